use super::*;

    use async_trait::async_trait;
    use gloo_net::http::{Request, Response};
    use nastool_client_core::{CommandTransport, PageFetcher, TransportError};

    /// Posts commands as `cmd` + JSON `data` form fields to the API path.
    pub(crate) struct GlooTransport {
        config: ShellConfig,
    }

    impl GlooTransport {
        pub(super) fn new(config: &ShellConfig) -> Self {
            Self {
                config: config.clone(),
            }
        }
    }

    #[async_trait(?Send)]
    impl CommandTransport for GlooTransport {
        async fn call(&self, command: &str, payload: &Value) -> Result<Value, TransportError> {
            let data = serde_json::to_string(payload).map_err(|error| TransportError::Decode {
                status: 0,
                message: format!("failed to serialize command payload: {error}"),
            })?;
            let form = web_sys::UrlSearchParams::new()
                .map_err(|_| TransportError::Network("form encoder is unavailable".to_string()))?;
            form.append("cmd", command);
            form.append("data", &data);

            let url = self.config.command_url(js_sys::Math::random());
            let response = Request::post(&url)
                .body(form)
                .map_err(map_network_error)?
                .send()
                .await
                .map_err(map_network_error)?;
            decode_command_response(response).await
        }
    }

    /// Fetches page markup from the path named after the page.
    pub(crate) struct GlooPageFetcher;

    #[async_trait(?Send)]
    impl PageFetcher for GlooPageFetcher {
        async fn fetch_page(&self, page: &str) -> Result<String, TransportError> {
            let response = Request::get(page)
                .send()
                .await
                .map_err(map_network_error)?;
            if !response.ok() {
                return Err(TransportError::Status {
                    status: response.status(),
                });
            }
            response.text().await.map_err(map_network_error)
        }
    }

    pub(super) fn map_network_error(error: gloo_net::Error) -> TransportError {
        TransportError::Network(error.to_string())
    }

    pub(super) async fn decode_command_response(response: Response) -> Result<Value, TransportError> {
        let status = response.status();
        if !response.ok() {
            return Err(TransportError::Status { status });
        }
        let raw = response.text().await.map_err(map_network_error)?;
        serde_json::from_str(&raw).map_err(|error| TransportError::Decode {
            status,
            message: error.to_string(),
        })
    }

    /// JS value -> JSON through `JSON.stringify`; `undefined` and functions yield `None`.
    pub(super) fn js_to_value(value: &JsValue) -> Option<Value> {
        if value.is_undefined() {
            return None;
        }
        let raw = js_sys::JSON::stringify(value).ok()?.as_string()?;
        serde_json::from_str(&raw).ok()
    }

    pub(super) fn value_to_js(value: &Value) -> JsValue {
        serde_json::to_string(value)
            .ok()
            .and_then(|raw| js_sys::JSON::parse(&raw).ok())
            .unwrap_or(JsValue::NULL)
    }
