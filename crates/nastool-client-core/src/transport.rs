//! Command transport contract and the `ajax_post` style client on top of it.

use std::rc::Rc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::TransportError;

pub const NETWORK_ERROR_CODE: i64 = -99;
pub const NETWORK_ERROR_MESSAGE: &str = "网络错误";

/// Decoded command response: `{ code, msg?, ...fields }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    #[serde(default)]
    pub code: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ApiResponse {
    #[must_use]
    pub fn ok_empty() -> Self {
        Self {
            code: 0,
            msg: None,
            fields: Map::new(),
        }
    }

    #[must_use]
    pub fn network_error() -> Self {
        Self {
            code: NETWORK_ERROR_CODE,
            msg: Some(NETWORK_ERROR_MESSAGE.to_string()),
            fields: Map::new(),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.code == 0
    }

    #[must_use]
    pub fn is_network_error(&self) -> bool {
        self.code == NETWORK_ERROR_CODE
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// String view of a field; numbers are rendered, empty strings are `None`.
    #[must_use]
    pub fn field_str(&self, name: &str) -> Option<String> {
        match self.fields.get(name)? {
            Value::String(value) if !value.trim().is_empty() => Some(value.clone()),
            Value::Number(value) => Some(value.to_string()),
            _ => None,
        }
    }

    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        let mut object = Map::new();
        object.insert("code".to_string(), Value::from(self.code));
        if let Some(msg) = self.msg {
            object.insert("msg".to_string(), Value::String(msg));
        }
        object.extend(self.fields);
        Value::Object(object)
    }
}

/// POST-style RPC: `command + JSON payload -> JSON body`.
#[async_trait(?Send)]
pub trait CommandTransport {
    async fn call(&self, command: &str, payload: &Value) -> Result<Value, TransportError>;
}

#[async_trait(?Send)]
impl<T: CommandTransport + ?Sized> CommandTransport for Rc<T> {
    async fn call(&self, command: &str, payload: &Value) -> Result<Value, TransportError> {
        (**self).call(command, payload).await
    }
}

/// Fetches the HTML fragment for a page path.
#[async_trait(?Send)]
pub trait PageFetcher {
    async fn fetch_page(&self, page: &str) -> Result<String, TransportError>;
}

#[async_trait(?Send)]
impl<T: PageFetcher + ?Sized> PageFetcher for Rc<T> {
    async fn fetch_page(&self, page: &str) -> Result<String, TransportError> {
        (**self).fetch_page(page).await
    }
}

/// Top-of-page progress bar.
pub trait ProgressIndicator {
    fn start(&self);
    fn done(&self);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressIndicator for NoProgress {
    fn start(&self) {}
    fn done(&self) {}
}

/// Wraps a transport with progress reporting and the network-error sentinel.
pub struct CommandClient<T> {
    transport: T,
    progress: Rc<dyn ProgressIndicator>,
}

impl<T: CommandTransport> CommandClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            progress: Rc::new(NoProgress),
        }
    }

    #[must_use]
    pub fn with_progress(mut self, progress: Rc<dyn ProgressIndicator>) -> Self {
        self.progress = progress;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub async fn post(&self, command: &str, payload: &Value) -> ApiResponse {
        let body = self.post_raw(command, payload).await;
        ApiResponse::from_value(body).unwrap_or_else(|error| {
            debug!(command, %error, "command body is not a response object");
            ApiResponse::ok_empty()
        })
    }

    /// Response body as delivered, with transport failures replaced by the
    /// network-error sentinel. Non-object bodies (lists) pass through.
    pub async fn post_raw(&self, command: &str, payload: &Value) -> Value {
        self.try_post_raw(command, payload)
            .await
            .unwrap_or_else(|_| ApiResponse::network_error().into_value())
    }

    /// Like [`Self::post_raw`] but keeps transport failures apart from
    /// server replies. An undecodable HTTP 200 body still counts as a reply.
    pub async fn try_post_raw(
        &self,
        command: &str,
        payload: &Value,
    ) -> Result<Value, TransportError> {
        self.progress.start();
        let result = self.transport.call(command, payload).await;
        self.progress.done();

        match result {
            Ok(body) => Ok(body),
            Err(error) if error.is_ok_status() => {
                debug!(command, %error, "undecodable 200 response treated as success");
                Ok(ApiResponse::ok_empty().into_value())
            }
            Err(error) => {
                debug!(command, %error, "command transport failed");
                Err(error)
            }
        }
    }
}
