use super::*;

    use nastool_client_core::config::SHELL_CONFIG_ELEMENT_ID;
    use nastool_client_core::transport::ProgressIndicator;
    use nastool_client_core::ShellHost;
    use web_sys::{Document, Element, HtmlElement};

    /// DOM side effects of a page swap, bound to the configured element ids.
    pub(crate) struct DomHost {
        content_region_id: String,
        menu_id: String,
    }

    impl DomHost {
        pub(super) fn new(config: &ShellConfig) -> Self {
            Self {
                content_region_id: config.content_region_id.clone(),
                menu_id: config.menu_id.clone(),
            }
        }

        fn content_region(&self) -> Option<Element> {
            document()?.get_element_by_id(&self.content_region_id)
        }
    }

    impl ShellHost for DomHost {
        fn update_active_menu(&self, page: &str) {
            let Some(menu) = document().and_then(|document| document.get_element_by_id(&self.menu_id))
            else {
                return;
            };
            let Ok(method) = js_sys::Reflect::get(&menu, &JsValue::from_str(MENU_UPDATE_METHOD)) else {
                return;
            };
            let Ok(method) = method.dyn_into::<js_sys::Function>() else {
                return;
            };
            if let Err(error) = method.call1(&menu, &JsValue::from_str(page)) {
                report_js_error("menu highlight failed", &error);
            }
        }

        fn unbind_scroll(&self) {
            call_global_hook(SCROLL_UNBIND_HOOK);
        }

        fn replace_content(&self, html: &str) {
            match self.content_region() {
                Some(region) => region.set_inner_html(html),
                None => report_warning(&format!(
                    "content region `#{}` is missing",
                    self.content_region_id
                )),
            }
        }

        fn content_title(&self) -> Option<String> {
            let title = self
                .content_region()?
                .query_selector(CONTENT_TITLE_SELECTOR)
                .ok()??;
            title.text_content().map(|text| text.trim().to_string())
        }

        fn close_modals(&self) {
            let Some(document) = document() else {
                return;
            };
            for modal in elements_by_class(&document, MODAL_CLASS) {
                let _ = modal.class_list().remove_1(MODAL_SHOWN_CLASS);
                if let Ok(modal) = modal.dyn_into::<HtmlElement>() {
                    let _ = modal.style().set_property("display", "none");
                }
            }
            for backdrop in elements_by_class(&document, MODAL_BACKDROP_CLASS) {
                backdrop.remove();
            }
            if let Some(body) = document.body() {
                let _ = body.class_list().remove_1(BODY_MODAL_OPEN_CLASS);
            }
        }

        fn refresh_tooltips(&self) {
            call_global_hook(TOOLTIP_REFRESH_HOOK);
        }

        fn init_filetree(&self) {
            call_global_hook(FILETREE_INIT_HOOK);
        }

        fn scroll_y(&self) -> f64 {
            web_sys::window()
                .and_then(|window| window.scroll_y().ok())
                .unwrap_or(0.0)
        }

        fn scroll_to(&self, y: f64) {
            if let Some(window) = web_sys::window() {
                window.scroll_to_with_x_and_y(0.0, y);
            }
        }

        fn reload(&self) {
            let Some(window) = web_sys::window() else {
                return;
            };
            if let Err(error) = window.location().reload() {
                report_js_error("reload failed", &error);
            }
        }
    }

    /// Top-of-page progress bar (`window.NProgress`), silent when absent.
    pub(crate) struct NProgressIndicator;

    impl NProgressIndicator {
        fn call(method: &str) {
            let Some(window) = web_sys::window() else {
                return;
            };
            let Ok(progress) = js_sys::Reflect::get(&window, &JsValue::from_str(PROGRESS_GLOBAL)) else {
                return;
            };
            if progress.is_undefined() {
                return;
            }
            let Ok(function) = js_sys::Reflect::get(&progress, &JsValue::from_str(method)) else {
                return;
            };
            let Ok(function) = function.dyn_into::<js_sys::Function>() else {
                return;
            };
            let _ = function.call0(&progress);
        }
    }

    impl ProgressIndicator for NProgressIndicator {
        fn start(&self) {
            Self::call("start");
        }

        fn done(&self) {
            Self::call("done");
        }
    }

    /// Shell config from `<script type="application/json" id="nastool-shell-config">`.
    pub(super) fn read_shell_config() -> ShellConfig {
        let raw = document()
            .and_then(|document| document.get_element_by_id(SHELL_CONFIG_ELEMENT_ID))
            .and_then(|element| element.text_content());
        let Some(raw) = raw else {
            return ShellConfig::default();
        };
        ShellConfig::from_json(&raw).unwrap_or_else(|error| {
            report_warning(&format!("ignoring shell config: {error}"));
            ShellConfig::default()
        })
    }

    pub(super) fn first_menu_page(config: &ShellConfig) -> Option<String> {
        document()?
            .get_element_by_id(&config.menu_id)?
            .query_selector(MENU_PAGE_SELECTOR)
            .ok()??
            .get_attribute(MENU_PAGE_ATTRIBUTE)
    }

    pub(super) fn document() -> Option<Document> {
        web_sys::window()?.document()
    }

    /// Calls `window[name]()` when the page defines it.
    pub(super) fn call_global_hook(name: &str) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let Ok(hook) = js_sys::Reflect::get(&window, &JsValue::from_str(name)) else {
            return;
        };
        let Ok(hook) = hook.dyn_into::<js_sys::Function>() else {
            return;
        };
        if let Err(error) = hook.call0(&window) {
            report_js_error(name, &error);
        }
    }

    fn elements_by_class(document: &Document, class_name: &str) -> Vec<Element> {
        let collection = document.get_elements_by_class_name(class_name);
        (0..collection.length())
            .filter_map(|index| collection.item(index))
            .collect()
    }
