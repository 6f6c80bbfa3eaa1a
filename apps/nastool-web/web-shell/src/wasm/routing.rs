use super::*;

    use nastool_client_core::HistorySink;
    use web_sys::PopStateEvent;

    use crate::shell_state::{decode_history_state, encode_history_state};

    /// Persists entries into `history.state`; the address bar is left alone.
    pub(crate) struct BrowserHistory {
        history: web_sys::History,
    }

    impl BrowserHistory {
        pub(super) fn new() -> Result<Self, String> {
            let window = web_sys::window().ok_or_else(|| "window is unavailable".to_string())?;
            let history = window
                .history()
                .map_err(|_| "history is unavailable".to_string())?;
            Ok(Self { history })
        }

        fn state_value(entry: &HistoryEntry) -> Option<JsValue> {
            let raw = match encode_history_state(entry) {
                Ok(raw) => raw,
                Err(error) => {
                    report_warning(&format!("history entry for `{}` not stored: {error}", entry.page));
                    return None;
                }
            };
            match js_sys::JSON::parse(&raw) {
                Ok(value) => Some(value),
                Err(error) => {
                    report_js_error("history state parse failed", &error);
                    None
                }
            }
        }
    }

    impl HistorySink for BrowserHistory {
        fn push_state(&self, entry: &HistoryEntry) {
            let Some(state) = Self::state_value(entry) else {
                return;
            };
            if let Err(error) = self.history.push_state(&state, "") {
                report_js_error("pushState failed", &error);
            }
        }

        fn replace_state(&self, entry: &HistoryEntry) {
            let Some(state) = Self::state_value(entry) else {
                return;
            };
            if let Err(error) = self.history.replace_state(&state, "") {
                report_js_error("replaceState failed", &error);
            }
        }
    }

    /// Entry kept by the browser across a reload, if it is one of ours.
    pub(super) fn restored_history_entry() -> Option<HistoryEntry> {
        let state = web_sys::window()?.history().ok()?.state().ok()?;
        history_entry_from_js(&state)
    }

    pub(super) fn current_location_page() -> String {
        let Some(location) = web_sys::window().map(|window| window.location()) else {
            return "index".to_string();
        };
        let path = location.pathname().unwrap_or_default();
        let search = location.search().unwrap_or_default();
        let page = format!("{}{search}", path.trim_start_matches('/'));
        if page.is_empty() {
            "index".to_string()
        } else {
            page
        }
    }

    pub(super) fn install_popstate_handler() -> Result<(), String> {
        let window = web_sys::window().ok_or_else(|| "window is unavailable".to_string())?;
        POPSTATE_HANDLER.with(|slot| {
            if slot.borrow().is_some() {
                return Ok(());
            }
            let callback = Closure::<dyn FnMut(web_sys::Event)>::wrap(Box::new(move |event| {
                handle_popstate(event);
            }));
            window
                .add_event_listener_with_callback("popstate", callback.as_ref().unchecked_ref())
                .map_err(|_| "failed to install popstate listener".to_string())?;
            *slot.borrow_mut() = Some(callback);
            Ok(())
        })
    }

    pub(super) fn handle_popstate(event: web_sys::Event) {
        let Some(event) = event.dyn_ref::<PopStateEvent>() else {
            return;
        };
        let Some(entry) = history_entry_from_js(&event.state()) else {
            return;
        };
        let Some(shell) = shell() else {
            return;
        };
        spawn_local(async move {
            let outcome = shell.navigator.on_popstate(entry).await;
            record_navigation(&outcome);
        });
    }

    fn history_entry_from_js(state: &JsValue) -> Option<HistoryEntry> {
        if state.is_null() || state.is_undefined() {
            return None;
        }
        let raw = js_sys::JSON::stringify(state).ok()?.as_string()?;
        decode_history_state(&raw).ok()
    }
