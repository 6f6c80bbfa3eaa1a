use super::*;

    pub(super) fn set_shell_phase(phase: &str, detail: &str) {
        DIAGNOSTICS.with(|state| {
            let mut state = state.borrow_mut();
            state.phase = phase.to_string();
            state.detail = detail.to_string();
            if phase != "error" {
                state.last_error = None;
            }
        });
    }

    pub(super) fn set_shell_error(message: &str) {
        DIAGNOSTICS.with(|state| {
            let mut state = state.borrow_mut();
            state.phase = "error".to_string();
            state.detail = "startup failed".to_string();
            state.last_error = Some(message.to_string());
        });
        web_sys::console::error_1(&JsValue::from_str(&format!("nastool shell: {message}")));
    }

    pub(super) fn report_warning(message: &str) {
        web_sys::console::warn_1(&JsValue::from_str(&format!("nastool shell: {message}")));
    }

    pub(super) fn report_js_error(context: &str, error: &JsValue) {
        web_sys::console::warn_2(&JsValue::from_str(&format!("nastool shell: {context}")), error);
    }

    pub(super) fn report_missing_shell(operation: &str) {
        report_warning(&format!("`{operation}` called before the shell started"));
    }
