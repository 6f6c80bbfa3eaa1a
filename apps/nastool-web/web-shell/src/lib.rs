#[cfg(any(target_arch = "wasm32", test))]
mod shell_state;
#[cfg(target_arch = "wasm32")]
mod wasm_constants;

#[cfg(target_arch = "wasm32")]
mod wasm {
    use std::cell::RefCell;
    use std::rc::Rc;

    use nastool_client_core::media::{
        MediaSearchOutcome, love_click as core_love_click, media_search as core_media_search,
    };
    use nastool_client_core::{
        CommandClient, FavUpdate, HistoryEntry, NavOutcome, NavigationContext, Navigator,
        PageCache, ShellConfig,
    };
    use serde_json::Value;
    use wasm_bindgen::JsCast;
    use wasm_bindgen::prelude::*;
    use wasm_bindgen_futures::spawn_local;

    use crate::shell_state::{
        BootAction, LoveClickRequest, ShellDiagnostics, boot_action, love_click_json,
        media_search_json,
    };
    use crate::wasm_constants::*;

    mod dom;
    mod lifecycle;
    mod network;
    mod routing;

    use dom::*;
    use lifecycle::*;
    use network::*;
    use routing::*;

    thread_local! {
        static SHELL: RefCell<Option<Rc<WebShell>>> = const { RefCell::new(None) };
        static DIAGNOSTICS: RefCell<ShellDiagnostics> = RefCell::new(ShellDiagnostics::default());
        static POPSTATE_HANDLER: RefCell<Option<Closure<dyn FnMut(web_sys::Event)>>> = const { RefCell::new(None) };
    }

    pub(super) struct WebShell {
        navigator: Navigator<GlooPageFetcher, DomHost>,
        cache: PageCache<GlooTransport>,
        restored: Option<HistoryEntry>,
    }

    #[wasm_bindgen(start)]
    pub fn start() {
        console_error_panic_hook::set_once();
        set_shell_phase("booting", "initializing NAStool web shell");
        match install_shell() {
            Ok(()) => set_shell_phase("ready", "waiting for navigation menu"),
            Err(error) => set_shell_error(&error),
        }
    }

    /// Called by the navigation menu once it is mounted.
    #[wasm_bindgen]
    pub fn boot_shell(go_page: Option<String>) {
        let Some(shell) = shell() else {
            report_missing_shell("boot_shell");
            return;
        };
        let first_menu_page = first_menu_page(shell.navigator.config());
        let action = boot_action(
            go_page.as_deref(),
            shell.restored.as_ref(),
            first_menu_page.as_deref(),
        );
        match action {
            BootAction::Navigate(page) => navmenu(page, None),
            BootAction::Refresh => window_history_refresh(),
            BootAction::Idle => set_shell_phase("ready", "no page to open"),
        }
    }

    #[wasm_bindgen]
    pub fn navmenu(page: String, replace: Option<bool>) {
        let Some(shell) = shell() else {
            report_missing_shell("navmenu");
            return;
        };
        spawn_local(async move {
            let outcome = shell
                .navigator
                .navmenu(&page, replace.unwrap_or(false))
                .await;
            record_navigation(&outcome);
        });
    }

    #[wasm_bindgen]
    pub fn window_history_refresh() {
        let Some(shell) = shell() else {
            report_missing_shell("window_history_refresh");
            return;
        };
        spawn_local(async move {
            let outcome = shell.navigator.window_history_refresh().await;
            record_navigation(&outcome);
        });
    }

    #[wasm_bindgen]
    pub fn set_modal_abort(enabled: bool) {
        if let Some(shell) = shell() {
            shell.navigator.set_modal_abort(enabled);
        }
    }

    #[wasm_bindgen]
    pub fn get_cache_or_ajax(
        api: String,
        sub: String,
        payload: JsValue,
        on_result: js_sys::Function,
        cacheable: Option<bool>,
    ) {
        let Some(shell) = shell() else {
            report_missing_shell("get_cache_or_ajax");
            return;
        };
        let payload = js_to_value(&payload).unwrap_or(Value::Null);
        spawn_local(async move {
            let result = shell
                .cache
                .get_cache_or_ajax(
                    &api,
                    &sub,
                    &payload,
                    |value| invoke_callback(&on_result, &value),
                    cacheable.unwrap_or(true),
                )
                .await;
            if let Err(error) = result {
                report_warning(&error.to_string());
            }
        });
    }

    #[wasm_bindgen]
    pub fn save_page_data(key: String, value: JsValue) {
        let Some(shell) = shell() else {
            report_missing_shell("save_page_data");
            return;
        };
        match js_to_value(&value) {
            Some(value) => shell.cache.save_page_data(&key, value),
            None => report_warning(&format!("page data for `{key}` is not JSON")),
        }
    }

    #[wasm_bindgen]
    pub fn get_page_data(key: String) -> JsValue {
        shell()
            .and_then(|shell| shell.cache.get_page_data(&key))
            .map_or(JsValue::UNDEFINED, |value| value_to_js(&value))
    }

    #[wasm_bindgen]
    pub fn remove_page_data(key: String) -> bool {
        shell().is_some_and(|shell| shell.cache.remove_page_data(&key).is_some())
    }

    /// Drops every cached slot of the current entry; the next lookups refetch.
    #[wasm_bindgen]
    pub fn clear_page_data() {
        match shell() {
            Some(shell) => shell.cache.clear_page_data(),
            None => report_missing_shell("clear_page_data"),
        }
    }

    /// `mutator` receives a copy of the cached payload and returns the new one.
    #[wasm_bindgen]
    pub fn update_fav_data(api: String, sub: String, mutator: js_sys::Function) -> String {
        let Some(shell) = shell() else {
            report_missing_shell("update_fav_data");
            return "missing".to_string();
        };
        let update = shell.cache.update_fav_data(&api, &sub, |payload| {
            let input = value_to_js(&payload);
            match mutator.call1(&JsValue::NULL, &input) {
                Ok(output) => js_to_value(&output).unwrap_or(payload),
                Err(error) => {
                    report_js_error("fav mutator failed", &error);
                    payload
                }
            }
        });
        match update {
            FavUpdate::Missing => "missing",
            FavUpdate::Unchanged => "unchanged",
            FavUpdate::Updated => "updated",
        }
        .to_string()
    }

    #[wasm_bindgen]
    pub fn love_click(request: JsValue, on_result: js_sys::Function) {
        let Some(shell) = shell() else {
            report_missing_shell("love_click");
            return;
        };
        let request = match js_to_value(&request)
            .map(serde_json::from_value::<LoveClickRequest>)
        {
            Some(Ok(request)) => request,
            Some(Err(error)) => {
                report_warning(&format!("love click request is invalid: {error}"));
                return;
            }
            None => {
                report_warning("love click request is not JSON");
                return;
            }
        };
        spawn_local(async move {
            let slot = request.cached_slot();
            let outcome = core_love_click(
                &shell.cache,
                &request.media(),
                &request.page_type,
                request.current_fav(),
                slot.as_ref(),
            )
            .await;
            invoke_callback(&on_result, &love_click_json(&outcome));
        });
    }

    #[wasm_bindgen]
    pub fn media_search(
        tmdbid: String,
        title: String,
        media_type: String,
        on_result: Option<js_sys::Function>,
    ) {
        let Some(shell) = shell() else {
            report_missing_shell("media_search");
            return;
        };
        spawn_local(async move {
            let outcome = core_media_search(
                shell.cache.client(),
                &shell.navigator,
                &tmdbid,
                &title,
                &media_type,
            )
            .await;
            if let MediaSearchOutcome::Navigated(nav) = &outcome {
                record_navigation(nav);
            }
            if let Some(on_result) = on_result {
                invoke_callback(&on_result, &media_search_json(&outcome));
            }
        });
    }

    #[wasm_bindgen]
    pub fn shell_diagnostics_json() -> String {
        DIAGNOSTICS.with(|state| {
            serde_json::to_string(&*state.borrow()).unwrap_or_else(|_| {
                "{\"phase\":\"error\",\"detail\":\"diagnostics serialization failed\"}".to_string()
            })
        })
    }

    fn install_shell() -> Result<(), String> {
        if shell().is_some() {
            return Ok(());
        }
        let config = read_shell_config();
        let restored = restored_history_entry();
        let initial = restored
            .clone()
            .unwrap_or_else(|| HistoryEntry::new(current_location_page()));
        let navigation = NavigationContext::new(Rc::new(BrowserHistory::new()?), initial)
            .with_scroll_limit(config.scroll_position_limit)
            .into_handle();

        let progress = Rc::new(NProgressIndicator);
        let client = CommandClient::new(GlooTransport::new(&config)).with_progress(progress.clone());
        let navigator = Navigator::new(
            navigation.clone(),
            GlooPageFetcher,
            DomHost::new(&config),
            config,
        )
        .with_progress(progress);
        let shell = Rc::new(WebShell {
            navigator,
            cache: PageCache::new(navigation, client),
            restored,
        });
        SHELL.with(|slot| *slot.borrow_mut() = Some(shell));
        install_popstate_handler()
    }

    pub(super) fn shell() -> Option<Rc<WebShell>> {
        SHELL.with(|slot| slot.borrow().clone())
    }

    fn record_navigation(outcome: &NavOutcome) {
        DIAGNOSTICS.with(|state| state.borrow_mut().record_navigation(outcome));
        if let NavOutcome::Failed(error) = outcome {
            report_warning(&format!("page load failed: {error}"));
        }
    }

    fn invoke_callback(callback: &js_sys::Function, value: &Value) {
        if let Err(error) = callback.call1(&JsValue::NULL, &value_to_js(value)) {
            report_js_error("callback failed", &error);
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub use wasm::shell_diagnostics_json;

#[cfg(not(target_arch = "wasm32"))]
pub fn shell_diagnostics_json() -> String {
    "{\"phase\":\"native\",\"detail\":\"web shell diagnostics only available on wasm\"}".to_string()
}
