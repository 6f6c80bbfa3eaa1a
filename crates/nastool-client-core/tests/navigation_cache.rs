use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use async_trait::async_trait;
use nastool_client_core::{
    CacheLookup, CommandClient, CommandTransport, FavUpdate, HistoryEntry, MemoryHistory,
    NavOutcome, NavigationContext, Navigator, PageCache, PageFetcher, ShellConfig, ShellHost,
    TransportError, set_fav_at,
};
use serde_json::{Value, json};

#[derive(Default)]
struct FakeServer {
    commands: RefCell<HashMap<String, Value>>,
    command_calls: RefCell<Vec<String>>,
    page_calls: RefCell<Vec<String>>,
}

impl FakeServer {
    fn command_calls(&self) -> usize {
        self.command_calls.borrow().len()
    }
}

#[async_trait(?Send)]
impl CommandTransport for FakeServer {
    async fn call(&self, command: &str, _payload: &Value) -> Result<Value, TransportError> {
        self.command_calls.borrow_mut().push(command.to_string());
        self.commands
            .borrow()
            .get(command)
            .cloned()
            .ok_or_else(|| TransportError::Network(format!("unknown command {command}")))
    }
}

#[async_trait(?Send)]
impl PageFetcher for FakeServer {
    async fn fetch_page(&self, page: &str) -> Result<String, TransportError> {
        self.page_calls.borrow_mut().push(page.to_string());
        Ok(format!("<div data-page=\"{page}\"></div>"))
    }
}

#[derive(Default)]
struct QuietHost {
    scroll_y: RefCell<f64>,
}

impl ShellHost for QuietHost {
    fn update_active_menu(&self, _page: &str) {}
    fn unbind_scroll(&self) {}
    fn replace_content(&self, _html: &str) {}
    fn content_title(&self) -> Option<String> {
        None
    }
    fn close_modals(&self) {}
    fn refresh_tooltips(&self) {}
    fn init_filetree(&self) {}
    fn scroll_y(&self) -> f64 {
        *self.scroll_y.borrow()
    }
    fn scroll_to(&self, y: f64) {
        *self.scroll_y.borrow_mut() = y;
    }
    fn reload(&self) {}
}

#[tokio::test]
async fn patched_cache_survives_back_navigation() {
    let server = Rc::new(FakeServer::default());
    server
        .commands
        .borrow_mut()
        .insert("search".to_string(), json!([{"id": 1, "fav": "0"}]));
    let history = Rc::new(MemoryHistory::new());
    let navigation = NavigationContext::new(history.clone(), HistoryEntry::new("index")).into_handle();
    let navigator = Navigator::new(
        navigation.clone(),
        server.clone(),
        QuietHost::default(),
        ShellConfig::default(),
    );
    let cache = PageCache::new(navigation, CommandClient::new(server.clone()));

    let outcome = navigator.navmenu("list?x=1", false).await;
    assert_eq!(
        outcome,
        NavOutcome::Loaded {
            page: "list?x=1".to_string()
        }
    );

    let first = cache
        .get_cache_or_fetch("search", "q1", &json!({"s": "q1"}), true)
        .await
        .expect("cache lookup");
    assert_eq!(first, CacheLookup::Fetched(json!([{"id": 1, "fav": "0"}])));

    let update = cache.update_fav_data("search", "q1", |mut entry| {
        set_fav_at(&mut entry, "/0", "1");
        entry
    });
    assert_eq!(update, FavUpdate::Updated);

    navigator.navmenu("other", false).await;
    assert_eq!(cache.get_page_data("searchq1"), None);

    let popped = history.back().expect("list entry behind other");
    assert_eq!(popped.page, "list?x=1");
    navigator.on_popstate(popped).await;

    let calls_before = server.command_calls();
    let restored = cache
        .get_cache_or_fetch("search", "q1", &json!({"s": "q1"}), true)
        .await
        .expect("cache lookup");
    assert_eq!(restored, CacheLookup::Hit(json!([{"id": 1, "fav": "1"}])));
    assert_eq!(server.command_calls(), calls_before);
    assert_eq!(
        *server.page_calls.borrow(),
        vec!["list?x=1", "other", "list?x=1"]
    );
}

#[tokio::test]
async fn fresh_visit_to_same_page_starts_with_empty_cache() {
    let server = Rc::new(FakeServer::default());
    server
        .commands
        .borrow_mut()
        .insert("get_recommend".to_string(), json!({"code": 0, "Items": []}));
    let history = Rc::new(MemoryHistory::new());
    let navigation = NavigationContext::new(history.clone(), HistoryEntry::new("index")).into_handle();
    let navigator = Navigator::new(
        navigation.clone(),
        server.clone(),
        QuietHost::default(),
        ShellConfig::default(),
    );
    let cache = PageCache::new(navigation, CommandClient::new(server.clone()));

    navigator.navmenu("discovery", false).await;
    cache
        .get_cache_or_fetch("get_recommend", "hm", &json!({}), true)
        .await
        .expect("cache lookup");
    navigator.navmenu("discovery", false).await;

    let lookup = cache
        .get_cache_or_fetch("get_recommend", "hm", &json!({}), true)
        .await
        .expect("cache lookup");
    assert!(matches!(lookup, CacheLookup::Fetched(_)));
    assert_eq!(server.command_calls(), 2);
    assert_eq!(history.entries().len(), 3);
}
