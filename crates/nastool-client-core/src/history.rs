//! Navigation history entries and the context that owns the current one.
//!
//! A [`HistoryEntry`] mirrors the browser's `history.state` object
//! (`{ page, extra }`). [`NavigationContext`] is the single owner of the
//! current entry: the page cache reads and writes `extra` through it, and the
//! navigator advances it. Every write is persisted through a [`HistorySink`]
//! so back/forward restores `extra` verbatim.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::DEFAULT_SCROLL_POSITION_LIMIT;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub page: String,
    #[serde(default)]
    pub extra: BTreeMap<String, Value>,
}

impl HistoryEntry {
    pub fn new(page: impl Into<String>) -> Self {
        Self {
            page: page.into(),
            extra: BTreeMap::new(),
        }
    }
}

/// Escapes spaces the way page links are written into the history stack.
#[must_use]
pub fn normalize_page(page: &str) -> String {
    page.replace(' ', "%20")
}

#[must_use]
pub fn cache_key(api: &str, sub: &str) -> String {
    format!("{api}{sub}")
}

/// Where history entries are persisted (`pushState` / `replaceState`).
pub trait HistorySink {
    fn push_state(&self, entry: &HistoryEntry);
    fn replace_state(&self, entry: &HistoryEntry);
}

/// In-memory back/forward stack.
#[derive(Debug, Default)]
pub struct MemoryHistory {
    entries: RefCell<Vec<HistoryEntry>>,
    cursor: Cell<usize>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.entries.borrow().clone()
    }

    pub fn current(&self) -> Option<HistoryEntry> {
        self.entries.borrow().get(self.cursor.get()).cloned()
    }

    /// Steps back and returns the entry a `popstate` would carry.
    pub fn back(&self) -> Option<HistoryEntry> {
        let cursor = self.cursor.get();
        if cursor == 0 {
            return None;
        }
        self.cursor.set(cursor - 1);
        self.current()
    }

    pub fn forward(&self) -> Option<HistoryEntry> {
        let next = self.cursor.get() + 1;
        if next >= self.entries.borrow().len() {
            return None;
        }
        self.cursor.set(next);
        self.current()
    }
}

impl HistorySink for MemoryHistory {
    fn push_state(&self, entry: &HistoryEntry) {
        let mut entries = self.entries.borrow_mut();
        if !entries.is_empty() {
            entries.truncate(self.cursor.get() + 1);
        }
        entries.push(entry.clone());
        self.cursor.set(entries.len() - 1);
    }

    fn replace_state(&self, entry: &HistoryEntry) {
        let mut entries = self.entries.borrow_mut();
        match entries.get_mut(self.cursor.get()) {
            Some(slot) => *slot = entry.clone(),
            None => {
                entries.push(entry.clone());
                self.cursor.set(entries.len() - 1);
            }
        }
    }
}

/// Identity of the view a request was issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTicket {
    pub page: String,
    pub generation: u64,
}

pub struct NavigationContext {
    entry: HistoryEntry,
    generation: u64,
    sink: Rc<dyn HistorySink>,
    results_page: Option<u32>,
    scroll_positions: VecDeque<(String, f64)>,
    scroll_limit: usize,
}

pub type NavigationHandle = Rc<RefCell<NavigationContext>>;

impl NavigationContext {
    /// Adopts `initial` as the current entry and persists it in place.
    pub fn new(sink: Rc<dyn HistorySink>, initial: HistoryEntry) -> Self {
        sink.replace_state(&initial);
        Self {
            entry: initial,
            generation: 0,
            sink,
            results_page: None,
            scroll_positions: VecDeque::new(),
            scroll_limit: DEFAULT_SCROLL_POSITION_LIMIT,
        }
    }

    #[must_use]
    pub fn with_scroll_limit(mut self, limit: usize) -> Self {
        self.scroll_limit = limit.max(1);
        self
    }

    pub fn into_handle(self) -> NavigationHandle {
        Rc::new(RefCell::new(self))
    }

    pub fn current_page(&self) -> &str {
        &self.entry.page
    }

    pub fn current_entry(&self) -> &HistoryEntry {
        &self.entry
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn ticket(&self) -> PageTicket {
        PageTicket {
            page: self.entry.page.clone(),
            generation: self.generation,
        }
    }

    /// A response may only be applied while both page and generation match.
    pub fn is_current(&self, ticket: &PageTicket) -> bool {
        ticket.generation == self.generation && ticket.page == self.entry.page
    }

    /// Every change of the active entry expires the tickets issued for the
    /// previous one, even when the page string repeats.
    fn advance_generation(&mut self) {
        self.generation += 1;
    }

    pub fn commit_push(&mut self, page: &str) {
        self.entry = HistoryEntry::new(page);
        self.advance_generation();
        self.sink.push_state(&self.entry);
    }

    /// Replaces the current entry in place; `extra` and outstanding tickets
    /// survive only when the page is unchanged.
    pub fn commit_replace(&mut self, page: &str) {
        if self.entry.page != page {
            self.entry = HistoryEntry::new(page);
            self.advance_generation();
        }
        self.sink.replace_state(&self.entry);
    }

    /// Adopts an entry handed back by `popstate`, cache bag included.
    pub fn restore(&mut self, entry: HistoryEntry) {
        self.entry = entry;
        self.advance_generation();
    }

    pub fn get_page_data(&self, key: &str) -> Option<&Value> {
        self.entry.extra.get(key)
    }

    pub fn save_page_data(&mut self, key: &str, value: Value) {
        self.entry.extra.insert(key.to_string(), value);
        self.sink.replace_state(&self.entry);
    }

    pub fn remove_page_data(&mut self, key: &str) -> Option<Value> {
        let removed = self.entry.extra.remove(key);
        if removed.is_some() {
            self.sink.replace_state(&self.entry);
        }
        removed
    }

    pub fn clear_page_data(&mut self) {
        if self.entry.extra.is_empty() {
            return;
        }
        self.entry.extra.clear();
        self.sink.replace_state(&self.entry);
    }

    pub fn remember_scroll(&mut self, page: &str, y: f64) {
        self.scroll_positions.retain(|(known, _)| known != page);
        self.scroll_positions.push_back((page.to_string(), y));
        while self.scroll_positions.len() > self.scroll_limit {
            self.scroll_positions.pop_front();
        }
    }

    pub fn scroll_for(&self, page: &str) -> Option<f64> {
        self.scroll_positions
            .iter()
            .find(|(known, _)| known == page)
            .map(|(_, y)| *y)
    }

    pub fn set_current_results_page(&mut self, page_number: u32) {
        self.results_page = Some(page_number);
    }

    pub fn current_results_page(&self) -> Option<u32> {
        self.results_page
    }

    pub fn clear_current_results_page(&mut self) {
        self.results_page = None;
    }
}
