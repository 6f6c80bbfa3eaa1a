//! SPA navigation: fetch page markup, swap it in, and keep the history
//! entry, menu highlight and scroll position in step.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use futures::future::{AbortHandle, Abortable};
use tracing::{debug, warn};

use crate::config::ShellConfig;
use crate::error::TransportError;
use crate::history::{HistoryEntry, NavigationHandle, normalize_page};
use crate::transport::{NoProgress, PageFetcher, ProgressIndicator};

/// DOM side effects of a page swap.
pub trait ShellHost {
    fn update_active_menu(&self, page: &str);
    /// Drops page-specific scroll listeners (infinite-scroll pages).
    fn unbind_scroll(&self);
    fn replace_content(&self, html: &str);
    /// `<title>` found in the swapped content, if any.
    fn content_title(&self) -> Option<String>;
    fn close_modals(&self);
    fn refresh_tooltips(&self);
    fn init_filetree(&self);
    fn scroll_y(&self) -> f64;
    fn scroll_to(&self, y: f64);
    fn reload(&self);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavOutcome {
    Loaded { page: String },
    /// The server answered with the login page; a full reload was requested.
    SessionExpired,
    /// A newer navigation started before this one finished.
    Superseded,
    Failed(TransportError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Commit {
    Push,
    Replace,
    /// Entry already adopted from `popstate`.
    Keep,
}

pub struct Navigator<F, H> {
    navigation: NavigationHandle,
    fetcher: F,
    host: H,
    config: ShellConfig,
    progress: Rc<dyn ProgressIndicator>,
    modal_abort: Cell<bool>,
    /// Bumped by every page load; a fetch whose number is no longer the
    /// latest lost the race to a newer navigation.
    load_seq: Cell<u64>,
    in_flight: RefCell<Option<AbortHandle>>,
}

impl<F: PageFetcher, H: ShellHost> Navigator<F, H> {
    pub fn new(navigation: NavigationHandle, fetcher: F, host: H, config: ShellConfig) -> Self {
        Self {
            navigation,
            fetcher,
            host,
            config,
            progress: Rc::new(NoProgress),
            modal_abort: Cell::new(true),
            load_seq: Cell::new(0),
            in_flight: RefCell::new(None),
        }
    }

    #[must_use]
    pub fn with_progress(mut self, progress: Rc<dyn ProgressIndicator>) -> Self {
        self.progress = progress;
        self
    }

    pub fn navigation(&self) -> &NavigationHandle {
        &self.navigation
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    /// Whether a completed navigation closes open modal dialogs.
    pub fn set_modal_abort(&self, enabled: bool) {
        self.modal_abort.set(enabled);
    }

    pub fn current_page(&self) -> String {
        self.navigation.borrow().current_page().to_string()
    }

    pub async fn navmenu(&self, target: &str, replace: bool) -> NavOutcome {
        let previous_page = self.current_page();
        if !replace {
            self.remember_scroll(&previous_page);
        }
        let commit = if replace { Commit::Replace } else { Commit::Push };
        self.load(normalize_page(target), commit, &previous_page)
            .await
    }

    /// Reloads the current page in place, keeping its history entry.
    pub async fn window_history_refresh(&self) -> NavOutcome {
        let page = self.current_page();
        self.navmenu(&page, true).await
    }

    /// Back/forward: adopt the popped entry verbatim and reload its markup.
    pub async fn on_popstate(&self, entry: HistoryEntry) -> NavOutcome {
        let previous_page = self.current_page();
        self.remember_scroll(&previous_page);
        let page = entry.page.clone();
        self.navigation.borrow_mut().restore(entry);
        self.load(page, Commit::Keep, &previous_page).await
    }

    async fn load(&self, page: String, commit: Commit, previous_page: &str) -> NavOutcome {
        self.navigation.borrow_mut().clear_current_results_page();
        self.host.update_active_menu(&page);
        self.host.unbind_scroll();
        self.progress.start();

        let seq = self.load_seq.get() + 1;
        self.load_seq.set(seq);
        let (abort_handle, registration) = AbortHandle::new_pair();
        if let Some(previous) = self.in_flight.replace(Some(abort_handle)) {
            debug!(page = %page, "aborting previous page fetch");
            previous.abort();
        }

        let fetched = Abortable::new(self.fetcher.fetch_page(&page), registration).await;
        if self.load_seq.get() != seq {
            debug!(page = %page, seq, "page fetch superseded");
            return NavOutcome::Superseded;
        }
        self.in_flight.borrow_mut().take();
        self.progress.done();

        let html = match fetched {
            Ok(Ok(html)) => html,
            Ok(Err(error)) => {
                warn!(page = %page, %error, "page fetch failed");
                return NavOutcome::Failed(error);
            }
            Err(_aborted) => return NavOutcome::Superseded,
        };

        {
            let mut navigation = self.navigation.borrow_mut();
            match commit {
                Commit::Push => navigation.commit_push(&page),
                Commit::Replace => navigation.commit_replace(&page),
                Commit::Keep => {}
            }
        }

        self.host.replace_content(&html);
        if self.host.content_title().as_deref() == Some(self.config.login_page_title.as_str()) {
            debug!(page = %page, "login page returned, reloading");
            self.host.reload();
            return NavOutcome::SessionExpired;
        }

        if self.modal_abort.get() && self.config.close_modals_on_navigate {
            self.host.close_modals();
        }
        self.host.refresh_tooltips();
        self.host.init_filetree();

        if page != previous_page {
            let scroll_target = match commit {
                Commit::Keep => self.navigation.borrow().scroll_for(&page).unwrap_or(0.0),
                Commit::Push | Commit::Replace => 0.0,
            };
            self.host.scroll_to(scroll_target);
        }
        NavOutcome::Loaded { page }
    }

    fn remember_scroll(&self, page: &str) {
        let y = self.host.scroll_y();
        self.navigation.borrow_mut().remember_scroll(page, y);
    }
}
