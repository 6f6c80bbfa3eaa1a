use nastool_client_core::media::{CachedSlot, LoveClickOutcome, MediaSearchOutcome};
use nastool_client_core::{FavFlag, FavUpdate, HistoryEntry, MediaId, MediaRef, NavOutcome, RssOutcome};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum HistoryStateError {
    #[error("history state is empty")]
    Empty,
    #[error("history state is not an entry: {0}")]
    Json(#[from] serde_json::Error),
    #[error("history state has no page")]
    MissingPage,
}

/// Decodes the JSON text of `history.state` (as produced by `JSON.stringify`).
pub(crate) fn decode_history_state(raw: &str) -> Result<HistoryEntry, HistoryStateError> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "null" || raw == "undefined" {
        return Err(HistoryStateError::Empty);
    }
    let entry: HistoryEntry = serde_json::from_str(raw)?;
    if entry.page.trim().is_empty() {
        return Err(HistoryStateError::MissingPage);
    }
    Ok(entry)
}

pub(crate) fn encode_history_state(entry: &HistoryEntry) -> Result<String, HistoryStateError> {
    Ok(serde_json::to_string(entry)?)
}

/// What the shell loads once the menu is mounted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum BootAction {
    Navigate(String),
    /// A reload kept `history.state`; refetch it in place so its cache survives.
    Refresh,
    Idle,
}

pub(crate) fn boot_action(
    go_page: Option<&str>,
    restored: Option<&HistoryEntry>,
    first_menu_page: Option<&str>,
) -> BootAction {
    if let Some(page) = go_page.map(str::trim).filter(|page| !page.is_empty()) {
        return BootAction::Navigate(page.to_string());
    }
    if restored.is_some() {
        return BootAction::Refresh;
    }
    match first_menu_page.map(str::trim).filter(|page| !page.is_empty()) {
        Some(page) => BootAction::Navigate(page.to_string()),
        None => BootAction::Idle,
    }
}

/// Card fields handed over by the heart button.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct LoveClickRequest {
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) year: String,
    pub(crate) media_type: String,
    pub(crate) id: String,
    #[serde(default)]
    pub(crate) page_type: String,
    #[serde(default)]
    pub(crate) fav: String,
    #[serde(default)]
    pub(crate) slot: Option<SlotRequest>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SlotRequest {
    pub(crate) api: String,
    pub(crate) sub: String,
    pub(crate) pointer: String,
}

impl LoveClickRequest {
    pub(crate) fn media(&self) -> MediaRef {
        MediaRef {
            title: self.title.clone(),
            year: self.year.clone(),
            media_type: self.media_type.clone(),
            id: MediaId::parse(&self.id),
        }
    }

    pub(crate) fn current_fav(&self) -> FavFlag {
        FavFlag::parse(&self.fav)
    }

    pub(crate) fn cached_slot(&self) -> Option<CachedSlot> {
        self.slot.as_ref().map(|slot| CachedSlot {
            api: slot.api.clone(),
            sub: slot.sub.clone(),
            pointer: slot.pointer.clone(),
        })
    }
}

pub(crate) fn rss_outcome_json(outcome: &RssOutcome) -> Value {
    match outcome {
        RssOutcome::Navigate(page) => json!({"kind": "navigate", "page": page}),
        RssOutcome::Subscribed { rssid } => json!({"kind": "subscribed", "rssid": rssid}),
        RssOutcome::RefreshPage => json!({"kind": "refresh"}),
        RssOutcome::Removed { name } => json!({"kind": "removed", "name": name}),
        RssOutcome::ChooseSeason { seasons } => json!({"kind": "choose_season", "seasons": seasons}),
        RssOutcome::Failed { msg } => json!({"kind": "failed", "msg": msg}),
    }
}

pub(crate) fn love_click_json(outcome: &LoveClickOutcome) -> Value {
    let cache = outcome.cache.map(|update| match update {
        FavUpdate::Missing => "missing",
        FavUpdate::Unchanged => "unchanged",
        FavUpdate::Updated => "updated",
    });
    json!({
        "fav": outcome.fav.as_str(),
        "rss": rss_outcome_json(&outcome.rss),
        "cache": cache,
    })
}

pub(crate) fn nav_outcome_label(outcome: &NavOutcome) -> &'static str {
    match outcome {
        NavOutcome::Loaded { .. } => "loaded",
        NavOutcome::SessionExpired => "session_expired",
        NavOutcome::Superseded => "superseded",
        NavOutcome::Failed(_) => "failed",
    }
}

pub(crate) fn media_search_json(outcome: &MediaSearchOutcome) -> Value {
    match outcome {
        MediaSearchOutcome::Navigated(nav) => {
            json!({"code": 0, "navigation": nav_outcome_label(nav)})
        }
        MediaSearchOutcome::Failed { msg } => json!({"code": 1, "msg": msg}),
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ShellDiagnostics {
    pub(crate) phase: String,
    pub(crate) detail: String,
    pub(crate) current_page: String,
    pub(crate) navigations: u64,
    pub(crate) superseded: u64,
    pub(crate) session_expired: bool,
    pub(crate) last_error: Option<String>,
}

impl ShellDiagnostics {
    pub(crate) fn record_navigation(&mut self, outcome: &NavOutcome) {
        self.navigations += 1;
        match outcome {
            NavOutcome::Loaded { page } => {
                self.current_page.clone_from(page);
                self.last_error = None;
            }
            NavOutcome::SessionExpired => self.session_expired = true,
            NavOutcome::Superseded => self.superseded += 1,
            NavOutcome::Failed(error) => self.last_error = Some(error.to_string()),
        }
    }
}

impl Default for ShellDiagnostics {
    fn default() -> Self {
        Self {
            phase: "idle".to_string(),
            detail: "shell not started".to_string(),
            current_page: String::new(),
            navigations: 0,
            superseded: 0,
            session_expired: false,
            last_error: None,
        }
    }
}
