//! Platform-agnostic core of the NAStool web client.
//!
//! The browser shell supplies a [`CommandTransport`], a [`PageFetcher`], a
//! [`HistorySink`] and a [`ShellHost`]; everything else (the history-scoped
//! API cache, SPA navigation, the reactive state store and media
//! subscription flows) lives here and runs natively in tests.

pub mod config;
pub mod error;
pub mod history;
pub mod media;
pub mod navigator;
pub mod observe;
pub mod page_cache;
pub mod state;
pub mod transport;

#[cfg(test)]
mod testing;

pub use config::ShellConfig;
pub use error::{ClientError, ConfigError, Result, TransportError};
pub use history::{
    HistoryEntry, HistorySink, MemoryHistory, NavigationContext, NavigationHandle, PageTicket,
    cache_key, normalize_page,
};
pub use media::{FavFlag, MediaId, MediaRef, RssOutcome};
pub use navigator::{NavOutcome, Navigator, ShellHost};
pub use observe::{Component, Lifecycle, ObservedComponent};
pub use page_cache::{CacheLookup, FavUpdate, PageCache, set_fav_at};
pub use state::{RenderContext, StateStore, StateVar, SubscriptionId};
pub use transport::{
    ApiResponse, CommandClient, CommandTransport, NoProgress, PageFetcher, ProgressIndicator,
};
