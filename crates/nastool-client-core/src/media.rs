//! Media subscription commands and the favorite ("love") toggle that keeps
//! cached card payloads in step with the server.

use serde_json::{Value, json};
use tracing::debug;

use crate::navigator::{NavOutcome, Navigator, ShellHost};
use crate::page_cache::{FavUpdate, PageCache, set_fav_at};
use crate::transport::{ApiResponse, CommandClient, CommandTransport, PageFetcher};

/// Listing page types whose items are subscribed without a season lookup.
pub const SEASONLESS_PAGE_TYPES: [&str; 6] = ["hm", "nm", "dbom", "dbnm", "dbhm", "dbtop"];

const DOUBAN_PREFIX: &str = "DB:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavFlag {
    Unfaved,
    Faved,
}

impl FavFlag {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unfaved => "0",
            Self::Faved => "1",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Self {
        if raw.trim() == "1" {
            Self::Faved
        } else {
            Self::Unfaved
        }
    }

    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Unfaved => Self::Faved,
            Self::Faved => Self::Unfaved,
        }
    }
}

/// Identifier carried by a media card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaId {
    Tmdb(String),
    Douban(String),
    Unknown,
}

impl MediaId {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if let Some(douban) = raw.strip_prefix(DOUBAN_PREFIX) {
            return Self::Douban(douban.to_string());
        }
        if !raw.is_empty() && raw.chars().all(|ch| ch.is_ascii_digit()) {
            return Self::Tmdb(raw.to_string());
        }
        Self::Unknown
    }

    fn tmdb(&self) -> Option<&str> {
        match self {
            Self::Tmdb(id) => Some(id),
            Self::Douban(_) | Self::Unknown => None,
        }
    }

    fn as_payload(&self) -> String {
        match self {
            Self::Tmdb(id) => id.clone(),
            Self::Douban(id) => format!("{DOUBAN_PREFIX}{id}"),
            Self::Unknown => String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRef {
    pub title: String,
    pub year: String,
    pub media_type: String,
    pub id: MediaId,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RssOutcome {
    /// The server wants the client on another page.
    Navigate(String),
    Subscribed { rssid: Option<String> },
    /// The current page lists subscriptions and must be reloaded.
    RefreshPage,
    Removed { name: Option<String> },
    /// Several seasons exist; the caller has to pick one.
    ChooseSeason { seasons: Vec<Value> },
    Failed { msg: String },
}

/// Where a card's payload lives in the page cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedSlot {
    pub api: String,
    pub sub: String,
    /// JSON pointer to the card object, e.g. `/Items/3` or `/data`.
    pub pointer: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoveClickOutcome {
    pub fav: FavFlag,
    pub rss: RssOutcome,
    pub cache: Option<FavUpdate>,
}

pub async fn add_rss_media<T: CommandTransport>(
    client: &CommandClient<T>,
    media: &MediaRef,
    page: &str,
    season: &str,
) -> RssOutcome {
    let payload = json!({
        "name": media.title,
        "type": media.media_type,
        "year": media.year,
        "mediaid": media.id.as_payload(),
        "page": page,
        "season": season,
    });
    let response = client.post("add_rss_media", &payload).await;
    if !response.is_success() {
        return RssOutcome::Failed {
            msg: failure_message(&response, &format!("{} 添加订阅失败", media.title)),
        };
    }
    if let Some(page) = response.field_str("page") {
        return RssOutcome::Navigate(page);
    }
    RssOutcome::Subscribed {
        rssid: response.field_str("rssid"),
    }
}

/// The server's answer is not checked for `code`; a `page` field asks for a
/// refresh, anything else counts as removed.
pub async fn remove_rss_media<T: CommandTransport>(
    client: &CommandClient<T>,
    media: &MediaRef,
    rssid: &str,
    page: &str,
) -> RssOutcome {
    let payload = json!({
        "name": media.title,
        "type": media.media_type,
        "year": media.year,
        "rssid": rssid,
        "page": page,
        "tmdbid": media.id.tmdb().unwrap_or_default(),
    });
    let response = client.post("remove_rss_media", &payload).await;
    if response.field_str("page").is_some() {
        return RssOutcome::RefreshPage;
    }
    RssOutcome::Removed {
        name: response.field_str("name"),
    }
}

/// Subscribes a card, looking up TV seasons first unless the listing type
/// or the id makes that pointless.
pub async fn subscribe_media<T: CommandTransport>(
    client: &CommandClient<T>,
    media: &MediaRef,
    page_type: &str,
) -> RssOutcome {
    let Some(tmdbid) = media.id.tmdb() else {
        return add_rss_media(client, media, "", "").await;
    };
    if SEASONLESS_PAGE_TYPES.contains(&page_type) {
        return add_rss_media(client, media, "", "").await;
    }

    let response = client
        .post("get_tvseason_list", &json!({ "tmdbid": tmdbid }))
        .await;
    let seasons = response
        .field("seasons")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    match seasons.len() {
        0 => RssOutcome::Failed {
            msg: format!("{} 添加RSS订阅失败：未查询到季信息！", media.title),
        },
        1 => {
            let tv = MediaRef {
                media_type: "TV".to_string(),
                ..media.clone()
            };
            add_rss_media(client, &tv, "", "").await
        }
        _ => RssOutcome::ChooseSeason { seasons },
    }
}

/// Heart button on a card: remove when faved, subscribe otherwise, then
/// patch the cached payload so a back navigation shows the new flag.
pub async fn love_click<T: CommandTransport>(
    cache: &PageCache<T>,
    media: &MediaRef,
    page_type: &str,
    current: FavFlag,
    slot: Option<&CachedSlot>,
) -> LoveClickOutcome {
    let (rss, fav) = match current {
        FavFlag::Faved => {
            let rss = remove_rss_media(cache.client(), media, "", "").await;
            (rss, FavFlag::Unfaved)
        }
        FavFlag::Unfaved => {
            let rss = subscribe_media(cache.client(), media, page_type).await;
            let fav = if matches!(rss, RssOutcome::Subscribed { .. }) {
                FavFlag::Faved
            } else {
                FavFlag::Unfaved
            };
            (rss, fav)
        }
    };

    let cache_update = slot.filter(|_| fav != current).map(|slot| {
        cache.update_fav_data(&slot.api, &slot.sub, |mut payload| {
            if !set_fav_at(&mut payload, &slot.pointer, fav.as_str()) {
                debug!(pointer = %slot.pointer, "cached slot has no card at pointer");
            }
            payload
        })
    });

    LoveClickOutcome {
        fav,
        rss,
        cache: cache_update,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MediaSearchOutcome {
    Navigated(NavOutcome),
    Failed { msg: String },
}

/// Starts a server-side search and opens the results page on success.
pub async fn media_search<T, F, H>(
    client: &CommandClient<T>,
    navigator: &Navigator<F, H>,
    tmdbid: &str,
    title: &str,
    media_type: &str,
) -> MediaSearchOutcome
where
    T: CommandTransport,
    F: PageFetcher,
    H: ShellHost,
{
    let payload = json!({
        "tmdbid": tmdbid,
        "search_word": title,
        "media_type": media_type,
    });
    let response = client.post("search", &payload).await;
    if !response.is_success() {
        return MediaSearchOutcome::Failed {
            msg: failure_message(&response, "搜索失败"),
        };
    }
    let outcome = navigator.navmenu(&format!("search?s={title}"), false).await;
    MediaSearchOutcome::Navigated(outcome)
}

fn failure_message(response: &ApiResponse, fallback: &str) -> String {
    response
        .msg
        .clone()
        .filter(|msg| !msg.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string())
}
