//! History-scoped API cache.
//!
//! Responses are stored in the current history entry's `extra` bag under
//! `api + sub`, so a back/forward navigation to the same entry is served
//! without a request while a fresh navigation starts from an empty bag.
//! Every miss is tagged with a [`PageTicket`]; a response that comes back
//! after the view changed is dropped instead of being cached or delivered.

use serde_json::Value;
use tracing::debug;

use crate::error::{ClientError, Result};
use crate::history::{NavigationHandle, PageTicket, cache_key};
use crate::transport::{ApiResponse, CommandClient, CommandTransport};

#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    /// Served from the current entry, no request made.
    Hit(Value),
    /// Fetched and stored for the current entry.
    Fetched(Value),
    /// Fetched but not stored: an uncacheable lookup, or the network-error
    /// sentinel standing in for a transport failure.
    Uncached(Value),
    /// The view changed while the request was in flight.
    Stale,
}

impl CacheLookup {
    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Hit(value) | Self::Fetched(value) | Self::Uncached(value) => Some(value),
            Self::Stale => None,
        }
    }

    pub fn is_hit(&self) -> bool {
        matches!(self, Self::Hit(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavUpdate {
    Missing,
    Unchanged,
    Updated,
}

pub struct PageCache<T> {
    navigation: NavigationHandle,
    client: CommandClient<T>,
}

impl<T: CommandTransport> PageCache<T> {
    pub fn new(navigation: NavigationHandle, client: CommandClient<T>) -> Self {
        Self { navigation, client }
    }

    pub fn navigation(&self) -> &NavigationHandle {
        &self.navigation
    }

    pub fn client(&self) -> &CommandClient<T> {
        &self.client
    }

    pub async fn get_cache_or_fetch(
        &self,
        api: &str,
        sub: &str,
        payload: &Value,
        cacheable: bool,
    ) -> Result<CacheLookup> {
        let key = validated_key(api, sub)?;
        let cached = if cacheable { self.get_page_data(&key) } else { None };
        if let Some(value) = cached {
            return Ok(CacheLookup::Hit(value));
        }

        let ticket = self.navigation.borrow().ticket();
        let response = self.client.try_post_raw(api, payload).await;
        if !self.accepts(&ticket) {
            debug!(
                api,
                sub,
                page = %ticket.page,
                generation = ticket.generation,
                "dropping response for superseded view"
            );
            return Ok(CacheLookup::Stale);
        }

        match response {
            Ok(body) if cacheable => {
                self.save_page_data(&key, body.clone());
                Ok(CacheLookup::Fetched(body))
            }
            Ok(body) => Ok(CacheLookup::Uncached(body)),
            Err(_) => Ok(CacheLookup::Uncached(ApiResponse::network_error().into_value())),
        }
    }

    /// Callback form: `on_result` runs for every outcome except a stale one.
    pub async fn get_cache_or_ajax(
        &self,
        api: &str,
        sub: &str,
        payload: &Value,
        on_result: impl FnOnce(Value),
        cacheable: bool,
    ) -> Result<()> {
        if let Some(value) = self
            .get_cache_or_fetch(api, sub, payload, cacheable)
            .await?
            .into_value()
        {
            on_result(value);
        }
        Ok(())
    }

    pub fn save_page_data(&self, key: &str, value: Value) {
        self.navigation.borrow_mut().save_page_data(key, value);
    }

    pub fn get_page_data(&self, key: &str) -> Option<Value> {
        self.navigation.borrow().get_page_data(key).cloned()
    }

    /// Forgets one cached slot so the next lookup refetches it.
    pub fn remove_page_data(&self, key: &str) -> Option<Value> {
        self.navigation.borrow_mut().remove_page_data(key)
    }

    pub fn clear_page_data(&self) {
        self.navigation.borrow_mut().clear_page_data();
    }

    /// Patches a cached payload in place. The mutator works on a copy and the
    /// slot is only rewritten when the result differs.
    pub fn update_fav_data(
        &self,
        api: &str,
        sub: &str,
        mutator: impl FnOnce(Value) -> Value,
    ) -> FavUpdate {
        let key = cache_key(api, sub);
        let Some(current) = self.get_page_data(&key) else {
            return FavUpdate::Missing;
        };
        let updated = mutator(current.clone());
        if updated == current {
            return FavUpdate::Unchanged;
        }
        self.save_page_data(&key, updated);
        FavUpdate::Updated
    }

    fn accepts(&self, ticket: &PageTicket) -> bool {
        self.navigation.borrow().is_current(ticket)
    }
}

/// Sets the `fav` flag of the object at `pointer` (e.g. `/Items/3` or
/// `/data`). Returns `false` when the pointer does not resolve to an object.
pub fn set_fav_at(payload: &mut Value, pointer: &str, fav: &str) -> bool {
    match payload.pointer_mut(pointer) {
        Some(Value::Object(object)) => {
            object.insert("fav".to_string(), Value::String(fav.to_string()));
            true
        }
        _ => false,
    }
}

fn validated_key(api: &str, sub: &str) -> Result<String> {
    if api.is_empty() || sub.is_empty() {
        return Err(ClientError::InvalidCacheKey {
            api: api.to_string(),
            sub: sub.to_string(),
        });
    }
    Ok(cache_key(api, sub))
}
