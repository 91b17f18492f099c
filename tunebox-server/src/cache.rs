//! JSON cache for library listings
//!
//! Artist, album and track listings change rarely, so they are kept in the
//! store's expiring string values for a configurable TTL.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};
use tunebox_common::Result;

use crate::db::Store;

pub const ALL_ARTISTS_KEY: &str = "all_artists";

pub fn albums_for_artist_key(artist_id: &str) -> String {
    format!("albums_for_artist_{}", artist_id)
}

pub fn tracks_for_album_key(album_id: &str) -> String {
    format!("tracks_for_album_{}", album_id)
}

#[derive(Clone)]
pub struct LibraryCache {
    store: Store,
    ttl: Duration,
}

impl LibraryCache {
    pub fn new(store: Store, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Cached value for `key`; a payload that no longer decodes counts as a miss
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(raw) = self.store.get(key).await? else {
            debug!("Cache miss for {}", key);
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                debug!("Cache hit for {}", key);
                Ok(Some(value))
            }
            Err(e) => {
                warn!("Discarding undecodable cache entry {}: {}", key, e);
                Ok(None)
            }
        }
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.store.set_ex(key, &raw, self.ttl).await
    }

    /// Drop `key`, returning whether anything was cached under it
    pub async fn clear(&self, key: &str) -> Result<bool> {
        self.store.del(key).await
    }
}
