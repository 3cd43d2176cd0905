//! Cache layer over the durable store.

use std::sync::Arc;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::store::KeyValueStore;

use super::entry::CacheEntry;
use super::key::{cache_key, CACHE_PREFIX};

/// TTL applied by [`ResponseCache::set`] unless overridden.
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Read-through cache for GET responses.
///
/// Cheap to clone; clones share the store and clock.
#[derive(Clone)]
pub struct ResponseCache {
  store: Arc<dyn KeyValueStore>,
  clock: Arc<dyn Clock>,
  default_ttl: Duration,
}

impl ResponseCache {
  pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
    Self {
      store,
      clock: Arc::new(SystemClock),
      default_ttl: DEFAULT_TTL,
    }
  }

  /// Set the TTL used by [`set`](Self::set).
  pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
    self.default_ttl = ttl;
    self
  }

  pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = clock;
    self
  }

  pub fn default_ttl(&self) -> Duration {
    self.default_ttl
  }

  /// Cached value for `url`, if present and not expired.
  ///
  /// An expired entry is deleted before returning `None`.
  pub async fn get<T: DeserializeOwned>(&self, url: &str) -> Option<T> {
    self.get_entry(url).await.map(|entry| entry.value)
  }

  /// Like [`get`](Self::get) but keeps the timestamp and TTL.
  pub async fn get_entry<T: DeserializeOwned>(&self, url: &str) -> Option<CacheEntry<T>> {
    let key = cache_key(url);
    let raw = match self.store.get(&key).await {
      Ok(raw) => raw?,
      Err(e) => {
        warn!(url, error = %e, "cache read failed, treating as miss");
        return None;
      }
    };

    let entry: CacheEntry<T> = match serde_json::from_str(&raw) {
      Ok(entry) => entry,
      Err(e) => {
        warn!(url, error = %e, "cache entry unreadable, treating as miss");
        return None;
      }
    };

    if !entry.is_valid_at(self.clock.now()) {
      debug!(url, cached_at = %entry.cached_at, "cache entry expired");
      if let Err(e) = self.store.remove(&key).await {
        warn!(url, error = %e, "failed to purge expired cache entry");
      }
      return None;
    }

    Some(entry)
  }

  /// Store `value` for `url` with the default TTL.
  pub async fn set<T: Serialize>(&self, url: &str, value: &T) {
    self.set_with_ttl(url, value, self.default_ttl).await;
  }

  /// Store `value` for `url`, overwriting any previous entry.
  ///
  /// Failures are logged and otherwise ignored.
  pub async fn set_with_ttl<T: Serialize>(&self, url: &str, value: &T, ttl: Duration) {
    let entry = CacheEntry::new(value, self.clock.now(), ttl);
    let raw = match serde_json::to_string(&entry) {
      Ok(raw) => raw,
      Err(e) => {
        warn!(url, error = %e, "failed to serialize cache entry");
        return;
      }
    };

    if let Err(e) = self.store.set(&cache_key(url), raw).await {
      warn!(url, error = %e, "cache write failed");
    }
  }

  /// Remove the entry for `url`.
  pub async fn clear(&self, url: &str) {
    if let Err(e) = self.store.remove(&cache_key(url)).await {
      warn!(url, error = %e, "failed to clear cache entry");
    }
  }

  /// Remove every cache entry, leaving other keys in the store alone.
  pub async fn clear_all(&self) {
    let keys: Vec<String> = match self.store.keys().await {
      Ok(keys) => keys
        .into_iter()
        .filter(|k| k.starts_with(CACHE_PREFIX))
        .collect(),
      Err(e) => {
        warn!(error = %e, "failed to list cache keys");
        return;
      }
    };

    if keys.is_empty() {
      return;
    }

    debug!(count = keys.len(), "clearing cache");
    if let Err(e) = self.store.multi_remove(&keys).await {
      warn!(error = %e, "failed to clear cache");
    }
  }
}
