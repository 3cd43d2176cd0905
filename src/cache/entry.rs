//! Stored cache entry.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A cached value with the time it was stored and how long it stays valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
  pub value: T,
  pub cached_at: DateTime<Utc>,
  /// Time to live in milliseconds.
  pub ttl_ms: u64,
}

impl<T> CacheEntry<T> {
  pub fn new(value: T, cached_at: DateTime<Utc>, ttl: Duration) -> Self {
    Self {
      value,
      cached_at,
      ttl_ms: u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX),
    }
  }

  /// Last instant at which the entry is still valid. `None` when the TTL is
  /// too large to represent, meaning the entry never expires.
  pub fn expires_at(&self) -> Option<DateTime<Utc>> {
    let ttl = i64::try_from(self.ttl_ms).ok()?;
    self
      .cached_at
      .checked_add_signed(TimeDelta::try_milliseconds(ttl)?)
  }

  /// Valid while `now <= cached_at + ttl`.
  pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
    self.expires_at().map_or(true, |expires| now <= expires)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn validity_is_inclusive_of_expiry() {
    let at = Utc::now();
    let entry = CacheEntry::new(1, at, Duration::from_secs(60));

    assert!(entry.is_valid_at(at));
    assert!(entry.is_valid_at(at + TimeDelta::seconds(60)));
    assert!(!entry.is_valid_at(at + TimeDelta::milliseconds(60_001)));
  }

  #[test]
  fn huge_ttl_never_expires() {
    let at = Utc::now();
    let entry = CacheEntry::new(1, at, Duration::MAX);

    assert_eq!(entry.expires_at(), None);
    assert!(entry.is_valid_at(at + TimeDelta::days(365 * 100)));
  }
}
