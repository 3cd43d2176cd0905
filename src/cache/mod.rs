//! Read-through response cache.
//!
//! Successful GET payloads are stored under a namespaced key derived from the
//! request URL, together with the time they were cached and a TTL. Reads
//! after the TTL has elapsed miss and purge the entry. The cache is fail-open:
//! store errors are logged and read as a miss, never surfaced to the caller.

mod entry;
mod key;
mod layer;

pub use entry::CacheEntry;
pub use key::{cache_key, normalize_url, CACHE_PREFIX};
pub use layer::{ResponseCache, DEFAULT_TTL};
