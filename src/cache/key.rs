//! Cache key derivation.

use sha2::{Digest, Sha256};

/// Namespace shared by every cache key in the store.
pub const CACHE_PREFIX: &str = "cache:";

/// Normalize a request URL so equivalent spellings share one entry.
///
/// Trims whitespace, ensures a leading `/` and drops a trailing `/` from the
/// path. The query string is kept as-is: different queries are different
/// resources.
pub fn normalize_url(url: &str) -> String {
  let url = url.trim();
  let (path, query) = match url.split_once('?') {
    Some((p, q)) => (p, Some(q)),
    None => (url, None),
  };

  let mut normalized = String::with_capacity(url.len() + 1);
  if !path.starts_with('/') && !path.contains("://") {
    normalized.push('/');
  }
  normalized.push_str(path);
  while normalized.len() > 1 && normalized.ends_with('/') {
    normalized.pop();
  }

  if let Some(q) = query.filter(|q| !q.is_empty()) {
    normalized.push('?');
    normalized.push_str(q);
  }
  normalized
}

/// Store key for a request URL.
pub fn cache_key(url: &str) -> String {
  // SHA256 hash for stable, fixed-length keys
  let mut hasher = Sha256::new();
  hasher.update(normalize_url(url).as_bytes());
  format!("{}{}", CACHE_PREFIX, hex::encode(hasher.finalize()))
}
