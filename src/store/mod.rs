//! Durable string key-value storage.
//!
//! The cache, the mutation queue and the session all persist through a
//! [`KeyValueStore`]. Values are opaque strings (callers serialize JSON
//! themselves), and every operation is asynchronous so backends are free to
//! do blocking I/O off the caller's task.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use futures::future::BoxFuture;

/// Error type for store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  /// SQLite error.
  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  /// I/O error.
  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),

  /// A thread panicked while holding the store lock.
  #[error("store lock poisoned: {0}")]
  Poisoned(String),

  /// No platform data directory to place the default database in.
  #[error("could not determine data directory")]
  NoDataDir,
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Asynchronous, persistent, string-keyed storage.
pub trait KeyValueStore: Send + Sync {
  /// Read a value, `None` when the key is absent.
  fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, StoreResult<Option<String>>>;

  /// Write a value, replacing any previous one.
  fn set<'a>(&'a self, key: &'a str, value: String) -> BoxFuture<'a, StoreResult<()>>;

  /// Remove a key. Removing an absent key is not an error.
  fn remove<'a>(&'a self, key: &'a str) -> BoxFuture<'a, StoreResult<()>>;

  /// Remove several keys at once.
  fn multi_remove<'a>(&'a self, keys: &'a [String]) -> BoxFuture<'a, StoreResult<()>>;

  /// List every stored key.
  fn keys(&self) -> BoxFuture<'_, StoreResult<Vec<String>>>;
}
