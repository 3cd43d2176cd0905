//! SQLite-backed durable store.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use futures::future::BoxFuture;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use super::{KeyValueStore, StoreError, StoreResult};

/// Schema for the key-value table.
const STORE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv_store (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

/// Store persisted in a single SQLite table.
///
/// Statements are short, so they run inline on the calling task while the
/// connection mutex is held.
pub struct SqliteStore {
  conn: Mutex<Connection>,
}

impl SqliteStore {
  /// Open or create the store at `path`, or at the default location when
  /// `path` is `None`.
  pub fn open(path: Option<&Path>) -> StoreResult<Self> {
    let path = match path {
      Some(p) => p.to_path_buf(),
      None => Self::default_path()?,
    };

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      if !parent.as_os_str().is_empty() {
        std::fs::create_dir_all(parent)?;
      }
    }

    debug!(path = %path.display(), "opening store");
    let conn = Connection::open(&path)?;
    Self::with_connection(conn)
  }

  /// Open a private in-memory database.
  pub fn open_in_memory() -> StoreResult<Self> {
    Self::with_connection(Connection::open_in_memory()?)
  }

  fn with_connection(conn: Connection) -> StoreResult<Self> {
    conn.execute_batch(STORE_SCHEMA)?;
    Ok(Self {
      conn: Mutex::new(conn),
    })
  }

  /// Get the default database path.
  pub fn default_path() -> StoreResult<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or(StoreError::NoDataDir)?;

    Ok(data_dir.join("tether").join("store.db"))
  }

  fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
    self
      .conn
      .lock()
      .map_err(|e| StoreError::Poisoned(e.to_string()))
  }

  fn get_sync(&self, key: &str) -> StoreResult<Option<String>> {
    let conn = self.conn()?;
    let value = conn
      .query_row(
        "SELECT value FROM kv_store WHERE key = ?",
        params![key],
        |row| row.get(0),
      )
      .optional()?;
    Ok(value)
  }

  fn set_sync(&self, key: &str, value: &str) -> StoreResult<()> {
    let conn = self.conn()?;
    conn.execute(
      "INSERT OR REPLACE INTO kv_store (key, value, updated_at)
       VALUES (?, ?, datetime('now'))",
      params![key, value],
    )?;
    Ok(())
  }

  fn multi_remove_sync(&self, keys: &[String]) -> StoreResult<()> {
    let mut conn = self.conn()?;
    let tx = conn.transaction()?;
    {
      let mut stmt = tx.prepare("DELETE FROM kv_store WHERE key = ?")?;
      for key in keys {
        stmt.execute(params![key])?;
      }
    }
    tx.commit()?;
    Ok(())
  }

  fn keys_sync(&self) -> StoreResult<Vec<String>> {
    let conn = self.conn()?;
    let mut stmt = conn.prepare("SELECT key FROM kv_store ORDER BY key")?;
    let keys = stmt
      .query_map([], |row| row.get(0))?
      .collect::<Result<Vec<String>, _>>()?;
    Ok(keys)
  }
}

impl KeyValueStore for SqliteStore {
  fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, StoreResult<Option<String>>> {
    Box::pin(async move { self.get_sync(key) })
  }

  fn set<'a>(&'a self, key: &'a str, value: String) -> BoxFuture<'a, StoreResult<()>> {
    Box::pin(async move { self.set_sync(key, &value) })
  }

  fn remove<'a>(&'a self, key: &'a str) -> BoxFuture<'a, StoreResult<()>> {
    Box::pin(async move {
      self
        .conn()?
        .execute("DELETE FROM kv_store WHERE key = ?", params![key])?;
      Ok(())
    })
  }

  fn multi_remove<'a>(&'a self, keys: &'a [String]) -> BoxFuture<'a, StoreResult<()>> {
    Box::pin(async move { self.multi_remove_sync(keys) })
  }

  fn keys(&self) -> BoxFuture<'_, StoreResult<Vec<String>>> {
    Box::pin(async move { self.keys_sync() })
  }
}
