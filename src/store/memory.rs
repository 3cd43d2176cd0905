//! In-memory store for tests and throwaway sessions.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use futures::future::BoxFuture;

use super::{KeyValueStore, StoreError, StoreResult};

/// Store backed by a `BTreeMap`. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
  entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  fn entries(&self) -> StoreResult<MutexGuard<'_, BTreeMap<String, String>>> {
    self
      .entries
      .lock()
      .map_err(|e| StoreError::Poisoned(e.to_string()))
  }
}

impl KeyValueStore for MemoryStore {
  fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, StoreResult<Option<String>>> {
    Box::pin(async move { Ok(self.entries()?.get(key).cloned()) })
  }

  fn set<'a>(&'a self, key: &'a str, value: String) -> BoxFuture<'a, StoreResult<()>> {
    Box::pin(async move {
      self.entries()?.insert(key.to_string(), value);
      Ok(())
    })
  }

  fn remove<'a>(&'a self, key: &'a str) -> BoxFuture<'a, StoreResult<()>> {
    Box::pin(async move {
      self.entries()?.remove(key);
      Ok(())
    })
  }

  fn multi_remove<'a>(&'a self, keys: &'a [String]) -> BoxFuture<'a, StoreResult<()>> {
    Box::pin(async move {
      let mut entries = self.entries()?;
      for key in keys {
        entries.remove(key);
      }
      Ok(())
    })
  }

  fn keys(&self) -> BoxFuture<'_, StoreResult<Vec<String>>> {
    Box::pin(async move { Ok(self.entries()?.keys().cloned().collect()) })
  }
}
