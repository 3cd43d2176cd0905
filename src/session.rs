//! Locally stored authentication material.

use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use crate::store::{KeyValueStore, StoreResult};

/// Store key for the bearer token.
pub const TOKEN_KEY: &str = "auth_token";
/// Store key for the serialized identity of the signed-in user.
pub const USER_KEY: &str = "auth_user";

/// Bearer token and identity persisted in the durable store.
#[derive(Clone)]
pub struct Session {
  store: Arc<dyn KeyValueStore>,
}

impl Session {
  pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
    Self { store }
  }

  /// Current bearer token.
  ///
  /// A store failure reads as "signed out": callers then send the request
  /// unauthenticated (or pause replay) instead of failing outright.
  pub async fn token(&self) -> Option<String> {
    match self.store.get(TOKEN_KEY).await {
      Ok(token) => token.filter(|t| !t.is_empty()),
      Err(e) => {
        warn!(error = %e, "failed to read auth token");
        None
      }
    }
  }

  /// Identity saved at sign-in, if any.
  pub async fn user(&self) -> Option<Value> {
    let raw = match self.store.get(USER_KEY).await {
      Ok(raw) => raw?,
      Err(e) => {
        warn!(error = %e, "failed to read stored identity");
        return None;
      }
    };

    match serde_json::from_str(&raw) {
      Ok(user) => Some(user),
      Err(e) => {
        warn!(error = %e, "stored identity is not valid JSON");
        None
      }
    }
  }

  /// Persist a new token and, optionally, the identity that goes with it.
  pub async fn save(&self, token: &str, user: Option<&Value>) -> StoreResult<()> {
    self.store.set(TOKEN_KEY, token.to_string()).await?;
    match user {
      Some(user) => self.store.set(USER_KEY, user.to_string()).await,
      None => self.store.remove(USER_KEY).await,
    }
  }

  /// Remove the token and identity.
  pub async fn clear(&self) -> StoreResult<()> {
    self
      .store
      .multi_remove(&[TOKEN_KEY.to_string(), USER_KEY.to_string()])
      .await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::MemoryStore;
  use serde_json::json;

  #[tokio::test]
  async fn save_then_clear() {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let session = Session::new(store.clone());
    assert_eq!(session.token().await, None);

    let user = json!({"id": 7, "name": "Jane"});
    session.save("tok", Some(&user)).await.unwrap();
    store.set("other", "kept".into()).await.unwrap();

    assert_eq!(session.token().await.as_deref(), Some("tok"));
    assert_eq!(session.user().await, Some(user));

    session.clear().await.unwrap();

    assert_eq!(session.token().await, None);
    assert_eq!(session.user().await, None);
    assert_eq!(store.keys().await.unwrap(), vec!["other".to_string()]);
  }

  #[tokio::test]
  async fn empty_token_reads_as_signed_out() {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    store.set(TOKEN_KEY, String::new()).await.unwrap();

    assert_eq!(Session::new(store).token().await, None);
  }
}
