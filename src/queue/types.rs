//! Queue data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::{ApiRequest, Method};

/// Replay attempts before a mutation is dropped.
pub const MAX_RETRIES: u32 = 3;

/// Write verbs that can be queued. GET is never a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MutationMethod {
  Post,
  Put,
  Patch,
  Delete,
}

impl From<MutationMethod> for Method {
  fn from(method: MutationMethod) -> Self {
    match method {
      MutationMethod::Post => Method::Post,
      MutationMethod::Put => Method::Put,
      MutationMethod::Patch => Method::Patch,
      MutationMethod::Delete => Method::Delete,
    }
  }
}

impl TryFrom<Method> for MutationMethod {
  type Error = Method;

  fn try_from(method: Method) -> Result<Self, Self::Error> {
    match method {
      Method::Post => Ok(Self::Post),
      Method::Put => Ok(Self::Put),
      Method::Patch => Ok(Self::Patch),
      Method::Delete => Ok(Self::Delete),
      Method::Get => Err(method),
    }
  }
}

/// A write to capture; the queue assigns the id and bookkeeping fields.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMutation {
  pub method: MutationMethod,
  pub url: String,
  pub payload: Option<Value>,
}

impl NewMutation {
  pub fn new(method: MutationMethod, url: impl Into<String>, payload: Option<Value>) -> Self {
    Self {
      method,
      url: url.into(),
      payload,
    }
  }
}

/// A write waiting to be replayed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedMutation {
  pub id: String,
  pub method: MutationMethod,
  pub url: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub payload: Option<Value>,
  pub enqueued_at: DateTime<Utc>,
  #[serde(default)]
  pub retry_count: u32,
}

impl QueuedMutation {
  pub(crate) fn to_request(&self, bearer: String) -> ApiRequest {
    ApiRequest {
      method: self.method.into(),
      path: self.url.clone(),
      body: self.payload.clone(),
      bearer: Some(bearer),
    }
  }
}

/// Outcome of one [`sync`](super::MutationQueue::sync) call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
  /// Another pass was already running; nothing was attempted.
  pub skipped: bool,
  /// The pass stopped early because no auth token was available.
  pub paused: bool,
  /// Mutations accepted by the backend and removed.
  pub delivered: usize,
  /// Mutations that failed and stay queued with a higher retry count.
  pub retried: usize,
  /// Mutations that exhausted their retries and were removed.
  pub dropped: Vec<QueuedMutation>,
}

impl SyncReport {
  pub(crate) fn skipped() -> Self {
    Self {
      skipped: true,
      ..Self::default()
    }
  }

  pub fn attempted(&self) -> usize {
    self.delivered + self.retried + self.dropped.len()
  }
}
