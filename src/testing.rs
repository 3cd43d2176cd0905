//! Shared test helpers.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use serde_json::Value;
use tokio::sync::{Notify, Semaphore};

use crate::api::{ApiRequest, ApiResponse, Transport, TransportError, TransportResult};
use crate::queue::MutationQueue;
use crate::session::Session;
use crate::store::MemoryStore;

/// How [`ScriptedTransport`] answers when no one-off reply is queued.
#[derive(Debug, Clone)]
pub enum Mode {
  Offline,
  Respond(u16, Value),
}

/// In-process transport that records requests and answers from a script.
pub struct ScriptedTransport {
  mode: Mutex<Mode>,
  replies: Mutex<VecDeque<TransportResult<ApiResponse>>>,
  requests: Mutex<Vec<ApiRequest>>,
  gate: Option<Gate>,
}

/// Holds every request until released, and signals when one arrives.
struct Gate {
  entered: Notify,
  permits: Semaphore,
}

impl ScriptedTransport {
  pub fn new(mode: Mode) -> Arc<Self> {
    Arc::new(Self::with_gate(mode, None))
  }

  pub fn offline() -> Arc<Self> {
    Self::new(Mode::Offline)
  }

  pub fn ok() -> Arc<Self> {
    Self::new(Mode::Respond(200, Value::Null))
  }

  /// A transport whose calls block until [`release`](Self::release).
  pub fn gated(mode: Mode) -> Arc<Self> {
    Arc::new(Self::with_gate(
      mode,
      Some(Gate {
        entered: Notify::new(),
        permits: Semaphore::new(0),
      }),
    ))
  }

  fn with_gate(mode: Mode, gate: Option<Gate>) -> Self {
    Self {
      mode: Mutex::new(mode),
      replies: Mutex::new(VecDeque::new()),
      requests: Mutex::new(Vec::new()),
      gate,
    }
  }

  pub fn set_mode(&self, mode: Mode) {
    *self.mode.lock().unwrap() = mode;
  }

  /// Answer the next call with `reply`, ahead of the current mode.
  pub fn push_reply(&self, reply: TransportResult<ApiResponse>) {
    self.replies.lock().unwrap().push_back(reply);
  }

  pub fn requests(&self) -> Vec<ApiRequest> {
    self.requests.lock().unwrap().clone()
  }

  /// Wait until a call is blocked on the gate.
  pub async fn entered(&self) {
    if let Some(gate) = &self.gate {
      gate.entered.notified().await;
    }
  }

  /// Let `n` blocked calls through.
  pub fn release(&self, n: usize) {
    if let Some(gate) = &self.gate {
      gate.permits.add_permits(n);
    }
  }
}

impl Transport for ScriptedTransport {
  fn send(&self, request: ApiRequest) -> BoxFuture<'_, TransportResult<ApiResponse>> {
    Box::pin(async move {
      self.requests.lock().unwrap().push(request);

      if let Some(gate) = &self.gate {
        gate.entered.notify_one();
        gate.permits.acquire().await.unwrap().forget();
      }

      if let Some(reply) = self.replies.lock().unwrap().pop_front() {
        return reply;
      }

      match self.mode.lock().unwrap().clone() {
        Mode::Offline => Err(TransportError::NoResponse("connection refused".into())),
        Mode::Respond(status, body) => Ok(ApiResponse { status, body }),
      }
    })
  }
}

/// Queue over a fresh in-memory store.
pub struct Fixture {
  pub store: Arc<MemoryStore>,
  pub session: Session,
  pub queue: Arc<MutationQueue>,
}

impl Fixture {
  pub async fn new(transport: Arc<ScriptedTransport>) -> Self {
    Self::with_store(Arc::new(MemoryStore::new()), transport).await
  }

  pub async fn with_store(store: Arc<MemoryStore>, transport: Arc<ScriptedTransport>) -> Self {
    let session = Session::new(store.clone());
    let queue = MutationQueue::open(store.clone(), transport, session.clone())
      .await
      .unwrap();
    Self {
      store,
      session,
      queue: Arc::new(queue),
    }
  }

  pub async fn signed_in(transport: Arc<ScriptedTransport>) -> Self {
    let fixture = Self::new(transport).await;
    fixture.session.save("tok", None).await.unwrap();
    fixture
  }
}
