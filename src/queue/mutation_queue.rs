//! Persisted FIFO of pending writes and its replay loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api::Transport;
use crate::session::Session;
use crate::store::{KeyValueStore, StoreError};

use super::subscribers::{Listeners, Subscription};
use super::types::{NewMutation, QueuedMutation, SyncReport, MAX_RETRIES};

/// Store key holding the serialized queue.
pub const QUEUE_KEY: &str = "mutation_queue";

/// Error type for queue operations.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
  /// The durable store failed.
  #[error("storage error: {0}")]
  Store(#[from] StoreError),

  /// Serialization error.
  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

/// Result type for queue operations.
pub type QueueResult<T> = Result<T, QueueError>;

/// What happened to a mutation after a failed replay.
enum Failure {
  Retried(u32),
  Dropped(QueuedMutation),
  /// Removed by someone else (e.g. `clear`) while the call was in flight.
  Gone,
}

/// Durable, ordered queue of writes awaiting replay.
///
/// The in-memory list is the source of truth for reads; every change is
/// written to the store before it is committed in memory, under the same
/// lock, so the two never diverge.
pub struct MutationQueue {
  store: Arc<dyn KeyValueStore>,
  transport: Arc<dyn Transport>,
  session: Session,
  entries: Mutex<Vec<QueuedMutation>>,
  syncing: AtomicBool,
  listeners: Listeners,
}

impl MutationQueue {
  /// Load the persisted queue from `store`.
  ///
  /// An unreadable queue value is logged and replaced by an empty queue on
  /// the next change.
  pub async fn open(
    store: Arc<dyn KeyValueStore>,
    transport: Arc<dyn Transport>,
    session: Session,
  ) -> QueueResult<Self> {
    let entries = match store.get(QUEUE_KEY).await? {
      Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
        warn!(error = %e, "persisted queue is corrupt, starting empty");
        Vec::new()
      }),
      None => Vec::new(),
    };
    debug!(pending = entries.len(), "mutation queue loaded");

    Ok(Self {
      store,
      transport,
      session,
      entries: Mutex::new(entries),
      syncing: AtomicBool::new(false),
      listeners: Listeners::default(),
    })
  }

  /// Append a write to the end of the queue.
  pub async fn enqueue(&self, mutation: NewMutation) -> QueueResult<QueuedMutation> {
    let queued = QueuedMutation {
      id: Uuid::new_v4().to_string(),
      method: mutation.method,
      url: mutation.url,
      payload: mutation.payload,
      enqueued_at: Utc::now(),
      retry_count: 0,
    };

    {
      let mut entries = self.entries.lock().await;
      let mut next = entries.clone();
      next.push(queued.clone());
      self.persist(&next).await?;
      *entries = next;
      info!(
        id = %queued.id,
        method = ?queued.method,
        url = %queued.url,
        pending = entries.len(),
        "mutation queued for replay"
      );
    }

    self.listeners.notify();
    Ok(queued)
  }

  /// Snapshot of the pending mutations in replay order.
  pub async fn get_all(&self) -> Vec<QueuedMutation> {
    self.entries.lock().await.clone()
  }

  pub async fn len(&self) -> usize {
    self.entries.lock().await.len()
  }

  pub async fn is_empty(&self) -> bool {
    self.entries.lock().await.is_empty()
  }

  /// `true` while a replay pass is running.
  pub fn is_syncing(&self) -> bool {
    self.syncing.load(Ordering::Acquire)
  }

  /// Register a callback fired after every persisted change.
  pub fn subscribe<F>(&self, listener: F) -> Subscription
  where
    F: Fn() + Send + Sync + 'static,
  {
    self.listeners.add(Arc::new(listener))
  }

  /// Drop every pending mutation.
  pub async fn clear(&self) -> QueueResult<()> {
    {
      let mut entries = self.entries.lock().await;
      self.persist(&[]).await?;
      entries.clear();
    }
    info!("mutation queue cleared");
    self.listeners.notify();
    Ok(())
  }

  /// Replay queued mutations in order, one at a time.
  ///
  /// A call made while another pass is running returns immediately with
  /// [`SyncReport::skipped`] set. Without an auth token the pass stops
  /// before the next mutation and leaves it, and everything after it,
  /// untouched.
  pub async fn sync(&self) -> QueueResult<SyncReport> {
    let Some(_guard) = SyncGuard::acquire(&self.syncing) else {
      debug!("sync already in progress, skipping");
      return Ok(SyncReport::skipped());
    };

    let pending = self.get_all().await;
    let mut report = SyncReport::default();
    if pending.is_empty() {
      return Ok(report);
    }
    info!(pending = pending.len(), "replaying queued mutations");

    for (index, mutation) in pending.iter().enumerate() {
      let Some(token) = self.session.token().await else {
        info!(
          remaining = pending.len() - index,
          "no auth token, pausing sync"
        );
        report.paused = true;
        break;
      };

      let delivered = match self.transport.send(mutation.to_request(token)).await {
        Ok(response) if response.is_success() => true,
        Ok(response) => {
          warn!(id = %mutation.id, url = %mutation.url, status = response.status, "replay rejected");
          false
        }
        Err(e) => {
          warn!(id = %mutation.id, url = %mutation.url, error = %e, "replay failed");
          false
        }
      };

      if delivered {
        self.remove(&mutation.id).await?;
        debug!(id = %mutation.id, url = %mutation.url, "mutation delivered");
        report.delivered += 1;
        continue;
      }

      match self.record_failure(&mutation.id).await? {
        Failure::Retried(retry_count) => {
          debug!(id = %mutation.id, retry_count, "mutation will be retried");
          report.retried += 1;
        }
        Failure::Dropped(dropped) => {
          warn!(
            id = %dropped.id,
            method = ?dropped.method,
            url = %dropped.url,
            "mutation dropped after {} failed attempts",
            MAX_RETRIES
          );
          report.dropped.push(dropped);
        }
        Failure::Gone => {}
      }
    }

    info!(
      delivered = report.delivered,
      retried = report.retried,
      dropped = report.dropped.len(),
      paused = report.paused,
      "sync pass finished"
    );
    Ok(report)
  }

  async fn remove(&self, id: &str) -> QueueResult<()> {
    {
      let mut entries = self.entries.lock().await;
      let Some(position) = entries.iter().position(|m| m.id == id) else {
        return Ok(());
      };
      let mut next = entries.clone();
      next.remove(position);
      self.persist(&next).await?;
      *entries = next;
    }
    self.listeners.notify();
    Ok(())
  }

  async fn record_failure(&self, id: &str) -> QueueResult<Failure> {
    let failure = {
      let mut entries = self.entries.lock().await;
      let Some(position) = entries.iter().position(|m| m.id == id) else {
        return Ok(Failure::Gone);
      };

      let mut next = entries.clone();
      let retry_count = next[position].retry_count + 1;
      let failure = if retry_count >= MAX_RETRIES {
        let mut dropped = next.remove(position);
        dropped.retry_count = retry_count;
        Failure::Dropped(dropped)
      } else {
        next[position].retry_count = retry_count;
        Failure::Retried(retry_count)
      };

      self.persist(&next).await?;
      *entries = next;
      failure
    };
    self.listeners.notify();
    Ok(failure)
  }

  async fn persist(&self, entries: &[QueuedMutation]) -> QueueResult<()> {
    let raw = serde_json::to_string(entries)?;
    self.store.set(QUEUE_KEY, raw).await?;
    Ok(())
  }
}

/// Single-flight flag for [`MutationQueue::sync`], released on drop.
struct SyncGuard<'a>(&'a AtomicBool);

impl<'a> SyncGuard<'a> {
  fn acquire(flag: &'a AtomicBool) -> Option<Self> {
    flag
      .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
      .ok()
      .map(|_| Self(flag))
  }
}

impl Drop for SyncGuard<'_> {
  fn drop(&mut self) {
    self.0.store(false, Ordering::Release);
  }
}
