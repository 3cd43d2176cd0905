//! Change listeners.

use std::sync::{Arc, Mutex, PoisonError, Weak};

type Listener = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct ListenerSet {
  next_id: u64,
  listeners: Vec<(u64, Listener)>,
}

/// Registry of "queue changed" callbacks.
#[derive(Default)]
pub(crate) struct Listeners {
  set: Arc<Mutex<ListenerSet>>,
}

impl Listeners {
  pub(crate) fn add(&self, listener: Listener) -> Subscription {
    let mut set = self.set.lock().unwrap_or_else(PoisonError::into_inner);
    let id = set.next_id;
    set.next_id += 1;
    set.listeners.push((id, listener));

    Subscription {
      id,
      set: Arc::downgrade(&self.set),
    }
  }

  /// Call every listener. The registry lock is released first so a listener
  /// may subscribe or unsubscribe.
  pub(crate) fn notify(&self) {
    let snapshot: Vec<Listener> = self
      .set
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .listeners
      .iter()
      .map(|(_, l)| Arc::clone(l))
      .collect();

    for listener in snapshot {
      listener();
    }
  }

  #[cfg(test)]
  pub(crate) fn len(&self) -> usize {
    self
      .set
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .listeners
      .len()
  }
}

/// Handle for a registered listener. Dropping it unsubscribes.
#[must_use = "the listener is removed when the Subscription is dropped"]
pub struct Subscription {
  id: u64,
  set: Weak<Mutex<ListenerSet>>,
}

impl Subscription {
  /// Remove the listener now.
  pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
  fn drop(&mut self) {
    if let Some(set) = self.set.upgrade() {
      set
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .listeners
        .retain(|(id, _)| *id != self.id);
    }
  }
}

impl std::fmt::Debug for Subscription {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Subscription").field("id", &self.id).finish()
  }
}
