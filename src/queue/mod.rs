//! Durable mutation queue.
//!
//! Writes that fail without a response are captured here and replayed later
//! by [`MutationQueue::sync`], one at a time and in enqueue order, so that
//! dependent writes (create, then update the same record) reach the backend
//! in the order they were made.
//!
//! ```text
//! Pending(n) --fail--> Pending(n+1)
//! Pending(2) --fail--> Dropped
//! Pending(n) --ok----> Removed
//! ```
//!
//! The whole queue is stored as one JSON array under [`QUEUE_KEY`] and
//! rewritten after every change.

mod mutation_queue;
mod subscribers;
mod types;

pub use mutation_queue::{MutationQueue, QueueError, QueueResult, QUEUE_KEY};
pub use subscribers::Subscription;
pub use types::{MutationMethod, NewMutation, QueuedMutation, SyncReport, MAX_RETRIES};
