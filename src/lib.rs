//! Offline-resilient API client.
//!
//! Three cooperating components keep a client usable on a flaky network:
//!
//! - [`cache::ResponseCache`]: successful GET payloads, served back when a
//!   later read gets no response;
//! - [`queue::MutationQueue`]: writes that got no response, persisted and
//!   replayed in order by [`queue::MutationQueue::sync`];
//! - [`api::ApiClient`]: attaches the bearer token, classifies failures and
//!   routes them to the two above.
//!
//! All state lives in a [`store::KeyValueStore`], so the queue, the cache and
//! the session survive restarts. Components are constructed explicitly and
//! shared by `Arc`; nothing is global.

pub mod api;
pub mod cache;
pub mod clock;
pub mod config;
pub mod queue;
pub mod session;
pub mod store;

#[cfg(test)]
mod testing;

pub use api::{ApiClient, RequestError, RequestOptions};
pub use cache::ResponseCache;
pub use queue::MutationQueue;
pub use session::Session;
