//! Backend access: transport, response normalization and the request
//! dispatcher.
//!
//! ```text
//! caller ──► ApiClient ──► Transport ──► backend
//!               │  ▲
//!   no response │  │ stale GET payload
//!               ▼  │
//!      MutationQueue  ResponseCache
//! ```

mod client;
mod envelope;
mod error;
mod transport;

pub use client::{ApiClient, RequestOptions};
pub use envelope::{normalize, server_message};
pub use error::{RequestError, RequestResult, NETWORK_ERROR_MESSAGE};
pub use transport::{
  ApiRequest, ApiResponse, HttpTransport, Method, Transport, TransportError, TransportResult,
};
