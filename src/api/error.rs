//! Errors surfaced by [`ApiClient`](super::ApiClient).

/// Message for reads that failed without a response and had no cached copy.
pub const NETWORK_ERROR_MESSAGE: &str = "Network error. Please check your connection.";

/// Normalized request failure. `Display` is the human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
  /// The server answered with a non-2xx status.
  #[error("{message}")]
  Http { status: u16, message: String },

  /// The server answered 401; local credentials have been purged.
  #[error("{message}")]
  Unauthorized { message: String },

  /// No response and no cached data to fall back on.
  #[error("{message}")]
  Connectivity { message: String },

  /// A write could not be sent and was queued for replay.
  #[error("Request queued, will sync when online")]
  Queued { id: String },

  /// A 2xx response whose envelope reported `success: false`.
  #[error("{message}")]
  Rejected { message: String },

  /// The endpoint could not be turned into a request.
  #[error("invalid request: {0}")]
  InvalidRequest(String),
}

impl RequestError {
  pub(crate) fn connectivity() -> Self {
    Self::Connectivity {
      message: NETWORK_ERROR_MESSAGE.to_string(),
    }
  }

  /// `true` for the soft "queued, will sync later" outcome.
  pub fn is_queued(&self) -> bool {
    matches!(self, Self::Queued { .. })
  }

  /// HTTP status, when a response was received.
  pub fn status(&self) -> Option<u16> {
    match self {
      Self::Http { status, .. } => Some(*status),
      Self::Unauthorized { .. } => Some(401),
      _ => None,
    }
  }
}

/// Result type for client requests.
pub type RequestResult<T> = Result<T, RequestError>;
