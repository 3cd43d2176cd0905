//! Request dispatcher.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::cache::ResponseCache;
use crate::queue::{MutationMethod, MutationQueue, NewMutation};
use crate::session::Session;

use super::envelope::{normalize, server_message};
use super::error::{RequestError, RequestResult};
use super::transport::{ApiRequest, ApiResponse, Method, Transport, TransportError};

const SESSION_EXPIRED_MESSAGE: &str = "Session expired. Please sign in again.";

/// Per-request knobs.
#[derive(Debug, Clone, Copy)]
pub struct RequestOptions {
  /// TTL for the cached copy of a GET response; the cache default if `None`.
  pub cache_ttl: Option<Duration>,
  /// Neither read from nor write to the cache.
  pub bypass_cache: bool,
  /// Queue writes that get no response. When `false` they fail instead.
  pub queue_offline: bool,
}

impl Default for RequestOptions {
  fn default() -> Self {
    Self {
      cache_ttl: None,
      bypass_cache: false,
      queue_offline: true,
    }
  }
}

impl RequestOptions {
  pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
    self.cache_ttl = Some(ttl);
    self
  }

  pub fn bypass_cache(mut self) -> Self {
    self.bypass_cache = true;
    self
  }

  pub fn no_queue(mut self) -> Self {
    self.queue_offline = false;
    self
  }
}

/// API client that survives connectivity gaps.
///
/// Reads refresh the [`ResponseCache`] on success and fall back to it when no
/// response arrives. Writes that get no response are captured by the
/// [`MutationQueue`] and reported as [`RequestError::Queued`].
#[derive(Clone)]
pub struct ApiClient {
  transport: Arc<dyn Transport>,
  session: Session,
  cache: ResponseCache,
  queue: Arc<MutationQueue>,
}

impl ApiClient {
  pub fn new(
    transport: Arc<dyn Transport>,
    session: Session,
    cache: ResponseCache,
    queue: Arc<MutationQueue>,
  ) -> Self {
    Self {
      transport,
      session,
      cache,
      queue,
    }
  }

  pub fn session(&self) -> &Session {
    &self.session
  }

  pub fn cache(&self) -> &ResponseCache {
    &self.cache
  }

  pub fn queue(&self) -> &Arc<MutationQueue> {
    &self.queue
  }

  pub async fn get(&self, endpoint: &str, options: RequestOptions) -> RequestResult<Value> {
    self.request(Method::Get, endpoint, None, options).await
  }

  pub async fn post(
    &self,
    endpoint: &str,
    body: Option<Value>,
    options: RequestOptions,
  ) -> RequestResult<Value> {
    self.request(Method::Post, endpoint, body, options).await
  }

  pub async fn put(
    &self,
    endpoint: &str,
    body: Option<Value>,
    options: RequestOptions,
  ) -> RequestResult<Value> {
    self.request(Method::Put, endpoint, body, options).await
  }

  pub async fn patch(
    &self,
    endpoint: &str,
    body: Option<Value>,
    options: RequestOptions,
  ) -> RequestResult<Value> {
    self.request(Method::Patch, endpoint, body, options).await
  }

  pub async fn delete(
    &self,
    endpoint: &str,
    body: Option<Value>,
    options: RequestOptions,
  ) -> RequestResult<Value> {
    self.request(Method::Delete, endpoint, body, options).await
  }

  /// Issue a request and classify the outcome.
  pub async fn request(
    &self,
    method: Method,
    endpoint: &str,
    body: Option<Value>,
    options: RequestOptions,
  ) -> RequestResult<Value> {
    let request = ApiRequest {
      method,
      path: endpoint.to_string(),
      body: body.clone(),
      bearer: self.session.token().await,
    };

    match self.transport.send(request).await {
      Ok(response) => self.on_response(method, endpoint, response, options).await,
      Err(TransportError::NoResponse(reason)) => {
        debug!(%method, endpoint, %reason, "no response");
        self.on_no_response(method, endpoint, body, options).await
      }
      Err(TransportError::InvalidRequest(reason)) => Err(RequestError::InvalidRequest(reason)),
    }
  }

  async fn on_response(
    &self,
    method: Method,
    endpoint: &str,
    response: ApiResponse,
    options: RequestOptions,
  ) -> RequestResult<Value> {
    if response.status == 401 {
      warn!(%method, endpoint, "unauthorized, clearing stored credentials");
      if let Err(e) = self.session.clear().await {
        error!(error = %e, "failed to clear stored credentials");
      }
      return Err(RequestError::Unauthorized {
        message: server_message(&response.body)
          .unwrap_or_else(|| SESSION_EXPIRED_MESSAGE.to_string()),
      });
    }

    if !response.is_success() {
      debug!(%method, endpoint, status = response.status, "request failed");
      return Err(RequestError::Http {
        status: response.status,
        message: server_message(&response.body)
          .unwrap_or_else(|| format!("Request failed with status code {}", response.status)),
      });
    }

    let payload = normalize(response.body).map_err(|message| RequestError::Rejected { message })?;

    if method == Method::Get && !options.bypass_cache {
      match options.cache_ttl {
        Some(ttl) => self.cache.set_with_ttl(endpoint, &payload, ttl).await,
        None => self.cache.set(endpoint, &payload).await,
      }
    }

    Ok(payload)
  }

  async fn on_no_response(
    &self,
    method: Method,
    endpoint: &str,
    body: Option<Value>,
    options: RequestOptions,
  ) -> RequestResult<Value> {
    let mutation_method = match MutationMethod::try_from(method) {
      Ok(m) => m,
      Err(_) => {
        if !options.bypass_cache {
          if let Some(cached) = self.cache.get::<Value>(endpoint).await {
            info!(endpoint, "offline, serving cached response");
            return Ok(cached);
          }
        }
        return Err(RequestError::connectivity());
      }
    };

    if !options.queue_offline {
      return Err(RequestError::connectivity());
    }

    match self
      .queue
      .enqueue(NewMutation::new(mutation_method, endpoint, body))
      .await
    {
      Ok(queued) => Err(RequestError::Queued { id: queued.id }),
      Err(e) => {
        error!(%method, endpoint, error = %e, "failed to queue offline write");
        Err(RequestError::connectivity())
      }
    }
  }
}
