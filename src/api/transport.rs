//! HTTP transport abstraction.
//!
//! A [`Transport`] performs exactly one call and reports one of two things:
//! a response was received (any status code), or no response arrived at all.
//! The dispatcher and the replay loop branch on that distinction, so the
//! transport never turns a 4xx/5xx into an error and never retries.

use std::fmt;
use std::time::Duration;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use url::Url;

/// Error type for transport operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
  /// Connect failure, timeout, or the connection dropped before a response.
  #[error("no response received: {0}")]
  NoResponse(String),

  /// The request could not be built (bad endpoint or base URL).
  #[error("invalid request: {0}")]
  InvalidRequest(String),
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// HTTP verbs used by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
  Get,
  Post,
  Put,
  Patch,
  Delete,
}

impl Method {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Get => "GET",
      Self::Post => "POST",
      Self::Put => "PUT",
      Self::Patch => "PATCH",
      Self::Delete => "DELETE",
    }
  }
}

impl fmt::Display for Method {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.pad(self.as_str())
  }
}

impl From<Method> for reqwest::Method {
  fn from(method: Method) -> Self {
    match method {
      Method::Get => reqwest::Method::GET,
      Method::Post => reqwest::Method::POST,
      Method::Put => reqwest::Method::PUT,
      Method::Patch => reqwest::Method::PATCH,
      Method::Delete => reqwest::Method::DELETE,
    }
  }
}

/// A single outbound call.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
  pub method: Method,
  /// Endpoint path relative to the API base URL (may carry a query string).
  pub path: String,
  pub body: Option<Value>,
  pub bearer: Option<String>,
}

/// A received response, successful or not.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
  pub status: u16,
  /// Decoded JSON body; `Null` when empty, a JSON string when not JSON.
  pub body: Value,
}

impl ApiResponse {
  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }
}

/// Performs HTTP calls for the client and the replay loop.
pub trait Transport: Send + Sync {
  fn send(&self, request: ApiRequest) -> BoxFuture<'_, TransportResult<ApiResponse>>;
}

/// [`Transport`] over `reqwest` with a fixed client-side timeout.
#[derive(Clone)]
pub struct HttpTransport {
  client: reqwest::Client,
  base_url: Url,
}

impl HttpTransport {
  pub fn new(base_url: &str, timeout: Duration) -> TransportResult<Self> {
    let base_url = Url::parse(base_url)
      .map_err(|e| TransportError::InvalidRequest(format!("base URL {}: {}", base_url, e)))?;

    let client = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

    Ok(Self { client, base_url })
  }

  /// Resolve an endpoint path against the base URL, keeping the base path.
  ///
  /// `https://host/api` + `/orders?page=2` -> `https://host/api/orders?page=2`
  fn endpoint_url(&self, path: &str) -> TransportResult<Url> {
    if path.starts_with("http://") || path.starts_with("https://") {
      return Url::parse(path).map_err(|e| TransportError::InvalidRequest(e.to_string()));
    }

    let (path, query) = match path.split_once('?') {
      Some((p, q)) => (p, Some(q)),
      None => (path, None),
    };

    let mut url = self.base_url.clone();
    let joined = format!(
      "{}/{}",
      self.base_url.path().trim_end_matches('/'),
      path.trim_start_matches('/')
    );
    url.set_path(&joined);
    url.set_query(query);
    Ok(url)
  }
}

impl Transport for HttpTransport {
  fn send(&self, request: ApiRequest) -> BoxFuture<'_, TransportResult<ApiResponse>> {
    Box::pin(async move {
      let url = self.endpoint_url(&request.path)?;
      debug!(method = %request.method, %url, "sending request");

      let mut builder = self.client.request(request.method.into(), url.clone());
      if let Some(token) = &request.bearer {
        builder = builder.bearer_auth(token);
      }
      if let Some(body) = &request.body {
        builder = builder.json(body);
      }

      let response = builder.send().await.map_err(|e| {
        debug!(method = %request.method, %url, error = %e, "no response");
        TransportError::NoResponse(e.to_string())
      })?;

      let status = response.status().as_u16();
      let text = response
        .text()
        .await
        .map_err(|e| TransportError::NoResponse(e.to_string()))?;
      debug!(method = %request.method, %url, status, "received response");

      Ok(ApiResponse {
        status,
        body: decode_body(&text),
      })
    })
  }
}

fn decode_body(text: &str) -> Value {
  if text.trim().is_empty() {
    return Value::Null;
  }
  serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;
  use std::net::TcpListener;
  use wiremock::matchers::{body_json, header, method, path, query_param};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  #[test]
  fn method_display_honors_width() {
    assert_eq!(format!("{:<6}|", Method::Get), "GET   |");
    assert_eq!(format!("{}", Method::Delete), "DELETE");
  }

  fn transport(base: &str) -> HttpTransport {
    HttpTransport::new(base, Duration::from_secs(5)).unwrap()
  }

  #[test]
  fn endpoint_url_keeps_base_path_and_query() {
    let t = transport("https://example.com/api/");
    assert_eq!(
      t.endpoint_url("/orders?page=2").unwrap().as_str(),
      "https://example.com/api/orders?page=2"
    );
    assert_eq!(
      t.endpoint_url("services").unwrap().as_str(),
      "https://example.com/api/services"
    );
  }

  #[test]
  fn decode_body_variants() {
    assert_eq!(decode_body(""), Value::Null);
    assert_eq!(decode_body("{\"a\":1}"), json!({"a": 1}));
    assert_eq!(decode_body("plain text"), json!("plain text"));
  }

  #[tokio::test]
  async fn sends_bearer_and_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/orders"))
      .and(header("authorization", "Bearer tok"))
      .and(body_json(json!({"customer": "Jane"})))
      .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 1})))
      .expect(1)
      .mount(&server)
      .await;

    let response = transport(&server.uri())
      .send(ApiRequest {
        method: Method::Post,
        path: "/orders".into(),
        body: Some(json!({"customer": "Jane"})),
        bearer: Some("tok".into()),
      })
      .await
      .unwrap();

    assert_eq!(response.status, 201);
    assert!(response.is_success());
    assert_eq!(response.body, json!({"id": 1}));
  }

  #[tokio::test]
  async fn error_status_is_a_response_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/services"))
      .and(query_param("active", "true"))
      .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "boom"})))
      .mount(&server)
      .await;

    let response = transport(&server.uri())
      .send(ApiRequest {
        method: Method::Get,
        path: "/services?active=true".into(),
        body: None,
        bearer: None,
      })
      .await
      .unwrap();

    assert_eq!(response.status, 500);
    assert!(!response.is_success());
  }

  #[tokio::test]
  async fn unreachable_server_is_no_response() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = transport(&format!("http://{}", addr))
      .send(ApiRequest {
        method: Method::Get,
        path: "/services".into(),
        body: None,
        bearer: None,
      })
      .await;

    assert!(matches!(result, Err(TransportError::NoResponse(_))));
  }

  #[tokio::test]
  async fn timeout_is_no_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
      .mount(&server)
      .await;

    let t = HttpTransport::new(&server.uri(), Duration::from_millis(50)).unwrap();
    let result = t
      .send(ApiRequest {
        method: Method::Get,
        path: "/slow".into(),
        body: None,
        bearer: None,
      })
      .await;

    assert!(matches!(result, Err(TransportError::NoResponse(_))));
  }
}
