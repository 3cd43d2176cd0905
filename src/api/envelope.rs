//! Response-body normalization.
//!
//! Some endpoints wrap their payload as `{"success": bool, "data": ..,
//! "message": ..}`; others return the payload directly. The body is decoded
//! into [`ResponseBody`] once and matched, rather than probed field by field.

use serde::Deserialize;
use serde_json::Value;

const DEFAULT_REJECTION: &str = "Request failed";

/// Explicit success/failure wrapper.
#[derive(Debug, Deserialize)]
struct Envelope {
  success: bool,
  #[serde(default)]
  data: Value,
  #[serde(default)]
  message: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ResponseBody {
  Envelope(Envelope),
  Plain(Value),
}

/// Unwrap an envelope to its payload, or return the body unchanged.
///
/// `Err` carries the message of an envelope with `success: false`.
pub fn normalize(body: Value) -> Result<Value, String> {
  // Only objects can be envelopes; serde would otherwise accept `[true]`.
  let decoded = if body.is_object() {
    ResponseBody::deserialize(&body).unwrap_or(ResponseBody::Plain(body))
  } else {
    ResponseBody::Plain(body)
  };
  match decoded {
    ResponseBody::Envelope(Envelope {
      success: true,
      data,
      ..
    }) => Ok(data),
    ResponseBody::Envelope(Envelope {
      success: false,
      message,
      ..
    }) => Err(
      message
        .as_ref()
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_REJECTION)
        .to_string(),
    ),
    ResponseBody::Plain(value) => Ok(value),
  }
}

/// Human-readable message from an error body (`message`, then `error`).
pub fn server_message(body: &Value) -> Option<String> {
  match body {
    Value::Object(map) => ["message", "error"]
      .iter()
      .find_map(|field| map.get(*field).and_then(Value::as_str))
      .map(String::from),
    Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
    _ => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn unwraps_successful_envelope() {
    let body = json!({"success": true, "data": [{"id": 1}]});
    assert_eq!(normalize(body), Ok(json!([{"id": 1}])));
  }

  #[test]
  fn successful_envelope_without_data_is_null() {
    assert_eq!(normalize(json!({"success": true})), Ok(Value::Null));
  }

  #[test]
  fn failed_envelope_uses_message() {
    let body = json!({"success": false, "message": "Slot already booked"});
    assert_eq!(normalize(body), Err("Slot already booked".to_string()));
    assert_eq!(
      normalize(json!({"success": false})),
      Err(DEFAULT_REJECTION.to_string())
    );
  }

  #[test]
  fn success_flag_decides_regardless_of_message_type() {
    let rejected = json!({"success": false, "message": {"code": "SLOT_TAKEN"}});
    assert_eq!(normalize(rejected), Err(DEFAULT_REJECTION.to_string()));

    let accepted = json!({"success": true, "data": [1], "message": 42});
    assert_eq!(normalize(accepted), Ok(json!([1])));
  }

  #[test]
  fn plain_bodies_pass_through() {
    for body in [
      json!({"id": 1, "name": "Cut"}),
      json!([1, 2, 3]),
      json!("ok"),
      Value::Null,
      json!({"success": "yes"}),
      json!([true]),
    ] {
      assert_eq!(normalize(body.clone()), Ok(body));
    }
  }

  #[test]
  fn server_message_prefers_message_field() {
    assert_eq!(
      server_message(&json!({"message": "m", "error": "e"})).as_deref(),
      Some("m")
    );
    assert_eq!(server_message(&json!({"error": "e"})).as_deref(), Some("e"));
    assert_eq!(server_message(&json!({"code": 3})), None);
    assert_eq!(server_message(&Value::Null), None);
  }
}
