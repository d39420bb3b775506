//! Wire types and the frame codec.
//!
//! One JSON object per text frame. Requests carry `{id, method, params}`;
//! responses carry `{id, result}` on success or `{id, error: {type, message}}`
//! on failure -- never both, never neither. There is no protocol-version
//! envelope. Server-initiated heartbeats are `{"heartbeat": true}` with no id.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

/// Synthetic id used when an inbound frame cannot be parsed.
pub const PARSE_FAILURE_ID: &str = "error";

/// Synthetic method used when an inbound frame cannot be parsed.
pub const PARSE_FAILURE_METHOD: &str = "unknown";

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// A decoded inbound request frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Opaque correlation token, echoed verbatim in exactly one response.
    pub id: String,
    /// Name of a registered tool or a built-in method.
    pub method: String,
    /// Parameter object; defaults to `{}` when absent.
    #[serde(default)]
    pub params: Value,
}

impl Request {
    /// True if this request is the synthetic marker produced by a frame that
    /// failed to parse. The dispatcher answers it instead of dropping it.
    pub fn is_parse_failure(&self) -> bool {
        self.id == PARSE_FAILURE_ID && self.method == PARSE_FAILURE_METHOD
    }
}

/// Decode a raw text frame into a [`Request`].
///
/// A frame that is not valid JSON, or not a JSON object, yields the synthetic
/// `{id: "error", method: "unknown"}` request so the dispatcher still has
/// something to respond to rather than dropping the frame silently.
pub fn decode(frame: &str) -> Request {
    let obj = match serde_json::from_str::<Value>(frame) {
        Ok(Value::Object(obj)) => obj,
        Ok(other) => {
            warn!("[Codec] Frame is not a JSON object: {}", other);
            return parse_failure();
        }
        Err(e) => {
            warn!("[Codec] JSON parse error: {}", e);
            return parse_failure();
        }
    };

    Request {
        id: obj.get("id").map(stringify_id).unwrap_or_default(),
        method: obj
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        params: obj.get("params").cloned().unwrap_or_else(|| json!({})),
    }
}

fn parse_failure() -> Request {
    Request {
        id: PARSE_FAILURE_ID.to_string(),
        method: PARSE_FAILURE_METHOD.to_string(),
        params: json!({}),
    }
}

/// Render a request id as a string. Ids are opaque strings on the wire, but
/// a client sending a bare number or bool still gets it echoed back.
fn stringify_id(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

/// An outbound response frame. Exactly one of `result` / `error` is set;
/// the constructors enforce it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

/// Structured failure payload: `{"type": <kind>, "message": <text>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}

impl Response {
    pub fn success(id: impl Into<String>, result: Value) -> Self {
        Self {
            id: id.into(),
            result: Some(result),
            error: None,
        }
    }

    pub fn error(
        id: impl Into<String>,
        kind: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            result: None,
            error: Some(ErrorBody {
                kind: kind.into(),
                message: message.into(),
            }),
        }
    }
}

/// Encode a response to its wire text. An encoding failure degrades to a
/// `serialization_error` response for the same id rather than dropping the
/// frame.
pub fn encode(response: &Response) -> String {
    match serde_json::to_string(response) {
        Ok(text) => text,
        Err(e) => {
            warn!("[Codec] Failed to encode response '{}': {}", response.id, e);
            let fallback = Response::error(
                response.id.clone(),
                "serialization_error",
                format!("Failed to encode response: {}", e),
            );
            serde_json::to_string(&fallback).unwrap_or_else(|_| {
                r#"{"id":"error","error":{"type":"serialization_error","message":"response encoding failed"}}"#.to_string()
            })
        }
    }
}

/// The server -> client liveness frame. Unsolicited; carries no id.
pub fn heartbeat_frame() -> String {
    r#"{"heartbeat":true}"#.to_string()
}

// ---------------------------------------------------------------------------
// Result envelope
// ---------------------------------------------------------------------------

/// The `{success, message, data?}` payload convention carried inside
/// `Response::result` by every tool and builtin, keeping client-side
/// handling uniform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Envelope {
    /// A successful envelope with no data payload.
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }

    /// A successful envelope carrying a data payload.
    pub fn with_data(message: impl Into<String>, data: Value) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn into_value(self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
