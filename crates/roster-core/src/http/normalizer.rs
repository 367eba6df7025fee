//! Error payload normalization
//!
//! Turns whatever the backend sent back on a failed call (a JSON object, a
//! bare string, or something unparseable) into one [`ErrorRecord`] shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Message used when the payload carries no usable message of its own
pub const DEFAULT_ERROR_MESSAGE: &str = "Request failed";

/// Canonical error record for a failed backend call
///
/// `message` is always present. Everything else is optional and callers must
/// not assume the backend filled it in. `status` is 0 for failures that never
/// produced an HTTP response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// HTTP status code, 0 for non-HTTP failures
    pub status: u16,
    /// Human-readable error message
    pub message: String,
    /// Machine-readable error code (e.g. `login_required`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Structured details, opaque to this crate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    /// Path reported by the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Timestamp reported by the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// The payload exactly as received
    #[serde(default)]
    pub raw: Value,
}

impl ErrorRecord {
    /// Build a record for a failure that has no backend payload
    pub fn from_message(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            status,
            raw: Value::String(message.clone()),
            message,
            error: None,
            details: None,
            path: None,
            timestamp: None,
        }
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error {
            Some(code) => write!(f, "[{}] {} ({})", self.status, self.message, code),
            None => write!(f, "[{}] {}", self.status, self.message),
        }
    }
}

/// Normalize a failed response payload into an [`ErrorRecord`]
///
/// Never fails. Object payloads contribute their `message`, `error`,
/// `details`, `path` and `timestamp` fields when they have the right type;
/// string payloads become the message; anything else falls back to
/// [`DEFAULT_ERROR_MESSAGE`].
pub fn normalize(status: u16, payload: &Value) -> ErrorRecord {
    match payload {
        Value::Object(body) => ErrorRecord {
            status,
            message: string_field(body, "message")
                .unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string()),
            error: string_field(body, "error"),
            details: body.get("details").cloned(),
            path: string_field(body, "path"),
            timestamp: string_field(body, "timestamp"),
            raw: payload.clone(),
        },
        Value::String(text) => ErrorRecord {
            status,
            message: text.clone(),
            error: None,
            details: None,
            path: None,
            timestamp: None,
            raw: payload.clone(),
        },
        _ => ErrorRecord {
            status,
            message: DEFAULT_ERROR_MESSAGE.to_string(),
            error: None,
            details: None,
            path: None,
            timestamp: None,
            raw: payload.clone(),
        },
    }
}

fn string_field(body: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    body.get(key).and_then(Value::as_str).map(str::to_string)
}
