use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use super::RawResponse;
use crate::error::{LedgerError, Result};

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default = "default_success")]
    success: bool,
    data: Option<Value>,
    #[serde(default)]
    message: Option<Value>,
}

fn default_success() -> bool {
    true
}

/// Best-effort human message from an error body.
///
/// Tries `message`, then ERPNext's `_server_messages` (a JSON string holding
/// a list of JSON strings, each an object with `message`), then falls back to
/// `"Error {status}: {statusText}"`.
pub fn error_message(response: &RawResponse) -> String {
    let fallback = || format!("Error {}: {}", response.status, response.status_text);

    let Ok(body) = serde_json::from_str::<Value>(&response.body) else {
        return fallback();
    };

    if let Some(message) = body.get("message").and_then(text_of) {
        return message;
    }

    if let Some(raw) = body.get("_server_messages").and_then(Value::as_str) {
        if let Some(message) = server_messages(raw) {
            return message;
        }
    }

    fallback()
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Object(map) => map.get("message").and_then(text_of),
        _ => None,
    }
}

fn server_messages(raw: &str) -> Option<String> {
    let entries: Vec<String> = serde_json::from_str(raw).ok()?;
    let messages: Vec<String> = entries
        .iter()
        .filter_map(|entry| match serde_json::from_str::<Value>(entry) {
            Ok(value) => text_of(&value),
            Err(_) => Some(entry.clone()).filter(|e| !e.trim().is_empty()),
        })
        .collect();
    if messages.is_empty() {
        None
    } else {
        Some(messages.join("; "))
    }
}

/// Unwrap `{success, data, message}` into `data`.
///
/// Non-2xx statuses and `success: false` become [`LedgerError::Api`]; 401
/// becomes [`LedgerError::Unauthorized`]. A missing `data` decodes as JSON
/// `null`, so `T = Option<_>` or `()` tolerate empty replies.
pub fn decode_envelope<T: DeserializeOwned>(path: &str, response: &RawResponse) -> Result<T> {
    if response.status == 401 {
        return Err(LedgerError::Unauthorized);
    }
    if !response.is_success() {
        return Err(LedgerError::Api {
            status: response.status,
            message: error_message(response),
        });
    }

    let envelope: Envelope =
        serde_json::from_str(&response.body).map_err(|e| LedgerError::Decode {
            path: path.to_string(),
            source: e,
        })?;

    if !envelope.success {
        let message = envelope
            .message
            .as_ref()
            .and_then(text_of)
            .unwrap_or_else(|| "Request failed".to_string());
        return Err(LedgerError::Api {
            status: response.status,
            message,
        });
    }

    serde_json::from_value(envelope.data.unwrap_or(Value::Null)).map_err(|e| LedgerError::Decode {
        path: path.to_string(),
        source: e,
    })
}
