//! Backend client error types.

use serde_json::Value;

/// Errors that can occur while talking to the remote backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The backend returned an error response. `message` carries the
    /// backend's own message verbatim.
    #[error("backend error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Backend-provided message.
        message: String,
    },

    /// An operation needed a session but none is held.
    #[error("no active session")]
    NoSession,
}

impl BackendError {
    /// True when the error is an API rejection with the given status.
    #[must_use]
    pub fn is_status(&self, code: u16) -> bool {
        matches!(self, Self::Api { status, .. } if *status == code)
    }
}

/// Extract the backend's error message from a response body.
///
/// The auth subsystem and the query API use different envelopes; try the
/// known keys in order and fall back to the raw body.
///
/// - Auth: `{"error_description": "..."}` or `{"msg": "..."}`
/// - Query: `{"message": "...", "code": "...", "details": ...}`
pub fn parse_error_message(body: &str, status: u16) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        if let Some(msg) = json["error_description"]
            .as_str()
            .or_else(|| json["msg"].as_str())
            .or_else(|| json["message"].as_str())
            .or_else(|| json["error"].as_str())
        {
            return msg.to_string();
        }
    }
    format!("HTTP {status}: {body}")
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
