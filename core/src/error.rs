//! Error types for the SPIKE API client.
//!
//! # Design
//! Every operation returns `Result<T, ApiError>`. An API-level failure
//! (status >= 400) still carries the decoded response body, because SPIKE
//! puts a structured `{"error": {"type", "message"}}` payload there that
//! callers need alongside the status line. Transport failures never carry a
//! body.

use serde_json::Value;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ApiError>;

/// Errors returned by `SpikeClient` operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Parameters were rejected before any request was built.
    #[error("Invalid arguments: {field} {reason}")]
    InvalidArguments { field: &'static str, reason: String },

    /// The exchange could not be completed (DNS, refused connection,
    /// timeout, TLS).
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with status >= 400. `message` is the status line.
    #[error("{message}")]
    Api {
        status: u16,
        message: String,
        body: Option<Value>,
    },

    /// A success response body could not be decoded.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The request payload could not be encoded.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Client configuration is missing or malformed.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ApiError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ApiError::InvalidArguments {
            field,
            reason: reason.into(),
        }
    }

    /// HTTP status of an API error.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Decoded response body of an API error, if the server sent one.
    pub fn body(&self) -> Option<&Value> {
        match self {
            ApiError::Api { body, .. } => body.as_ref(),
            _ => None,
        }
    }

    /// The `error.type` field of a structured SPIKE error payload,
    /// e.g. `"invalid_request_error"` or `"card_error"`.
    pub fn error_type(&self) -> Option<&str> {
        self.body()?.get("error")?.get("type")?.as_str()
    }

    pub fn is_invalid_arguments(&self) -> bool {
        matches!(self, ApiError::InvalidArguments { .. })
    }
}
