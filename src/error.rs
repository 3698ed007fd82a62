//! Error types for the caching layer
//!
//! Provides unified error handling using thiserror. The enum is `Clone` so a
//! single in-flight fetch result can be handed to every waiter.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

// == Cache Error Enum ==
/// Unified error type for the caching layer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CacheError {
    /// No connectivity, DNS failure, connection reset
    #[error("Network error: {0}")]
    Network(String),

    /// The remote call exceeded the request timeout
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// The interception proxy answered with its synthesized offline response
    #[error("Offline: {0}")]
    Offline(String),

    /// The remote API rejected the credential
    #[error("Unauthorized - login required")]
    Unauthorized,

    /// Any other non-success status from the remote API
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Response body could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Persistent store failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CacheError {
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Maps a non-success remote status to an error.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = Self::truncate_body(body);
        match status {
            401 => CacheError::Unauthorized,
            404 => CacheError::NotFound(message),
            _ => CacheError::Http { status, message },
        }
    }
}

impl From<reqwest::Error> for CacheError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CacheError::Timeout(err.to_string())
        } else if err.is_decode() {
            CacheError::Decode(err.to_string())
        } else {
            CacheError::Network(err.to_string())
        }
    }
}

impl From<rusqlite::Error> for CacheError {
    fn from(err: rusqlite::Error) -> Self {
        CacheError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Decode(err.to_string())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::Network(_) | CacheError::Timeout(_) => StatusCode::BAD_GATEWAY,
            CacheError::Offline(_) => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::Unauthorized => StatusCode::UNAUTHORIZED,
            CacheError::Http { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::Decode(_) | CacheError::Storage(_) | CacheError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let message = match self {
            CacheError::Offline(msg) => msg,
            other => other.to_string(),
        };

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the caching layer.
pub type Result<T> = std::result::Result<T, CacheError>;
