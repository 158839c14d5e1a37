//! Application error model with HTTP status classification
//!
//! Defines a typed error hierarchy using `thiserror` for internal error
//! handling. Remote failures are classified by HTTP status exactly once, at
//! the transport boundary ([`AppError::from_status`]); every other layer
//! matches on the resulting variant instead of re-deriving status semantics.

use rmcp::model::ErrorData;
use serde_json::json;
use thiserror::Error;

/// Application error type
///
/// Covers all error cases the Gmail MCP server may encounter. Remote
/// variants (`AuthFailed`, `RateLimited`, `NotFound`, `Api`) carry the
/// classification used for retry decisions and boundary error tags.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid user input (validation failed, malformed request)
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Remote 401: credentials rejected by the provider
    #[error("authentication failed: {0}")]
    AuthFailed(String),
    /// Remote 429: provider quota exhausted
    #[error("rate limited: {0}")]
    RateLimited(String),
    /// Remote 404: resource does not exist
    #[error("not found: {0}")]
    NotFound(String),
    /// Any other status-coded remote failure
    #[error("api error (status {status}): {message}")]
    Api {
        /// HTTP status returned by the provider
        status: u16,
        /// Response body or error description
        message: String,
    },
    /// Non-HTTP transport failure (connect, TLS, malformed response body)
    #[error("transport error: {0}")]
    Transport(String),
    /// Internal error (unexpected failure, external crate error)
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Convenience constructor for `InvalidInput`
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Classify a non-success HTTP response into an error variant
    ///
    /// The single place where provider status codes become typed failures:
    ///
    /// - 401 → `AuthFailed`
    /// - 429 → `RateLimited`
    /// - 404 → `NotFound`
    /// - anything else → `Api { status }`
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 => Self::AuthFailed(message),
            429 => Self::RateLimited(message),
            404 => Self::NotFound(message),
            _ => Self::Api { status, message },
        }
    }

    /// Whether a failed call may be retried with backoff
    ///
    /// Only 429 and 5xx failures are transient. 401 is permanent until the
    /// user re-authorizes, and every other failure is propagated as-is.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimited(_) => true,
            Self::Api { status, .. } => (500..600).contains(status),
            _ => false,
        }
    }

    /// Convert to MCP `ErrorData`
    ///
    /// Used for failures that precede any remote work (input validation).
    /// Remote failures never take this path; the tool facade converts them
    /// into tagged JSON objects instead.
    pub fn to_error_data(&self) -> ErrorData {
        match self {
            Self::InvalidInput(msg) => {
                ErrorData::invalid_params(msg.clone(), Some(json!({ "code": "invalid_input" })))
            }
            other => {
                ErrorData::internal_error(other.to_string(), Some(json!({ "code": "internal" })))
            }
        }
    }
}

/// Type alias for fallible return values
///
/// Use this for all internal functions that can fail. Provides a consistent
/// error type throughout the codebase.
pub type AppResult<T> = Result<T, AppError>;
