//! Configuration module for the Gmail MCP server
//!
//! All configuration is loaded from environment variables following the
//! pattern `GMAIL_MCP_<KEY>`. Every setting has a default; the only external
//! prerequisite is the stored token file produced by the pre-authorization
//! step (see [`crate::auth`]).

use std::env;
use std::env::VarError;
use std::path::PathBuf;

use crate::errors::{AppError, AppResult};

/// Server-wide configuration
///
/// Wraps token location and HTTP/retry settings. Shared with the Gmail
/// client via `Arc` for thread-safe access.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Path to the stored OAuth token file (authorized-user JSON)
    pub token_path: PathBuf,
    /// Gmail user ID for API paths (`me` addresses the authorized user)
    pub user_id: String,
    /// Per-request HTTP timeout in milliseconds
    pub http_timeout_ms: u64,
    /// Maximum retries for transient provider failures
    pub max_retries: u32,
    /// Base backoff delay in milliseconds (doubled per attempt)
    pub backoff_base_ms: u64,
}

impl ServerConfig {
    /// Load all configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if a variable is set to a malformed value.
    ///
    /// # Example Environment
    ///
    /// ```text
    /// GMAIL_MCP_TOKEN_PATH=.token.json
    /// GMAIL_MCP_USER_ID=me
    /// GMAIL_MCP_HTTP_TIMEOUT_MS=30000
    /// GMAIL_MCP_MAX_RETRIES=3
    /// GMAIL_MCP_BACKOFF_BASE_MS=1000
    /// ```
    pub fn load_from_env() -> AppResult<Self> {
        Ok(Self {
            token_path: PathBuf::from(string_env("GMAIL_MCP_TOKEN_PATH", ".token.json")?),
            user_id: string_env("GMAIL_MCP_USER_ID", "me")?,
            http_timeout_ms: parse_u64_env("GMAIL_MCP_HTTP_TIMEOUT_MS", 30_000)?,
            max_retries: parse_u32_env("GMAIL_MCP_MAX_RETRIES", 3)?,
            backoff_base_ms: parse_u64_env("GMAIL_MCP_BACKOFF_BASE_MS", 1_000)?,
        })
    }
}

/// Read a string environment variable with default fallback
///
/// Returns `default` if unset or blank.
fn string_env(key: &str, default: &str) -> AppResult<String> {
    match env::var(key) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        Ok(_) | Err(VarError::NotPresent) => Ok(default.to_owned()),
        Err(VarError::NotUnicode(_)) => Err(AppError::InvalidInput(format!(
            "environment variable {key} contains non-unicode data"
        ))),
    }
}

/// Parse a `u32` environment variable with default fallback
///
/// Returns `default` if unset.
///
/// # Errors
///
/// Returns `InvalidInput` if the variable is set but not a valid `u32`.
fn parse_u32_env(key: &str, default: u32) -> AppResult<u32> {
    match env::var(key) {
        Ok(v) => v.parse::<u32>().map_err(|_| {
            AppError::InvalidInput(format!("invalid u32 environment variable {key}: '{v}'"))
        }),
        Err(VarError::NotPresent) => Ok(default),
        Err(VarError::NotUnicode(_)) => Err(AppError::InvalidInput(format!(
            "environment variable {key} contains non-unicode data"
        ))),
    }
}

/// Parse a `u64` environment variable with default fallback
///
/// Returns `default` if unset.
///
/// # Errors
///
/// Returns `InvalidInput` if the variable is set but not a valid `u64`.
fn parse_u64_env(key: &str, default: u64) -> AppResult<u64> {
    match env::var(key) {
        Ok(v) => v.parse::<u64>().map_err(|_| {
            AppError::InvalidInput(format!("invalid u64 environment variable {key}: '{v}'"))
        }),
        Err(VarError::NotPresent) => Ok(default),
        Err(VarError::NotUnicode(_)) => Err(AppError::InvalidInput(format!(
            "environment variable {key} contains non-unicode data"
        ))),
    }
}
