//! Stored OAuth credentials and token refresh
//!
//! Runtime credentials handle for the Gmail API. Loads a previously
//! authorized token file (access token, refresh token, client pair) and
//! refreshes the access token against the Google token endpoint when it
//! nears expiry. Does NOT initiate the browser authorization flow; a
//! missing or unusable token file is a construction error whose message
//! points at the pre-authorization step.
//!
//! Refresh is atomic with respect to concurrent readers: the access token
//! is swapped under a write lock, so callers only ever observe a currently
//! valid or currently invalid token, never a torn intermediate state.

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::config::ServerConfig;
use crate::errors::{AppError, AppResult};

/// Seconds before expiry at which the access token is treated as stale
const EXPIRY_BUFFER_SECS: i64 = 300;

/// Guidance appended to credential errors
const REAUTHORIZE_HINT: &str =
    "Run the OAuth pre-authorization step to regenerate the token file, then restart the server.";

/// Stored token file contents (authorized-user JSON)
///
/// Matches the layout written by the pre-authorization step: OAuth client
/// pair, refresh token, and the most recent access token with its expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TokenFile {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default = "default_token_uri")]
    token_uri: String,
    #[serde(default)]
    client_id: Option<String>,
    #[serde(default)]
    client_secret: Option<String>,
    #[serde(default)]
    scopes: Option<Vec<String>>,
    /// RFC 3339 expiry of `token`, absent when unknown
    #[serde(default)]
    expiry: Option<String>,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_owned()
}

/// Token response from the Google token endpoint
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Mutable credential state guarded by the store's lock
#[derive(Debug)]
struct AccessState {
    access_token: Option<String>,
    expires_at: Option<DateTime<Utc>>,
    refresh_token: SecretString,
}

impl AccessState {
    /// Whether the held access token is usable without a refresh
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        match (&self.access_token, self.expires_at) {
            (Some(_), Some(expires_at)) => expires_at > now + Duration::seconds(EXPIRY_BUFFER_SECS),
            _ => false,
        }
    }
}

/// Long-lived credentials handle
///
/// Owned by the host, shared read-only with the Gmail client. The access
/// token lives behind a `RwLock`; reads are cheap, refresh takes the write
/// lock and re-checks before calling the token endpoint so concurrent
/// callers trigger at most one refresh.
#[derive(Debug)]
pub struct TokenStore {
    token_path: PathBuf,
    token_uri: String,
    client_id: String,
    client_secret: SecretString,
    scopes: Option<Vec<String>>,
    http: reqwest::Client,
    state: RwLock<AccessState>,
}

impl TokenStore {
    /// Load the stored token file and build the credentials handle
    ///
    /// # Errors
    ///
    /// Returns `AuthFailed` when the token file is missing, malformed, or
    /// lacks the refresh token / client pair needed to mint access tokens.
    /// Each message includes re-authorization instructions; there is no
    /// silent fallback to a browser flow.
    pub fn load(config: &ServerConfig) -> AppResult<Self> {
        let token_path = config.token_path.clone();
        let raw = fs::read_to_string(&token_path).map_err(|e| {
            AppError::AuthFailed(format!(
                "cannot read token file {}: {e}. {REAUTHORIZE_HINT}",
                token_path.display()
            ))
        })?;
        let file: TokenFile = serde_json::from_str(&raw).map_err(|e| {
            AppError::AuthFailed(format!(
                "token file {} is not valid JSON: {e}. {REAUTHORIZE_HINT}",
                token_path.display()
            ))
        })?;

        let refresh_token = file.refresh_token.clone().filter(|t| !t.is_empty()).ok_or_else(|| {
            AppError::AuthFailed(format!(
                "token file {} is missing refresh_token. {REAUTHORIZE_HINT}",
                token_path.display()
            ))
        })?;
        let client_id = file.client_id.clone().filter(|c| !c.is_empty()).ok_or_else(|| {
            AppError::AuthFailed(format!(
                "token file {} is missing client_id. {REAUTHORIZE_HINT}",
                token_path.display()
            ))
        })?;
        let client_secret = file.client_secret.clone().filter(|c| !c.is_empty()).ok_or_else(|| {
            AppError::AuthFailed(format!(
                "token file {} is missing client_secret. {REAUTHORIZE_HINT}",
                token_path.display()
            ))
        })?;

        let expires_at = file
            .expiry
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|dt| dt.with_timezone(&Utc));

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(config.http_timeout_ms))
            .build()
            .map_err(|e| AppError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            token_path,
            token_uri: file.token_uri,
            client_id,
            client_secret: SecretString::new(client_secret.into()),
            scopes: file.scopes,
            http,
            state: RwLock::new(AccessState {
                access_token: file.token.filter(|t| !t.is_empty()),
                expires_at,
                refresh_token: SecretString::new(refresh_token.into()),
            }),
        })
    }

    /// Whether a currently valid access token is held
    pub async fn valid(&self) -> bool {
        self.state.read().await.is_fresh(Utc::now())
    }

    /// Return a currently valid bearer token, refreshing if stale
    ///
    /// Fast path takes the read lock only. On staleness the write lock is
    /// taken and freshness re-checked, so racing callers coalesce into one
    /// token-endpoint call.
    pub async fn bearer_token(&self) -> AppResult<String> {
        {
            let state = self.state.read().await;
            if state.is_fresh(Utc::now())
                && let Some(token) = &state.access_token
            {
                return Ok(token.clone());
            }
        }

        let mut state = self.state.write().await;
        if state.is_fresh(Utc::now())
            && let Some(token) = &state.access_token
        {
            return Ok(token.clone());
        }
        self.refresh_locked(&mut state).await
    }

    /// Force a refresh of the access token
    pub async fn refresh(&self) -> AppResult<()> {
        let mut state = self.state.write().await;
        self.refresh_locked(&mut state).await?;
        Ok(())
    }

    /// Exchange the refresh token for a new access token
    ///
    /// Called with the write lock held. Persists the rotated token file
    /// back to disk; persistence failure keeps the in-memory token and is
    /// only logged.
    async fn refresh_locked(&self, state: &mut AccessState) -> AppResult<String> {
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose_secret()),
            ("refresh_token", state.refresh_token.expose_secret()),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .http
            .post(&self.token_uri)
            .form(&params)
            .send()
            .await
            .map_err(|e| AppError::Transport(format!("token refresh request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::AuthFailed(format!(
                "token refresh rejected (status {}): {body}. {REAUTHORIZE_HINT}",
                status.as_u16()
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::Transport(format!("failed to parse token response: {e}")))?;

        state.access_token = Some(token.access_token.clone());
        state.expires_at = token
            .expires_in
            .map(|secs| Utc::now() + Duration::seconds(secs as i64));
        // The endpoint may rotate the refresh token; keep the old one otherwise.
        if let Some(rotated) = token.refresh_token.filter(|t| !t.is_empty()) {
            state.refresh_token = SecretString::new(rotated.into());
        }

        if let Err(e) = self.persist(state) {
            tracing::warn!("failed to persist refreshed token: {e}");
        }

        Ok(token.access_token)
    }

    /// Write the current credential state back to the token file
    fn persist(&self, state: &AccessState) -> AppResult<()> {
        let file = TokenFile {
            token: state.access_token.clone(),
            refresh_token: Some(state.refresh_token.expose_secret().to_owned()),
            token_uri: self.token_uri.clone(),
            client_id: Some(self.client_id.clone()),
            client_secret: Some(self.client_secret.expose_secret().to_owned()),
            scopes: self.scopes.clone(),
            expiry: state.expires_at.map(|dt| dt.to_rfc3339()),
        };
        let content = serde_json::to_string_pretty(&file)
            .map_err(|e| AppError::Internal(format!("failed to serialize token file: {e}")))?;
        fs::write(&self.token_path, content)
            .map_err(|e| AppError::Internal(format!("failed to write token file: {e}")))?;
        Ok(())
    }
}
