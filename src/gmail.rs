//! Gmail REST API client
//!
//! Typed façade over the two provider operations (`messages.list`,
//! `messages.get`), routed through the retry policy. Wire types mirror the
//! provider's camelCase JSON; the message payload tree is passed through
//! opaque for the codec and tool layers to interpret.
//!
//! References:
//! - messages.list: https://developers.google.com/workspace/gmail/api/reference/rest/v1/users.messages/list
//! - messages.get:  https://developers.google.com/workspace/gmail/api/reference/rest/v1/users.messages/get

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::auth::TokenStore;
use crate::config::ServerConfig;
use crate::errors::{AppError, AppResult};
use crate::models::MessageFormat;
use crate::retry::RetryPolicy;

/// Response from listing messages
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMessagesResponse {
    pub messages: Option<Vec<MessageRef>>,
    pub next_page_token: Option<String>,
    pub result_size_estimate: Option<u32>,
}

/// Reference to a message (just ID and thread ID)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRef {
    pub id: String,
    #[serde(default)]
    pub thread_id: String,
}

/// Full message from the Gmail API
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GmailMessage {
    pub id: String,
    #[serde(default)]
    pub thread_id: String,
    #[serde(default)]
    pub snippet: String,
    pub label_ids: Option<Vec<String>>,
    pub internal_date: Option<String>,
    pub payload: Option<MessagePayload>,
}

/// Message payload containing headers and body
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePayload {
    pub mime_type: Option<String>,
    pub headers: Option<Vec<Header>>,
    pub body: Option<MessageBody>,
    pub parts: Option<Vec<MessagePart>>,
}

/// Email header (name-value pair)
#[derive(Debug, Clone, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

/// Message body (base64url-encoded when present)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageBody {
    pub size: Option<u32>,
    pub data: Option<String>,
}

/// Message part (for multipart messages, arbitrary nesting)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePart {
    pub part_id: Option<String>,
    pub mime_type: Option<String>,
    pub filename: Option<String>,
    pub headers: Option<Vec<Header>>,
    pub body: Option<MessageBody>,
    pub parts: Option<Vec<MessagePart>>,
}

/// The two remote operations the rest of the server is built on
///
/// The injection seam for the orchestrator and tool facade: production code
/// talks to [`GmailClient`], tests script a fake. Errors are the classified
/// failures of [`AppError`], unmodified, once retries are exhausted.
#[async_trait]
pub trait MailApi: Send + Sync {
    /// List message refs matching `query`
    ///
    /// `max_results` is clamped to the provider ceiling (500) before the
    /// call; `page_token` continues a previous listing.
    async fn list_messages(
        &self,
        query: &str,
        max_results: usize,
        page_token: Option<&str>,
    ) -> AppResult<ListMessagesResponse>;

    /// Fetch one message by ID in the requested format
    async fn get_message(
        &self,
        message_id: &str,
        format: MessageFormat,
    ) -> AppResult<GmailMessage>;
}

/// Gmail API client
///
/// Holds the long-lived HTTP client, the shared credentials handle, and the
/// retry policy. Constructed once by the host and shared by reference.
pub struct GmailClient {
    http: reqwest::Client,
    tokens: Arc<TokenStore>,
    user_id: String,
    retry: RetryPolicy,
}

impl GmailClient {
    /// Gmail API base URL
    const BASE_URL: &'static str = "https://gmail.googleapis.com/gmail/v1";

    /// Provider ceiling for `maxResults` per page
    const MAX_RESULTS_CEILING: usize = 500;

    /// Create a new Gmail client from config and a loaded token store
    pub fn new(config: &ServerConfig, tokens: Arc<TokenStore>) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.http_timeout_ms))
            .build()
            .map_err(|e| AppError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            tokens,
            user_id: config.user_id.clone(),
            retry: RetryPolicy::new(config.max_retries, config.backoff_base_ms),
        })
    }

    /// Issue one authorized GET and parse the JSON response
    ///
    /// Non-2xx statuses flow through [`AppError::from_status`], the single
    /// classification point for provider failures.
    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> AppResult<T> {
        let token = self.tokens.bearer_token().await?;

        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AppError::Transport(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::from_status(status.as_u16(), body));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Transport(format!("failed to parse response: {e}")))
    }
}

#[async_trait]
impl MailApi for GmailClient {
    async fn list_messages(
        &self,
        query: &str,
        max_results: usize,
        page_token: Option<&str>,
    ) -> AppResult<ListMessagesResponse> {
        let mut url = format!(
            "{}/users/{}/messages?q={}&maxResults={}",
            Self::BASE_URL,
            self.user_id,
            urlencoding::encode(query),
            max_results.min(Self::MAX_RESULTS_CEILING)
        );
        if let Some(token) = page_token {
            url.push_str("&pageToken=");
            url.push_str(&urlencoding::encode(token));
        }

        self.retry.call(|| self.get_json(&url)).await
    }

    async fn get_message(
        &self,
        message_id: &str,
        format: MessageFormat,
    ) -> AppResult<GmailMessage> {
        let url = format!(
            "{}/users/{}/messages/{}?format={}",
            Self::BASE_URL,
            self.user_id,
            urlencoding::encode(message_id),
            format.as_query()
        );

        self.retry.call(|| self.get_json(&url)).await
    }
}
