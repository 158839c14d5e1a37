//! MCP server implementation with tool handlers
//!
//! Implements the `ServerHandler` trait and registers the two Gmail tools.
//! Handles input validation, delegation to the search orchestrator and
//! client, and response shaping. Remote and execution failures never escape
//! the boundary: every one is converted into a stable error-tagged JSON
//! object.

use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{ErrorData, ServerCapabilities, ServerInfo};
use rmcp::{Json, ServerHandler, tool, tool_handler, tool_router};
use serde_json::json;

use crate::codec;
use crate::errors::{AppError, AppResult};
use crate::gmail::{GmailMessage, MailApi};
use crate::models::{GetMessageInput, MessageFormat, SearchMessagesInput};
use crate::search;
use crate::search::SearchData;

/// Maximum messages per search result
const MAX_SEARCH_RESULTS: usize = 50;

/// Boundary message for rejected credentials
const AUTH_FAILED_MESSAGE: &str =
    "Gmail API authentication failed. Re-run the OAuth pre-authorization step to refresh the stored token.";

/// Boundary message for exhausted quota
const RATE_LIMITED_MESSAGE: &str = "Gmail API rate limit exceeded. Please try again later.";

/// Gmail MCP server
///
/// Holds the shared provider handle. Implements MCP tool handlers via
/// `#[tool]` attribute macro and `ServerHandler` trait.
#[derive(Clone)]
pub struct GmailMcpServer {
    /// Provider client (the injection seam for tests)
    client: Arc<dyn MailApi>,
    /// Tool router for dispatching MCP tool calls
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl GmailMcpServer {
    /// Create a new MCP server instance around a constructed client
    pub fn new(client: Arc<dyn MailApi>) -> Self {
        Self {
            client,
            tool_router: Self::tool_router(),
        }
    }

    /// Tool: Search Gmail messages
    ///
    /// Combines the base query with date and label filters, paginates with
    /// deduplication up to `max_results`, and enriches the leading entries
    /// with From/Subject/Date metadata.
    #[tool(
        name = "gmail_search_messages",
        description = "Search Gmail messages using Gmail query syntax; returns ids with metadata for the leading results"
    )]
    async fn search_messages(
        &self,
        Parameters(input): Parameters<SearchMessagesInput>,
    ) -> Result<Json<serde_json::Value>, ErrorData> {
        validate_search_input(&input).map_err(|e| e.to_error_data())?;
        Ok(Json(self.search_messages_impl(input).await))
    }

    /// Tool: Get message details by ID
    ///
    /// Returns headers, snippet, and — for `full` format only — decoded
    /// text/HTML bodies.
    #[tool(
        name = "gmail_get_message",
        description = "Get detailed information about a Gmail message by ID"
    )]
    async fn get_message(
        &self,
        Parameters(input): Parameters<GetMessageInput>,
    ) -> Result<Json<serde_json::Value>, ErrorData> {
        validate_get_input(&input).map_err(|e| e.to_error_data())?;
        Ok(Json(self.get_message_impl(input).await))
    }
}

/// MCP server handler implementation
///
/// Provides server info and capabilities to the MCP client.
#[tool_handler(router = self.tool_router)]
impl ServerHandler for GmailMcpServer {
    fn get_info(&self) -> ServerInfo {
        let mut info = ServerInfo::default();
        info.instructions = Some(
            "Read-only Gmail MCP server. Search messages and fetch message details; failures are reported as stable error-tagged JSON objects.".to_owned(),
        );
        info.capabilities = ServerCapabilities::builder().enable_tools().build();
        info
    }
}

/// Tool implementation methods
///
/// Separated from the public `#[tool]` methods so tests can exercise the
/// full behavior without an MCP transport.
impl GmailMcpServer {
    async fn search_messages_impl(&self, input: SearchMessagesInput) -> serde_json::Value {
        let max_results = input.max_results.clamp(1, MAX_SEARCH_RESULTS);
        match search::search(
            self.client.as_ref(),
            &input.query,
            max_results,
            input.newer_than_days,
            input.label_ids.as_deref(),
        )
        .await
        {
            Ok(data) => search_success_body(data),
            Err(err) => search_error_body(&err),
        }
    }

    async fn get_message_impl(&self, input: GetMessageInput) -> serde_json::Value {
        match self.client.get_message(&input.message_id, input.fmt).await {
            Ok(message) => message_detail_body(&message, input.fmt),
            Err(err) => get_error_body(&err, &input.message_id),
        }
    }
}

/// Validate search input beyond what the schema enforces
fn validate_search_input(input: &SearchMessagesInput) -> AppResult<()> {
    if let Some(days) = input.newer_than_days
        && days < 1
    {
        return Err(AppError::invalid("newer_than_days must be at least 1"));
    }
    Ok(())
}

/// Validate get-message input beyond what the schema enforces
fn validate_get_input(input: &GetMessageInput) -> AppResult<()> {
    if input.message_id.trim().is_empty() {
        return Err(AppError::invalid("message_id is required"));
    }
    Ok(())
}

/// Shape a successful search outcome into the stable response object
fn search_success_body(data: SearchData) -> serde_json::Value {
    let results = match serde_json::to_value(&data.results) {
        Ok(value) => value,
        Err(e) => {
            return json!({
                "error": "tool_execution_error",
                "message": format!("serialization failure: {e}"),
                "results": [],
            });
        }
    };

    let mut body = json!({
        "results": results,
        "total_count": data.total_count,
    });
    if let Some(hint) = data.hint {
        body["hint"] = json!(hint);
    }
    body
}

/// Map a search failure to its boundary error tag
///
/// `not_found` is reserved for `gmail_get_message`; a 404 during listing
/// surfaces as a plain API error.
fn search_error_body(err: &AppError) -> serde_json::Value {
    let (code, message) = match err {
        AppError::AuthFailed(_) => ("authentication_error", AUTH_FAILED_MESSAGE.to_owned()),
        AppError::RateLimited(_) => ("rate_limited", RATE_LIMITED_MESSAGE.to_owned()),
        AppError::NotFound(_) | AppError::Api { .. } => {
            ("api_error", format!("Gmail API error: {err}"))
        }
        other => ("tool_execution_error", other.to_string()),
    };
    json!({ "error": code, "message": message, "results": [] })
}

/// Map a get-message failure to its boundary error tag
///
/// The provider returns 404 for missing messages but 400 with an
/// "Invalid id" marker for malformed ids; both surface as `not_found`.
fn get_error_body(err: &AppError, message_id: &str) -> serde_json::Value {
    let (code, message) = match err {
        AppError::NotFound(_) => ("not_found", not_found_message(message_id)),
        AppError::Api {
            status: 400,
            message,
        } if message.contains("Invalid id") => ("not_found", not_found_message(message_id)),
        AppError::AuthFailed(_) => ("authentication_error", AUTH_FAILED_MESSAGE.to_owned()),
        AppError::RateLimited(_) => ("rate_limited", RATE_LIMITED_MESSAGE.to_owned()),
        AppError::Api { .. } => ("api_error", format!("Gmail API error: {err}")),
        other => ("unknown_error", format!("Unexpected error: {other}")),
    };
    json!({ "error": code, "message": message })
}

fn not_found_message(message_id: &str) -> String {
    format!("Message not found: {message_id}. Please check the message_id is correct.")
}

/// Shape a fetched message into the stable detail object
///
/// Headers collapse into a name→value map where a duplicate name keeps the
/// last value. Body fields are attached only for `full` format and only
/// when the codec produced them; `metadata` responses never carry body
/// keys even if the payload includes body data.
fn message_detail_body(message: &GmailMessage, fmt: MessageFormat) -> serde_json::Value {
    let mut headers = serde_json::Map::new();
    if let Some(payload) = &message.payload
        && let Some(list) = &payload.headers
    {
        for header in list {
            headers.insert(
                header.name.clone(),
                serde_json::Value::String(header.value.clone()),
            );
        }
    }

    let mut body = json!({
        "id": message.id,
        "thread_id": message.thread_id,
        "headers": headers,
        "snippet": message.snippet,
    });

    if fmt == MessageFormat::Full
        && let Some(payload) = &message.payload
    {
        let (body_text, body_html) = codec::decode_body(payload);
        if let Some(text) = body_text {
            body["body_text"] = json!(text);
        }
        if let Some(html) = body_html {
            body["body_html"] = json!(html);
        }
    }

    body
}
