//! Input/output DTOs and schema-bearing types
//!
//! Defines the data structures used in the MCP tool contracts. Input types
//! are annotated with `JsonSchema` for automatic schema generation; output
//! types serialize to the stable JSON surface the tools promise.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Message fetch format
///
/// `full` includes the payload body tree; `metadata` carries headers and
/// snippet only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum MessageFormat {
    /// Headers, snippet, and decodable body parts
    #[default]
    Full,
    /// Headers and snippet only
    Metadata,
}

impl MessageFormat {
    /// Provider query-parameter value
    pub fn as_query(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Metadata => "metadata",
        }
    }
}

/// Input: search messages
///
/// Used by `gmail_search_messages`. The base query uses Gmail search
/// syntax; optional filters are appended as query clauses.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SearchMessagesInput {
    /// Gmail search query (e.g., `from:alice@example.com`, `subject:meeting`).
    /// See https://support.google.com/mail/answer/7190
    pub query: String,
    /// Maximum number of results to return (1..50, default 10)
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    /// Filter to messages newer than N days (optional, minimum 1)
    pub newer_than_days: Option<u32>,
    /// Filter by label IDs (e.g., `["INBOX", "STARRED"]`) (optional)
    pub label_ids: Option<Vec<String>>,
}

/// Input: get message details
///
/// Used by `gmail_get_message`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetMessageInput {
    /// Gmail message ID (obtained from search results)
    pub message_id: String,
    /// Message format: `full` (includes body) or `metadata` (headers only)
    #[serde(default)]
    pub fmt: MessageFormat,
}

/// One search result entry
///
/// Only the leading enriched entries carry the optional metadata fields;
/// the rest serialize them as nulls.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MessageSummary {
    /// Message identifier
    pub id: String,
    /// Thread identifier
    pub thread_id: String,
    /// Parsed From header (enriched entries only)
    pub from_email: Option<String>,
    /// Parsed Subject header (enriched entries only)
    pub subject: Option<String>,
    /// Parsed Date header (enriched entries only)
    pub date: Option<String>,
    /// Provider snippet (enriched entries only)
    pub snippet: Option<String>,
}

impl MessageSummary {
    /// Build a bare entry carrying identity only
    ///
    /// Used past the enrichment limit and when enriching one entry fails.
    pub fn bare(id: String, thread_id: String) -> Self {
        Self {
            id,
            thread_id,
            from_email: None,
            subject: None,
            date: None,
            snippet: None,
        }
    }
}

/// Default value for `max_results` in search
///
/// Chosen as a reasonable balance between response size and provider cost.
/// Most callers need to see only the first few relevant messages.
fn default_max_results() -> usize {
    10
}
