//! Search orchestration over the provider listing API
//!
//! Drives multi-page listing with deduplication, a result cap, and
//! selective metadata enrichment. Query assembly, the pagination loop, and
//! the enrichment pass live here; the tool facade only shapes the outcome
//! into JSON.

use std::collections::HashSet;

use crate::codec::extract_header;
use crate::errors::AppResult;
use crate::gmail::{MailApi, MessageRef};
use crate::models::{MessageFormat, MessageSummary};

/// Number of leading results enriched with per-message metadata
///
/// Entries past this limit are emitted bare, trading completeness for
/// latency and provider quota.
pub const ENRICHMENT_LIMIT: usize = 10;

/// Hard cap on listing pages per search, bounding worst-case cost against
/// a misbehaving provider that keeps returning page tokens
const MAX_PAGES: usize = 10;

/// Provider ceiling for `maxResults` per listing page
const PAGE_SIZE_CEILING: usize = 500;

/// Catch-all query sent when no filter clause was produced
pub const CATCH_ALL_QUERY: &str = "in:anywhere";

/// Advisory hint attached to empty (non-failure) results
pub const EMPTY_RESULT_HINT: &str = "No messages found. Try adjusting your search criteria.";

/// Successful search outcome
#[derive(Debug)]
pub struct SearchData {
    /// Ordered, deduplicated results; leading entries enriched
    pub results: Vec<MessageSummary>,
    /// Length of `results`
    pub total_count: usize,
    /// Advisory hint, present only for an empty result set
    pub hint: Option<String>,
}

/// Combine the base query with optional filters
///
/// Clause order is fixed: trimmed base query, then the date clause, then
/// one `label:` clause per label in input order. An all-empty combination
/// substitutes the catch-all sentinel rather than sending an empty string
/// to the provider.
pub fn combine_query(
    query: &str,
    newer_than_days: Option<u32>,
    label_ids: Option<&[String]>,
) -> String {
    let mut parts: Vec<String> = Vec::new();

    let trimmed = query.trim();
    if !trimmed.is_empty() {
        parts.push(trimmed.to_owned());
    }

    if let Some(days) = newer_than_days {
        parts.push(format!("newer_than:{days}d"));
    }

    if let Some(labels) = label_ids {
        for label in labels {
            parts.push(format!("label:{label}"));
        }
    }

    if parts.is_empty() {
        CATCH_ALL_QUERY.to_owned()
    } else {
        parts.join(" ")
    }
}

/// Search messages: assemble, paginate, enrich
///
/// Any classified failure during pagination aborts the entire search and
/// propagates, discarding pages already collected, so a success is always
/// a coherent snapshot. Enrichment failures degrade per-item only.
pub async fn search(
    client: &dyn MailApi,
    query: &str,
    max_results: usize,
    newer_than_days: Option<u32>,
    label_ids: Option<&[String]>,
) -> AppResult<SearchData> {
    let combined = combine_query(query, newer_than_days, label_ids);

    let refs = collect_refs(client, &combined, max_results).await?;
    if refs.is_empty() {
        return Ok(SearchData {
            results: Vec::new(),
            total_count: 0,
            hint: Some(EMPTY_RESULT_HINT.to_owned()),
        });
    }

    let results = enrich(client, refs).await;
    Ok(SearchData {
        total_count: results.len(),
        results,
        hint: None,
    })
}

/// Accumulate deduplicated message refs across listing pages
///
/// Each page requests `min(500, max_results * 2)` entries; the over-fetch
/// anticipates duplicates straddling page boundaries. Stops when the
/// accumulated count reaches `max_results` (truncating exactly), when no
/// further page token exists, or at the page cap.
async fn collect_refs(
    client: &dyn MailApi,
    query: &str,
    max_results: usize,
) -> AppResult<Vec<MessageRef>> {
    let page_size = PAGE_SIZE_CEILING.min(max_results * 2);
    let mut collected: Vec<MessageRef> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut page_token: Option<String> = None;

    for _ in 0..MAX_PAGES {
        let response = client
            .list_messages(query, page_size, page_token.as_deref())
            .await?;

        for message in response.messages.unwrap_or_default() {
            if seen.insert(message.id.clone()) {
                collected.push(message);
            }
        }

        if collected.len() >= max_results {
            collected.truncate(max_results);
            break;
        }

        match response.next_page_token {
            Some(token) => page_token = Some(token),
            None => break,
        }
    }

    Ok(collected)
}

/// Build summaries, enriching the leading entries with metadata
///
/// The first `min(ENRICHMENT_LIMIT, len)` refs each cost one metadata
/// fetch; a failure there degrades only that entry to its bare identity.
async fn enrich(client: &dyn MailApi, refs: Vec<MessageRef>) -> Vec<MessageSummary> {
    let enrich_count = ENRICHMENT_LIMIT.min(refs.len());
    let mut results = Vec::with_capacity(refs.len());

    for (index, message_ref) in refs.into_iter().enumerate() {
        if index >= enrich_count {
            results.push(MessageSummary::bare(message_ref.id, message_ref.thread_id));
            continue;
        }

        match client
            .get_message(&message_ref.id, MessageFormat::Metadata)
            .await
        {
            Ok(message) => {
                let headers = message
                    .payload
                    .as_ref()
                    .and_then(|p| p.headers.as_deref())
                    .unwrap_or(&[]);
                results.push(MessageSummary {
                    id: message_ref.id,
                    thread_id: message_ref.thread_id,
                    from_email: extract_header(headers, "From").map(str::to_owned),
                    subject: extract_header(headers, "Subject").map(str::to_owned),
                    date: extract_header(headers, "Date").map(str::to_owned),
                    snippet: Some(message.snippet),
                });
            }
            Err(err) => {
                tracing::warn!(
                    message_id = %message_ref.id,
                    "metadata enrichment failed, returning bare entry: {err}"
                );
                results.push(MessageSummary::bare(message_ref.id, message_ref.thread_id));
            }
        }
    }

    results
}
