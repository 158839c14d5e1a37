//! Scripted provider fake for tests
//!
//! Implements [`MailApi`] over queued page scripts and canned messages so
//! orchestrator and facade behavior can be exercised without network I/O.

use std::collections::{HashMap, VecDeque};
use std::ops::Range;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::errors::{AppError, AppResult};
use crate::gmail::{
    GmailMessage, Header, ListMessagesResponse, MailApi, MessagePayload, MessageRef,
};
use crate::models::MessageFormat;

/// One scripted listing outcome
enum ScriptedPage {
    Page(ListMessagesResponse),
    Fail(u16),
}

/// Scripted [`MailApi`] implementation
///
/// Listing pops queued pages in order (an exhausted queue yields an empty
/// page); message fetches return canned messages or scripted failures and
/// fall back to a synthesized metadata message. All calls are recorded.
#[derive(Default)]
pub struct FakeMail {
    pages: Mutex<VecDeque<ScriptedPage>>,
    messages: Mutex<HashMap<String, GmailMessage>>,
    get_failures: Mutex<HashMap<String, u16>>,
    list_queries: Mutex<Vec<String>>,
    list_sizes: Mutex<Vec<usize>>,
    get_ids: Mutex<Vec<String>>,
}

impl FakeMail {
    /// Queue a listing page
    pub fn push_page(&self, messages: Vec<MessageRef>, next_page_token: Option<&str>) {
        self.pages
            .lock()
            .expect("pages lock")
            .push_back(ScriptedPage::Page(ListMessagesResponse {
                result_size_estimate: Some(messages.len() as u32),
                messages: if messages.is_empty() {
                    None
                } else {
                    Some(messages)
                },
                next_page_token: next_page_token.map(str::to_owned),
            }));
    }

    /// Queue a listing failure with the given HTTP status
    pub fn push_list_failure(&self, status: u16) {
        self.pages
            .lock()
            .expect("pages lock")
            .push_back(ScriptedPage::Fail(status));
    }

    /// Store a canned message returned by `get_message`
    pub fn insert_message(&self, message: GmailMessage) {
        self.messages
            .lock()
            .expect("messages lock")
            .insert(message.id.clone(), message);
    }

    /// Script a failure for one message id
    pub fn fail_get(&self, id: &str, status: u16) {
        self.get_failures
            .lock()
            .expect("failures lock")
            .insert(id.to_owned(), status);
    }

    /// Queries passed to `list_messages`, in call order
    pub fn recorded_list_queries(&self) -> Vec<String> {
        self.list_queries.lock().expect("queries lock").clone()
    }

    /// Page sizes passed to `list_messages`, in call order
    pub fn recorded_list_sizes(&self) -> Vec<usize> {
        self.list_sizes.lock().expect("sizes lock").clone()
    }

    /// Number of `list_messages` calls observed
    pub fn list_call_count(&self) -> usize {
        self.list_queries.lock().expect("queries lock").len()
    }

    /// Message ids passed to `get_message`, in call order
    pub fn recorded_get_ids(&self) -> Vec<String> {
        self.get_ids.lock().expect("get ids lock").clone()
    }
}

#[async_trait]
impl MailApi for FakeMail {
    async fn list_messages(
        &self,
        query: &str,
        max_results: usize,
        _page_token: Option<&str>,
    ) -> AppResult<ListMessagesResponse> {
        self.list_queries
            .lock()
            .expect("queries lock")
            .push(query.to_owned());
        self.list_sizes
            .lock()
            .expect("sizes lock")
            .push(max_results);

        match self.pages.lock().expect("pages lock").pop_front() {
            Some(ScriptedPage::Page(page)) => Ok(page),
            Some(ScriptedPage::Fail(status)) => Err(AppError::from_status(
                status,
                "scripted listing failure".to_owned(),
            )),
            None => Ok(ListMessagesResponse {
                messages: None,
                next_page_token: None,
                result_size_estimate: Some(0),
            }),
        }
    }

    async fn get_message(
        &self,
        message_id: &str,
        _format: MessageFormat,
    ) -> AppResult<GmailMessage> {
        self.get_ids
            .lock()
            .expect("get ids lock")
            .push(message_id.to_owned());

        if let Some(status) = self
            .get_failures
            .lock()
            .expect("failures lock")
            .get(message_id)
        {
            return Err(AppError::from_status(
                *status,
                format!("scripted failure for {message_id}"),
            ));
        }

        if let Some(message) = self.messages.lock().expect("messages lock").get(message_id) {
            return Ok(message.clone());
        }

        Ok(metadata_message(message_id))
    }
}

/// Build numbered message refs, `m{i}`/`t{i}`
pub fn refs(range: Range<usize>) -> Vec<MessageRef> {
    range
        .map(|i| MessageRef {
            id: format!("m{i}"),
            thread_id: format!("t{i}"),
        })
        .collect()
}

/// Synthesize a metadata-format message for an id
fn metadata_message(id: &str) -> GmailMessage {
    let thread_id = format!("t{}", id.strip_prefix('m').unwrap_or(id));
    GmailMessage {
        id: id.to_owned(),
        thread_id,
        snippet: format!("snippet for {id}"),
        label_ids: None,
        internal_date: None,
        payload: Some(MessagePayload {
            mime_type: Some("multipart/alternative".to_owned()),
            headers: Some(vec![
                Header {
                    name: "From".to_owned(),
                    value: format!("sender-{id}@example.com"),
                },
                Header {
                    name: "Subject".to_owned(),
                    value: format!("Subject {id}"),
                },
                Header {
                    name: "Date".to_owned(),
                    value: "Wed, 1 Jan 2025 00:00:00 +0000".to_owned(),
                },
            ]),
            body: None,
            parts: None,
        }),
    }
}
