//! Message payload decoding
//!
//! Extracts text and HTML bodies from the provider's multipart payload tree
//! and looks up headers by name. Real messages nest `multipart/alternative`
//! inside `multipart/mixed` at arbitrary depth; the walk is recursive and
//! preserves a fixed precedence: a body found at an outer level is never
//! overwritten by one found deeper in the tree, while among direct siblings
//! of a level the last typed part wins. Malformed base64 or non-UTF-8 data
//! is skipped silently; decoding never fails a fetch.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

use crate::gmail::{Header, MessageBody, MessagePart, MessagePayload};

/// Decode text and HTML bodies from a message payload
///
/// Returns `(body_text, body_html)`; either side may be absent.
pub fn decode_body(payload: &MessagePayload) -> (Option<String>, Option<String>) {
    let mut body_text = None;
    let mut body_html = None;
    decode_node(
        payload.mime_type.as_deref(),
        payload.body.as_ref(),
        payload.parts.as_deref(),
        &mut body_text,
        &mut body_html,
    );
    (body_text, body_html)
}

/// Walk one node of the payload tree
///
/// Order matters: the node's own data first, then direct children
/// (overwriting, so the last typed sibling wins), then recursion into
/// nested children adopted only for fields this level has not set.
fn decode_node(
    mime_type: Option<&str>,
    body: Option<&MessageBody>,
    parts: Option<&[MessagePart]>,
    body_text: &mut Option<String>,
    body_html: &mut Option<String>,
) {
    if let (Some(mime), Some(data)) = (mime_type, body.and_then(|b| b.data.as_deref()))
        && let Some(decoded) = decode_base64url(data)
    {
        if mime.starts_with("text/plain") {
            *body_text = Some(decoded);
        } else if mime.starts_with("text/html") {
            *body_html = Some(decoded);
        }
    }

    let Some(parts) = parts else {
        return;
    };

    for part in parts {
        let mime = part.mime_type.as_deref().unwrap_or("");
        let data = part.body.as_ref().and_then(|b| b.data.as_deref());
        if mime.starts_with("text/plain") {
            if let Some(decoded) = data.and_then(decode_base64url) {
                *body_text = Some(decoded);
            }
        } else if mime.starts_with("text/html")
            && let Some(decoded) = data.and_then(decode_base64url)
        {
            *body_html = Some(decoded);
        }

        if part.parts.is_some() {
            let mut nested_text = None;
            let mut nested_html = None;
            decode_node(
                part.mime_type.as_deref(),
                part.body.as_ref(),
                part.parts.as_deref(),
                &mut nested_text,
                &mut nested_html,
            );
            if body_text.is_none() {
                *body_text = nested_text;
            }
            if body_html.is_none() {
                *body_html = nested_html;
            }
        }
    }
}

/// Decode a base64url string into UTF-8 text
///
/// The provider emits unpadded base64url; trailing padding is tolerated.
/// Returns `None` on any decode failure.
fn decode_base64url(data: &str) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(data.trim_end_matches('=')).ok()?;
    String::from_utf8(bytes).ok()
}

/// Look up a header value by name
///
/// Case-insensitive exact match; headers may contain duplicates and the
/// first match wins.
pub fn extract_header<'a>(headers: &'a [Header], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.as_str())
}
