//! Tolerant parser for JSON-shaped model replies.
//!
//! Models asked for "JSON only" still wrap it in code fences, prepend a
//! sentence, or quote the key names. [`parse_structured_reply`] walks a
//! fixed fallback order and reports which step produced the summary:
//!
//! 1. Extract a JSON candidate: the body of a ```` ```json ```` (or bare
//!    ```` ``` ````) fence, else the span from the first `{` to the last `}`,
//!    else the whole text.
//! 2. Parse it as a JSON object and read the summary key
//!    ([`SummarySource::PrimaryKey`]).
//! 3. Read the same key wrapped in quotes, e.g. `'resumen'`
//!    ([`SummarySource::QuotedKey`]).
//! 4. Use the raw reply text verbatim ([`SummarySource::RawText`]).
//!
//! The list key gets the same quoted-key fallback.

use serde_json::{Map, Value};

/// Which fallback step produced the summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummarySource {
    PrimaryKey,
    QuotedKey,
    RawText,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredReply {
    pub summary: String,
    pub source: SummarySource,
    /// String entries of the list key, when the reply parsed.
    pub items: Vec<String>,
}

impl StructuredReply {
    fn raw(raw: &str) -> Self {
        Self {
            summary: raw.to_string(),
            source: SummarySource::RawText,
            items: Vec::new(),
        }
    }
}

/// Parse a model reply that should contain `{summary_key: str, list_key: [str]}`.
pub fn parse_structured_reply(raw: &str, summary_key: &str, list_key: &str) -> StructuredReply {
    let Some(object) = extract_object(raw) else {
        return StructuredReply::raw(raw);
    };

    let mut items = read_list(&object, list_key);
    if items.is_empty() {
        items = read_list(&object, &format!("'{}'", list_key));
    }

    if let Some(summary) = read_string(&object, summary_key) {
        return StructuredReply {
            summary,
            source: SummarySource::PrimaryKey,
            items,
        };
    }

    let quoted = [format!("'{}'", summary_key), format!("\"{}\"", summary_key)];
    for key in &quoted {
        if let Some(summary) = read_string(&object, key) {
            return StructuredReply {
                summary,
                source: SummarySource::QuotedKey,
                items,
            };
        }
    }

    StructuredReply::raw(raw)
}

/// Body of the first code fence, preferring a `json`-tagged one.
pub fn strip_code_fence(text: &str) -> Option<&str> {
    let (start, tag_len) = match text.find("```json") {
        Some(i) => (i, "```json".len()),
        None => (text.find("```")?, "```".len()),
    };
    let body = &text[start + tag_len..];
    let end = body.find("```").unwrap_or(body.len());
    Some(body[..end].trim())
}

/// Span from the first `{` to the last `}`.
pub fn brace_block(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn extract_object(raw: &str) -> Option<Map<String, Value>> {
    let mut candidates = Vec::with_capacity(3);
    if let Some(fenced) = strip_code_fence(raw) {
        candidates.push(fenced);
        if let Some(inner) = brace_block(fenced) {
            candidates.push(inner);
        }
    }
    if let Some(block) = brace_block(raw) {
        candidates.push(block);
    }
    candidates.push(raw.trim());

    candidates
        .into_iter()
        .find_map(|c| match serde_json::from_str::<Value>(c) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        })
}

fn read_string(object: &Map<String, Value>, key: &str) -> Option<String> {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn read_list(object: &Map<String, Value>, key: &str) -> Vec<String> {
    object
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
