//! Turns raw model text into typed results.
//!
//! Model output is untrusted: JSON answers are syntax-checked and then
//! validated against the expected shape. The reading functions never fail;
//! an unreadable answer becomes [`Identification::Failed`] or an empty list,
//! which callers must treat as "unknown", not "confirmed empty".

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::models::{DetectedItem, Identification};

use super::error::ServiceError;

pub const PARSE_FAILED: &str = "parse failed";

/// Trims the text and drops every Markdown fence marker wherever it appears.
/// An opening fence also loses its language tag when the tag runs to the end
/// of the line.
pub fn strip_code_fences(raw: &str) -> String {
    let mut cleaned = String::with_capacity(raw.len());
    let mut rest = raw.trim();
    let mut opening = true;

    while let Some(pos) = rest.find("```") {
        cleaned.push_str(&rest[..pos]);
        rest = &rest[pos + 3..];

        if opening {
            let tag_len = rest
                .find(|c: char| !c.is_ascii_alphanumeric())
                .unwrap_or(rest.len());
            let after_tag = &rest[tag_len..];
            if after_tag.is_empty() || after_tag.starts_with(['\n', '\r']) {
                rest = after_tag;
            }
        }
        opening = !opening;
    }
    cleaned.push_str(rest);

    cleaned.trim().to_string()
}

/// Strict JSON parse of fence-stripped model text.
pub fn parse_json<T: DeserializeOwned>(raw: &str) -> Result<T, ServiceError> {
    let cleaned = strip_code_fences(raw);
    serde_json::from_str(&cleaned).map_err(|e| ServiceError::MalformedResponse(e.to_string()))
}

#[derive(Debug, Deserialize)]
struct RawIdentification {
    #[serde(default)]
    is_food: bool,
    #[serde(default)]
    items: Vec<Value>,
}

pub fn identification(raw: &str) -> Identification {
    let parsed: RawIdentification = match parse_json(raw) {
        Ok(parsed) => parsed,
        Err(e) => {
            log::warn!("⚠️ Could not read identification response: {}", e);
            log::debug!("📄 Raw identification response: {}", raw);
            return Identification::Failed {
                error: PARSE_FAILED.to_string(),
            };
        }
    };

    if !parsed.is_food {
        return Identification::NoFood;
    }

    Identification::Food {
        items: validated::<DetectedItem>(parsed.items, "detected item"),
    }
}

/// Reads a JSON list answer, keeping only the elements that match `T`.
pub fn record_list<T: DeserializeOwned>(raw: &str) -> Vec<T> {
    match parse_json::<Value>(raw) {
        Ok(Value::Array(elements)) => validated(elements, std::any::type_name::<T>()),
        Ok(other) => {
            log::warn!(
                "⚠️ Expected a JSON list from the model, got: {}",
                truncate(&other.to_string(), 200)
            );
            Vec::new()
        }
        Err(e) => {
            log::warn!("⚠️ Could not read list response: {}", e);
            log::debug!("📄 Raw list response: {}", raw);
            Vec::new()
        }
    }
}

/// Free-text Markdown report, fence markers removed like any other answer.
pub fn report(raw: &str) -> String {
    strip_code_fences(raw)
}

/// Free-text Markdown report that keeps the code blocks inside it. Only a
/// fence wrapping the whole report is removed.
pub fn report_keeping_code_blocks(raw: &str) -> String {
    let trimmed = raw.trim();

    if let Some(inner) = trimmed
        .strip_prefix("```")
        .and_then(|body| body.strip_suffix("```"))
    {
        // The rest of the opening line is the language tag
        let body = match inner.split_once('\n') {
            Some((tag, body)) if !tag.trim().contains(' ') => body,
            _ => inner,
        };
        if !body.contains("```") {
            return body.trim().to_string();
        }
    }

    trimmed.to_string()
}

fn validated<T: DeserializeOwned>(elements: Vec<Value>, what: &str) -> Vec<T> {
    elements
        .into_iter()
        .filter_map(|element| match serde_json::from_value::<T>(element.clone()) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!(
                    "⚠️ Dropping invalid {} from model output ({}): {}",
                    what,
                    e,
                    truncate(&element.to_string(), 200)
                );
                None
            }
        })
        .collect()
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
