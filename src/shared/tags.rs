//! Tag normalization and persistence format.
//!
//! Tags arrive either as a comma-separated string or as a JSON list and are
//! normalized to an ordered, duplicate-free list of lowercase labels. A record
//! stores them as one comma-joined column and splits them again on read.

use serde::Deserialize;
use serde_json::Value;

use crate::shared::constants::TAG_SEPARATOR;

/// Tag payload as accepted over the wire
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TagInput {
    Text(String),
    List(Vec<Value>),
    Other(Value),
}

impl From<&str> for TagInput {
    fn from(value: &str) -> Self {
        TagInput::Text(value.to_string())
    }
}

impl From<Vec<String>> for TagInput {
    fn from(values: Vec<String>) -> Self {
        TagInput::List(values.into_iter().map(Value::String).collect())
    }
}

/// Normalize any tag payload. Absent or unsupported shapes yield an empty list.
pub fn normalize(input: Option<&TagInput>) -> Vec<String> {
    match input {
        Some(TagInput::Text(text)) => normalize_text(text),
        Some(TagInput::List(values)) => normalize_list(values.iter().filter_map(coerce_scalar)),
        Some(TagInput::Other(_)) | None => Vec::new(),
    }
}

/// Split a comma-separated string into normalized tags
pub fn normalize_text(text: &str) -> Vec<String> {
    normalize_list([text])
}

/// Split every entry on the separator, then trim, lowercase and drop empty
/// pieces, keeping first-occurrence order. A separator can never survive
/// inside a tag, so the stored form always splits back to the same list.
pub fn normalize_list<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut pieces = Vec::new();
    for value in values {
        pieces.extend(
            value
                .as_ref()
                .split(TAG_SEPARATOR)
                .map(|piece| piece.trim().to_lowercase())
                .filter(|piece| !piece.is_empty()),
        );
    }
    dedup(pieces)
}

/// Persisted form: duplicates removed, joined with commas
pub fn serialize(tags: &[String]) -> String {
    dedup(tags.iter().cloned()).join(&TAG_SEPARATOR.to_string())
}

/// Inverse of [`serialize`], applied when a record is read back out
pub fn split(stored: &str) -> Vec<String> {
    stored
        .split(TAG_SEPARATOR)
        .filter(|piece| !piece.is_empty())
        .map(str::to_string)
        .collect()
}

fn dedup<I: IntoIterator<Item = String>>(values: I) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for value in values {
        if !out.contains(&value) {
            out.push(value);
        }
    }
    out
}

/// String form of a scalar list element; nested arrays, objects and nulls are skipped
fn coerce_scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
