use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use std::time::Duration;

lazy_static! {
    /// Regex for trailing commas before } or ]
    static ref TRAILING_COMMA_RE: Regex = Regex::new(r",(\s*[}\]])").unwrap();

    /// Regex for JavaScript string concatenation ("str1" + "str2")
    static ref JS_STRING_CONCAT_RE: Regex = Regex::new(r#""\s*\+\s*""#).unwrap();
}

/// Timeout for JSON repair operations
const JSON_REPAIR_TIMEOUT: Duration = Duration::from_secs(5);

/// Locate the outermost `[...]` span in a model response.
///
/// Models often wrap the array in prose or a code fence, so this takes
/// everything from the first `[` to the last `]`.
pub fn extract_json_array_string(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;

    if start < end {
        Some(&text[start..=end])
    } else {
        None
    }
}

/// Fix trailing commas in JSON (common LLM mistake)
///
/// Example: `["a", "b",]` -> `["a", "b"]`
pub fn fix_trailing_commas(json_str: &str) -> String {
    TRAILING_COMMA_RE.replace_all(json_str, "$1").to_string()
}

/// Fix JavaScript string concatenation which is invalid in JSON
///
/// LLMs sometimes output: `"str1" + "str2"` which is invalid JSON.
/// This merges them into: `"str1str2"`
pub fn fix_js_string_concatenation(json_str: &str) -> String {
    JS_STRING_CONCAT_RE.replace_all(json_str, "").to_string()
}

/// Apply quick fixes to malformed JSON
fn apply_quick_fixes(json_str: &str) -> String {
    let fixed = fix_js_string_concatenation(json_str);
    fix_trailing_commas(&fixed)
}

/// Attempt to repair JSON using llm_json crate with timeout
///
/// Returns the repaired JSON string if successful, or None if repair fails or times out
fn repair_json_with_timeout(json_str: &str) -> Option<String> {
    let start = std::time::Instant::now();

    let options = llm_json::RepairOptions::default();
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        llm_json::repair_json(json_str, &options)
    }));

    if start.elapsed() > JSON_REPAIR_TIMEOUT {
        tracing::warn!("JSON repair took longer than timeout");
        return None;
    }

    match result {
        Ok(Ok(repaired)) => Some(repaired),
        Ok(Err(e)) => {
            tracing::debug!("JSON repair failed: {:?}", e);
            None
        }
        Err(_) => {
            tracing::warn!("JSON repair panicked");
            None
        }
    }
}

fn parse_array(json_str: &str) -> Option<Vec<Value>> {
    match serde_json::from_str::<Value>(json_str) {
        Ok(Value::Array(items)) => Some(items),
        _ => None,
    }
}

/// Parse the JSON array embedded in a model response.
///
/// Parsing pipeline:
/// 1. Extract the `[...]` span
/// 2. Try direct parse (fast path)
/// 3. Apply quick fixes (trailing commas, string concat) and retry
/// 4. Apply llm_json::repair_json() and retry
///
/// Never fails: anything that does not end up as a JSON array yields an
/// empty list, so format drift in the upstream model degrades to "no
/// suggestion" instead of an error.
pub fn parse_json_array(text: &str) -> Vec<Value> {
    let Some(json_str) = extract_json_array_string(text) else {
        tracing::debug!("No JSON array found in model response");
        return Vec::new();
    };

    if let Some(items) = parse_array(json_str) {
        return items;
    }

    if let Some(items) = parse_array(&apply_quick_fixes(json_str)) {
        tracing::debug!("JSON array parsed after quick fixes");
        return items;
    }

    if let Some(items) = repair_json_with_timeout(json_str).and_then(|r| parse_array(&r)) {
        tracing::debug!("JSON array parsed after llm_json repair");
        return items;
    }

    tracing::warn!(
        "Failed to parse JSON array from model response: {}",
        json_str.chars().take(200).collect::<String>()
    );
    Vec::new()
}
