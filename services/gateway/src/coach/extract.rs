//! services/gateway/src/coach/extract.rs
//!
//! JSON recovery for model output. Models are told to answer with strict
//! JSON but regularly wrap it in markdown fences or prose; this module
//! tries the cheap interpretations in order and gives up explicitly
//! rather than guessing further.

use regex::Regex;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
#[error("provider did not return valid JSON")]
pub struct ExtractError;

/// Extracts a JSON value from raw model output. Strategies, in order:
/// the whole text, the first fenced code block, the substring between
/// the first `{` and the last `}`.
pub fn extract_json(raw: &str) -> Result<Value, ExtractError> {
    let trimmed = raw.trim();

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Ok(value);
    }

    if let Some(block) = fenced_block(trimmed) {
        if let Ok(value) = serde_json::from_str::<Value>(block.trim()) {
            return Ok(value);
        }
    }

    if let Some(slice) = brace_bounded(trimmed) {
        if let Ok(value) = serde_json::from_str::<Value>(slice) {
            return Ok(value);
        }
    }

    Err(ExtractError)
}

/// The contents of the first ``` fence, tolerating an optional language tag.
fn fenced_block(text: &str) -> Option<&str> {
    let fence = Regex::new(r"```[a-zA-Z]*\r?\n?([\s\S]*?)```").unwrap();
    fence
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

fn brace_bounded(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}
