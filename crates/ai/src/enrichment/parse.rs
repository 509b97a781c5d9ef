//! Parsing of raw completion text into typed sub-task outputs.
//!
//! Any parse failure is an [`AiError::MalformedOutput`], which the retry
//! engine treats as a transient failure.

use serde::de::DeserializeOwned;

use crate::error::AiError;

/// Strip a surrounding Markdown code fence (```json ... ```), if any.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Non-empty prose.
pub fn text(raw: &str) -> Result<String, AiError> {
    let text = strip_code_fence(raw);
    if text.is_empty() {
        return Err(AiError::malformed("expected text, got an empty completion"));
    }
    Ok(text.to_string())
}

/// A JSON document of type `T`.
pub fn json<T: DeserializeOwned>(raw: &str) -> Result<T, AiError> {
    serde_json::from_str(strip_code_fence(raw))
        .map_err(|e| AiError::malformed(format!("invalid JSON: {e}")))
}

/// A JSON array of strings; blank entries are dropped.
pub fn list(raw: &str) -> Result<Vec<String>, AiError> {
    let items: Vec<String> = json(raw)?;
    Ok(items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect())
}
