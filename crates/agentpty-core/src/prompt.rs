//! Structured result extraction for one-shot prompts
//!
//! `--print` output is usually a JSON object, sometimes preceded by log
//! lines. The answer is either its `result` string or the text parts of
//! `message.content`.

use crate::error::{Error, Result};
use agentpty_term::strip_ansi_escapes;
use serde_json::{Map, Value};

/// Clean raw `--print` output and pull the answer out of it.
///
/// Falls back to the cleaned text when no structured answer is present.
#[must_use]
pub fn extract_reply(raw: &str) -> String {
    let cleaned = strip_ansi_escapes(raw).trim().to_string();
    match structured_result(&cleaned) {
        Ok(answer) => answer,
        Err(e) => {
            tracing::debug!(error = %e, "Using plain agent output");
            cleaned
        }
    }
}

/// The answer carried by a JSON result object in `cleaned`.
pub fn structured_result(cleaned: &str) -> Result<String> {
    let object = find_json_object(cleaned)
        .ok_or_else(|| Error::ProtocolMismatch(format!("no JSON object found in output: {cleaned}")))?;

    if let Some(result) = object.get("result").and_then(Value::as_str) {
        return Ok(result.trim().to_string());
    }

    let text: String = object
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter(|part| part.get("type").and_then(Value::as_str) == Some("text"))
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();

    if text.is_empty() {
        return Err(Error::ProtocolMismatch(
            "JSON object has neither `result` nor text content".to_string(),
        ));
    }
    Ok(text.trim().to_string())
}

/// The whole text as a JSON object, else the last line that parses as one.
fn find_json_object(cleaned: &str) -> Option<Map<String, Value>> {
    if cleaned.starts_with('{') {
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(cleaned) {
            return Some(map);
        }
    }

    cleaned
        .lines()
        .rev()
        .map(str::trim)
        .filter(|line| line.starts_with('{') && line.ends_with('}'))
        .find_map(|line| match serde_json::from_str::<Value>(line) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        })
}
