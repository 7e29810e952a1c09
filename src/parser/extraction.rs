use crate::types::{EventRecord, ExtractionFailure};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::warn;

static THINK_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<think>.*?</think>").expect("think regex"));
static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)\s*```").expect("fence regex"));

/// Strips reasoning blocks and Markdown fences, leaving the JSON payload.
pub fn clean_model_output(raw: &str) -> String {
    let without_reasoning = THINK_BLOCK.replace_all(raw, "");
    let trimmed = without_reasoning.trim();

    if let Some(inner) = CODE_FENCE.captures(trimmed).and_then(|c| c.get(1)) {
        return inner.as_str().trim().to_string();
    }

    // Prose on either side of the payload
    let start = trimmed.find(['{', '[']);
    let end = trimmed.rfind(['}', ']']);
    match (start, end) {
        (Some(start), Some(end)) if start < end => trimmed[start..=end].to_string(),
        _ => trimmed.to_string(),
    }
}

/// Turns one extraction result into a validated record for `url`.
///
/// A JSON array yields its first element. `event_link` always becomes
/// `url`, whatever the model returned.
pub fn parse_extraction(raw: &str, url: &str) -> Result<EventRecord, ExtractionFailure> {
    let value: Value = serde_json::from_str(raw.trim())
        .map_err(|e| ExtractionFailure::MalformedJson(e.to_string()))?;

    let mut fields = match value {
        Value::Array(items) => {
            if items.len() > 1 {
                warn!(
                    "⚠️ Extraction for {} returned {} objects, using the first",
                    url,
                    items.len()
                );
            }
            match items.into_iter().next() {
                None => return Err(ExtractionFailure::EmptyList),
                Some(Value::Object(map)) => map,
                Some(other) => return Err(ExtractionFailure::NotAnObject(kind_of(&other))),
            }
        }
        Value::Object(map) => map,
        other => return Err(ExtractionFailure::NotAnObject(kind_of(&other))),
    };

    fields.insert("event_link".to_string(), Value::String(url.to_string()));
    EventRecord::from_fields(&fields).map_err(ExtractionFailure::Incomplete)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
