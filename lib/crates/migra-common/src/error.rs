//! Error bodies returned by OpenStack services.
//!
//! Each service wraps its message differently: Keystone uses
//! `{"error":{"message":..}}`, Neutron `{"NeutronError":{"message":..}}`,
//! Nova `{"itemNotFound":{"message":..}}` and similar, and Glance often
//! answers with plain text or HTML.

use serde_json::Value;

const MAX_TEXT_LEN: usize = 200;

/// Extract a human-readable message from an error response body.
///
/// Falls back to the trimmed raw body, truncated, when no JSON message is
/// found. Returns an empty string for an empty body.
#[must_use]
pub fn extract_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body)
        && let Some(message) = find_message(&value)
    {
        return message;
    }
    let trimmed = body.trim();
    match trimmed.char_indices().nth(MAX_TEXT_LEN) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

fn find_message(value: &Value) -> Option<String> {
    let object = value.as_object()?;
    if let Some(Value::String(message)) = object.get("message") {
        return Some(message.clone());
    }
    if let Some(Value::String(message)) = object.get("detail") {
        return Some(message.clone());
    }
    object
        .values()
        .filter_map(|inner| inner.get("message").and_then(Value::as_str))
        .map(str::to_string)
        .next()
}
