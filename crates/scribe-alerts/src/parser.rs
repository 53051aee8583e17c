//! Webhook payload parsing.
//!
//! [`parse_payload`] classifies a raw body; [`normalize`] turns the
//! classification into a [`NormalizedAlert`]. Free-text deliveries go through
//! the marker heuristics in [`parse_text`].

use serde_json::{Map, Value};

use crate::error::{AlertError, Result};
use crate::normalize::normalize_object;
use crate::types::NormalizedAlert;

const TRIGGERED_MARKER: &str = "[Triggered]";
const RECOVERY_MARKER: &str = "[Recovery]";

/// Classification of a raw webhook body.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedPayload {
    /// A JSON object.
    Json(Map<String, Value>),
    /// Free text (also a JSON string literal).
    Text(String),
    /// Nothing usable; carries the reason.
    Invalid(String),
}

/// Classifies a raw body as JSON, text or invalid.
#[must_use]
pub fn parse_payload(body: &[u8]) -> ParsedPayload {
    let Ok(text) = std::str::from_utf8(body) else {
        return ParsedPayload::Invalid("body is neither JSON nor text".to_string());
    };

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return ParsedPayload::Invalid("body is empty".to_string());
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) => ParsedPayload::Json(map),
        Ok(Value::String(s)) if !s.trim().is_empty() => ParsedPayload::Text(s),
        Ok(Value::String(_)) => ParsedPayload::Invalid("body is empty".to_string()),
        Ok(other) => ParsedPayload::Invalid(format!(
            "structured payload has no alert type ({})",
            json_kind(&other)
        )),
        Err(_) => ParsedPayload::Text(text.to_string()),
    }
}

/// Converts a parsed payload into a normalized alert.
///
/// # Errors
///
/// Returns `AlertError::InvalidPayload` for [`ParsedPayload::Invalid`].
pub fn normalize(parsed: ParsedPayload) -> Result<NormalizedAlert> {
    match parsed {
        ParsedPayload::Json(map) => Ok(normalize_object(map)),
        ParsedPayload::Text(text) => Ok(parse_text(&text)),
        ParsedPayload::Invalid(reason) => Err(AlertError::invalid(reason)),
    }
}

/// Parses and normalizes a raw body in one step.
///
/// # Errors
///
/// Returns `AlertError::InvalidPayload` if the body is unusable.
pub fn normalize_payload(body: &[u8]) -> Result<NormalizedAlert> {
    normalize(parse_payload(body))
}

/// Builds an alert from a free-text notification.
///
/// Markers decide the type: `[Triggered]` or `Anomaly Detected` mean
/// `error`, `Normalized` or `Recovery` mean `recovery`, anything else is
/// `info`. The first line, minus markers, is the title.
#[must_use]
pub fn parse_text(text: &str) -> NormalizedAlert {
    let alert_type = if text.contains(TRIGGERED_MARKER) || text.contains("Anomaly Detected") {
        "error"
    } else if text.contains("Normalized") || text.contains("Recovery") {
        "recovery"
    } else {
        "info"
    };

    let first_line = text.trim_start().lines().next().unwrap_or_default();
    let title = first_line
        .replace(TRIGGERED_MARKER, "")
        .replace(RECOVERY_MARKER, "")
        .trim()
        .to_string();

    let priority_hint = if text.to_lowercase().contains("anomaly") {
        "high"
    } else {
        "medium"
    };

    let mut alert = NormalizedAlert::new(alert_type)
        .with_message(text.trim())
        .with_priority_hint(priority_hint);
    if !title.is_empty() {
        alert.title = Some(title);
    }
    alert
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
