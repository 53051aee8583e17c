//! Field-name mapping for structured payloads.
//!
//! Monitoring tools disagree on field names (`event_type` vs `alert_type`,
//! `body` vs `message`, ...). [`FIELD_MAP`] lists, per canonical field, the
//! payload keys consulted in order; the first present, non-empty value wins.
//! Keys that are not consumed end up in [`NormalizedAlert::extra`].

use chrono::DateTime;
use serde_json::{Map, Value};

use crate::types::{DEFAULT_ALERT_TYPE, DEFAULT_TITLE, NormalizedAlert};

/// Canonical alert fields a payload key can map to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalField {
    /// Alert type.
    AlertType,
    /// Title.
    Title,
    /// Body text.
    Message,
    /// Organization name.
    Org,
    /// Organization id.
    OrgId,
    /// Sender's id.
    SourceId,
    /// Trigger time.
    Timestamp,
    /// Tag list.
    Tags,
    /// Host name.
    Hostname,
    /// Priority hint.
    PriorityHint,
    /// Metric name.
    MetricName,
    /// Metric value.
    MetricValue,
    /// Metric unit.
    MetricUnit,
    /// Metric threshold.
    MetricThreshold,
    /// Metric condition.
    MetricCondition,
    /// Link.
    Url,
}

/// Payload keys per canonical field, in lookup order.
pub const FIELD_MAP: &[(CanonicalField, &[&str])] = &[
    (CanonicalField::AlertType, &["event_type", "alert_type", "alertType"]),
    (CanonicalField::Title, &["title", "event_title"]),
    (CanonicalField::Message, &["body", "message", "event_msg", "text"]),
    (CanonicalField::Org, &["org", "org_name"]),
    (CanonicalField::OrgId, &["org_id"]),
    (CanonicalField::SourceId, &["id", "source_id", "alert_id"]),
    (CanonicalField::Timestamp, &["date", "timestamp", "last_updated"]),
    (CanonicalField::Tags, &["tags"]),
    (CanonicalField::Hostname, &["hostname", "host"]),
    (CanonicalField::PriorityHint, &["priority"]),
    (CanonicalField::MetricName, &["metric", "metric_name", "metric_namespace"]),
    (CanonicalField::MetricValue, &["value", "metric_value"]),
    (CanonicalField::MetricUnit, &["unit"]),
    (CanonicalField::MetricThreshold, &["threshold"]),
    (CanonicalField::MetricCondition, &["condition"]),
    (CanonicalField::Url, &["url", "link"]),
];

/// Timestamps above this are taken to be milliseconds.
const MILLIS_CUTOFF: i64 = 100_000_000_000;

/// Maps a JSON object onto the canonical alert shape.
#[must_use]
pub fn normalize_object(mut payload: Map<String, Value>) -> NormalizedAlert {
    let mut alert = NormalizedAlert::new(DEFAULT_ALERT_TYPE);

    for (field, keys) in FIELD_MAP {
        let Some((key, value)) = take_first(&payload, keys, *field) else {
            continue;
        };
        payload.remove(&key);
        apply(&mut alert, *field, value);
    }

    if alert.title.is_none() && alert.message.is_none() {
        alert.title = Some(DEFAULT_TITLE.to_string());
    }

    alert.extra = payload;
    alert
}

/// Converted value for a canonical field.
enum Mapped {
    Text(String),
    Tags(Vec<String>),
    Timestamp(i64),
}

/// Finds the first key in `keys` whose value converts for `field`.
fn take_first(payload: &Map<String, Value>, keys: &[&str], field: CanonicalField) -> Option<(String, Mapped)> {
    keys.iter().find_map(|key| {
        let value = payload.get(*key)?;
        let mapped = match field {
            CanonicalField::Tags => tags(value).map(Mapped::Tags),
            CanonicalField::Timestamp => timestamp(value).map(Mapped::Timestamp),
            _ => text(value).map(Mapped::Text),
        }?;
        Some(((*key).to_string(), mapped))
    })
}

fn apply(alert: &mut NormalizedAlert, field: CanonicalField, value: Mapped) {
    match value {
        Mapped::Tags(tags) => alert.tags = tags,
        Mapped::Timestamp(ts) => alert.timestamp = Some(ts),
        Mapped::Text(text) => {
            let slot = match field {
                CanonicalField::AlertType => {
                    alert.alert_type = text;
                    return;
                }
                CanonicalField::Title => &mut alert.title,
                CanonicalField::Message => &mut alert.message,
                CanonicalField::Org => &mut alert.org,
                CanonicalField::OrgId => &mut alert.org_id,
                CanonicalField::SourceId => &mut alert.source_id,
                CanonicalField::Hostname => &mut alert.hostname,
                CanonicalField::PriorityHint => &mut alert.priority_hint,
                CanonicalField::MetricName => &mut alert.metric.name,
                CanonicalField::MetricValue => &mut alert.metric.value,
                CanonicalField::MetricUnit => &mut alert.metric.unit,
                CanonicalField::MetricThreshold => &mut alert.metric.threshold,
                CanonicalField::MetricCondition => &mut alert.metric.condition,
                CanonicalField::Url => &mut alert.url,
                CanonicalField::Tags | CanonicalField::Timestamp => return,
            };
            *slot = Some(text);
        }
    }
}

/// Textual rendering of a scalar; empty strings count as absent.
fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Tags from an array or a comma-separated string.
fn tags(value: &Value) -> Option<Vec<String>> {
    let tags: Vec<String> = match value {
        Value::Array(items) => items.iter().filter_map(text).collect(),
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect(),
        _ => return None,
    };
    (!tags.is_empty()).then_some(tags)
}

/// Seconds since the epoch from a number, numeric string or RFC 3339 string.
fn timestamp(value: &Value) -> Option<i64> {
    let raw = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?,
        Value::String(s) => {
            let s = s.trim();
            if let Ok(n) = s.parse::<i64>() {
                n
            } else if let Ok(f) = s.parse::<f64>() {
                f as i64
            } else {
                return DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.timestamp());
            }
        }
        _ => return None,
    };

    Some(if raw.abs() > MILLIS_CUTOFF { raw / 1000 } else { raw })
}
