//! Core types for alert ingest.
//!
//! - [`Priority`]: urgency derived from an alert's hint and type
//! - [`NormalizedAlert`]: the canonical shape every payload is mapped into
//! - [`PendingAlert`]: a stored alert waiting for (or done with) rendering
//! - [`FingerprintClaim`]: the dedup index record
//! - [`IngestOutcome`]: the result of one webhook delivery

use chrono::{DateTime, Utc};
use scribe_store::Record;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Title used when a payload carries neither a title nor a message.
pub const DEFAULT_TITLE: &str = "Datadog Alert";

/// Alert type used when a structured payload does not name one.
pub const DEFAULT_ALERT_TYPE: &str = "info";

/// How urgent an alert (and the document rendered from it) is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Needs attention now.
    High,
    /// Should be looked at.
    #[default]
    Medium,
    /// Informational.
    Low,
}

impl Priority {
    /// Returns the priority as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    /// Derives a priority from an explicit hint and the alert type.
    ///
    /// The hint wins when it mentions a known level; otherwise the alert type
    /// decides; otherwise the result is [`Priority::Medium`]. Matching is a
    /// case-insensitive substring test.
    #[must_use]
    pub fn derive(hint: Option<&str>, alert_type: &str) -> Self {
        if let Some(hint) = hint {
            let hint = hint.to_lowercase();
            if ["critical", "high", "error"].iter().any(|s| hint.contains(s)) {
                return Self::High;
            }
            if ["warning", "medium", "warn"].iter().any(|s| hint.contains(s)) {
                return Self::Medium;
            }
            if ["info", "low"].iter().any(|s| hint.contains(s)) {
                return Self::Low;
            }
        }

        let alert_type = alert_type.to_lowercase();
        if ["error", "critical"].iter().any(|s| alert_type.contains(s)) {
            Self::High
        } else {
            // "warning" and "anomaly" map here explicitly; everything else by default.
            Self::Medium
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle of a stored alert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    /// Waiting for an operator to pick a template.
    #[default]
    Pending,
    /// A document has been generated from it.
    Processed,
}

impl AlertStatus {
    /// Returns the status as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processed => "processed",
        }
    }
}

impl std::fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Metric fields carried through to templates verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricFields {
    /// Metric name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Observed value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Unit of the value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Threshold that was crossed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<String>,
    /// Monitor condition text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

/// An alert in canonical form, independent of how it was delivered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedAlert {
    /// Alert type such as `error`, `warning`, `info` or `recovery`.
    pub alert_type: String,
    /// Alert title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Alert body text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Organization name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org: Option<String>,
    /// Organization id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,
    /// Id assigned by the sender.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    /// When the alert triggered, in seconds since the epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    /// Tags, usually `key:value`.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Reporting host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    /// Sender-supplied priority.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority_hint: Option<String>,
    /// Metric details.
    #[serde(default)]
    pub metric: MetricFields,
    /// Link back to the monitor or event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Payload fields that have no canonical slot.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl NormalizedAlert {
    /// Creates an alert with only a type set.
    #[must_use]
    pub fn new(alert_type: impl Into<String>) -> Self {
        Self {
            alert_type: alert_type.into(),
            title: None,
            message: None,
            org: None,
            org_id: None,
            source_id: None,
            timestamp: None,
            tags: Vec::new(),
            hostname: None,
            priority_hint: None,
            metric: MetricFields::default(),
            url: None,
            extra: Map::new(),
        }
    }

    /// Sets the title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Adds a tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Sets the trigger timestamp (seconds since the epoch).
    #[must_use]
    pub const fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Sets the priority hint.
    #[must_use]
    pub fn with_priority_hint(mut self, hint: impl Into<String>) -> Self {
        self.priority_hint = Some(hint.into());
        self
    }

    /// Returns the title, falling back to [`DEFAULT_TITLE`].
    #[must_use]
    pub fn title_or_default(&self) -> &str {
        self.title.as_deref().unwrap_or(DEFAULT_TITLE)
    }

    /// Derives this alert's priority.
    #[must_use]
    pub fn priority(&self) -> Priority {
        Priority::derive(self.priority_hint.as_deref(), &self.alert_type)
    }

    /// Returns the value of the first `key:value` tag whose key matches one of `keys`.
    ///
    /// Keys compare case-insensitively.
    #[must_use]
    pub fn tag_value(&self, keys: &[&str]) -> Option<&str> {
        self.tags.iter().find_map(|tag| {
            let (key, value) = tag.split_once(':')?;
            let key = key.trim();
            keys.iter()
                .any(|k| k.eq_ignore_ascii_case(key))
                .then(|| value.trim())
        })
    }

    /// An illustrative alert for previewing templates without a real delivery.
    #[must_use]
    pub fn sample() -> Self {
        let mut alert = Self::new("error")
            .with_title("[Triggered] High CPU usage on web-01")
            .with_message("CPU usage has been above 90% for the last 10 minutes.")
            .with_tag("env:prod")
            .with_tag("service:web")
            .with_tag("team:platform")
            .with_tag("region:us-east-1")
            .with_priority_hint("high");
        alert.org = Some("Example Org".to_string());
        alert.hostname = Some("web-01".to_string());
        alert.metric = MetricFields {
            name: Some("system.cpu.user".to_string()),
            value: Some("93.4".to_string()),
            unit: Some("%".to_string()),
            threshold: Some("90".to_string()),
            condition: Some("avg(last_10m) > 90".to_string()),
        };
        alert
    }
}

/// An ingested alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingAlert {
    /// Unique id.
    pub id: String,
    /// When the webhook delivered it.
    pub received_at: DateTime<Utc>,
    /// The normalized payload.
    pub alert: NormalizedAlert,
    /// Dedup fingerprint computed at ingest.
    pub fingerprint: String,
    /// Lifecycle status.
    pub status: AlertStatus,
    /// When a document was generated from it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,
    /// The generated document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
}

impl PendingAlert {
    /// Creates a pending record.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        alert: NormalizedAlert,
        fingerprint: impl Into<String>,
        received_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            received_at,
            alert,
            fingerprint: fingerprint.into(),
            status: AlertStatus::Pending,
            processed_at: None,
            document_id: None,
        }
    }

    /// Returns true while no document has been generated.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == AlertStatus::Pending
    }

    /// Marks the alert as processed into `document_id`.
    pub fn mark_processed(&mut self, document_id: impl Into<String>, at: DateTime<Utc>) {
        self.status = AlertStatus::Processed;
        self.processed_at = Some(at);
        self.document_id = Some(document_id.into());
    }
}

impl Record for PendingAlert {
    const KIND: &'static str = "alerts";

    fn id(&self) -> &str {
        &self.id
    }
}

/// Compact listing view of a stored alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingAlertSummary {
    /// Alert id.
    pub id: String,
    /// When it was received.
    pub received_at: DateTime<Utc>,
    /// Alert type.
    pub alert_type: String,
    /// Title (or the default title).
    pub title: String,
    /// Derived priority.
    pub priority: Priority,
    /// Lifecycle status.
    pub status: AlertStatus,
    /// Tags.
    pub tags: Vec<String>,
}

impl From<&PendingAlert> for PendingAlertSummary {
    fn from(p: &PendingAlert) -> Self {
        Self {
            id: p.id.clone(),
            received_at: p.received_at,
            alert_type: p.alert.alert_type.clone(),
            title: p.alert.title_or_default().to_string(),
            priority: p.alert.priority(),
            status: p.status,
            tags: p.alert.tags.clone(),
        }
    }
}

/// Dedup index record: a fingerprint currently owned by a pending alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FingerprintClaim {
    /// The fingerprint (also the record id).
    pub fingerprint: String,
    /// The alert that owns it.
    pub alert_id: String,
    /// Time bucket the fingerprint was computed in.
    pub bucket: i64,
    /// When the claim was made.
    pub claimed_at: DateTime<Utc>,
}

impl Record for FingerprintClaim {
    const KIND: &'static str = "claims";

    fn id(&self) -> &str {
        &self.fingerprint
    }
}

/// Result of one ingest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestOutcome {
    /// The new alert id, or the existing one for a duplicate.
    pub alert_id: String,
    /// True when the delivery collapsed into an existing pending alert.
    pub duplicate: bool,
    /// Dedup fingerprint of the delivery.
    pub fingerprint: String,
}
