//! Render contexts.
//!
//! [`build_context`] reorganizes a [`NormalizedAlert`] into the groups that
//! templates address (`alert.*`, `timing.*`, `metric.*`, `host.*`, `org.*`,
//! `raw.*`, `generated.*`). It does no I/O and is shared by rendering and
//! preview.

use chrono::{DateTime, TimeZone, Utc};
use scribe_alerts::NormalizedAlert;
use serde::Serialize;
use serde_json::Value;

/// Name stamped into `generated.by`.
pub const GENERATOR_NAME: &str = "Scribe";

/// Human-readable timestamp format.
pub const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Everything a template can reference.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderContext {
    /// Alert identity.
    pub alert: AlertGroup,
    /// When the alert fired.
    pub timing: TimingGroup,
    /// Metric details.
    pub metric: MetricGroup,
    /// Affected host and service.
    pub host: HostGroup,
    /// Owning organization.
    pub org: OrgGroup,
    /// The normalized alert, unmodified.
    pub raw: Value,
    /// Generation metadata.
    pub generated: GeneratedGroup,
}

/// Alert identity fields.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertGroup {
    /// Pending alert id, empty for previews of unsaved alerts.
    pub id: String,
    /// Alert type.
    #[serde(rename = "type")]
    pub alert_type: String,
    /// Title, defaulted when absent.
    pub title: String,
    /// Message body.
    pub message: String,
    /// Derived priority.
    pub priority: String,
    /// All tags as received.
    pub tags: Vec<String>,
    /// Sender-side alert id.
    pub source_id: String,
    /// Link back to the sender.
    pub url: String,
}

/// Trigger time in several renderings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingGroup {
    /// RFC 3339 timestamp.
    pub triggered_at: String,
    /// Unix seconds.
    pub triggered_at_unix: i64,
    /// `YYYY-MM-DD HH:MM:SS UTC`.
    pub formatted: String,
    /// `YYYY-MM-DD`.
    pub date: String,
    /// `HH:MM:SS`.
    pub time: String,
    /// "5 minutes ago" style.
    pub relative: String,
}

/// Metric details, empty strings when absent.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricGroup {
    /// Metric name.
    pub name: String,
    /// Observed value.
    pub value: String,
    /// Unit.
    pub unit: String,
    /// Threshold.
    pub threshold: String,
    /// Monitor condition.
    pub condition: String,
}

/// Host and service details drawn from the hostname and `key:value` tags.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostGroup {
    /// Hostname.
    pub hostname: String,
    /// `env:` or `environment:` tag.
    pub environment: String,
    /// `service:` tag.
    pub service: String,
    /// `team:` tag.
    pub team: String,
    /// `region:` tag.
    pub region: String,
}

/// Organization details.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgGroup {
    /// Organization name.
    pub name: String,
    /// Organization id.
    pub id: String,
}

/// When and by what the document was produced.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedGroup {
    /// RFC 3339 timestamp.
    pub at: String,
    /// `YYYY-MM-DD HH:MM:SS UTC`.
    pub formatted: String,
    /// `YYYY-MM-DD`.
    pub date: String,
    /// Generator name.
    pub by: String,
    /// Template used; filled in by the renderer.
    pub template_name: String,
}

/// Builds the render context for `alert` as of `now`.
#[must_use]
pub fn build_context(alert: &NormalizedAlert, alert_id: Option<&str>, now: DateTime<Utc>) -> RenderContext {
    let triggered = alert
        .timestamp
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
        .unwrap_or(now);

    RenderContext {
        alert: AlertGroup {
            id: alert_id.unwrap_or_default().to_string(),
            alert_type: alert.alert_type.clone(),
            title: alert.title_or_default().to_string(),
            message: text(alert.message.as_ref()),
            priority: alert.priority().as_str().to_string(),
            tags: alert.tags.clone(),
            source_id: text(alert.source_id.as_ref()),
            url: text(alert.url.as_ref()),
        },
        timing: TimingGroup {
            triggered_at: triggered.to_rfc3339(),
            triggered_at_unix: triggered.timestamp(),
            formatted: triggered.format(DISPLAY_FORMAT).to_string(),
            date: triggered.format("%Y-%m-%d").to_string(),
            time: triggered.format("%H:%M:%S").to_string(),
            relative: relative_time(triggered, now),
        },
        metric: MetricGroup {
            name: text(alert.metric.name.as_ref()),
            value: text(alert.metric.value.as_ref()),
            unit: text(alert.metric.unit.as_ref()),
            threshold: text(alert.metric.threshold.as_ref()),
            condition: text(alert.metric.condition.as_ref()),
        },
        host: HostGroup {
            hostname: text(alert.hostname.as_ref()),
            environment: tag(alert, &["env", "environment"]),
            service: tag(alert, &["service"]),
            team: tag(alert, &["team"]),
            region: tag(alert, &["region"]),
        },
        org: OrgGroup {
            name: text(alert.org.as_ref()),
            id: text(alert.org_id.as_ref()),
        },
        raw: serde_json::to_value(alert).unwrap_or(Value::Null),
        generated: GeneratedGroup {
            at: now.to_rfc3339(),
            formatted: now.format(DISPLAY_FORMAT).to_string(),
            date: now.format("%Y-%m-%d").to_string(),
            by: GENERATOR_NAME.to_string(),
            template_name: String::new(),
        },
    }
}

/// Describes how long before `now` the instant `then` was.
#[must_use]
pub fn relative_time(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = (now - then).num_minutes();
    if minutes < 1 {
        return "just now".to_string();
    }
    if minutes < 60 {
        return plural(minutes, "minute");
    }
    let hours = minutes / 60;
    if hours < 24 {
        return plural(hours, "hour");
    }
    plural(hours / 24, "day")
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {unit} ago")
    } else {
        format!("{n} {unit}s ago")
    }
}

fn text(value: Option<&String>) -> String {
    value.cloned().unwrap_or_default()
}

fn tag(alert: &NormalizedAlert, keys: &[&str]) -> String {
    alert.tag_value(keys).unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).single().unwrap()
    }

    mod host_tests {
        use super::*;

        #[test]
        fn host_fields_from_tags() {
            let alert = NormalizedAlert::new("error")
                .with_tag("env:prod")
                .with_tag("service:api");
            let ctx = build_context(&alert, None, now());

            assert_eq!(ctx.host.environment, "prod");
            assert_eq!(ctx.host.service, "api");
            assert_eq!(ctx.host.team, "");
        }

        #[test]
        fn no_tags_means_empty_host_fields() {
            let ctx = build_context(&NormalizedAlert::new("info"), None, now());

            assert_eq!(ctx.host.hostname, "");
            assert_eq!(ctx.host.environment, "");
            assert_eq!(ctx.host.service, "");
            assert_eq!(ctx.host.team, "");
            assert_eq!(ctx.host.region, "");
        }

        #[test]
        fn tag_keys_case_insensitive_and_first_wins() {
            let alert = NormalizedAlert::new("info")
                .with_tag("Environment:staging")
                .with_tag("env:prod")
                .with_tag("REGION:eu-west-1");
            let ctx = build_context(&alert, None, now());

            assert_eq!(ctx.host.environment, "staging");
            assert_eq!(ctx.host.region, "eu-west-1");
        }
    }

    mod timing_tests {
        use super::*;
        use test_case::test_case;

        #[test]
        fn uses_alert_timestamp() {
            let triggered = now() - Duration::minutes(5);
            let alert = NormalizedAlert::new("info").with_timestamp(triggered.timestamp());
            let ctx = build_context(&alert, Some("a1"), now());

            assert_eq!(ctx.timing.triggered_at_unix, triggered.timestamp());
            assert_eq!(ctx.timing.formatted, "2024-03-01 11:55:00 UTC");
            assert_eq!(ctx.timing.date, "2024-03-01");
            assert_eq!(ctx.timing.time, "11:55:00");
            assert_eq!(ctx.timing.relative, "5 minutes ago");
            assert_eq!(ctx.alert.id, "a1");
        }

        #[test]
        fn falls_back_to_now() {
            let ctx = build_context(&NormalizedAlert::new("info"), None, now());
            assert_eq!(ctx.timing.triggered_at_unix, now().timestamp());
            assert_eq!(ctx.timing.relative, "just now");
        }

        #[test_case(0, "just now" ; "zero")]
        #[test_case(-600, "just now" ; "future")]
        #[test_case(59, "just now" ; "under a minute")]
        #[test_case(60, "1 minute ago" ; "one minute")]
        #[test_case(59 * 60, "59 minutes ago" ; "minutes")]
        #[test_case(3600, "1 hour ago" ; "one hour")]
        #[test_case(5 * 3600, "5 hours ago" ; "hours")]
        #[test_case(24 * 3600, "1 day ago" ; "one day")]
        #[test_case(3 * 24 * 3600, "3 days ago" ; "days")]
        fn relative(seconds_ago: i64, expected: &str) {
            let then = now() - Duration::seconds(seconds_ago);
            assert_eq!(relative_time(then, now()), expected);
        }
    }

    mod group_tests {
        use super::*;

        #[test]
        fn defaults_are_empty_strings() {
            let ctx = build_context(&NormalizedAlert::new("info"), None, now());

            assert_eq!(ctx.alert.title, "Datadog Alert");
            assert_eq!(ctx.alert.message, "");
            assert_eq!(ctx.alert.priority, "medium");
            assert_eq!(ctx.metric.name, "");
            assert_eq!(ctx.org.name, "");
            assert_eq!(ctx.generated.by, GENERATOR_NAME);
            assert_eq!(ctx.generated.template_name, "");
        }

        #[test]
        fn sample_alert_fills_every_group() {
            let alert = NormalizedAlert::sample();
            let ctx = build_context(&alert, None, now());

            assert_eq!(ctx.alert.priority, "high");
            assert_eq!(ctx.metric.value, "93.4");
            assert_eq!(ctx.host.hostname, "web-01");
            assert_eq!(ctx.org.name, "Example Org");
            assert_eq!(ctx.raw["alertType"], "error");
        }

        #[test]
        fn serializes_with_template_names() {
            let ctx = build_context(&NormalizedAlert::new("warning"), None, now());
            let value = serde_json::to_value(&ctx).unwrap();

            assert_eq!(value["alert"]["type"], "warning");
            assert!(value["alert"].get("sourceId").is_some());
            assert!(value["timing"].get("triggeredAtUnix").is_some());
            assert!(value["generated"].get("templateName").is_some());
        }
    }
}
