//! Dedup fingerprints.
//!
//! A fingerprint hashes the alert's identity (type, title, org, source id)
//! together with the time bucket it arrived in. Deliveries with the same
//! identity inside one bucket collapse; once the bucket rolls over the same
//! alert is accepted again.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::types::NormalizedAlert;

/// Default dedup window.
pub const DEFAULT_DEDUP_WINDOW: Duration = Duration::from_secs(5 * 60);

/// Title hashed for alerts that have none.
const UNTITLED: &str = "untitled";

/// Returns the bucket index `now` falls into for windows of `window`.
#[must_use]
pub fn time_bucket(now: DateTime<Utc>, window: Duration) -> i64 {
    let window_secs = i64::try_from(window.as_secs()).unwrap_or(i64::MAX).max(1);
    now.timestamp().div_euclid(window_secs)
}

/// Computes the dedup fingerprint of `alert` in `bucket`.
///
/// Keys are sorted before hashing, so the result only depends on the values.
#[must_use]
pub fn fingerprint(alert: &NormalizedAlert, bucket: i64) -> String {
    let bucket = bucket.to_string();
    let mut keys: BTreeMap<&str, &str> = BTreeMap::new();
    keys.insert("alertType", &alert.alert_type);
    keys.insert("title", alert.title.as_deref().unwrap_or(UNTITLED));
    keys.insert("bucket", &bucket);
    if let Some(org) = alert.org.as_deref() {
        keys.insert("org", org);
    }
    if let Some(source_id) = alert.source_id.as_deref() {
        keys.insert("sourceId", source_id);
    }

    let mut hasher = blake3::Hasher::new();
    for (key, value) in &keys {
        hasher.update(key.as_bytes());
        hasher.update(&[0x1f]);
        hasher.update(value.as_bytes());
        hasher.update(&[0x1e]);
    }
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().unwrap()
    }

    #[test]
    fn bucket_boundaries() {
        let window = DEFAULT_DEDUP_WINDOW;
        assert_eq!(time_bucket(at(0), window), 0);
        assert_eq!(time_bucket(at(299), window), 0);
        assert_eq!(time_bucket(at(300), window), 1);
        assert_eq!(time_bucket(at(-1), window), -1);
    }

    #[test]
    fn zero_window_does_not_divide_by_zero() {
        assert_eq!(time_bucket(at(42), Duration::ZERO), 42);
    }

    #[test]
    fn same_identity_same_fingerprint() {
        let a = NormalizedAlert::new("error").with_title("CPU").with_message("one");
        let b = NormalizedAlert::new("error").with_title("CPU").with_message("two");
        // Message is not part of the identity.
        assert_eq!(fingerprint(&a, 7), fingerprint(&b, 7));
    }

    #[test]
    fn identity_fields_change_fingerprint() {
        let base = NormalizedAlert::new("error").with_title("CPU");
        let fp = fingerprint(&base, 7);

        assert_ne!(fp, fingerprint(&base, 8));
        assert_ne!(fp, fingerprint(&NormalizedAlert::new("warning").with_title("CPU"), 7));
        assert_ne!(fp, fingerprint(&NormalizedAlert::new("error").with_title("Disk"), 7));

        let mut with_org = base.clone();
        with_org.org = Some("acme".into());
        assert_ne!(fp, fingerprint(&with_org, 7));

        let mut with_source = base.clone();
        with_source.source_id = Some("123".into());
        assert_ne!(fp, fingerprint(&with_source, 7));
    }

    #[test]
    fn missing_title_hashes_as_untitled() {
        let untitled = NormalizedAlert::new("info");
        let literal = NormalizedAlert::new("info").with_title("untitled");
        assert_eq!(fingerprint(&untitled, 1), fingerprint(&literal, 1));
    }

    #[test]
    fn fingerprint_is_a_valid_record_id() {
        let fp = fingerprint(&NormalizedAlert::sample(), 1);
        assert_eq!(fp.len(), 64);
        assert!(scribe_store::validate_id(&fp).is_ok());
    }

    proptest! {
        #[test]
        fn deterministic(alert_type in "[a-z]{1,10}", title in ".{0,40}", bucket in any::<i64>()) {
            let alert = NormalizedAlert::new(alert_type).with_title(title);
            prop_assert_eq!(fingerprint(&alert, bucket), fingerprint(&alert.clone(), bucket));
        }

        #[test]
        fn same_bucket_within_window(offset in 0i64..300) {
            let start = 1_700_000_100 - 1_700_000_100 % 300;
            prop_assert_eq!(
                time_bucket(at(start), DEFAULT_DEDUP_WINDOW),
                time_bucket(at(start + offset), DEFAULT_DEDUP_WINDOW)
            );
        }
    }
}
