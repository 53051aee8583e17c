//! Alert ingest, normalization and deduplication for Scribe.
//!
//! `scribe-alerts` turns raw webhook deliveries from a monitoring service into
//! [`PendingAlert`]s waiting for an operator to pick a template.
//!
//! # Features
//!
//! - **Payload parsing**: JSON objects or free text, see [`parse_payload`]
//! - **Field mapping**: sender field-name variants mapped through [`FIELD_MAP`]
//! - **Deduplication**: time-bucketed [`fingerprint`]s; repeats within a bucket
//!   collapse into the pending alert that is already queued
//! - **Shared stores**: the queue runs over [`scribe_store::RecordStore`], so
//!   processes sharing a data directory dedup against each other
//!
//! # Example
//!
//! ```rust
//! use chrono::Utc;
//! use scribe_alerts::{AlertQueue, QueueConfig};
//!
//! let queue = AlertQueue::in_memory(QueueConfig::default());
//! let now = Utc::now();
//!
//! let body = br#"{"alert_type": "error", "title": "High CPU on web-01"}"#;
//! let first = queue.ingest_at(body, now).unwrap();
//! let again = queue.ingest_at(body, now).unwrap();
//!
//! assert!(!first.duplicate);
//! assert!(again.duplicate);
//! assert_eq!(first.alert_id, again.alert_id);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod fingerprint;
pub mod normalize;
pub mod parser;
pub mod queue;
pub mod types;

pub use error::{AlertError, Result};
pub use fingerprint::{DEFAULT_DEDUP_WINDOW, fingerprint, time_bucket};
pub use normalize::{CanonicalField, FIELD_MAP, normalize_object};
pub use parser::{ParsedPayload, normalize, normalize_payload, parse_payload, parse_text};
pub use queue::{AlertQueue, QueueConfig};
pub use types::{
    AlertStatus, DEFAULT_TITLE, FingerprintClaim, IngestOutcome, MetricFields, NormalizedAlert,
    PendingAlert, PendingAlertSummary, Priority,
};
