//! The pending-alert queue.
//!
//! [`AlertQueue`] owns ingest and the pending set. Both the alert records and
//! the dedup index ([`FingerprintClaim`]s) live in [`RecordStore`]s, so several
//! queues sharing one backend see each other's pending alerts: the claim is
//! taken with [`RecordStore::insert_new`], which is atomic in the store.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use scribe_store::{MemoryStore, RecordStore};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{AlertError, Result};
use crate::fingerprint::{DEFAULT_DEDUP_WINDOW, fingerprint, time_bucket};
use crate::parser::normalize_payload;
use crate::types::{FingerprintClaim, IngestOutcome, NormalizedAlert, PendingAlert};

/// Configuration for the alert queue.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Width of a dedup time bucket.
    pub dedup_window: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            dedup_window: DEFAULT_DEDUP_WINDOW,
        }
    }
}

impl QueueConfig {
    /// Sets the dedup window.
    #[must_use]
    pub const fn with_dedup_window(mut self, window: Duration) -> Self {
        self.dedup_window = window;
        self
    }
}

/// Ingests alerts and tracks them until a document is generated.
pub struct AlertQueue {
    config: QueueConfig,
    alerts: Arc<dyn RecordStore<PendingAlert>>,
    claims: Arc<dyn RecordStore<FingerprintClaim>>,
    /// Serializes ingest and status transitions within this process.
    write_lock: Mutex<()>,
}

impl AlertQueue {
    /// Creates a queue over the given stores.
    #[must_use]
    pub fn new(
        config: QueueConfig,
        alerts: Arc<dyn RecordStore<PendingAlert>>,
        claims: Arc<dyn RecordStore<FingerprintClaim>>,
    ) -> Self {
        Self {
            config,
            alerts,
            claims,
            write_lock: Mutex::new(()),
        }
    }

    /// Creates a queue backed by in-memory stores.
    #[must_use]
    pub fn in_memory(config: QueueConfig) -> Self {
        Self::new(
            config,
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryStore::new()),
        )
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &QueueConfig {
        &self.config
    }

    // ============ Ingest ============

    /// Parses a webhook body and enqueues it.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::InvalidPayload` for unusable bodies, or a store error.
    pub fn ingest(&self, body: &[u8]) -> Result<IngestOutcome> {
        self.ingest_at(body, Utc::now())
    }

    /// Like [`ingest`](Self::ingest) with an explicit clock.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::InvalidPayload` for unusable bodies, or a store error.
    pub fn ingest_at(&self, body: &[u8], now: DateTime<Utc>) -> Result<IngestOutcome> {
        let alert = normalize_payload(body)?;
        self.ingest_alert(alert, now)
    }

    /// Enqueues an already-normalized alert, collapsing duplicates.
    ///
    /// A delivery whose fingerprint is claimed by a still-pending alert returns
    /// that alert's id with `duplicate = true` and stores nothing.
    ///
    /// # Errors
    ///
    /// Returns a store error, or `AlertError::ClaimConflict` if the claim
    /// changed hands twice while ingesting.
    pub fn ingest_alert(&self, alert: NormalizedAlert, now: DateTime<Utc>) -> Result<IngestOutcome> {
        let _guard = self.write_lock.lock();

        let bucket = time_bucket(now, self.config.dedup_window);
        let fingerprint = fingerprint(&alert, bucket);
        self.prune_claims(bucket);

        // The record goes in before the claim, so a claim always points at a
        // stored alert unless that alert was removed afterwards.
        let pending = PendingAlert::new(Uuid::new_v4().to_string(), alert, &fingerprint, now);
        self.alerts.put(&pending)?;

        let claim = FingerprintClaim {
            fingerprint: fingerprint.clone(),
            alert_id: pending.id.clone(),
            bucket,
            claimed_at: now,
        };

        for _ in 0..2 {
            if self.claims.insert_new(&claim)? {
                info!(
                    alert_id = %pending.id,
                    alert_type = %pending.alert.alert_type,
                    title = %pending.alert.title_or_default(),
                    "queued alert"
                );
                return Ok(IngestOutcome {
                    alert_id: pending.id,
                    duplicate: false,
                    fingerprint,
                });
            }

            if let Some(existing) = self.live_claim(&fingerprint)? {
                self.alerts.delete(&pending.id)?;
                debug!(alert_id = %existing.alert_id, fingerprint = %fingerprint, "duplicate alert collapsed");
                return Ok(IngestOutcome {
                    alert_id: existing.alert_id,
                    duplicate: true,
                    fingerprint,
                });
            }
        }

        self.alerts.delete(&pending.id)?;
        Err(AlertError::ClaimConflict { fingerprint })
    }

    /// Returns the claim for `fingerprint` if its alert is still pending.
    ///
    /// Stale claims (alert processed or gone) are released.
    fn live_claim(&self, fingerprint: &str) -> Result<Option<FingerprintClaim>> {
        let Some(claim) = self.claims.get(fingerprint)? else {
            return Ok(None);
        };

        match self.alerts.get(&claim.alert_id)? {
            Some(alert) if alert.is_pending() => Ok(Some(claim)),
            _ => {
                warn!(alert_id = %claim.alert_id, fingerprint = %fingerprint, "releasing stale fingerprint claim");
                self.release_claim_held_by(fingerprint, &claim.alert_id)?;
                Ok(None)
            }
        }
    }

    /// Drops claims from earlier buckets; they can never match again.
    fn prune_claims(&self, current_bucket: i64) {
        let claims = match self.claims.list() {
            Ok(claims) => claims,
            Err(e) => {
                warn!(error = %e, "failed to list fingerprint claims");
                return;
            }
        };

        for claim in claims.into_iter().filter(|c| c.bucket < current_bucket) {
            if let Err(e) = self.claims.delete(&claim.fingerprint) {
                warn!(fingerprint = %claim.fingerprint, error = %e, "failed to prune fingerprint claim");
            }
        }
    }

    fn release_claim(&self, alert: &PendingAlert) -> Result<()> {
        self.release_claim_held_by(&alert.fingerprint, &alert.id)
    }

    /// Deletes the claim on `fingerprint` only while it still names `alert_id`.
    ///
    /// Another queue may have re-claimed the fingerprint since it was read.
    fn release_claim_held_by(&self, fingerprint: &str, alert_id: &str) -> Result<()> {
        if let Some(claim) = self.claims.get(fingerprint)? {
            if claim.alert_id == alert_id {
                self.claims.delete(fingerprint)?;
            }
        }
        Ok(())
    }

    // ============ Queries ============

    /// Gets an alert by id, pending or processed.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::NotFound` for unknown ids.
    pub fn get(&self, id: &str) -> Result<PendingAlert> {
        self.alerts
            .get(id)
            .map_err(|e| not_found_on_bad_id(e, id))?
            .ok_or_else(|| AlertError::NotFound { id: id.to_string() })
    }

    /// Returns pending alerts, newest first.
    ///
    /// # Errors
    ///
    /// Returns a store error if the alerts cannot be listed.
    pub fn list_pending(&self) -> Result<Vec<PendingAlert>> {
        let mut alerts = self.list_all()?;
        alerts.retain(PendingAlert::is_pending);
        Ok(alerts)
    }

    /// Returns every stored alert, newest first.
    ///
    /// # Errors
    ///
    /// Returns a store error if the alerts cannot be listed.
    pub fn list_all(&self) -> Result<Vec<PendingAlert>> {
        let mut alerts = self.alerts.list()?;
        alerts.sort_by(|a, b| b.received_at.cmp(&a.received_at));
        Ok(alerts)
    }

    /// Returns the number of pending alerts.
    ///
    /// # Errors
    ///
    /// Returns a store error if the alerts cannot be listed.
    pub fn pending_count(&self) -> Result<usize> {
        Ok(self.alerts.list()?.iter().filter(|a| a.is_pending()).count())
    }

    // ============ Transitions ============

    /// Records that `document_id` was generated from alert `id`.
    ///
    /// The alert leaves the pending set and its fingerprint becomes free.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::NotFound` or `AlertError::AlreadyProcessed`.
    pub fn mark_processed(&self, id: &str, document_id: &str) -> Result<PendingAlert> {
        let _guard = self.write_lock.lock();
        let mut alert = self.get(id)?;
        if !alert.is_pending() {
            return Err(AlertError::AlreadyProcessed { id: id.to_string() });
        }

        alert.mark_processed(document_id, Utc::now());
        self.alerts.put(&alert)?;
        self.release_claim(&alert)?;

        info!(alert_id = %id, document_id = %document_id, "alert processed");
        Ok(alert)
    }

    /// Removes a pending alert without generating a document.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::NotFound` or `AlertError::AlreadyProcessed`.
    pub fn dismiss(&self, id: &str) -> Result<PendingAlert> {
        let _guard = self.write_lock.lock();
        let alert = self.get(id)?;
        if !alert.is_pending() {
            return Err(AlertError::AlreadyProcessed { id: id.to_string() });
        }

        self.alerts.delete(id)?;
        self.release_claim(&alert)?;

        info!(alert_id = %id, "alert dismissed");
        Ok(alert)
    }
}

/// An id that cannot be a storage key cannot name a stored alert either.
fn not_found_on_bad_id(err: scribe_store::StoreError, id: &str) -> AlertError {
    match err {
        scribe_store::StoreError::InvalidId(_) => AlertError::NotFound { id: id.to_string() },
        other => other.into(),
    }
}

impl std::fmt::Debug for AlertQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertQueue")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AlertStatus;
    use chrono::TimeZone;
    use scribe_store::FileStore;
    use tempfile::TempDir;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().unwrap()
    }

    /// Start of a dedup bucket.
    const T0: i64 = 1_700_000_100;

    fn queue() -> AlertQueue {
        AlertQueue::in_memory(QueueConfig::default())
    }

    fn file_queue(dir: &TempDir) -> AlertQueue {
        AlertQueue::new(
            QueueConfig::default(),
            Arc::new(FileStore::open(dir.path()).unwrap()),
            Arc::new(FileStore::open(dir.path()).unwrap()),
        )
    }

    mod ingest_tests {
        use super::*;

        #[test]
        fn first_ingest_is_new() {
            let queue = queue();
            let outcome = queue.ingest_at(br#"{"alert_type":"error","title":"CPU"}"#, at(T0)).unwrap();

            assert!(!outcome.duplicate);
            let stored = queue.get(&outcome.alert_id).unwrap();
            assert_eq!(stored.status, AlertStatus::Pending);
            assert_eq!(stored.fingerprint, outcome.fingerprint);
            assert_eq!(stored.alert.title.as_deref(), Some("CPU"));
        }

        #[test]
        fn same_alert_same_bucket_is_duplicate() {
            let queue = queue();
            let body = br#"{"alert_type":"error","title":"CPU"}"#;

            let first = queue.ingest_at(body, at(T0)).unwrap();
            let second = queue.ingest_at(body, at(T0 + 120)).unwrap();

            assert_eq!(first.alert_id, second.alert_id);
            assert!(second.duplicate);
            assert_eq!(queue.list_pending().unwrap().len(), 1);
        }

        #[test]
        fn different_title_is_new_alert() {
            let queue = queue();
            let a = queue.ingest_at(br#"{"alert_type":"error","title":"CPU"}"#, at(T0)).unwrap();
            let b = queue.ingest_at(br#"{"alert_type":"error","title":"Disk"}"#, at(T0)).unwrap();

            assert_ne!(a.alert_id, b.alert_id);
            assert!(!b.duplicate);
            assert_eq!(queue.pending_count().unwrap(), 2);
        }

        #[test]
        fn next_bucket_is_new_alert() {
            let queue = queue();
            let body = br#"{"alert_type":"error","title":"CPU"}"#;
            let start = T0 - T0 % 300;

            let a = queue.ingest_at(body, at(start)).unwrap();
            let b = queue.ingest_at(body, at(start + 300)).unwrap();

            assert_ne!(a.alert_id, b.alert_id);
            assert!(!b.duplicate);
        }

        #[test]
        fn text_payloads_dedup_too() {
            let queue = queue();
            let body = b"[Triggered] Latency high\np99 above 2s";
            let a = queue.ingest_at(body, at(T0)).unwrap();
            let b = queue.ingest_at(body, at(T0 + 1)).unwrap();
            assert_eq!(a.alert_id, b.alert_id);
            assert!(b.duplicate);
        }

        #[test]
        fn invalid_payload_rejected_and_nothing_stored() {
            let queue = queue();
            let err = queue.ingest_at(b"", at(T0)).unwrap_err();
            assert!(matches!(err, AlertError::InvalidPayload { .. }));
            assert!(queue.list_all().unwrap().is_empty());
        }

        #[test]
        fn duplicate_is_not_stored_twice() {
            let queue = queue();
            let body = br#"{"title":"same"}"#;
            queue.ingest_at(body, at(T0)).unwrap();
            queue.ingest_at(body, at(T0)).unwrap();
            queue.ingest_at(body, at(T0)).unwrap();
            assert_eq!(queue.list_all().unwrap().len(), 1);
        }

        #[test]
        fn custom_window_widens_bucket() {
            let queue = AlertQueue::in_memory(
                QueueConfig::default().with_dedup_window(Duration::from_secs(3600)),
            );
            let start = T0 - T0 % 3600;
            let body = br#"{"title":"hourly"}"#;
            let a = queue.ingest_at(body, at(start)).unwrap();
            let b = queue.ingest_at(body, at(start + 1800)).unwrap();
            assert!(b.duplicate);
            assert_eq!(a.alert_id, b.alert_id);
        }
    }

    mod transition_tests {
        use super::*;

        #[test]
        fn processed_alert_leaves_pending_set() {
            let queue = queue();
            let body = br#"{"alert_type":"error","title":"CPU"}"#;
            let first = queue.ingest_at(body, at(T0)).unwrap();

            let processed = queue.mark_processed(&first.alert_id, "doc-1").unwrap();
            assert_eq!(processed.status, AlertStatus::Processed);
            assert!(queue.list_pending().unwrap().is_empty());

            // History is kept.
            assert_eq!(queue.list_all().unwrap().len(), 1);

            // The fingerprint is free again within the same bucket.
            let again = queue.ingest_at(body, at(T0 + 10)).unwrap();
            assert!(!again.duplicate);
            assert_ne!(again.alert_id, first.alert_id);
        }

        #[test]
        fn processing_twice_fails() {
            let queue = queue();
            let outcome = queue.ingest_at(br#"{"title":"x"}"#, at(T0)).unwrap();
            queue.mark_processed(&outcome.alert_id, "doc-1").unwrap();

            let err = queue.mark_processed(&outcome.alert_id, "doc-2").unwrap_err();
            assert!(matches!(err, AlertError::AlreadyProcessed { .. }));
        }

        #[test]
        fn dismiss_removes_alert_and_claim() {
            let queue = queue();
            let body = br#"{"title":"noise"}"#;
            let outcome = queue.ingest_at(body, at(T0)).unwrap();

            queue.dismiss(&outcome.alert_id).unwrap();
            assert!(matches!(queue.get(&outcome.alert_id), Err(AlertError::NotFound { .. })));

            let again = queue.ingest_at(body, at(T0)).unwrap();
            assert!(!again.duplicate);
        }

        #[test]
        fn unknown_ids_are_not_found() {
            let queue = queue();
            assert!(matches!(queue.get("nope"), Err(AlertError::NotFound { .. })));
            assert!(matches!(queue.get("../nope"), Err(AlertError::NotFound { .. })));
            assert!(matches!(queue.mark_processed("nope", "d"), Err(AlertError::NotFound { .. })));
            assert!(matches!(queue.dismiss("nope"), Err(AlertError::NotFound { .. })));
        }

        #[test]
        fn list_is_newest_first() {
            let queue = queue();
            queue.ingest_at(br#"{"title":"old"}"#, at(T0)).unwrap();
            queue.ingest_at(br#"{"title":"new"}"#, at(T0 + 5)).unwrap();

            let titles: Vec<_> = queue
                .list_pending()
                .unwrap()
                .into_iter()
                .map(|a| a.alert.title.unwrap_or_default())
                .collect();
            assert_eq!(titles, vec!["new", "old"]);
        }
    }

    mod shared_store_tests {
        use super::*;

        #[test]
        fn queues_sharing_a_directory_dedup_together() {
            let dir = TempDir::new().unwrap();
            let a = file_queue(&dir);
            let b = file_queue(&dir);
            let body = br#"{"alert_type":"error","title":"CPU"}"#;

            let first = a.ingest_at(body, at(T0)).unwrap();
            let second = b.ingest_at(body, at(T0 + 30)).unwrap();

            assert!(second.duplicate);
            assert_eq!(first.alert_id, second.alert_id);
            assert_eq!(b.list_pending().unwrap().len(), 1);
        }

        #[test]
        fn stale_claim_is_released() {
            let dir = TempDir::new().unwrap();
            let a = file_queue(&dir);
            let b = file_queue(&dir);
            let body = br#"{"title":"flappy"}"#;

            let first = a.ingest_at(body, at(T0)).unwrap();
            // Simulate a crash between processing and releasing the claim.
            let mut record = a.get(&first.alert_id).unwrap();
            record.mark_processed("doc", at(T0));
            a.alerts.put(&record).unwrap();

            let second = b.ingest_at(body, at(T0 + 1)).unwrap();
            assert!(!second.duplicate);
            assert_ne!(second.alert_id, first.alert_id);
        }

        /// Alert store that lets another writer re-claim a fingerprint right
        /// after the queue reads the alert behind the current claim.
        struct ReclaimingAlerts {
            inner: MemoryStore<PendingAlert>,
            claims: Arc<MemoryStore<FingerprintClaim>>,
            reclaim: parking_lot::Mutex<Option<(PendingAlert, FingerprintClaim)>>,
        }

        impl RecordStore<PendingAlert> for ReclaimingAlerts {
            fn put(&self, record: &PendingAlert) -> scribe_store::Result<()> {
                self.inner.put(record)
            }

            fn insert_new(&self, record: &PendingAlert) -> scribe_store::Result<bool> {
                self.inner.insert_new(record)
            }

            fn get(&self, id: &str) -> scribe_store::Result<Option<PendingAlert>> {
                let found = self.inner.get(id)?;
                if let Some((alert, claim)) = self.reclaim.lock().take() {
                    self.inner.put(&alert)?;
                    self.claims.put(&claim)?;
                }
                Ok(found)
            }

            fn delete(&self, id: &str) -> scribe_store::Result<bool> {
                self.inner.delete(id)
            }

            fn list(&self) -> scribe_store::Result<Vec<PendingAlert>> {
                self.inner.list()
            }
        }

        #[test]
        fn stale_release_keeps_a_claim_taken_in_between() {
            let claims = Arc::new(MemoryStore::new());
            let alerts = Arc::new(ReclaimingAlerts {
                inner: MemoryStore::new(),
                claims: Arc::clone(&claims),
                reclaim: parking_lot::Mutex::new(None),
            });
            let queue = AlertQueue::new(QueueConfig::default(), alerts.clone(), claims.clone());
            let body = br#"{"title":"flappy"}"#;

            let first = queue.ingest_at(body, at(T0)).unwrap();
            let mut record = alerts.inner.get(&first.alert_id).unwrap().unwrap();
            record.mark_processed("doc", at(T0));
            alerts.inner.put(&record).unwrap();

            let bucket = time_bucket(at(T0), DEFAULT_DEDUP_WINDOW);
            let normalized = normalize_payload(body).unwrap();
            let print = fingerprint(&normalized, bucket);
            let other = PendingAlert::new("other-queue-alert".to_string(), normalized, &print, at(T0));
            let other_claim = FingerprintClaim {
                fingerprint: print.clone(),
                alert_id: other.id.clone(),
                bucket,
                claimed_at: at(T0),
            };
            *alerts.reclaim.lock() = Some((other, other_claim));

            let second = queue.ingest_at(body, at(T0 + 1)).unwrap();

            assert!(second.duplicate);
            assert_eq!(second.alert_id, "other-queue-alert");
            let claim = claims.get(&print).unwrap().unwrap();
            assert_eq!(claim.alert_id, "other-queue-alert");
        }

        #[test]
        fn old_bucket_claims_are_pruned() {
            let queue = queue();
            let start = T0 - T0 % 300;
            queue.ingest_at(br#"{"title":"a"}"#, at(start)).unwrap();
            queue.ingest_at(br#"{"title":"b"}"#, at(start + 600)).unwrap();

            let claims = queue.claims.list().unwrap();
            assert_eq!(claims.len(), 1);
            assert_eq!(claims[0].bucket, time_bucket(at(start + 600), DEFAULT_DEDUP_WINDOW));
        }
    }
}
