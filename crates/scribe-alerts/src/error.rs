//! Error types for the scribe-alerts crate.

use scribe_store::StoreError;
use thiserror::Error;

/// Errors that can occur while ingesting or tracking alerts.
#[derive(Debug, Error)]
pub enum AlertError {
    /// The webhook body could not be turned into an alert.
    #[error("invalid alert payload: {reason}")]
    InvalidPayload {
        /// Why the payload was rejected.
        reason: String,
    },

    /// No alert with the given id is stored.
    #[error("alert not found: {id}")]
    NotFound {
        /// The alert id that was not found.
        id: String,
    },

    /// The alert already produced a document.
    #[error("alert already processed: {id}")]
    AlreadyProcessed {
        /// The alert id.
        id: String,
    },

    /// The fingerprint claim kept changing hands while ingesting.
    #[error("fingerprint claim contended: {fingerprint}")]
    ClaimConflict {
        /// The contended fingerprint.
        fingerprint: String,
    },

    /// Persistence failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AlertError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidPayload {
            reason: reason.into(),
        }
    }
}

/// Result type for alert operations.
pub type Result<T> = std::result::Result<T, AlertError>;
