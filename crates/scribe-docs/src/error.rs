//! Error types for templates, rendering and documents.

use scribe_store::StoreError;
use thiserror::Error;

/// Errors that can occur in the document pipeline.
#[derive(Debug, Error)]
pub enum DocError {
    /// A required field was missing or empty.
    #[error("validation failed: {0}")]
    Validation(String),

    /// No template with the given id exists.
    #[error("template not found: {0}")]
    TemplateNotFound(String),

    /// No document with the given id exists.
    #[error("document not found: {0}")]
    DocumentNotFound(String),

    /// The template body failed to compile or render.
    #[error("template error: {0}")]
    TemplateCompile(String),

    /// Persistence failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for document operations.
pub type Result<T> = std::result::Result<T, DocError>;

/// Maps an unusable id to the kind-specific not-found error.
pub(crate) fn lookup_error(err: StoreError, not_found: impl FnOnce() -> DocError) -> DocError {
    match err {
        StoreError::InvalidId(_) => not_found(),
        other => DocError::Store(other),
    }
}
