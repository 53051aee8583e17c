//! Error types for record persistence.

use thiserror::Error;

/// Errors that can occur while reading or writing records.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The record id cannot be used as a storage key.
    #[error("invalid record id: {0:?}")]
    InvalidId(String),
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Maximum length of a record id.
pub const MAX_ID_LEN: usize = 128;

/// Checks that an id is safe to use as a file name.
///
/// Accepts ASCII alphanumerics, `-` and `_`, between 1 and [`MAX_ID_LEN`]
/// characters.
///
/// # Errors
///
/// Returns `StoreError::InvalidId` for anything else.
pub fn validate_id(id: &str) -> Result<()> {
    let valid = !id.is_empty()
        && id.len() <= MAX_ID_LEN
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');

    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidId(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = StoreError::InvalidId("../etc".to_string());
        assert_eq!(err.to_string(), "invalid record id: \"../etc\"");

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = StoreError::from(io);
        assert!(err.to_string().starts_with("I/O error"));
    }

    #[test]
    fn error_from_serde_json() {
        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        let err: StoreError = json_err.into();
        assert!(matches!(err, StoreError::Serialization(_)));
    }

    #[test]
    fn validate_id_accepts_uuids_and_hex() {
        assert!(validate_id("0f8e2c1a-5b7d-4e0a-9a61-3c2b1d0e9f87").is_ok());
        assert!(validate_id("a1b2c3d4e5f6").is_ok());
        assert!(validate_id("snake_case-id").is_ok());
    }

    #[test]
    fn validate_id_rejects_paths_and_blanks() {
        assert!(validate_id("").is_err());
        assert!(validate_id("../secret").is_err());
        assert!(validate_id("a/b").is_err());
        assert!(validate_id("with space").is_err());
        assert!(validate_id(&"x".repeat(MAX_ID_LEN + 1)).is_err());
    }
}
