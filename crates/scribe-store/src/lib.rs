//! Flat-file record persistence for Scribe.
//!
//! Every entity (template, document, alert, fingerprint claim) is stored as
//! one independently addressable JSON record. There are no cross-record
//! transactions.
//!
//! # Example
//!
//! ```rust
//! use scribe_store::{MemoryStore, Record, RecordStore};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Clone, Serialize, Deserialize)]
//! struct Note {
//!     id: String,
//!     text: String,
//! }
//!
//! impl Record for Note {
//!     const KIND: &'static str = "notes";
//!
//!     fn id(&self) -> &str {
//!         &self.id
//!     }
//! }
//!
//! let store = MemoryStore::new();
//! store.put(&Note { id: "n1".into(), text: "hello".into() }).unwrap();
//! assert!(store.get("n1").unwrap().is_some());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod file_store;
pub mod memory;
pub mod traits;

pub use error::{Result, StoreError, validate_id};
pub use file_store::FileStore;
pub use memory::MemoryStore;
pub use traits::{Record, RecordStore};
