//! Traits for record storage backends.
//!
//! Services depend on [`RecordStore`] rather than on a concrete backend, so the
//! same code runs against [`FileStore`](crate::FileStore) in production and
//! [`MemoryStore`](crate::MemoryStore) in tests.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::Result;

/// An entity that can be persisted by a [`RecordStore`].
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection name, used as the directory name by file-backed stores.
    const KIND: &'static str;

    /// The record's unique id.
    fn id(&self) -> &str;
}

/// Trait for record storage backends.
///
/// Every record is independently addressable by its id. There are no
/// cross-record transactions; the only atomic compound operation is
/// [`insert_new`](RecordStore::insert_new).
pub trait RecordStore<T: Record>: Send + Sync {
    /// Writes a record, replacing any existing record with the same id.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be written.
    fn put(&self, record: &T) -> Result<()>;

    /// Writes a record only if no record with the same id exists.
    ///
    /// Returns `false` (and writes nothing) when the id is taken. The check
    /// and the write are a single atomic step, also across processes that
    /// share the backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be written.
    fn insert_new(&self, record: &T) -> Result<bool>;

    /// Reads a record by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the record exists but cannot be read.
    fn get(&self, id: &str) -> Result<Option<T>>;

    /// Deletes a record by id.
    ///
    /// Returns `true` if a record was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be removed.
    fn delete(&self, id: &str) -> Result<bool>;

    /// Returns all records, in no particular order.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be enumerated.
    fn list(&self) -> Result<Vec<T>>;

    /// Returns the number of stored records.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be enumerated.
    fn count(&self) -> Result<usize> {
        Ok(self.list()?.len())
    }
}
