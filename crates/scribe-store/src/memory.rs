//! In-memory record storage.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::error::{Result, validate_id};
use crate::traits::{Record, RecordStore};

/// In-memory record store.
///
/// Applies the same id rules as [`FileStore`](crate::FileStore) so tests
/// exercise the same failure modes.
#[derive(Debug)]
pub struct MemoryStore<T> {
    records: RwLock<HashMap<String, T>>,
}

impl<T: Record> MemoryStore<T> {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }
}

impl<T: Record> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Record> RecordStore<T> for MemoryStore<T> {
    fn put(&self, record: &T) -> Result<()> {
        validate_id(record.id())?;
        self.records
            .write()
            .insert(record.id().to_string(), record.clone());
        Ok(())
    }

    fn insert_new(&self, record: &T) -> Result<bool> {
        validate_id(record.id())?;
        let mut records = self.records.write();
        if records.contains_key(record.id()) {
            return Ok(false);
        }
        records.insert(record.id().to_string(), record.clone());
        Ok(true)
    }

    fn get(&self, id: &str) -> Result<Option<T>> {
        validate_id(id)?;
        Ok(self.records.read().get(id).cloned())
    }

    fn delete(&self, id: &str) -> Result<bool> {
        validate_id(id)?;
        Ok(self.records.write().remove(id).is_some())
    }

    fn list(&self) -> Result<Vec<T>> {
        Ok(self.records.read().values().cloned().collect())
    }

    fn count(&self) -> Result<usize> {
        Ok(self.records.read().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Counter {
        id: String,
        value: u32,
    }

    impl Record for Counter {
        const KIND: &'static str = "counters";

        fn id(&self) -> &str {
            &self.id
        }
    }

    #[test]
    fn crud_cycle() {
        let store = MemoryStore::new();
        let c = Counter {
            id: "c1".into(),
            value: 1,
        };

        store.put(&c).unwrap();
        assert_eq!(store.get("c1").unwrap(), Some(c.clone()));
        assert_eq!(store.count().unwrap(), 1);

        assert!(store.delete("c1").unwrap());
        assert!(!store.delete("c1").unwrap());
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn insert_new_only_once() {
        let store = MemoryStore::new();
        let first = Counter {
            id: "c".into(),
            value: 1,
        };
        let second = Counter {
            id: "c".into(),
            value: 2,
        };

        assert!(store.insert_new(&first).unwrap());
        assert!(!store.insert_new(&second).unwrap());
        assert_eq!(store.get("c").unwrap().unwrap().value, 1);
    }

    #[test]
    fn invalid_ids_rejected() {
        let store: MemoryStore<Counter> = MemoryStore::new();
        assert!(store.get("a b").is_err());
    }

    proptest! {
        #[test]
        fn put_get_returns_last_write(id in "[a-z0-9]{1,16}", values in prop::collection::vec(any::<u32>(), 1..8)) {
            let store = MemoryStore::new();
            for value in &values {
                store.put(&Counter { id: id.clone(), value: *value }).unwrap();
            }
            let last = *values.last().unwrap();
            prop_assert_eq!(store.get(&id).unwrap().map(|c| c.value), Some(last));
            prop_assert_eq!(store.count().unwrap(), 1);
        }
    }
}
