//! File-based record storage.
//!
//! Each record lives in its own pretty-printed JSON file at
//! `<root>/<kind>/<id>.json`. Writes go through a temporary file in the same
//! directory so readers never observe a half-written record.

use std::fs::{self, File};
use std::io::{self, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{Result, validate_id};
use crate::traits::{Record, RecordStore};

const RECORD_EXTENSION: &str = "json";
const TEMP_EXTENSION: &str = "tmp";

/// File-backed record store for one record kind.
pub struct FileStore<T> {
    dir: PathBuf,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record> FileStore<T> {
    /// Opens (and creates if needed) the collection directory for `T` under `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let dir = root.as_ref().join(T::KIND);
        fs::create_dir_all(&dir)?;
        debug!(kind = T::KIND, dir = %dir.display(), "opened file store");
        Ok(Self {
            dir,
            _record: PhantomData,
        })
    }

    /// Returns the collection directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, id: &str) -> Result<PathBuf> {
        validate_id(id)?;
        Ok(self.dir.join(format!("{id}.{RECORD_EXTENSION}")))
    }

    /// Serializes a record into a fresh temporary file and returns its path.
    fn write_temp(&self, record: &T) -> Result<PathBuf> {
        let json = serde_json::to_vec_pretty(record)?;
        let tmp = self
            .dir
            .join(format!(".{}.{}.{TEMP_EXTENSION}", record.id(), Uuid::new_v4().simple()));

        let mut file = File::create(&tmp)?;
        if let Err(e) = file.write_all(&json).and_then(|()| file.sync_all()) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(tmp)
    }

    fn read_record(path: &Path) -> Result<Option<T>> {
        match fs::read(path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl<T: Record> RecordStore<T> for FileStore<T> {
    fn put(&self, record: &T) -> Result<()> {
        let path = self.record_path(record.id())?;
        let tmp = self.write_temp(record)?;

        if let Err(e) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }

    fn insert_new(&self, record: &T) -> Result<bool> {
        let path = self.record_path(record.id())?;
        let tmp = self.write_temp(record)?;

        // hard_link refuses to replace an existing target, which makes the
        // existence check and the publish one step.
        let linked = fs::hard_link(&tmp, &path);
        let _ = fs::remove_file(&tmp);

        match linked {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn get(&self, id: &str) -> Result<Option<T>> {
        let path = self.record_path(id)?;
        Self::read_record(&path)
    }

    fn delete(&self, id: &str) -> Result<bool> {
        let path = self.record_path(id)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self) -> Result<Vec<T>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_none_or(|ext| ext != RECORD_EXTENSION) {
                continue;
            }

            match Self::read_record(&path) {
                Ok(Some(record)) => records.push(record),
                // Deleted between read_dir and read.
                Ok(None) => {}
                Err(e) => {
                    warn!(kind = T::KIND, path = %path.display(), error = %e, "skipping unreadable record");
                }
            }
        }
        Ok(records)
    }
}

impl<T> std::fmt::Debug for FileStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStore").field("dir", &self.dir).finish()
    }
}
