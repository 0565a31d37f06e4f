use super::models::MediaRecord;
use super::sqlite::Database;
use crate::error::StoreError;
use crate::hasher::identity::{FullId, PartialId};
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

/// Content-addressed fingerprint cache over a single SQLite handle.
///
/// The handle sits behind one mutex, so concurrent fingerprint workers see every
/// `put`, `delete` and `rename` linearized. Each call commits before returning.
pub struct FingerprintStore {
    db: Mutex<Database>,
}

impl FingerprintStore {
    pub fn new(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Ok(Self::new(Database::open(path)?))
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    fn with_db<T>(
        &self,
        f: impl FnOnce(&Database) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let db = self.db.lock().map_err(|_| StoreError::Poisoned)?;
        f(&db)
    }

    /// Candidate only: the caller must confirm the full identity before trusting it.
    pub fn lookup_by_partial(&self, partial: &PartialId) -> Result<Option<MediaRecord>, StoreError> {
        let key = partial.to_string();
        self.with_db(|db| Ok(db.find_record_by_partial(&key)?))
    }

    pub fn lookup_by_full(&self, full: &FullId) -> Result<Option<MediaRecord>, StoreError> {
        self.with_db(|db| Ok(db.find_record_by_full(full.as_str())?))
    }

    pub fn lookup_by_path(&self, path: &str) -> Result<Option<MediaRecord>, StoreError> {
        self.with_db(|db| Ok(db.find_record_by_path(path)?))
    }

    /// Upsert keyed on the record's path; `id` is ignored.
    pub fn put(&self, record: &MediaRecord) -> Result<(), StoreError> {
        let fingerprint_json = record.fingerprint.to_json()?;
        self.with_db(|db| {
            db.upsert_record(record, &fingerprint_json)?;
            Ok(())
        })
    }

    /// Removing a path with no record is not an error.
    pub fn delete(&self, path: &str) -> Result<(), StoreError> {
        self.with_db(|db| {
            db.delete_record(path)?;
            Ok(())
        })
    }

    /// Re-key a record after its file moved. Refuses to overwrite a distinct record
    /// already sitting at `new_path`. A missing `old_path` record is a no-op.
    pub fn rename(&self, old_path: &str, new_path: &str) -> Result<(), StoreError> {
        if old_path == new_path {
            return Ok(());
        }
        self.with_db(|db| {
            let tx = db.connection().unchecked_transaction()?;
            if db.find_record_by_path(new_path)?.is_some() {
                return Err(StoreError::Conflict {
                    path: new_path.to_string(),
                });
            }
            let updated = db.update_record_path(old_path, new_path)?;
            tx.commit()?;
            debug!("Renamed {} record(s): {} -> {}", updated, old_path, new_path);
            Ok(())
        })
    }

    pub fn backfill_partial(&self, path: &str, partial: &PartialId) -> Result<(), StoreError> {
        let key = partial.to_string();
        self.with_db(|db| {
            db.set_partial_identity(path, &key)?;
            Ok(())
        })
    }

    pub fn count(&self) -> Result<i64, StoreError> {
        self.with_db(|db| Ok(db.count_records()?))
    }
}
