//! InMemoryRecordStore - BTreeMap-backed record store for testing and development.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{PutCondition, RecordStore, StoreError};
use crate::model::{ModelRecord, ModelStatus, Transition, PARTITION_KEY};

/// Attributes stored under a key.
#[derive(Clone)]
struct StoredRecord {
    data: String,
    status: ModelStatus,
    task_id: Option<String>,
}

/// In-memory record store backed by a `BTreeMap`.
///
/// Storage key is `"model:id"`, so a prefix range over the partition yields
/// records in sort-key order. Clone-friendly via Arc; clones share storage.
#[derive(Clone)]
pub struct InMemoryRecordStore {
    storage: Arc<RwLock<BTreeMap<String, StoredRecord>>>,
    unavailable: Arc<AtomicBool>,
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRecordStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            storage: Arc::new(RwLock::new(BTreeMap::new())),
            unavailable: Arc::new(AtomicBool::new(false)),
        }
    }

    fn make_key(id: &str) -> String {
        format!("{}:{}", PARTITION_KEY, id)
    }

    fn id_from_key(key: &str) -> &str {
        &key[PARTITION_KEY.len() + 1..]
    }

    /// Simulate the backing store going away (or coming back).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Write raw attributes without decoding them, replacing any record.
    ///
    /// Used to seed records written by other tools, including ones whose
    /// payload this crate cannot decode.
    pub fn put_raw(
        &self,
        id: &str,
        data: impl Into<String>,
        status: ModelStatus,
    ) -> Result<(), StoreError> {
        let mut storage = self.write()?;
        storage.insert(
            Self::make_key(id),
            StoredRecord {
                data: data.into(),
                status,
                task_id: None,
            },
        );
        Ok(())
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.storage.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("record store is unavailable".into()));
        }
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<String, StoredRecord>>, StoreError> {
        self.check_available()?;
        self.storage
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<String, StoredRecord>>, StoreError> {
        self.check_available()?;
        self.storage
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".into()))
    }

    fn to_record(id: &str, stored: &StoredRecord) -> ModelRecord {
        ModelRecord {
            id: id.to_string(),
            data: stored.data.clone(),
            status: stored.status,
            task_id: stored.task_id.clone(),
        }
    }
}

impl RecordStore for InMemoryRecordStore {
    fn get(&self, id: &str) -> Result<Option<ModelRecord>, StoreError> {
        let storage = self.read()?;
        Ok(storage
            .get(&Self::make_key(id))
            .map(|stored| Self::to_record(id, stored)))
    }

    fn put(
        &self,
        record: ModelRecord,
        condition: PutCondition,
    ) -> Result<Option<ModelRecord>, StoreError> {
        let key = Self::make_key(&record.id);
        let mut storage = self.write()?;

        if condition == PutCondition::MustNotExist && storage.contains_key(&key) {
            return Err(StoreError::Conflict { id: record.id });
        }

        let previous = storage.insert(
            key,
            StoredRecord {
                data: record.data,
                status: record.status,
                task_id: record.task_id,
            },
        );

        Ok(previous.map(|stored| Self::to_record(&record.id, &stored)))
    }

    fn update_status(
        &self,
        id: &str,
        status: ModelStatus,
        task_id: Option<&str>,
    ) -> Result<ModelStatus, StoreError> {
        let mut storage = self.write()?;
        let stored = storage
            .get_mut(&Self::make_key(id))
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;

        if let Some(task_id) = task_id {
            if stored.task_id.as_deref() != Some(task_id) {
                return Err(StoreError::StaleTask {
                    id: id.to_string(),
                    task_id: task_id.to_string(),
                });
            }
        }

        let previous = stored.status;
        match previous.transition_to(status) {
            Transition::Apply => {
                stored.status = status;
                Ok(previous)
            }
            Transition::Noop => Ok(previous),
            Transition::Invalid => Err(StoreError::InvalidTransition {
                id: id.to_string(),
                from: previous,
                to: status,
            }),
        }
    }

    fn delete(&self, id: &str) -> Result<ModelRecord, StoreError> {
        let mut storage = self.write()?;
        storage
            .remove(&Self::make_key(id))
            .map(|stored| Self::to_record(id, &stored))
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })
    }

    fn list_all(&self) -> Result<Vec<ModelRecord>, StoreError> {
        let storage = self.read()?;
        let prefix = format!("{}:", PARTITION_KEY);

        Ok(storage
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .map(|(key, stored)| Self::to_record(Self::id_from_key(key), stored))
            .collect())
    }
}
