//! Record store - conditional-write key-value storage for model records.
//!
//! The store is keyed by `(partition key, model id)` and exposes the small set
//! of atomic single-record operations the registry needs. Every operation is
//! atomic with respect to one record; nothing spans records.
//!
//! The conditional put is the concurrency control for the whole system: two
//! racing creates for the same id are serialized by the store, and exactly one
//! of them observes the id as free.
//!
//! ## Example
//!
//! ```ignore
//! use textcat_registry::{InMemoryRecordStore, PutCondition, RecordStore};
//!
//! let store = InMemoryRecordStore::new();
//! store.put(record.clone(), PutCondition::MustNotExist)?;
//! assert!(store.put(record, PutCondition::MustNotExist).is_err());
//! ```

mod in_memory;

use thiserror::Error;

use crate::model::{ModelRecord, ModelStatus};

pub use in_memory::InMemoryRecordStore;

/// Precondition for a put.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutCondition {
    /// Fail with [`StoreError::Conflict`] if a record already exists for the id.
    MustNotExist,
    /// Replace any existing record.
    Always,
}

/// Error type for record store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A `MustNotExist` put found an existing record.
    #[error("record {id} already exists")]
    Conflict { id: String },
    /// No record exists for the id.
    #[error("record {id} not found")]
    NotFound { id: String },
    /// The status change is not a forward lifecycle move.
    #[error("record {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: String,
        from: ModelStatus,
        to: ModelStatus,
    },
    /// A task-guarded update found the record owned by a different task.
    #[error("record {id} is no longer owned by task {task_id}")]
    StaleTask { id: String, task_id: String },
    /// Storage-level failure.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Abstract conditional-write storage for model records.
pub trait RecordStore: Send + Sync {
    /// Get a record by id. Returns `None` if absent.
    fn get(&self, id: &str) -> Result<Option<ModelRecord>, StoreError>;

    /// Write a record under `condition`, returning the record it replaced.
    fn put(
        &self,
        record: ModelRecord,
        condition: PutCondition,
    ) -> Result<Option<ModelRecord>, StoreError>;

    /// Set the status of an existing record, returning its previous status.
    ///
    /// When `task_id` is given, the update only applies if the record is still
    /// owned by that task. Writing the status the record already has is a
    /// no-op that succeeds.
    fn update_status(
        &self,
        id: &str,
        status: ModelStatus,
        task_id: Option<&str>,
    ) -> Result<ModelStatus, StoreError>;

    /// Remove a record, returning its last attributes.
    fn delete(&self, id: &str) -> Result<ModelRecord, StoreError>;

    /// All records in the model partition, ordered by id.
    fn list_all(&self) -> Result<Vec<ModelRecord>, StoreError>;
}
