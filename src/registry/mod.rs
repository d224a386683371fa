//! Model registry - the record lifecycle on top of a [`RecordStore`].
//!
//! The registry owns the create / force-replace / delete semantics and is the
//! only writer of records apart from the training worker's status update,
//! which also goes through here (see [`ModelRegistry::complete_task`]).
//!
//! Duplicate creates are detected by the store's conditional put and nothing
//! else. There is deliberately no "read, then write if absent" path.

mod entry;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::RegistryError;
use crate::model::{ModelRecord, ModelStatus, TrainingRequest};
use crate::store::{PutCondition, RecordStore};

pub use entry::ModelEntry;

/// Result of writing a training request into the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PutOutcome {
    /// The record as written.
    pub record: ModelRecord,
    /// The record a forced write replaced, if any.
    pub replaced: Option<ModelRecord>,
}

/// Typed access to model records.
#[derive(Clone)]
pub struct ModelRegistry<S> {
    store: S,
}

impl<S: RecordStore> ModelRegistry<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Get a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Write a started record for `request`, owned by `task_id`.
    ///
    /// Without `force` the write is conditional on the id being free and a
    /// collision fails with [`RegistryError::ModelAlreadyExists`]. With
    /// `force` any existing record is replaced and returned.
    pub fn put_request(
        &self,
        request: &TrainingRequest,
        force: bool,
        task_id: &str,
    ) -> Result<PutOutcome, RegistryError> {
        request.validate()?;

        let record = ModelRecord::started(request, task_id).map_err(|e| {
            RegistryError::Validation(format!("training request is not serializable: {}", e))
        })?;
        let condition = if force {
            PutCondition::Always
        } else {
            PutCondition::MustNotExist
        };

        let replaced = self.store.put(record.clone(), condition)?;
        match &replaced {
            Some(previous) => info!(
                model_id = %record.id,
                task_id,
                previous_status = %previous.status,
                "replaced model record"
            ),
            None => info!(model_id = %record.id, task_id, "created model record"),
        }

        Ok(PutOutcome { record, replaced })
    }

    /// Look up a record, returning `None` if it does not exist.
    pub fn find(&self, id: &str) -> Result<Option<ModelRecord>, RegistryError> {
        Ok(self.store.get(id)?)
    }

    /// Look up a record that must exist.
    pub fn get(&self, id: &str) -> Result<ModelRecord, RegistryError> {
        self.find(id)?.ok_or_else(|| RegistryError::NotFound { id: id.to_string() })
    }

    /// Look up a record and decode it into a listing entry.
    pub fn describe(&self, id: &str) -> Result<ModelEntry, RegistryError> {
        Ok(ModelEntry::from_record(self.get(id)?))
    }

    /// Remove a record, returning its last attributes.
    ///
    /// A training job still running for the record is not interrupted; its
    /// final status update will find nothing to update.
    pub fn delete(&self, id: &str) -> Result<ModelRecord, RegistryError> {
        let deleted = self.store.delete(id)?;
        info!(model_id = id, status = %deleted.status, "deleted model record");
        Ok(deleted)
    }

    /// List every model with its decoded training request.
    ///
    /// A record whose payload cannot be decoded is still listed, flagged with
    /// the decode error.
    pub fn list(&self) -> Result<Vec<ModelEntry>, RegistryError> {
        let entries: Vec<ModelEntry> = self
            .store
            .list_all()?
            .into_iter()
            .map(ModelEntry::from_record)
            .collect();
        debug!(count = entries.len(), "listed model records");
        Ok(entries)
    }

    /// Set a record's status regardless of which task owns it, returning the
    /// previous status.
    ///
    /// The move is still checked against the status lifecycle: a backwards or
    /// cross-terminal move fails with [`RegistryError::InvalidTransition`] and
    /// writes nothing. Setting the current status again is a no-op.
    pub fn update_status(
        &self,
        id: &str,
        status: ModelStatus,
    ) -> Result<ModelStatus, RegistryError> {
        Ok(self.store.update_status(id, status, None)?)
    }

    /// Record the terminal status of the training run started by `task_id`.
    ///
    /// Fails with [`RegistryError::StaleTask`] if the record has since been
    /// restarted by another task, and with [`RegistryError::NotFound`] if it
    /// has been deleted. Neither case writes anything.
    pub fn complete_task(
        &self,
        id: &str,
        task_id: &str,
        status: ModelStatus,
    ) -> Result<ModelStatus, RegistryError> {
        Ok(self.store.update_status(id, status, Some(task_id))?)
    }
}
