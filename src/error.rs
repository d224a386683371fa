use thiserror::Error;

use crate::model::ModelStatus;
use crate::queue::QueueError;
use crate::store::StoreError;

/// Error returned by every public registry, orchestrator and prediction operation.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Missing or malformed client input.
    #[error("{0}")]
    Validation(String),

    /// A non-forced create hit an existing record.
    #[error("cannot update existing model {id} without force")]
    ModelAlreadyExists { id: String },

    /// Delete, get or status update on a record that does not exist.
    #[error("model {id} does not exist")]
    NotFound { id: String },

    /// Prediction against a model id with no record.
    #[error("model {id} does not exist")]
    ModelNotFound { id: String },

    /// Prediction against a model that has not finished training, when
    /// active models are required.
    #[error("model {id} is not ready for prediction (status {status})")]
    ModelNotReady { id: String, status: ModelStatus },

    /// A status update that would move the record backwards.
    #[error("model {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: String,
        from: ModelStatus,
        to: ModelStatus,
    },

    /// A status update issued by a job that no longer owns the record.
    #[error("model {id} was restarted by another task; update from {task_id} ignored")]
    StaleTask { id: String, task_id: String },

    /// The stored training request could not be decoded.
    #[error("model {id} has a corrupt payload: {reason}")]
    CorruptRecord { id: String, reason: String },

    /// Backing store unavailable or failing.
    #[error("store error: {0}")]
    Store(String),

    /// The training job could not be enqueued.
    #[error("queue error: {0}")]
    Queue(String),

    /// The scoring routine failed or returned unusable scores.
    #[error("scoring error: {0}")]
    Scoring(String),
}

impl RegistryError {
    /// Map this error to an HTTP-style status code.
    pub fn status_code(&self) -> u16 {
        match self {
            RegistryError::Validation(_) => 400,
            RegistryError::ModelAlreadyExists { .. } => 409,
            RegistryError::NotFound { .. } => 404,
            RegistryError::ModelNotFound { .. } => 404,
            RegistryError::ModelNotReady { .. } => 409,
            RegistryError::InvalidTransition { .. } => 409,
            RegistryError::StaleTask { .. } => 409,
            RegistryError::CorruptRecord { .. } => 500,
            RegistryError::Store(_) => 500,
            RegistryError::Queue(_) => 502,
            RegistryError::Scoring(_) => 502,
        }
    }
}

impl From<StoreError> for RegistryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { id } => RegistryError::ModelAlreadyExists { id },
            StoreError::NotFound { id } => RegistryError::NotFound { id },
            StoreError::InvalidTransition { id, from, to } => {
                RegistryError::InvalidTransition { id, from, to }
            }
            StoreError::StaleTask { id, task_id } => RegistryError::StaleTask { id, task_id },
            StoreError::Unavailable(msg) => RegistryError::Store(msg),
        }
    }
}

impl From<QueueError> for RegistryError {
    fn from(err: QueueError) -> Self {
        RegistryError::Queue(err.to_string())
    }
}
