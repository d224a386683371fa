//! Models - registry records describing a text-classification training job.
//!
//! A model here is metadata, not learned weights: where the training data
//! lives, which base model to start from, the training hyperparameters, and
//! how far the most recent training run has progressed.
//!
//! ## Layout
//!
//! Every record lives under the fixed partition key [`PARTITION_KEY`] with the
//! model id as its sort key. The attributes are the serialized training
//! request (`data`), the lifecycle `status`, and the `task_id` of the job that
//! last (re)started training.
//!
//! ```ignore
//! use textcat_registry::{ModelRecord, ModelStatus, TrainingRequest};
//!
//! let request = TrainingRequest::new("tc-01", "albert-textcats", "trainingSet.json");
//! let record = ModelRecord::started(&request, "task-1")?;
//! assert_eq!(record.status, ModelStatus::Started);
//! ```

mod request;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use request::{
    CreateModelInput, ForceFlag, TrainingRequest, DEFAULT_N_ITER, DEFAULT_N_TEXTS,
};
pub(crate) use request::{MISSING_PARAMETERS, WRONG_PARAMETERS};

/// Partition key shared by every model record.
pub const PARTITION_KEY: &str = "model";

/// Lifecycle status of a model record.
///
/// A missing record is the "none" state; it is represented by `Option::None`
/// wherever a record may be absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelStatus {
    Started,
    Active,
    Failed,
}

/// Outcome of checking a status change against the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The change moves the record forward.
    Apply,
    /// The record already has the requested status.
    Noop,
    /// The change would move the record backwards or between terminal states.
    Invalid,
}

impl ModelStatus {
    /// Check whether `self -> next` is allowed for an in-place status update.
    ///
    /// Only `Started -> Active` and `Started -> Failed` move a record forward.
    /// Returning to `Started` requires replacing the whole record.
    pub fn transition_to(self, next: ModelStatus) -> Transition {
        match (self, next) {
            (current, next) if current == next => Transition::Noop,
            (ModelStatus::Started, ModelStatus::Active)
            | (ModelStatus::Started, ModelStatus::Failed) => Transition::Apply,
            _ => Transition::Invalid,
        }
    }

    /// Returns true for `Active` and `Failed`.
    pub fn is_terminal(self) -> bool {
        !matches!(self, ModelStatus::Started)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ModelStatus::Started => "started",
            ModelStatus::Active => "active",
            ModelStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ModelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored model record.
///
/// `data` keeps the training request exactly as it was serialized when the
/// record was written, so a record with a damaged payload can still be
/// listed, deleted, and replaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRecord {
    pub id: String,
    pub data: String,
    pub status: ModelStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
}

impl ModelRecord {
    /// Build a freshly started record for `request`, owned by `task_id`.
    pub fn started(
        request: &TrainingRequest,
        task_id: impl Into<String>,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: request.id.clone(),
            data: serde_json::to_string(request)?,
            status: ModelStatus::Started,
            task_id: Some(task_id.into()),
        })
    }

    pub fn partition_key(&self) -> &'static str {
        PARTITION_KEY
    }

    /// Decode the stored training request.
    pub fn request(&self) -> Result<TrainingRequest, serde_json::Error> {
        serde_json::from_str(&self.data)
    }

    /// Returns true if this record was last started by `task_id`.
    pub fn is_owned_by(&self, task_id: &str) -> bool {
        self.task_id.as_deref() == Some(task_id)
    }
}
