//! Request-side half of training: write the record, enqueue the job.

use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

use super::{TrainingJob, TRAIN_JOB_TYPE};
use crate::error::RegistryError;
use crate::model::{CreateModelInput, ModelRecord, ModelStatus, TrainingRequest};
use crate::queue::{Job, JobSender, QueueError};
use crate::registry::ModelRegistry;
use crate::store::RecordStore;

/// Status message returned once training has been dispatched.
pub const TRAINING_STARTED: &str = "model training started";

/// Handle returned to the client as soon as a training job is queued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrainingTicket {
    pub status: String,
    pub task_id: String,
    pub model_id: String,
    /// Attributes of the record a forced create replaced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replaced: Option<ModelRecord>,
}

/// Validates training requests, writes the registry record, and hands the
/// job to the queue without waiting for training to run.
pub struct TrainingOrchestrator<S, Q> {
    registry: ModelRegistry<S>,
    sender: Q,
    queue_name: String,
}

impl<S, Q> TrainingOrchestrator<S, Q> {
    pub fn sender(&self) -> &Q {
        &self.sender
    }
}

impl<S: RecordStore, Q: JobSender> TrainingOrchestrator<S, Q> {
    pub fn new(registry: ModelRegistry<S>, sender: Q, queue_name: impl Into<String>) -> Self {
        Self {
            registry,
            sender,
            queue_name: queue_name.into(),
        }
    }

    pub fn registry(&self) -> &ModelRegistry<S> {
        &self.registry
    }

    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    /// Validate raw client input, then create or replace the model.
    pub fn submit(&self, input: CreateModelInput) -> Result<TrainingTicket, RegistryError> {
        let (request, force) = input.into_request()?;
        self.create_or_update(request, force)
    }

    /// Create (or, with `force`, replace) a model record and queue its training.
    ///
    /// Returns once the record is written and the job accepted by the queue.
    /// If the queue refuses the job, the record just written is marked
    /// `failed` so it does not sit in `started` with no job behind it.
    pub fn create_or_update(
        &self,
        request: TrainingRequest,
        force: bool,
    ) -> Result<TrainingTicket, RegistryError> {
        let task_id = Uuid::new_v4().to_string();
        let outcome = self.registry.put_request(&request, force, &task_id)?;

        let model_id = request.id.clone();
        let job = TrainingJob {
            task_id: task_id.clone(),
            request,
        };

        let sent = Job::encode(task_id.clone(), TRAIN_JOB_TYPE, &job)
            .map_err(QueueError::from)
            .and_then(|job| self.sender.send(&self.queue_name, job))
            .map_err(RegistryError::from);

        if let Err(err) = sent {
            error!(model_id = %model_id, task_id = %task_id, error = %err, "failed to enqueue training job");
            if let Err(mark_err) =
                self.registry
                    .complete_task(&model_id, &task_id, ModelStatus::Failed)
            {
                error!(model_id = %model_id, task_id = %task_id, error = %mark_err, "could not mark unqueued model as failed");
            }
            return Err(err);
        }

        info!(model_id = %model_id, task_id = %task_id, queue = %self.queue_name, "training job queued");

        Ok(TrainingTicket {
            status: TRAINING_STARTED.to_string(),
            task_id,
            model_id,
            replaced: outcome.replaced,
        })
    }
}
