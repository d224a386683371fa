//! Worker-side half of training: run the routine, report the outcome.

use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, info, warn};

use super::{TrainingJob, TrainingRoutine};
use crate::error::RegistryError;
use crate::model::ModelStatus;
use crate::queue::Job;
use crate::registry::ModelRegistry;
use crate::store::RecordStore;

/// What happened to a job. Every outcome means the job is finished with and
/// can be acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// Training succeeded and the model is now active.
    Trained,
    /// Training failed and the model is now failed.
    Failed,
    /// The record was deleted; nothing was written.
    Orphaned,
    /// The record was restarted by a newer task; nothing was written.
    Stale,
    /// The task had already reached a terminal status (redelivered job).
    Duplicate,
    /// The job payload could not be decoded.
    Discarded,
}

/// Runs training jobs against a registry.
pub struct TrainingWorker<S, T> {
    registry: ModelRegistry<S>,
    routine: T,
}

impl<S: RecordStore, T: TrainingRoutine> TrainingWorker<S, T> {
    pub fn new(registry: ModelRegistry<S>, routine: T) -> Self {
        Self { registry, routine }
    }

    pub fn registry(&self) -> &ModelRegistry<S> {
        &self.registry
    }

    /// Process one job.
    ///
    /// Only store failures are returned as errors; the caller should hand the
    /// job back to the queue so it is retried. Training failures, deleted
    /// records and superseded tasks are all normal outcomes.
    pub fn execute(&self, job: &Job) -> Result<JobOutcome, RegistryError> {
        let TrainingJob { task_id, request } = match job.decode::<TrainingJob>() {
            Ok(payload) => payload,
            Err(e) => {
                warn!(job_id = %job.id, error = %e, "discarding undecodable training job");
                return Ok(JobOutcome::Discarded);
            }
        };
        let model_id = request.id.clone();

        match self.registry.find(&model_id)? {
            None => {
                info!(model_id = %model_id, task_id = %task_id, "model deleted before training started");
                return Ok(JobOutcome::Orphaned);
            }
            Some(record) if !record.is_owned_by(&task_id) => {
                info!(model_id = %model_id, task_id = %task_id, "model restarted by another task, skipping");
                return Ok(JobOutcome::Stale);
            }
            Some(record) if record.status.is_terminal() => {
                debug!(model_id = %model_id, task_id = %task_id, status = %record.status, "training already finished");
                return Ok(JobOutcome::Duplicate);
            }
            Some(_) => {}
        }

        info!(model_id = %model_id, task_id = %task_id, delivery = job.deliveries, "training started");

        let result = panic::catch_unwind(AssertUnwindSafe(|| self.routine.train(&request)));
        let status = match result {
            Ok(Ok(())) => ModelStatus::Active,
            Ok(Err(failure)) => {
                warn!(model_id = %model_id, task_id = %task_id, error = %failure, "training failed");
                ModelStatus::Failed
            }
            Err(_) => {
                warn!(model_id = %model_id, task_id = %task_id, "training routine panicked");
                ModelStatus::Failed
            }
        };

        match self.registry.complete_task(&model_id, &task_id, status) {
            Ok(_) => {
                info!(model_id = %model_id, task_id = %task_id, status = %status, "training finished");
                Ok(match status {
                    ModelStatus::Active => JobOutcome::Trained,
                    _ => JobOutcome::Failed,
                })
            }
            Err(RegistryError::NotFound { .. }) => {
                warn!(model_id = %model_id, task_id = %task_id, "model deleted during training, status not recorded");
                Ok(JobOutcome::Orphaned)
            }
            Err(RegistryError::StaleTask { .. }) => {
                info!(model_id = %model_id, task_id = %task_id, "model restarted during training, status not recorded");
                Ok(JobOutcome::Stale)
            }
            Err(RegistryError::InvalidTransition { from, .. }) => {
                debug!(model_id = %model_id, task_id = %task_id, current = %from, "status already settled");
                Ok(JobOutcome::Duplicate)
            }
            Err(e) => Err(e),
        }
    }
}
