//! The pluggable training body.

use thiserror::Error;
use tracing::debug;

use crate::model::TrainingRequest;

/// Error returned by a training routine. The worker turns it into a
/// `failed` status; it never reaches the client that requested training.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("training failed: {message}")]
pub struct TrainingFailure {
    pub message: String,
}

impl TrainingFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Trains a model for a request. May block for as long as training takes.
pub trait TrainingRoutine: Send + Sync {
    fn train(&self, request: &TrainingRequest) -> Result<(), TrainingFailure>;
}

impl<F> TrainingRoutine for F
where
    F: Fn(&TrainingRequest) -> Result<(), TrainingFailure> + Send + Sync,
{
    fn train(&self, request: &TrainingRequest) -> Result<(), TrainingFailure> {
        self(request)
    }
}

/// Training routine that succeeds immediately without doing any work.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateTrainer;

impl TrainingRoutine for ImmediateTrainer {
    fn train(&self, request: &TrainingRequest) -> Result<(), TrainingFailure> {
        debug!(
            model_id = %request.id,
            s3bucket = %request.s3bucket,
            training_object = %request.training_object,
            n_texts = request.n_texts,
            n_iter = request.n_iter,
            "immediate trainer accepted request"
        );
        Ok(())
    }
}
