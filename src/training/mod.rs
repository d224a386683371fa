//! Training orchestration - request-side dispatch and worker-side execution.
//!
//! The two halves never call each other. The [`TrainingOrchestrator`] writes
//! the record and hands a [`TrainingJob`] snapshot to the queue; a
//! [`TrainingWorker`] (usually inside a [`TrainingWorkerPool`]) takes the job,
//! runs the [`TrainingRoutine`], and reports the terminal status back to the
//! registry.
//!
//! ```text
//! (no record) ──create──▶ started ──train ok──▶ active
//!                            └─────train err──▶ failed
//! any ──forced create──▶ started        any ──delete──▶ (no record)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! let store = InMemoryRecordStore::new();
//! let queue = InMemoryJobQueue::new();
//!
//! let orchestrator = TrainingOrchestrator::new(ModelRegistry::new(store.clone()), queue.clone(), "training");
//! let ticket = orchestrator.create_or_update(TrainingRequest::new("tc-01", "b", "t.json"), false)?;
//!
//! let worker = Arc::new(TrainingWorker::new(ModelRegistry::new(store), ImmediateTrainer));
//! let pool = TrainingWorkerPool::spawn(worker, "training", queue, 2, Duration::from_millis(50))?;
//! // ...
//! let stats = pool.stop();
//! ```

mod orchestrator;
mod pool;
mod routine;
mod worker;

use serde::{Deserialize, Serialize};

use crate::model::TrainingRequest;

pub use orchestrator::{TrainingOrchestrator, TrainingTicket, TRAINING_STARTED};
pub use pool::{TrainingWorkerPool, WorkerStats};
pub use routine::{ImmediateTrainer, TrainingFailure, TrainingRoutine};
pub use worker::{JobOutcome, TrainingWorker};

/// Job type used for training jobs on the queue.
pub const TRAIN_JOB_TYPE: &str = "model.train";

/// Payload of a training job: the request snapshot and the task that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingJob {
    pub task_id: String,
    pub request: TrainingRequest,
}
