//! Job queue - point-to-point handoff between the request path and workers.
//!
//! The request path `send`s a job to a named queue and returns immediately.
//! Workers compete to `listen` on the same queue; each job is handed to one
//! listener at a time and stays in flight until it is `ack`ed. A `nack`
//! returns the job to the queue, so delivery is at-least-once and consumers
//! must be idempotent.
//!
//! ```text
//!  create request ──send──▶ ┌──────────────┐ ──listen──▶ worker 1
//!                           │  "training"  │ ──listen──▶ worker 2
//!                           └──────────────┘ ◀──ack/nack──
//! ```
//!
//! ## Example
//!
//! ```
//! use textcat_registry::queue::{InMemoryJobQueue, Job, JobListener, JobSender};
//!
//! let queue = InMemoryJobQueue::new();
//! queue.send("training", Job::with_string_payload("job-1", "model.train", "{}")).unwrap();
//!
//! let job = queue.listen("training", 100).unwrap().unwrap();
//! assert_eq!(job.job_type, "model.train");
//! queue.ack(&job.id).unwrap();
//! ```

mod in_memory;
mod job;

use thiserror::Error;

pub use in_memory::InMemoryJobQueue;
pub use job::{Job, PayloadError};

/// Error type for queue operations.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Connection to the queue failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    /// The job could not be serialized.
    #[error("serialization failed: {0}")]
    SerializationFailed(String),
    /// Ack or nack for a job that is not in flight.
    #[error("job {0} is not in flight")]
    UnknownJob(String),
}

impl From<PayloadError> for QueueError {
    fn from(err: PayloadError) -> Self {
        QueueError::SerializationFailed(err.message)
    }
}

/// Trait for sending jobs to a named queue.
pub trait JobSender: Send + Sync {
    /// Enqueue a job. Returns once the queue has accepted it.
    fn send(&self, queue: &str, job: Job) -> Result<(), QueueError>;
}

/// Trait for consuming jobs from a named queue (competing consumers).
pub trait JobListener: Send + Sync {
    /// Take the next job from a named queue, blocking until one is available
    /// or the timeout expires.
    fn listen(&self, queue: &str, timeout_ms: u64) -> Result<Option<Job>, QueueError>;

    /// Acknowledge that a job has been fully processed.
    fn ack(&self, job_id: &str) -> Result<(), QueueError>;

    /// Return a job to its queue for redelivery.
    fn nack(&self, job_id: &str, reason: &str) -> Result<(), QueueError>;
}
