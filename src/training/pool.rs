//! Background threads that listen on the training queue.
//!
//! Each thread polls the named queue, runs the job through a shared
//! [`TrainingWorker`], and acks it, or nacks it when the outcome could not be
//! recorded so the queue redelivers it. Stop the pool to collect statistics.

use std::io;
use std::sync::mpsc::{channel, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error, warn};

use super::worker::{JobOutcome, TrainingWorker};
use super::TrainingRoutine;
use crate::queue::JobListener;
use crate::store::RecordStore;

/// Statistics from the worker threads.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WorkerStats {
    /// Jobs whose model became active.
    pub trained: usize,
    /// Jobs whose model became failed.
    pub failed: usize,
    /// Jobs whose model was deleted before or during training.
    pub orphaned: usize,
    /// Jobs superseded by a forced restart.
    pub stale: usize,
    /// Redelivered jobs for already-finished tasks.
    pub duplicates: usize,
    /// Jobs with undecodable payloads.
    pub discarded: usize,
    /// Jobs handed back to the queue after a store error.
    pub errored: usize,
    /// Number of poll cycles completed.
    pub polls: usize,
}

impl WorkerStats {
    fn record(&mut self, outcome: JobOutcome) {
        match outcome {
            JobOutcome::Trained => self.trained += 1,
            JobOutcome::Failed => self.failed += 1,
            JobOutcome::Orphaned => self.orphaned += 1,
            JobOutcome::Stale => self.stale += 1,
            JobOutcome::Duplicate => self.duplicates += 1,
            JobOutcome::Discarded => self.discarded += 1,
        }
    }

    fn merge(&mut self, other: &WorkerStats) {
        self.trained += other.trained;
        self.failed += other.failed;
        self.orphaned += other.orphaned;
        self.stale += other.stale;
        self.duplicates += other.duplicates;
        self.discarded += other.discarded;
        self.errored += other.errored;
        self.polls += other.polls;
    }

    /// Jobs that were acknowledged.
    pub fn completed(&self) -> usize {
        self.trained + self.failed + self.orphaned + self.stale + self.duplicates + self.discarded
    }
}

struct WorkerThread {
    stop_tx: Sender<()>,
    handle: Option<JoinHandle<WorkerStats>>,
}

/// A pool of background threads consuming training jobs from one queue.
///
/// ## Example
///
/// ```ignore
/// let worker = Arc::new(TrainingWorker::new(registry, ImmediateTrainer));
/// let pool = TrainingWorkerPool::spawn(
///     worker,
///     "training",
///     queue.clone(),
///     2,
///     Duration::from_millis(10),
/// )?;
///
/// // ... create models ...
///
/// let stats = pool.stop();
/// println!("trained {} models", stats.trained);
/// ```
pub struct TrainingWorkerPool {
    threads: Vec<WorkerThread>,
}

impl TrainingWorkerPool {
    /// Spawn `size` listener threads (at least one) sharing `worker`.
    pub fn spawn<S, T, L>(
        worker: Arc<TrainingWorker<S, T>>,
        queue_name: &str,
        listener: L,
        size: usize,
        poll_interval: Duration,
    ) -> io::Result<Self>
    where
        S: RecordStore + 'static,
        T: TrainingRoutine + 'static,
        L: JobListener + Clone + 'static,
    {
        let mut threads = Vec::with_capacity(size.max(1));

        for index in 0..size.max(1) {
            let (stop_tx, stop_rx) = channel();
            let worker = Arc::clone(&worker);
            let listener = listener.clone();
            let queue_name = queue_name.to_string();

            let handle = thread::Builder::new()
                .name(format!("training-worker-{}", index))
                .spawn(move || {
                    let mut stats = WorkerStats::default();

                    loop {
                        // Check for stop signal
                        match stop_rx.try_recv() {
                            Ok(()) | Err(TryRecvError::Disconnected) => break,
                            Err(TryRecvError::Empty) => {}
                        }

                        stats.polls += 1;

                        match listener.listen(&queue_name, poll_interval.as_millis() as u64) {
                            Ok(Some(job)) => match worker.execute(&job) {
                                Ok(outcome) => {
                                    stats.record(outcome);
                                    if let Err(e) = listener.ack(&job.id) {
                                        warn!(job_id = %job.id, error = %e, "failed to ack training job");
                                    }
                                }
                                Err(e) => {
                                    stats.errored += 1;
                                    error!(job_id = %job.id, error = %e, "training job not recorded, returning to queue");
                                    if let Err(e) = listener.nack(&job.id, &e.to_string()) {
                                        warn!(job_id = %job.id, error = %e, "failed to nack training job");
                                    }
                                }
                            },
                            Ok(None) => {}
                            Err(e) => {
                                warn!(queue = %queue_name, error = %e, "listen failed");
                                thread::sleep(poll_interval);
                            }
                        }
                    }

                    debug!(?stats, "training worker stopped");
                    stats
                })?;

            threads.push(WorkerThread {
                stop_tx,
                handle: Some(handle),
            });
        }

        Ok(Self { threads })
    }

    /// Number of worker threads.
    pub fn size(&self) -> usize {
        self.threads.len()
    }

    /// Signal every thread to stop and wait for them. Returns combined stats.
    ///
    /// A thread in the middle of a training run finishes that job first.
    pub fn stop(mut self) -> WorkerStats {
        for thread in &self.threads {
            let _ = thread.stop_tx.send(());
        }

        let mut total = WorkerStats::default();
        for thread in &mut self.threads {
            if let Some(handle) = thread.handle.take() {
                total.merge(&handle.join().unwrap_or_default());
            }
        }
        total
    }

    /// Signal every thread to stop without waiting.
    pub fn signal_stop(&self) {
        for thread in &self.threads {
            let _ = thread.stop_tx.send(());
        }
    }
}

impl Drop for TrainingWorkerPool {
    fn drop(&mut self) {
        self.signal_stop();
    }
}
