//! In-memory job queue for testing and single-process deployments.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use super::{Job, JobListener, JobSender, QueueError};

/// Record of traffic, kept only when asked for.
#[derive(Default)]
struct History {
    /// Every job accepted, in send order.
    sent: Vec<Job>,
    /// Acknowledged job ids, in ack order.
    acked: Vec<String>,
}

#[derive(Default)]
struct QueueState {
    /// Ready jobs per named queue.
    ready: HashMap<String, VecDeque<Job>>,
    /// Delivered but not yet acknowledged, by job id. A job redelivered while
    /// a copy is still out has one entry per copy, oldest first.
    in_flight: HashMap<String, VecDeque<(String, Job)>>,
    history: Option<History>,
}

impl QueueState {
    /// Take the oldest outstanding copy of a job.
    fn take_in_flight(&mut self, job_id: &str) -> Result<(String, Job), QueueError> {
        let copies = self
            .in_flight
            .get_mut(job_id)
            .ok_or_else(|| QueueError::UnknownJob(job_id.to_string()))?;
        let taken = copies
            .pop_front()
            .ok_or_else(|| QueueError::UnknownJob(job_id.to_string()))?;
        if copies.is_empty() {
            self.in_flight.remove(job_id);
        }
        Ok(taken)
    }
}

/// In-memory job queue.
///
/// Features:
/// - Thread-safe (clones share the same queues)
/// - Named point-to-point queues with competing listeners
/// - In-flight tracking; `nack` puts a job back at the tail of its queue
///
/// Acknowledged jobs are dropped. Build the queue with
/// [`InMemoryJobQueue::with_history`] to keep a log of sent and acknowledged
/// jobs for inspection.
#[derive(Clone, Default)]
pub struct InMemoryJobQueue {
    state: Arc<Mutex<QueueState>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// A queue that also records every sent job and every ack.
    pub fn with_history() -> Self {
        let queue = Self::default();
        if let Ok(mut state) = queue.state.lock() {
            state.history = Some(History::default());
        }
        queue
    }

    fn state(&self) -> Result<MutexGuard<'_, QueueState>, QueueError> {
        self.state
            .lock()
            .map_err(|_| QueueError::ConnectionFailed("queue lock poisoned".into()))
    }

    /// Simulate the broker refusing connections (or recovering).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of jobs waiting on a named queue.
    pub fn pending(&self, queue: &str) -> usize {
        self.state()
            .map(|s| s.ready.get(queue).map_or(0, VecDeque::len))
            .unwrap_or(0)
    }

    /// Number of delivered, unacknowledged copies across all queues.
    pub fn in_flight(&self) -> usize {
        self.state()
            .map(|s| s.in_flight.values().map(VecDeque::len).sum())
            .unwrap_or(0)
    }

    /// Every job accepted so far, in send order. Empty without history.
    pub fn sent(&self) -> Vec<Job> {
        self.state()
            .ok()
            .and_then(|s| s.history.as_ref().map(|h| h.sent.clone()))
            .unwrap_or_default()
    }

    /// Acknowledged job ids, in ack order. Empty without history.
    pub fn acknowledged(&self) -> Vec<String> {
        self.state()
            .ok()
            .and_then(|s| s.history.as_ref().map(|h| h.acked.clone()))
            .unwrap_or_default()
    }

    /// Put a copy of an already-sent job back on its queue, as a broker does
    /// when a visibility window lapses. Needs history.
    pub fn redeliver(&self, queue: &str, job_id: &str) -> Result<(), QueueError> {
        let mut state = self.state()?;
        let job = state
            .history
            .as_ref()
            .and_then(|h| h.sent.iter().find(|job| job.id == job_id).cloned())
            .ok_or_else(|| QueueError::UnknownJob(job_id.to_string()))?;
        state.ready.entry(queue.to_string()).or_default().push_back(job);
        Ok(())
    }
}

impl JobSender for InMemoryJobQueue {
    fn send(&self, queue: &str, job: Job) -> Result<(), QueueError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(QueueError::ConnectionFailed("job queue is unavailable".into()));
        }
        let mut state = self.state()?;
        if let Some(history) = state.history.as_mut() {
            history.sent.push(job.clone());
        }
        state.ready.entry(queue.to_string()).or_default().push_back(job);
        Ok(())
    }
}

impl JobListener for InMemoryJobQueue {
    fn listen(&self, queue: &str, timeout_ms: u64) -> Result<Option<Job>, QueueError> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);

        loop {
            {
                let mut state = self.state()?;
                let next = state.ready.get_mut(queue).and_then(VecDeque::pop_front);
                if let Some(mut job) = next {
                    job.deliveries += 1;
                    state
                        .in_flight
                        .entry(job.id.clone())
                        .or_default()
                        .push_back((queue.to_string(), job.clone()));
                    return Ok(Some(job));
                }
            }

            if Instant::now() >= deadline {
                return Ok(None);
            }

            // Small sleep to avoid busy-waiting
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    fn ack(&self, job_id: &str) -> Result<(), QueueError> {
        let mut state = self.state()?;
        state.take_in_flight(job_id)?;
        if let Some(history) = state.history.as_mut() {
            history.acked.push(job_id.to_string());
        }
        Ok(())
    }

    fn nack(&self, job_id: &str, _reason: &str) -> Result<(), QueueError> {
        let mut state = self.state()?;
        let (queue, job) = state.take_in_flight(job_id)?;
        state.ready.entry(queue).or_default().push_back(job);
        Ok(())
    }
}
