//! Thread-safe FIFO holding area for submitted jobs.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use batching_core::{Job, JobId};

use crate::error::QueueError;

/// Ordered queue of jobs waiting for the next batch.
///
/// All operations go through one mutex, so every enqueue is visible to every
/// later dequeue or size check. Nothing here ever waits for jobs to arrive.
#[derive(Debug, Default)]
pub struct JobQueue {
    jobs: Mutex<VecDeque<Job>>,
    /// Maximum number of queued jobs accepted from submitters.
    capacity: Option<usize>,
}

impl JobQueue {
    /// Create an unbounded queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a queue that refuses submissions beyond `capacity` jobs.
    pub fn bounded(capacity: usize) -> Self {
        Self {
            jobs: Mutex::new(VecDeque::new()),
            capacity: Some(capacity),
        }
    }

    /// Create a queue with an optional capacity.
    pub fn with_capacity_limit(capacity: Option<usize>) -> Self {
        Self {
            jobs: Mutex::new(VecDeque::new()),
            capacity,
        }
    }

    /// Submission limit, `None` when unbounded.
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    // Critical sections never leave the deque half-updated, so a poisoned
    // lock still guards consistent data.
    fn lock(&self) -> MutexGuard<'_, VecDeque<Job>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_room(&self, queued: usize, incoming: usize) -> Result<(), QueueError> {
        match self.capacity {
            Some(capacity) if queued + incoming > capacity => Err(QueueError::Full { capacity }),
            _ => Ok(()),
        }
    }

    /// Append one job at the back of the queue.
    pub fn enqueue(&self, job: Job) -> Result<(), QueueError> {
        let mut jobs = self.lock();
        self.check_room(jobs.len(), 1)?;
        jobs.push_back(job);
        Ok(())
    }

    /// Append a sequence of jobs, keeping their relative order.
    ///
    /// Either every job is accepted or, when the capacity would be exceeded,
    /// none is.
    pub fn enqueue_many(&self, batch: Vec<Job>) -> Result<(), QueueError> {
        let mut jobs = self.lock();
        self.check_room(jobs.len(), batch.len())?;
        jobs.extend(batch);
        Ok(())
    }

    /// Put jobs back at the front of the queue, ahead of anything queued since
    /// they were taken out. Ignores the capacity limit.
    pub fn restore_front(&self, batch: Vec<Job>) {
        let mut jobs = self.lock();
        for job in batch.into_iter().rev() {
            jobs.push_front(job);
        }
    }

    /// Remove and return up to `n` of the oldest jobs.
    pub fn dequeue(&self, n: usize) -> Vec<Job> {
        let mut jobs = self.lock();
        let take = n.min(jobs.len());
        jobs.drain(..take).collect()
    }

    /// Remove and return every queued job.
    pub fn drain(&self) -> Vec<Job> {
        self.lock().drain(..).collect()
    }

    /// Look up a job that is still waiting in the queue.
    pub fn find(&self, id: JobId) -> Result<Job, QueueError> {
        self.lock()
            .iter()
            .find(|job| job.id == id)
            .cloned()
            .ok_or(QueueError::NotFound(id))
    }

    /// Number of queued jobs.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
