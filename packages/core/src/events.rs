//! Event types emitted by the batching engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{BatchId, Job, JobId, JobType};

/// Events emitted by the batching engine while it cuts and dispatches batches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BatchEvent {
    // Submission events
    /// A new job was accepted into the queue.
    JobQueued { job: Job, timestamp: DateTime<Utc> },

    // Tick events
    /// A tick found the queue empty and dispatched nothing.
    TickSkipped { timestamp: DateTime<Utc> },
    /// The pending jobs went through the preprocessing pipeline.
    Preprocessed {
        jobs_in: usize,
        jobs_out: usize,
        timestamp: DateTime<Utc>,
    },
    /// One type's preprocessing chain failed; its jobs passed through unchanged.
    PreprocessFailed {
        job_type: JobType,
        error: String,
        timestamp: DateTime<Utc>,
    },

    // Batch events
    /// A batch was cut from the queue and handed to a dispatch task.
    BatchDispatched {
        batch_id: BatchId,
        job_ids: Vec<JobId>,
        timestamp: DateTime<Utc>,
    },
    /// The batch processor returned for a dispatched batch.
    BatchCompleted {
        batch_id: BatchId,
        job_count: usize,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    // Lifecycle events
    /// The periodic trigger was started.
    TriggerStarted {
        frequency_secs: u64,
        batch_size: usize,
        timestamp: DateTime<Utc>,
    },
    /// The periodic trigger was stopped.
    TriggerStopped { timestamp: DateTime<Utc> },
}

impl BatchEvent {
    /// Get the timestamp of the event.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            BatchEvent::JobQueued { timestamp, .. } => *timestamp,
            BatchEvent::TickSkipped { timestamp } => *timestamp,
            BatchEvent::Preprocessed { timestamp, .. } => *timestamp,
            BatchEvent::PreprocessFailed { timestamp, .. } => *timestamp,
            BatchEvent::BatchDispatched { timestamp, .. } => *timestamp,
            BatchEvent::BatchCompleted { timestamp, .. } => *timestamp,
            BatchEvent::TriggerStarted { timestamp, .. } => *timestamp,
            BatchEvent::TriggerStopped { timestamp } => *timestamp,
        }
    }

    /// Get the batch ID associated with this event, if any.
    pub fn batch_id(&self) -> Option<BatchId> {
        match self {
            BatchEvent::BatchDispatched { batch_id, .. } => Some(*batch_id),
            BatchEvent::BatchCompleted { batch_id, .. } => Some(*batch_id),
            _ => None,
        }
    }

    /// Get a short description of this event for logging.
    pub fn description(&self) -> String {
        match self {
            BatchEvent::JobQueued { job, .. } => {
                format!("Job {} ({}) queued", job.id, job.job_type)
            }
            BatchEvent::TickSkipped { .. } => "No jobs to process".to_string(),
            BatchEvent::Preprocessed {
                jobs_in, jobs_out, ..
            } => format!("Preprocessed {} jobs into {}", jobs_in, jobs_out),
            BatchEvent::PreprocessFailed {
                job_type, error, ..
            } => format!("Preprocessing for {} failed: {}", job_type, error),
            BatchEvent::BatchDispatched {
                batch_id, job_ids, ..
            } => format!("Batch {} dispatched with {} jobs", batch_id, job_ids.len()),
            BatchEvent::BatchCompleted {
                batch_id,
                duration_ms,
                ..
            } => format!("Batch {} processed in {}ms", batch_id, duration_ms),
            BatchEvent::TriggerStarted {
                frequency_secs,
                batch_size,
                ..
            } => format!(
                "Trigger started: every {}s, up to {} jobs",
                frequency_secs, batch_size
            ),
            BatchEvent::TriggerStopped { .. } => "Trigger stopped".to_string(),
        }
    }
}
