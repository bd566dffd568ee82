//! Error types for the batching engine.

use batching_core::JobId;

use crate::config::ConfigError;
use crate::trigger::TriggerError;

/// Result type for engine operations.
pub type BatchingResult<T> = Result<T, BatchingError>;

/// Errors raised by the job queue.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("Job not found: {0}")]
    NotFound(JobId),

    #[error("Queue is full ({capacity} jobs)")]
    Full { capacity: usize },
}

/// Error type for engine operations.
#[derive(Debug, thiserror::Error)]
pub enum BatchingError {
    #[error("Job not found: {0}")]
    JobNotFound(JobId),

    #[error("Queue is full ({capacity} jobs)")]
    QueueFull { capacity: usize },

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Trigger error: {0}")]
    Trigger(#[from] TriggerError),
}

impl From<QueueError> for BatchingError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::NotFound(id) => BatchingError::JobNotFound(id),
            QueueError::Full { capacity } => BatchingError::QueueFull { capacity },
        }
    }
}
