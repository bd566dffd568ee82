//! Downstream batch processor contract.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use batching_core::Job;

/// Future type for batch processing.
pub type BatchFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Consumer of finished batches.
///
/// The engine hands each batch over exactly once and never looks at the
/// outcome; retries and status updates belong to the implementation.
pub trait BatchProcessor: Send + Sync + 'static {
    /// Process a batch, then pace for `pacing` before returning.
    fn process_and_sleep(&self, batch: Vec<Job>, pacing: Duration) -> BatchFuture;
}

/// Default processor: logs every job in the batch, then sleeps for the pacing delay.
#[derive(Debug, Default, Clone, Copy)]
pub struct PacedBatchProcessor;

impl BatchProcessor for PacedBatchProcessor {
    fn process_and_sleep(&self, batch: Vec<Job>, pacing: Duration) -> BatchFuture {
        Box::pin(async move {
            for job in &batch {
                tracing::info!(job_id = %job.id, job_type = %job.job_type, "Processing job {}", job.name);
            }
            tokio::time::sleep(pacing).await;
        })
    }
}

/// A simple function-based batch processor.
pub struct FnBatchProcessor<F>
where
    F: Fn(Vec<Job>, Duration) -> BatchFuture + Send + Sync + 'static,
{
    processor: F,
}

impl<F> FnBatchProcessor<F>
where
    F: Fn(Vec<Job>, Duration) -> BatchFuture + Send + Sync + 'static,
{
    /// Create a new function-based processor.
    pub fn new(processor: F) -> Self {
        Self { processor }
    }
}

impl<F> BatchProcessor for FnBatchProcessor<F>
where
    F: Fn(Vec<Job>, Duration) -> BatchFuture + Send + Sync + 'static,
{
    fn process_and_sleep(&self, batch: Vec<Job>, pacing: Duration) -> BatchFuture {
        (self.processor)(batch, pacing)
    }
}
