//! Micro-batching engine.
//!
//! This crate accumulates submitted jobs and periodically hands them to a
//! downstream processor in bounded batches.
//!
//! # Architecture
//!
//! - `JobQueue` - FIFO holding area for submitted jobs
//! - `JobProcess` - per-type preprocessing chains, one task per job type
//! - `TickerActor` - ractor actor that turns interval ticks into batch cuts
//! - `DispatchTracker` - counts in-flight batches for graceful shutdown
//! - `Batching` - ties it together and owns the lifecycle
//!
//! # Usage
//!
//! ```ignore
//! use batching::{Batching, PacedBatchProcessor, RunConfig};
//!
//! let engine = Batching::new(RunConfig::default(), PacedBatchProcessor);
//! engine.start().await?;
//! engine.take(JobRequest::new("balance_update", "credit"))?;
//! engine.shut_down().await?;
//! ```

mod config;
mod dispatch;
mod engine;
mod error;
pub mod preprocess;
mod processor;
mod queue;
mod trigger;

pub use config::{ConfigError, RunConfig};
pub use dispatch::DispatchTracker;
pub use engine::Batching;
pub use error::{BatchingError, BatchingResult, QueueError};
pub use preprocess::{FnProcessor, JobProcess, Processor, ProcessorError};
pub use processor::{BatchFuture, BatchProcessor, FnBatchProcessor, PacedBatchProcessor};
pub use queue::JobQueue;
pub use trigger::{
    ActorTrigger, ScheduledTrigger, TickFn, TickerActor, TickerMessage, TriggerError,
    TriggerFuture, TriggerProvider,
};

/// Re-export core types for convenience.
pub use batching_core::{
    BatchEvent, BatchFrequency, BatchId, BatchSize, Job, JobId, JobParams, JobRequest, JobStatus,
    JobType,
};
