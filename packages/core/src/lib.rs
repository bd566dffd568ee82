//! Core domain types for the micro-batching system.
//!
//! This crate contains shared types used across all packages:
//! - Job, JobRequest and JobStatus for submitted work
//! - Batch identifiers and configuration payloads
//! - Events for observing the batching engine

mod batch;
mod events;
mod job;

pub use batch::{BatchFrequency, BatchId, BatchSize};
pub use events::BatchEvent;
pub use job::{Job, JobId, JobParams, JobRequest, JobStatus, JobType};
