//! Per-type preprocessing applied to pending jobs before a batch is cut.
//!
//! Jobs are split by [`JobType`]; every type present gets its own blocking
//! task that runs the type's processor chain in registration order. Results
//! are collected in task-completion order, so the output keeps the relative
//! order within a type but makes no promise across types.

mod processors;

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use batching_core::{Job, JobType};
use tokio::task::{Id, JoinSet};

pub use processors::{BalanceUpdate, IdentityProcessor};

/// Error returned by a processor; aborts the rest of that type's chain.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ProcessorError(pub String);

impl ProcessorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Transformation over the jobs of a single type.
///
/// A processor may enrich, filter, reorder or rewrite the jobs it receives.
pub trait Processor: Send + Sync + 'static {
    fn process(&self, jobs: Vec<Job>) -> Result<Vec<Job>, ProcessorError>;
}

/// A simple function-based processor.
pub struct FnProcessor<F>
where
    F: Fn(Vec<Job>) -> Result<Vec<Job>, ProcessorError> + Send + Sync + 'static,
{
    processor: F,
}

impl<F> FnProcessor<F>
where
    F: Fn(Vec<Job>) -> Result<Vec<Job>, ProcessorError> + Send + Sync + 'static,
{
    /// Create a new function-based processor.
    pub fn new(processor: F) -> Self {
        Self { processor }
    }
}

impl<F> Processor for FnProcessor<F>
where
    F: Fn(Vec<Job>) -> Result<Vec<Job>, ProcessorError> + Send + Sync + 'static,
{
    fn process(&self, jobs: Vec<Job>) -> Result<Vec<Job>, ProcessorError> {
        (self.processor)(jobs)
    }
}

/// A chain that failed during one [`JobProcess::process`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainFailure {
    pub job_type: JobType,
    pub error: ProcessorError,
}

/// Output of one preprocessing pass.
#[derive(Debug, Default)]
pub struct Preprocessed {
    /// Combined jobs of every type, in task-completion order across types.
    pub jobs: Vec<Job>,
    /// Types whose chain failed; their original jobs are included unchanged.
    pub failures: Vec<ChainFailure>,
}

type Chain = Vec<Arc<dyn Processor>>;

/// Registry of processor chains keyed by job type.
#[derive(Default)]
pub struct JobProcess {
    chains: HashMap<JobType, Chain>,
}

impl JobProcess {
    /// Create an empty pipeline; every type passes through unchanged.
    pub fn new() -> Self {
        Self {
            chains: HashMap::new(),
        }
    }

    /// Pipeline with the built-in chains for the built-in job types.
    pub fn with_builtin_processors() -> Self {
        let mut pipeline = Self::new();
        pipeline.register(JobType::update_user_info(), IdentityProcessor);
        pipeline.register(JobType::balance_update(), BalanceUpdate);
        pipeline
    }

    /// Append a processor to the chain of `job_type`.
    pub fn register<P: Processor>(&mut self, job_type: impl Into<JobType>, processor: P) {
        self.chains
            .entry(job_type.into())
            .or_default()
            .push(Arc::new(processor));
    }

    /// Number of processors registered for a type.
    pub fn chain_len(&self, job_type: &JobType) -> usize {
        self.chains.get(job_type).map_or(0, Vec::len)
    }

    /// List all types with a registered chain.
    pub fn job_types(&self) -> Vec<&JobType> {
        self.chains.keys().collect()
    }

    /// Run every type's chain over its share of `jobs`, one task per type.
    ///
    /// Blocks until all tasks are done. A failing or panicking chain does not
    /// affect the other types.
    pub async fn process(&self, jobs: Vec<Job>) -> Preprocessed {
        let groups = split(jobs);
        let mut set = JoinSet::new();

        let mut in_flight: HashMap<Id, (JobType, usize)> = HashMap::new();
        for (job_type, group) in groups {
            let chain = self.chains.get(&job_type).cloned().unwrap_or_default();
            let label = (job_type.clone(), group.len());
            let handle = set.spawn_blocking(move || {
                let input = group.clone();
                let result = panic::catch_unwind(AssertUnwindSafe(|| run_chain(&chain, input)))
                    .unwrap_or_else(|payload| {
                        Err(ProcessorError::new(format!(
                            "processor panicked: {}",
                            panic_message(payload.as_ref())
                        )))
                    });
                (job_type, group, result)
            });
            in_flight.insert(handle.id(), label);
        }

        let mut output = Preprocessed::default();
        while let Some(joined) = set.join_next_with_id().await {
            match joined {
                Ok((_, (_, _, Ok(processed)))) => output.jobs.extend(processed),
                Ok((_, (job_type, original, Err(error)))) => {
                    tracing::warn!(
                        %job_type,
                        jobs = original.len(),
                        "Preprocessing chain failed, passing jobs through: {}",
                        error
                    );
                    output.jobs.extend(original);
                    output.failures.push(ChainFailure { job_type, error });
                }
                Err(e) => {
                    let (job_type, dropped) = in_flight
                        .remove(&e.id())
                        .unwrap_or_else(|| (JobType::from("unknown"), 0));
                    tracing::warn!(
                        %job_type,
                        dropped,
                        "Preprocessing task did not complete, its jobs are lost: {}",
                        e
                    );
                }
            }
        }

        output
    }
}

/// Stable partition of jobs by type, in order of each type's first appearance.
pub fn split(jobs: Vec<Job>) -> Vec<(JobType, Vec<Job>)> {
    let mut index: HashMap<JobType, usize> = HashMap::new();
    let mut groups: Vec<(JobType, Vec<Job>)> = Vec::new();

    for job in jobs {
        match index.get(&job.job_type) {
            Some(&i) => groups[i].1.push(job),
            None => {
                index.insert(job.job_type.clone(), groups.len());
                groups.push((job.job_type.clone(), vec![job]));
            }
        }
    }

    groups
}

fn run_chain(chain: &[Arc<dyn Processor>], mut jobs: Vec<Job>) -> Result<Vec<Job>, ProcessorError> {
    for processor in chain {
        jobs = processor.process(jobs)?;
    }
    Ok(jobs)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
