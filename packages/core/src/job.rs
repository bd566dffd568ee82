//! Job domain types for units of work submitted for batching.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unique identifier for a job, using ULID for chronological sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Ulid);

impl JobId {
    /// Create a new unique job ID.
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Parse a job ID from a string.
    pub fn parse(s: &str) -> Result<Self, ulid::DecodeError> {
        Ok(Self(Ulid::from_string(s)?))
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Routing tag that selects a job's preprocessing chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobType(String);

impl JobType {
    /// Built-in type for user profile updates.
    pub const UPDATE_USER_INFO: &'static str = "update_user_info";
    /// Built-in type for account balance changes.
    pub const BALANCE_UPDATE: &'static str = "balance_update";

    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn update_user_info() -> Self {
        Self::new(Self::UPDATE_USER_INFO)
    }

    pub fn balance_update() -> Self {
        Self::new(Self::BALANCE_UPDATE)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for JobType {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

impl From<String> for JobType {
    fn from(tag: String) -> Self {
        Self(tag)
    }
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Current status of a job.
///
/// The batching engine only ever assigns `Queued`; the remaining states belong
/// to whatever processes the dispatched batches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Job is waiting in the queue for the next batch.
    #[default]
    Queued,
    /// Job has been handed to the batch processor.
    Processing,
    /// Job completed successfully.
    Completed,
    /// Job failed downstream.
    Failed,
}

impl JobStatus {
    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Get a simple status string for display.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

/// Opaque key-value payload carried by a job.
pub type JobParams = serde_json::Map<String, serde_json::Value>;

/// Caller-supplied fields for a new job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRequest {
    /// Type of job (used for routing to preprocessing chains).
    #[serde(rename = "type")]
    pub job_type: JobType,
    /// Display label.
    pub name: String,
    /// Job payload.
    #[serde(default)]
    pub params: JobParams,
}

impl JobRequest {
    pub fn new(job_type: impl Into<JobType>, name: impl Into<String>) -> Self {
        Self {
            job_type: job_type.into(),
            name: name.into(),
            params: JobParams::new(),
        }
    }

    /// Set a single payload entry.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

/// A job represents a unit of work waiting to be batched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Unique identifier for this job.
    pub id: JobId,
    /// Current status.
    pub status: JobStatus,
    /// Type of job (used for routing to preprocessing chains).
    #[serde(rename = "type")]
    pub job_type: JobType,
    /// Display label.
    pub name: String,
    /// Job payload.
    #[serde(default)]
    pub params: JobParams,
    /// When the job was submitted.
    pub created_at: DateTime<Utc>,
}

impl Job {
    /// Create a new queued job from a request.
    pub fn from_request(request: JobRequest) -> Self {
        Self {
            id: JobId::new(),
            status: JobStatus::Queued,
            job_type: request.job_type,
            name: request.name,
            params: request.params,
            created_at: Utc::now(),
        }
    }

    /// Read a string parameter.
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(|v| v.as_str())
    }
}
