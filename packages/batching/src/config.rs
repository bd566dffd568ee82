//! Run configuration for the batching engine.

use std::path::Path;
use std::time::Duration;

use batching_core::{BatchFrequency, BatchSize};
use serde::{Deserialize, Serialize};

/// Configuration for batching behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Seconds between batch cuts.
    pub frequency: u64,
    /// Maximum number of jobs per batch.
    pub batch_size: usize,
    /// Pacing delay handed to the batch processor, in seconds.
    pub pacing_secs: u64,
    /// Maximum number of jobs that can be queued.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_queue_size: Option<usize>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            frequency: 10,
            batch_size: 10,
            pacing_secs: 5,
            max_queue_size: None,
        }
    }
}

impl RunConfig {
    /// Read and validate a JSON configuration file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path).await?;
        let config = Self::from_json(&json)?;
        tracing::debug!("Loaded run config from {:?}", path);
        Ok(config)
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the trigger or dispatcher cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frequency == 0 {
            return Err(ConfigError::Invalid("frequency must be at least 1 second".into()));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid("batch size must be at least 1".into()));
        }
        Ok(())
    }

    /// Set the batch frequency in seconds.
    pub fn with_frequency(mut self, frequency: u64) -> Self {
        self.frequency = frequency;
        self
    }

    /// Set the batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the pacing delay in seconds.
    pub fn with_pacing_secs(mut self, pacing_secs: u64) -> Self {
        self.pacing_secs = pacing_secs;
        self
    }

    /// Limit the number of queued jobs.
    pub fn with_max_queue_size(mut self, max_queue_size: usize) -> Self {
        self.max_queue_size = Some(max_queue_size);
        self
    }

    pub fn period(&self) -> Duration {
        Duration::from_secs(self.frequency)
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_secs(self.pacing_secs)
    }

    pub fn batch_frequency(&self) -> BatchFrequency {
        BatchFrequency {
            frequency: self.frequency,
        }
    }

    pub fn batch_size_setting(&self) -> BatchSize {
        BatchSize {
            batch_size: self.batch_size,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Invalid(String),
}
