//! Batch identifiers and the batching configuration payloads.

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unique identifier for one dispatched batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(pub Ulid);

impl BatchId {
    /// Create a new unique batch ID.
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for BatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How often a batch is cut, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchFrequency {
    pub frequency: u64,
}

/// Maximum number of jobs handed to the processor per batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSize {
    pub batch_size: usize,
}
