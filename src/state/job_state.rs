//! Job status definitions for long-running extraction and mail jobs

use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents the current status of a background job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    // ===== Inactive States =====
    /// No job has run yet
    #[default]
    Idle,

    // ===== Active States =====
    /// The job is working
    Running,

    /// Cancellation was requested; the job stops at its next checkpoint
    Paused,

    // ===== Terminal States =====
    /// The job finished (possibly with partial results)
    Completed,

    /// The job failed
    Error,
}

impl JobStatus {
    /// Wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
