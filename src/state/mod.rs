//! State module for tracking job progress
//!
//! # Components
//!
//! - `JobStatus`: Lifecycle of an extraction or mail job (idle, running, paused, completed, error)
//! - `JobProgress`: Snapshot served to pollers
//! - `ProgressSink`: Where jobs send status lines

mod job_state;
mod progress;

// Re-export main types
pub use job_state::JobStatus;
pub use progress::{
    JobProgress, NullProgress, ProgressHandle, ProgressSink, RecordingProgress,
};
