//! Progress reporting for long-running jobs
//!
//! Jobs report through a `ProgressSink`. The CLI renders reports on a
//! terminal progress bar, the HTTP server stores them in a `ProgressHandle`
//! that clients poll.

use crate::state::job_state::JobStatus;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};

/// Receiver of human-readable status updates
pub trait ProgressSink: Send + Sync {
    /// A new status line
    fn report(&self, message: &str);

    /// Position within a job of known size
    fn position(&self, _current: usize, _total: usize) {}
}

/// Discards every report
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn report(&self, _message: &str) {}
}

/// Keeps every report in memory
///
/// Clones share the same record.
#[derive(Debug, Clone, Default)]
pub struct RecordingProgress {
    messages: Arc<Mutex<Vec<String>>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages reported so far, in order
    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl ProgressSink for RecordingProgress {
    fn report(&self, message: &str) {
        self.messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(message.to_string());
    }
}

/// Snapshot of a job's progress as served to pollers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobProgress {
    pub current: usize,
    pub total: usize,
    pub message: String,
    pub status: JobStatus,
}

/// Shared, mutable progress record of one job
#[derive(Debug, Clone, Default)]
pub struct ProgressHandle {
    inner: Arc<Mutex<JobProgress>>,
}

impl ProgressHandle {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, JobProgress> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current state of the job
    pub fn snapshot(&self) -> JobProgress {
        self.lock().clone()
    }

    pub fn status(&self) -> JobStatus {
        self.lock().status
    }

    /// Resets the record for a new run
    pub fn start(&self, total: usize, message: &str) {
        *self.lock() = JobProgress {
            current: 0,
            total,
            message: message.to_string(),
            status: JobStatus::Running,
        };
    }

    pub fn set_status(&self, status: JobStatus) {
        self.lock().status = status;
    }

    /// Ends the run with a final status and message
    pub fn finish(&self, status: JobStatus, message: &str) {
        let mut progress = self.lock();
        progress.status = status;
        progress.message = message.to_string();
    }
}

impl ProgressSink for ProgressHandle {
    fn report(&self, message: &str) {
        self.lock().message = message.to_string();
    }

    fn position(&self, current: usize, total: usize) {
        let mut progress = self.lock();
        progress.current = current;
        progress.total = total;
    }
}
