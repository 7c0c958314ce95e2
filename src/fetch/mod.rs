//! Fetch module for retrieving pages over HTTP
//!
//! This module contains:
//! - The page fetcher and its retry state machine
//! - Backoff arithmetic and `Retry-After` parsing
//! - The `Sleeper` abstraction every wait goes through

mod fetcher;
mod retry;
mod sleeper;

pub use fetcher::{build_http_client, AttemptOutcome, FetchAttempt, PageFetcher, RetryReason};
pub use retry::{RetryHint, RetryPolicy, JITTER_FRACTION};
pub use sleeper::{RecordingSleeper, Sleeper, TokioSleeper};

use thiserror::Error;

/// The three failure kinds a fetch can end in
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// HTTP 404; never retried. Pagination reads this as "no more pages".
    #[error("HTTP 404 for {url}")]
    NotFound { url: String },

    /// HTTP 429 on every allowed attempt
    #[error("HTTP 429 for {url} after {attempts} attempts")]
    RateLimited { url: String, attempts: u32 },

    /// Any other failure, still failing once attempts ran out
    #[error("Fetching {url} failed after {attempts} attempts: {detail}")]
    Transient {
        url: String,
        attempts: u32,
        detail: String,
    },
}

impl FetchError {
    /// Returns true for the end-of-pages signal
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// The URL that failed
    pub fn url(&self) -> &str {
        match self {
            Self::NotFound { url } | Self::RateLimited { url, .. } | Self::Transient { url, .. } => {
                url
            }
        }
    }
}
