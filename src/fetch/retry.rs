//! Backoff arithmetic for the page fetcher
//!
//! Delays come from one of two places: a `Retry-After` hint sent with a 429
//! response, or exponential backoff with random jitter.

use crate::config::FetcherConfig;
use chrono::{DateTime, Utc};
use rand::Rng;
use std::time::Duration;

/// Upper bound of the random jitter, as a fraction of the backoff delay
pub const JITTER_FRACTION: f64 = 0.3;

/// A server-supplied hint on when to retry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryHint {
    /// Whole number of seconds to wait
    Seconds(u64),

    /// Point in time after which the request may be retried
    At(DateTime<Utc>),
}

impl RetryHint {
    /// Parses a `Retry-After` header value
    ///
    /// Accepts delta-seconds (`"120"`) and HTTP dates
    /// (`"Wed, 21 Oct 2015 07:28:00 GMT"`); RFC 3339 timestamps are tolerated
    /// as well. Returns `None` for anything else.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }

        if let Ok(seconds) = value.parse::<u64>() {
            return Some(Self::Seconds(seconds));
        }

        DateTime::parse_from_rfc2822(value)
            .or_else(|_| DateTime::parse_from_rfc3339(value))
            .ok()
            .map(|at| Self::At(at.with_timezone(&Utc)))
    }

    /// Delay this hint asks for, measured from `now`, floored at zero
    pub fn delay_from(&self, now: DateTime<Utc>) -> Duration {
        match self {
            Self::Seconds(seconds) => Duration::from_secs(*seconds),
            Self::At(at) => (*at - now).to_std().unwrap_or(Duration::ZERO),
        }
    }
}

/// Bounded retry policy with exponential backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub retries: u32,

    /// Base delay; the first retry waits at least this long
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 5,
            base_delay: Duration::from_millis(600),
        }
    }
}

impl From<&FetcherConfig> for RetryPolicy {
    fn from(config: &FetcherConfig) -> Self {
        Self {
            retries: config.retries,
            base_delay: Duration::from_millis(config.base_delay_ms),
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with the given retry count and base delay
    pub fn new(retries: u32, base_delay: Duration) -> Self {
        Self {
            retries,
            base_delay,
        }
    }

    /// Total attempts this policy allows (first try plus retries)
    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    /// `base_delay * 2^attempt`, saturating
    pub fn exponential(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// Delay before retrying after a transient failure on `attempt`
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        with_jitter(self.exponential(attempt))
    }

    /// Delay before retrying after a 429 on `attempt`
    ///
    /// A usable hint is honoured as-is with no jitter; otherwise this falls
    /// back to jittered exponential backoff. Never shorter than the base delay.
    pub fn rate_limited_delay(
        &self,
        attempt: u32,
        hint: Option<&RetryHint>,
        now: DateTime<Utc>,
    ) -> Duration {
        let delay = match hint {
            Some(hint) => hint.delay_from(now),
            None => with_jitter(self.exponential(attempt)),
        };
        delay.max(self.base_delay)
    }
}

/// Adds up to `JITTER_FRACTION` of random jitter to a delay
fn with_jitter(delay: Duration) -> Duration {
    let fraction = rand::thread_rng().gen_range(0.0..JITTER_FRACTION);
    delay + delay.mul_f64(fraction)
}
