//! HTTP page fetcher
//!
//! This module handles every GET the tool issues against the roster site and
//! the killboard, including:
//! - Building an HTTP client with browser-like identification headers
//! - Classifying responses (404, 429, other failures, success)
//! - Retrying transient failures with bounded exponential backoff
//! - Honouring `Retry-After` hints on rate limiting

use crate::config::FetcherConfig;
use crate::fetch::retry::{RetryHint, RetryPolicy};
use crate::fetch::sleeper::{Sleeper, TokioSleeper};
use crate::fetch::FetchError;
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;

/// Why an attempt may be retried
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryReason {
    /// HTTP 429, possibly with a usable `Retry-After` hint
    RateLimited { hint: Option<RetryHint> },

    /// Any other non-success status or a network-level failure
    Transient { detail: String },
}

/// Terminal outcome of a single HTTP call
#[derive(Debug)]
pub enum AttemptOutcome {
    /// 2xx with the body as text
    Success(String),

    /// Failed, but worth another try if attempts remain
    Retryable(RetryReason),

    /// Failed for good
    NonRetryable(FetchError),
}

/// One HTTP call inside the retry loop
#[derive(Debug)]
pub struct FetchAttempt<'a> {
    /// Target URL
    pub url: &'a str,

    /// 0-based attempt index
    pub attempt: u32,

    /// Delay slept before this attempt
    pub delay: Duration,

    /// What came back
    pub outcome: AttemptOutcome,
}

/// States of the retry loop
#[derive(Debug)]
enum FetchState {
    Attempting { attempt: u32, delay: Duration },
    Waiting { attempt: u32, delay: Duration },
    Succeeded(String),
    Failed(FetchError),
}

/// Builds an HTTP client with the configured identification headers
///
/// # Arguments
///
/// * `config` - The fetcher configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &FetcherConfig) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    if let Ok(accept) = HeaderValue::from_str(&config.accept) {
        headers.insert(ACCEPT, accept);
    }

    Client::builder()
        .user_agent(config.user_agent.clone())
        .default_headers(headers)
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches pages with retry and backoff
///
/// The fetcher keeps no state between calls; cloning it is cheap and clones
/// share the underlying connection pool.
#[derive(Clone)]
pub struct PageFetcher {
    client: Client,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl std::fmt::Debug for PageFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageFetcher")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl PageFetcher {
    /// Creates a fetcher from configuration, sleeping on the tokio timer
    pub fn new(config: &FetcherConfig) -> Result<Self, reqwest::Error> {
        let client = build_http_client(config)?;
        Ok(Self::with_client(client, RetryPolicy::from(config)))
    }

    /// Creates a fetcher around an existing client
    pub fn with_client(client: Client, policy: RetryPolicy) -> Self {
        Self {
            client,
            policy,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Replaces the sleeper used for backoff waits
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// The sleeper backoff waits go through
    pub fn sleeper(&self) -> Arc<dyn Sleeper> {
        Arc::clone(&self.sleeper)
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// The underlying HTTP client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Fetches a URL and returns its body verbatim
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | HTTP 404 | Immediate → `NotFound` |
    /// | HTTP 429 | Retry after `Retry-After`, or backoff with jitter → `RateLimited` when exhausted |
    /// | Other non-2xx | Retry with backoff and jitter → `Transient` when exhausted |
    /// | Network error | Retry with backoff and jitter → `Transient` when exhausted |
    ///
    /// With `retries = R` at most `R + 1` requests are made.
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let mut state = FetchState::Attempting {
            attempt: 0,
            delay: Duration::ZERO,
        };

        loop {
            state = match state {
                FetchState::Attempting { attempt, delay } => {
                    let outcome = self.attempt(url).await;
                    self.next_state(FetchAttempt {
                        url,
                        attempt,
                        delay,
                        outcome,
                    })
                }
                FetchState::Waiting { attempt, delay } => {
                    self.sleeper.sleep(delay).await;
                    FetchState::Attempting {
                        attempt: attempt + 1,
                        delay,
                    }
                }
                FetchState::Succeeded(body) => return Ok(body),
                FetchState::Failed(error) => return Err(error),
            };
        }
    }

    /// Decides where the loop goes after an attempt
    fn next_state(&self, record: FetchAttempt<'_>) -> FetchState {
        let FetchAttempt {
            url,
            attempt,
            delay,
            outcome,
        } = record;

        match outcome {
            AttemptOutcome::Success(body) => {
                tracing::debug!("Fetched {} on attempt {} (waited {:?})", url, attempt, delay);
                FetchState::Succeeded(body)
            }
            AttemptOutcome::NonRetryable(error) => {
                tracing::debug!("Attempt {} for {} is terminal: {}", attempt, url, error);
                FetchState::Failed(error)
            }
            AttemptOutcome::Retryable(reason) => {
                let attempts = attempt + 1;
                if attempt >= self.policy.retries {
                    let error = match reason {
                        RetryReason::RateLimited { .. } => FetchError::RateLimited {
                            url: url.to_string(),
                            attempts,
                        },
                        RetryReason::Transient { detail } => FetchError::Transient {
                            url: url.to_string(),
                            attempts,
                            detail,
                        },
                    };
                    tracing::warn!("Giving up: {}", error);
                    return FetchState::Failed(error);
                }

                let next_delay = match &reason {
                    RetryReason::RateLimited { hint } => {
                        self.policy
                            .rate_limited_delay(attempt, hint.as_ref(), Utc::now())
                    }
                    RetryReason::Transient { .. } => self.policy.backoff_delay(attempt),
                };
                tracing::debug!(
                    "Attempt {} for {} failed ({:?}), retrying in {:?}",
                    attempt,
                    url,
                    reason,
                    next_delay
                );

                FetchState::Waiting {
                    attempt,
                    delay: next_delay,
                }
            }
        }
    }

    /// Issues one GET and classifies the response
    async fn attempt(&self, url: &str) -> AttemptOutcome {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                return AttemptOutcome::Retryable(RetryReason::Transient {
                    detail: describe_request_error(&e),
                })
            }
        };

        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return AttemptOutcome::NonRetryable(FetchError::NotFound {
                url: url.to_string(),
            });
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let hint = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(RetryHint::parse);
            return AttemptOutcome::Retryable(RetryReason::RateLimited { hint });
        }

        if !status.is_success() {
            return AttemptOutcome::Retryable(RetryReason::Transient {
                detail: format!("HTTP {}", status.as_u16()),
            });
        }

        match response.text().await {
            Ok(body) => AttemptOutcome::Success(body),
            Err(e) => AttemptOutcome::Retryable(RetryReason::Transient {
                detail: describe_request_error(&e),
            }),
        }
    }
}

/// Short human description of a request-level failure
fn describe_request_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "Request timeout".to_string()
    } else if e.is_connect() {
        format!("Connection failed: {}", e)
    } else {
        e.to_string()
    }
}
