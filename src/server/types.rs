//! Shared server state and wire types

use crate::config::Config;
use crate::fetch::{PageFetcher, Sleeper, TokioSleeper};
use crate::mail::MailTemplate;
use crate::output::CsvTable;
use crate::roster::MovementType;
use crate::state::{JobProgress, JobStatus, ProgressHandle};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

/// One background job kind: its progress, cancellation and last result
///
/// At most one job runs per slot.
#[derive(Debug)]
pub struct JobSlot<R> {
    progress: ProgressHandle,
    running: Mutex<Option<CancellationToken>>,
    result: Mutex<Option<R>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<R: Clone> JobSlot<R> {
    pub fn new() -> Self {
        Self {
            progress: ProgressHandle::new(),
            running: Mutex::new(None),
            result: Mutex::new(None),
        }
    }

    pub fn progress(&self) -> &ProgressHandle {
        &self.progress
    }

    pub fn snapshot(&self) -> JobProgress {
        self.progress.snapshot()
    }

    pub fn is_running(&self) -> bool {
        lock(&self.running).is_some()
    }

    /// Claims the slot for a new job
    ///
    /// Returns the job's cancellation token, or None if a job is running.
    pub fn try_start(&self, message: &str) -> Option<CancellationToken> {
        let mut running = lock(&self.running);
        if running.is_some() {
            return None;
        }

        let token = CancellationToken::new();
        *running = Some(token.clone());
        *lock(&self.result) = None;
        self.progress.start(0, message);
        Some(token)
    }

    /// Requests cancellation of the running job
    ///
    /// Returns true if a job was running.
    pub fn cancel(&self) -> bool {
        match lock(&self.running).as_ref() {
            Some(token) => {
                token.cancel();
                self.progress.set_status(JobStatus::Paused);
                true
            }
            None => false,
        }
    }

    /// Releases the slot with a final status
    pub fn finish(&self, status: JobStatus, message: &str) {
        self.progress.finish(status, message);
        *lock(&self.running) = None;
    }

    pub fn set_result(&self, result: R) {
        *lock(&self.result) = Some(result);
    }

    pub fn result(&self) -> Option<R> {
        lock(&self.result).clone()
    }
}

/// CSV produced by the last extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionResult {
    pub file_name: String,
    pub csv: String,
    pub rows: usize,
}

/// State shared by all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub fetcher: PageFetcher,
    pub sleeper: Arc<dyn Sleeper>,
    pub extraction: Arc<JobSlot<ExtractionResult>>,
    pub mail: Arc<JobSlot<usize>>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("fetcher", &self.fetcher)
            .field("csv_dir", &self.csv_dir())
            .finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, reqwest::Error> {
        let fetcher = PageFetcher::new(&config.fetcher)?;
        Ok(Self {
            config: Arc::new(config),
            fetcher,
            sleeper: Arc::new(TokioSleeper),
            extraction: Arc::new(JobSlot::new()),
            mail: Arc::new(JobSlot::new()),
        })
    }

    /// Routes every wait (backoff, politeness, mail pacing) through `sleeper`
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.fetcher = self.fetcher.with_sleeper(Arc::clone(&sleeper));
        self.sleeper = sleeper;
        self
    }

    pub fn csv_dir(&self) -> PathBuf {
        PathBuf::from(&self.config.output.csv_dir)
    }
}

/// Body of `POST /api/extract-members`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractMembersRequest {
    pub alliance_id: Option<String>,

    /// Comma-separated corporation ids
    pub corp_ids: Option<String>,

    pub file_name_prefix: Option<String>,

    #[serde(rename = "type", default)]
    pub movement: MovementType,

    pub n_days: Option<u32>,
    pub ships_kills_threshold: Option<u64>,
    pub efficiency_threshold: Option<f64>,
}

impl ExtractMembersRequest {
    pub fn corp_id_list(&self) -> Vec<String> {
        self.corp_ids
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect()
    }

    pub fn has_target(&self) -> bool {
        !self.corp_id_list().is_empty()
            || self
                .alliance_id
                .as_deref()
                .is_some_and(|id| !id.trim().is_empty())
    }
}

/// Tokens as the UI sends them
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPayload {
    pub access_token: String,
    pub character_id: Option<String>,
}

/// Body of `POST /api/send-emails`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailsRequest {
    pub csv_data: Option<CsvTable>,
    pub template: Option<MailTemplate>,
    pub tokens: Option<TokenPayload>,

    /// Bare access token, as an alternative to `tokens`
    pub token: Option<String>,
}

impl SendEmailsRequest {
    /// The access token and explicit character id, if any
    pub fn credentials(&self) -> Option<(String, Option<String>)> {
        match (&self.tokens, &self.token) {
            (Some(tokens), _) if !tokens.access_token.trim().is_empty() => {
                Some((tokens.access_token.clone(), tokens.character_id.clone()))
            }
            (_, Some(token)) if !token.trim().is_empty() => Some((token.clone(), None)),
            _ => None,
        }
    }
}

/// `{"success": true, "message": ...}`
#[derive(Debug, Clone, Serialize)]
pub struct AckResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl AckResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn with_message(message: &str) -> Self {
        Self {
            success: true,
            message: Some(message.to_string()),
        }
    }
}

/// `GET /api/csv-preview/:filename`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvPreviewResponse {
    pub headers: Vec<String>,
    pub preview: Vec<crate::output::CsvRow>,
    pub total_rows: usize,
}
