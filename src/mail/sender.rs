//! Bulk mail sending through the game API
//!
//! # Behavior
//!
//! | Response | Action |
//! |----------|--------|
//! | 2xx | Counted as sent |
//! | 401 | Refresh the token once and resend |
//! | Anything else | Stop the run, keeping the sent count |
//!
//! A fixed pacing delay separates consecutive sends.

use crate::config::MailConfig;
use crate::fetch::{Sleeper, TokioSleeper};
use crate::mail::credentials::CredentialProvider;
use crate::mail::template::{MailMessage, MailTemplate};
use crate::mail::MailError;
use crate::output::CsvRow;
use crate::state::ProgressSink;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Serialize)]
struct Recipient {
    recipient_id: u64,
    recipient_type: &'static str,
}

#[derive(Debug, Serialize)]
struct MailPayload<'a> {
    approved_cost: u64,
    body: &'a str,
    recipients: [Recipient; 1],
    subject: &'a str,
}

impl<'a> MailPayload<'a> {
    fn for_message(message: &'a MailMessage) -> Self {
        Self {
            approved_cost: 0,
            body: &message.body,
            recipients: [Recipient {
                recipient_id: message.recipient_id,
                recipient_type: "character",
            }],
            subject: &message.subject,
        }
    }
}

/// Outcome of a bulk send
#[derive(Debug)]
pub struct MailReport {
    pub sent: usize,
    pub total: usize,
    pub cancelled: bool,

    /// The failure that stopped the run, if any
    pub error: Option<MailError>,
}

impl MailReport {
    pub fn is_complete(&self) -> bool {
        self.error.is_none() && !self.cancelled && self.sent == self.total
    }
}

/// Sends rendered messages one at a time
pub struct MailSender {
    client: Client,
    esi_origin: String,
    credentials: Arc<dyn CredentialProvider>,
    send_delay: Duration,
    sleeper: Arc<dyn Sleeper>,
}

impl std::fmt::Debug for MailSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailSender")
            .field("esi_origin", &self.esi_origin)
            .field("send_delay", &self.send_delay)
            .finish_non_exhaustive()
    }
}

impl MailSender {
    pub fn new(client: Client, config: &MailConfig, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            client,
            esi_origin: config.esi_origin.trim_end_matches('/').to_string(),
            credentials,
            send_delay: Duration::from_millis(config.send_delay_ms),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Replaces the sleeper used for pacing
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// `{esi}/characters/{characterId}/mail`
    pub fn mail_url(&self) -> Result<String, MailError> {
        let character_id = self.credentials.character_id()?;
        Ok(format!("{}/characters/{}/mail", self.esi_origin, character_id))
    }

    /// Renders and sends one message per row
    ///
    /// Stops at the first failure; cancellation is checked after the pacing
    /// delay, right before each message.
    pub async fn send_all(
        &self,
        template: &MailTemplate,
        rows: &[CsvRow],
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> MailReport {
        let total = rows.len();
        let mut report = MailReport {
            sent: 0,
            total,
            cancelled: false,
            error: None,
        };
        progress.position(0, total);

        let url = match self.mail_url() {
            Ok(url) => url,
            Err(e) => {
                progress.report(&format!("Error: {}", e));
                report.error = Some(e);
                return report;
            }
        };

        for (index, row) in rows.iter().enumerate() {
            if index > 0 {
                self.sleeper.sleep(self.send_delay).await;
            }

            // a pause during the pacing delay must hold the next message
            if cancel.is_cancelled() {
                tracing::info!("Mail run cancelled after {} of {}", report.sent, total);
                progress.report(&format!("Paused after {} messages", report.sent));
                report.cancelled = true;
                break;
            }

            let result = match template.render(row) {
                Ok(message) => {
                    progress.report(&format!("Sending message to {}...", message.recipient_name));
                    self.send(&url, &message, progress)
                        .await
                        .map(|_| message.recipient_name)
                }
                Err(e) => Err(e),
            };

            match result {
                Ok(name) => {
                    report.sent += 1;
                    progress.position(report.sent, total);
                    progress.report(&format!("Successfully sent to {}", name));
                }
                Err(e) => {
                    tracing::error!("Stopping after {} messages: {}", report.sent, e);
                    progress.report(&format!("Error: {}", e));
                    report.error = Some(e);
                    break;
                }
            }
        }

        if report.error.is_none() && !report.cancelled {
            progress.report(&format!("Completed! Sent {} messages.", report.sent));
        }
        report
    }

    /// Sends one message, refreshing the token once on 401
    pub async fn send(
        &self,
        url: &str,
        message: &MailMessage,
        progress: &dyn ProgressSink,
    ) -> Result<(), MailError> {
        let token = self.credentials.access_token().await?;
        let status = self.post(url, message, &token).await?;
        if status != StatusCode::UNAUTHORIZED {
            return Ok(());
        }

        progress.report("Token expired. Refreshing...");
        tracing::info!("Mail API rejected the token, refreshing");
        let token = self.credentials.refresh().await?;
        match self.post(url, message, &token).await? {
            StatusCode::UNAUTHORIZED => Err(MailError::Unauthorized),
            _ => Ok(()),
        }
    }

    /// Posts the payload; any status but success or 401 is an error
    async fn post(&self, url: &str, message: &MailMessage, token: &str) -> Result<StatusCode, MailError> {
        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(&MailPayload::for_message(message))
            .send()
            .await?;
        let status = response.status();

        if status.is_success() || status == StatusCode::UNAUTHORIZED {
            tracing::debug!("Mail to {} answered {}", message.recipient_id, status);
            return Ok(status);
        }

        let detail = response.text().await.unwrap_or_default();
        Err(MailError::Rejected {
            recipient: message.recipient_id,
            status: status.as_u16(),
            detail,
        })
    }
}
