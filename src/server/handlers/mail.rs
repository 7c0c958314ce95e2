//! Bulk mail handlers

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use super::error_response;
use crate::fetch::build_http_client;
use crate::mail::{CredentialProvider, MailSender, StaticCredentials};
use crate::server::types::{AckResponse, AppState, SendEmailsRequest};
use crate::state::JobStatus;

/// Starts sending mail in the background
pub async fn send_emails_handler(
    State(state): State<AppState>,
    Json(body): Json<SendEmailsRequest>,
) -> Response {
    let rows = match &body.csv_data {
        Some(table) if !table.data.is_empty() => table.data.clone(),
        _ => return error_response(StatusCode::BAD_REQUEST, "Valid CSV data is required"),
    };

    let (Some(template), Some((token, character_id))) = (body.template.clone(), body.credentials())
    else {
        return error_response(StatusCode::BAD_REQUEST, "Template and tokens are required");
    };

    let credentials = match StaticCredentials::new(token) {
        Ok(creds) => match character_id {
            Some(id) => creds.with_character_id(id),
            None => creds,
        },
        Err(e) => return error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    };
    if let Err(e) = credentials.character_id() {
        return error_response(StatusCode::BAD_REQUEST, &e.to_string());
    }

    let client = match build_http_client(&state.config.fetcher) {
        Ok(client) => client,
        Err(e) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    };

    let Some(cancel) = state.mail.try_start("Initializing...") else {
        return error_response(StatusCode::BAD_REQUEST, "Email sending is already in progress");
    };

    tokio::spawn(async move {
        let slot = state.mail.clone();
        let sender = MailSender::new(client, &state.config.mail, Arc::new(credentials))
            .with_sleeper(Arc::clone(&state.sleeper));
        let progress = slot.progress().clone();

        let report = sender.send_all(&template, &rows, &progress, &cancel).await;
        slot.set_result(report.sent);

        match (&report.error, report.cancelled) {
            (Some(e), _) => slot.finish(JobStatus::Error, &format!("Error: {}", e)),
            (None, true) => slot.finish(
                JobStatus::Paused,
                &format!("Paused after {} of {} messages.", report.sent, report.total),
            ),
            (None, false) => slot.finish(
                JobStatus::Completed,
                &format!("Completed! Sent {} messages.", report.sent),
            ),
        }
    });

    Json(AckResponse::with_message("Email sending started")).into_response()
}

pub async fn progress_handler(State(state): State<AppState>) -> Response {
    Json(state.mail.snapshot()).into_response()
}

pub async fn pause_handler(State(state): State<AppState>) -> Response {
    if state.mail.cancel() {
        tracing::info!("Mail sending paused");
    }
    Json(AckResponse::ok()).into_response()
}
