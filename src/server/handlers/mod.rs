//! HTTP handlers for the web server

mod extraction;
mod files;
mod mail;

pub use extraction::{
    download_extraction_handler, extract_members_handler, extraction_cancel_handler,
    extraction_progress_handler,
};
pub use files::{csv_files_handler, csv_preview_handler, csv_variables_handler, PREVIEW_ROWS};
pub use mail::{pause_handler, progress_handler, send_emails_handler};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// `{"error": message}` with the given status
pub(crate) fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

pub async fn health_handler() -> Response {
    Json(json!({ "status": "ok" })).into_response()
}
