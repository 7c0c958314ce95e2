//! HTTP server for running extraction and mail jobs from a browser
//!
//! Jobs run in the background; clients poll their progress endpoints.
//! Only one extraction and one mail job may run at a time.

mod handlers;
mod types;

use axum::routing::{get, post};
use axum::Router;

use handlers::{
    csv_files_handler, csv_preview_handler, csv_variables_handler, download_extraction_handler,
    extract_members_handler, extraction_cancel_handler, extraction_progress_handler,
    health_handler, pause_handler, progress_handler, send_emails_handler,
};
pub use handlers::PREVIEW_ROWS;
pub use types::{
    AckResponse, AppState, CsvPreviewResponse, ExtractMembersRequest, ExtractionResult, JobSlot,
    SendEmailsRequest, TokenPayload,
};

/// Builds the router over shared state
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/extract-members", post(extract_members_handler))
        .route("/api/extraction-progress", get(extraction_progress_handler))
        .route("/api/extraction-cancel", post(extraction_cancel_handler))
        .route("/api/download-extraction", get(download_extraction_handler))
        .route("/api/csv-files", get(csv_files_handler))
        .route("/api/csv-preview/:filename", get(csv_preview_handler))
        .route("/api/csv-variables/:filename", get(csv_variables_handler))
        .route("/api/send-emails", post(send_emails_handler))
        .route("/api/progress", get(progress_handler))
        .route("/api/pause", post(pause_handler))
        .with_state(state)
}

/// Binds `host:port` and serves until the process stops
pub async fn serve(host: &str, port: u16, state: AppState) -> Result<(), anyhow::Error> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", host, port))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind server to {}:{}: {}", host, port, e))?;

    tracing::info!("Web UI API listening on http://{}:{}/", host, port);

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}
