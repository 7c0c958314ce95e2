//! Member extraction handlers

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use super::error_response;
use crate::output::{make_csv_file_name, render_members_csv};
use crate::recruit::{RecruitPipeline, RecruitRequest, Thresholds};
use crate::server::types::{AckResponse, AppState, ExtractMembersRequest, ExtractionResult};
use crate::state::JobStatus;

/// Starts a background extraction
pub async fn extract_members_handler(
    State(state): State<AppState>,
    Json(body): Json<ExtractMembersRequest>,
) -> Response {
    if !body.has_target() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Either allianceId or corpIds must be provided",
        );
    }

    let Some(cancel) = state.extraction.try_start("Initializing...") else {
        return error_response(StatusCode::BAD_REQUEST, "Extraction is already in progress");
    };

    let request = RecruitRequest {
        alliance_id: body.alliance_id.clone().filter(|id| !id.trim().is_empty()),
        corp_ids: body.corp_id_list(),
        movement: body.movement,
        days: Some(body.n_days.unwrap_or(state.config.extractor.recency_days)),
        file_name_prefix: body.file_name_prefix.clone(),
        alliance_name: None,
        thresholds: Thresholds::new(body.ships_kills_threshold, body.efficiency_threshold),
    };

    tokio::spawn(async move {
        let slot = state.extraction.clone();
        let pipeline = RecruitPipeline::from_config(state.fetcher.clone(), &state.config.extractor);
        let progress = slot.progress().clone();

        match pipeline.run(&request, &progress, &cancel).await {
            Ok(outcome) => match render_members_csv(&outcome.rows) {
                Ok(csv) => {
                    let rows = outcome.rows.len();
                    slot.set_result(ExtractionResult {
                        file_name: make_csv_file_name(&outcome.prefix, outcome.movement),
                        csv,
                        rows,
                    });
                    if outcome.cancelled {
                        slot.finish(
                            JobStatus::Paused,
                            &format!("Cancelled. Found {} members.", rows),
                        );
                    } else {
                        slot.finish(
                            JobStatus::Completed,
                            &format!("Completed! Found {} members.", rows),
                        );
                    }
                }
                Err(e) => slot.finish(JobStatus::Error, &format!("Error: {}", e)),
            },
            Err(e) => {
                tracing::error!("Member extraction failed: {}", e);
                slot.finish(JobStatus::Error, &format!("Error: {}", e));
            }
        }
    });

    Json(AckResponse::with_message("Extraction started")).into_response()
}

pub async fn extraction_progress_handler(State(state): State<AppState>) -> Response {
    Json(state.extraction.snapshot()).into_response()
}

pub async fn extraction_cancel_handler(State(state): State<AppState>) -> Response {
    if state.extraction.cancel() {
        tracing::info!("Extraction cancellation requested");
    }
    Json(AckResponse::ok()).into_response()
}

/// Serves the last extraction as a CSV attachment
pub async fn download_extraction_handler(State(state): State<AppState>) -> Response {
    let Some(result) = state.extraction.result() else {
        return error_response(StatusCode::NOT_FOUND, "No extraction result available");
    };

    (
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", result.file_name),
            ),
        ],
        result.csv,
    )
        .into_response()
}
