//! CSV file listing and preview handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use super::error_response;
use crate::output::{is_safe_file_name, list_csv_files, read_csv_file, CsvTable};
use crate::server::types::{AppState, CsvPreviewResponse};

/// Rows included in a preview
pub const PREVIEW_ROWS: usize = 5;

pub async fn csv_files_handler(State(state): State<AppState>) -> Response {
    match list_csv_files(&state.csv_dir()) {
        Ok(files) => Json(json!({ "files": files })).into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}

pub async fn csv_preview_handler(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Response {
    match load_table(&state, &filename) {
        Ok(table) => Json(CsvPreviewResponse {
            headers: table.headers.clone(),
            preview: table.preview(PREVIEW_ROWS).to_vec(),
            total_rows: table.len(),
        })
        .into_response(),
        Err(response) => response,
    }
}

/// Columns usable as `%%KEY%%` placeholders
pub async fn csv_variables_handler(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Response {
    match load_table(&state, &filename) {
        Ok(table) => Json(json!({ "variables": table.headers })).into_response(),
        Err(response) => response,
    }
}

fn load_table(state: &AppState, filename: &str) -> Result<CsvTable, Response> {
    if !is_safe_file_name(filename) {
        return Err(error_response(StatusCode::BAD_REQUEST, "Invalid file name"));
    }

    let path = state.csv_dir().join(filename);
    if !path.is_file() {
        return Err(error_response(
            StatusCode::NOT_FOUND,
            &format!("No such CSV file: {}", filename),
        ));
    }

    read_csv_file(&path)
        .map_err(|e| error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()))
}
