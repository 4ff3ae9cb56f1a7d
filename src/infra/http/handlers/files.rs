//! Handlers for the CSV file browser.

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};

use crate::application::files::{CsvPage, CsvStats};
use crate::infra::csvio::CsvFileInfo;

use super::super::error::ApiError;
use super::super::state::AppState;

#[derive(Debug, Serialize)]
pub struct FilesResponse {
    files: Vec<CsvFileInfo>,
}

pub async fn list(State(state): State<AppState>) -> Result<Json<FilesResponse>, ApiError> {
    let files = state.files.list_files()?;
    Ok(Json(FilesResponse { files }))
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    limit: Option<usize>,
    offset: Option<usize>,
}

pub async fn content(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<CsvPage>, ApiError> {
    let page = state.files.read_file(&name, query.limit, query.offset)?;
    Ok(Json(page))
}

pub async fn stats(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<CsvStats>, ApiError> {
    let stats = state.files.file_stats(&name)?;
    Ok(Json(stats))
}
