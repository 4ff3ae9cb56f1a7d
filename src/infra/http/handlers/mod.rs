pub mod crypto;
pub mod dataset;
pub mod files;
pub mod worldbank;

use axum::Json;
use axum::extract::State;
use chrono::NaiveDate;
use serde::Serialize;

use crate::application::dataset::RowCounts;
use crate::fetch::Served;

use super::error::ApiError;
use super::state::AppState;

/// Wrapper for payloads backed by an external provider; `source` tells the
/// client whether it is looking at live, cached, or degraded data.
#[derive(Debug, Serialize)]
pub struct ExternalResponse<T> {
    pub source: Served,
    pub data: T,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub dataset: RowCounts,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        dataset: state.dataset.row_counts(),
    })
}

pub(super) fn parse_date(value: &str, param: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ApiError::invalid_input(format!("{param} `{value}`: expected YYYY-MM-DD")))
}

pub(super) fn parse_opt_date(
    value: Option<&String>,
    param: &str,
) -> Result<Option<NaiveDate>, ApiError> {
    value.map(|raw| parse_date(raw, param)).transpose()
}

/// Split a comma-separated query value into trimmed entries.
pub(super) fn csv_list(value: Option<String>) -> Vec<String> {
    value
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dates_parse_or_explain_the_format() {
        assert!(parse_date("2024-02-29", "start_date").is_ok());
        assert!(parse_date("29.02.2024", "start_date").is_err());
        assert!(parse_date("2024-13-01", "start_date").is_err());
    }

    #[test]
    fn csv_lists_trim_and_drop_empty_entries() {
        assert_eq!(
            csv_list(Some("UA, PL ,,US".to_string())),
            vec!["UA".to_string(), "PL".to_string(), "US".to_string()]
        );
        assert!(csv_list(None).is_empty());
    }
}
