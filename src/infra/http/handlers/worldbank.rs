//! Handlers for the World Bank indicator endpoints.

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;

use crate::domain::indicators::{ComparisonRow, HealthReport, IndicatorRow, TrendReport};

use super::super::error::ApiError;
use super::super::state::AppState;
use super::{ExternalResponse, csv_list};

const DEFAULT_START_YEAR: i32 = 2020;
const DEFAULT_END_YEAR: i32 = 2023;
const DEFAULT_COMPARISON_INDICATOR: &str = "GDP_PER_CAPITA";
const DEFAULT_COMPARISON_YEARS: u32 = 10;
const DEFAULT_TREND_YEARS: u32 = 20;
const MAX_SPAN_YEARS: u32 = 60;

#[derive(Debug, Deserialize)]
pub struct IndicatorsQuery {
    countries: Option<String>,
    indicators: Option<String>,
    start_year: Option<i32>,
    end_year: Option<i32>,
    #[serde(default)]
    normalize: bool,
    currency: Option<String>,
}

pub async fn indicators(
    State(state): State<AppState>,
    Query(query): Query<IndicatorsQuery>,
) -> Result<Json<ExternalResponse<Vec<IndicatorRow>>>, ApiError> {
    let (data, source) = state
        .worldbank
        .indicators(
            csv_list(query.countries),
            csv_list(query.indicators),
            query.start_year.unwrap_or(DEFAULT_START_YEAR),
            query.end_year.unwrap_or(DEFAULT_END_YEAR),
            query.normalize,
            query.currency.as_deref(),
        )
        .await?;
    Ok(Json(ExternalResponse { source, data }))
}

#[derive(Debug, Deserialize)]
pub struct ComparisonQuery {
    countries: Option<String>,
    indicator: Option<String>,
    years: Option<u32>,
}

pub async fn comparison(
    State(state): State<AppState>,
    Query(query): Query<ComparisonQuery>,
) -> Result<Json<ExternalResponse<Vec<ComparisonRow>>>, ApiError> {
    let years = validate_span(query.years.unwrap_or(DEFAULT_COMPARISON_YEARS))?;
    let indicator = query
        .indicator
        .unwrap_or_else(|| DEFAULT_COMPARISON_INDICATOR.to_string());

    let (data, source) = state
        .worldbank
        .comparison(csv_list(query.countries), &indicator, years)
        .await?;
    Ok(Json(ExternalResponse { source, data }))
}

#[derive(Debug, Deserialize)]
pub struct TrendQuery {
    indicators: Option<String>,
    years: Option<u32>,
}

pub async fn trends(
    State(state): State<AppState>,
    Path(country): Path<String>,
    Query(query): Query<TrendQuery>,
) -> Result<Json<ExternalResponse<TrendReport>>, ApiError> {
    let years = validate_span(query.years.unwrap_or(DEFAULT_TREND_YEARS))?;
    let (data, source) = state
        .worldbank
        .trend_analysis(&country, csv_list(query.indicators), years)
        .await?;
    Ok(Json(ExternalResponse { source, data }))
}

#[derive(Debug, Deserialize)]
pub struct HealthQuery {
    countries: Option<String>,
}

pub async fn health(
    State(state): State<AppState>,
    Query(query): Query<HealthQuery>,
) -> Result<Json<ExternalResponse<BTreeMap<String, HealthReport>>>, ApiError> {
    let (data, source) = state
        .worldbank
        .economic_health(csv_list(query.countries))
        .await?;
    Ok(Json(ExternalResponse { source, data }))
}

fn validate_span(years: u32) -> Result<u32, ApiError> {
    if years == 0 || years > MAX_SPAN_YEARS {
        return Err(ApiError::invalid_input(format!(
            "years must be between 1 and {MAX_SPAN_YEARS}"
        )));
    }
    Ok(years)
}
