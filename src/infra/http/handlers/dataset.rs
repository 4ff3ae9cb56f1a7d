//! Handlers for the synthetic dataset endpoints.

use axum::Json;
use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};

use crate::application::dataset::{RowCounts, SalesFilter, TrendFilter};
use crate::domain::entities::{InventoryRecord, KpiSummary, ProfitRecord, SalesRecord, TrendPoint};
use crate::domain::types::{ProductCategory, Region, TrendPeriod};

use super::super::error::ApiError;
use super::super::state::AppState;
use super::parse_opt_date;

fn parse_category(value: Option<&String>) -> Result<Option<ProductCategory>, ApiError> {
    value
        .map(|raw| {
            raw.parse::<ProductCategory>()
                .map_err(|err| ApiError::invalid_input(err.to_string()))
        })
        .transpose()
}

fn parse_region(value: Option<&String>) -> Result<Option<Region>, ApiError> {
    value
        .map(|raw| {
            raw.parse::<Region>()
                .map_err(|err| ApiError::invalid_input(err.to_string()))
        })
        .transpose()
}

#[derive(Debug, Deserialize)]
pub struct SalesQuery {
    start_date: Option<String>,
    end_date: Option<String>,
    category: Option<String>,
    region: Option<String>,
    limit: Option<usize>,
}

pub async fn sales(
    State(state): State<AppState>,
    Query(query): Query<SalesQuery>,
) -> Result<Json<Vec<SalesRecord>>, ApiError> {
    let filter = SalesFilter {
        start_date: parse_opt_date(query.start_date.as_ref(), "start_date")?,
        end_date: parse_opt_date(query.end_date.as_ref(), "end_date")?,
        category: parse_category(query.category.as_ref())?,
        region: parse_region(query.region.as_ref())?,
        limit: query.limit,
    };
    Ok(Json(state.dataset.sales(&filter)))
}

#[derive(Debug, Deserialize)]
pub struct InventoryQuery {
    category: Option<String>,
    #[serde(default)]
    low_stock: bool,
}

pub async fn inventory(
    State(state): State<AppState>,
    Query(query): Query<InventoryQuery>,
) -> Result<Json<Vec<InventoryRecord>>, ApiError> {
    let category = parse_category(query.category.as_ref())?;
    Ok(Json(state.dataset.inventory(category, query.low_stock)))
}

#[derive(Debug, Deserialize)]
pub struct ProfitQuery {
    category: Option<String>,
    min_margin: Option<f64>,
}

pub async fn profit(
    State(state): State<AppState>,
    Query(query): Query<ProfitQuery>,
) -> Result<Json<Vec<ProfitRecord>>, ApiError> {
    let category = parse_category(query.category.as_ref())?;
    Ok(Json(state.dataset.profit(category, query.min_margin)))
}

#[derive(Debug, Deserialize)]
pub struct TrendsQuery {
    start_date: Option<String>,
    end_date: Option<String>,
    period: Option<String>,
}

pub async fn trends(
    State(state): State<AppState>,
    Query(query): Query<TrendsQuery>,
) -> Result<Json<Vec<TrendPoint>>, ApiError> {
    let period = match query.period.as_deref() {
        Some(raw) => raw
            .parse::<TrendPeriod>()
            .map_err(|err| ApiError::invalid_input(err.to_string()))?,
        None => TrendPeriod::default(),
    };
    let filter = TrendFilter {
        start_date: parse_opt_date(query.start_date.as_ref(), "start_date")?,
        end_date: parse_opt_date(query.end_date.as_ref(), "end_date")?,
        period,
    };
    Ok(Json(state.dataset.trends(&filter)))
}

pub async fn stats(State(state): State<AppState>) -> Json<KpiSummary> {
    Json(state.dataset.stats())
}

#[derive(Debug, Serialize)]
pub struct CategoriesResponse {
    categories: Vec<String>,
}

pub async fn categories(State(state): State<AppState>) -> Json<CategoriesResponse> {
    Json(CategoriesResponse {
        categories: state.dataset.categories(),
    })
}

#[derive(Debug, Serialize)]
pub struct RegionsResponse {
    regions: Vec<String>,
}

pub async fn regions(State(state): State<AppState>) -> Json<RegionsResponse> {
    Json(RegionsResponse {
        regions: state.dataset.regions(),
    })
}

#[derive(Debug, Serialize)]
pub struct RegenerateResponse {
    message: &'static str,
    counts: RowCounts,
}

pub async fn regenerate(
    State(state): State<AppState>,
) -> Result<Json<RegenerateResponse>, ApiError> {
    let counts = state.dataset.regenerate()?;
    Ok(Json(RegenerateResponse {
        message: "Dataset regenerated",
        counts,
    }))
}
