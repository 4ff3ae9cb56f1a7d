//! Handlers for the crypto market endpoints.

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;

use crate::domain::markets::{CoinMarket, MarketChart};

use super::super::error::ApiError;
use super::super::state::AppState;
use super::ExternalResponse;

const DEFAULT_CURRENCY: &str = "usd";
const DEFAULT_PER_PAGE: u32 = 100;
const MAX_PER_PAGE: u32 = 250;
const DEFAULT_HISTORY_DAYS: u32 = 30;
const MAX_HISTORY_DAYS: u32 = 365;

#[derive(Debug, Deserialize)]
pub struct MarketsQuery {
    currency: Option<String>,
    per_page: Option<u32>,
}

pub async fn markets(
    State(state): State<AppState>,
    Query(query): Query<MarketsQuery>,
) -> Result<Json<ExternalResponse<Vec<CoinMarket>>>, ApiError> {
    let currency = query
        .currency
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string())
        .to_lowercase();
    let per_page = query.per_page.unwrap_or(DEFAULT_PER_PAGE);
    if per_page == 0 || per_page > MAX_PER_PAGE {
        return Err(ApiError::invalid_input(format!(
            "per_page must be between 1 and {MAX_PER_PAGE}"
        )));
    }

    let (data, source) = state.crypto.markets(&currency, per_page).await;
    Ok(Json(ExternalResponse { source, data }))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    currency: Option<String>,
    days: Option<u32>,
}

pub async fn history(
    State(state): State<AppState>,
    Path(coin_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<ExternalResponse<MarketChart>>, ApiError> {
    let currency = query
        .currency
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string())
        .to_lowercase();
    let days = query.days.unwrap_or(DEFAULT_HISTORY_DAYS);
    if days == 0 || days > MAX_HISTORY_DAYS {
        return Err(ApiError::invalid_input(format!(
            "days must be between 1 and {MAX_HISTORY_DAYS}"
        )));
    }

    let (data, source) = state.crypto.coin_history(&coin_id, &currency, days).await;
    Ok(Json(ExternalResponse { source, data }))
}

pub async fn global(
    State(state): State<AppState>,
) -> Json<ExternalResponse<serde_json::Value>> {
    let (data, source) = state.crypto.global().await;
    Json(ExternalResponse { source, data })
}
