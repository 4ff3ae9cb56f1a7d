//! HTTP surface: router assembly, shared middleware, and the JSON error
//! shape.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod rate_limit;
pub mod state;

use axum::Router;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};

pub use state::AppState;

pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/sales", get(handlers::dataset::sales))
        .route("/inventory", get(handlers::dataset::inventory))
        .route("/profit", get(handlers::dataset::profit))
        .route("/trends", get(handlers::dataset::trends))
        .route("/stats", get(handlers::dataset::stats))
        .route("/categories", get(handlers::dataset::categories))
        .route("/regions", get(handlers::dataset::regions))
        .route("/regenerate", post(handlers::dataset::regenerate))
        .route("/files", get(handlers::files::list))
        .route("/files/{name}", get(handlers::files::content))
        .route("/files/{name}/stats", get(handlers::files::stats))
        .route("/crypto/markets", get(handlers::crypto::markets))
        .route("/crypto/global", get(handlers::crypto::global))
        .route("/crypto/{coin_id}/history", get(handlers::crypto::history))
        .route("/worldbank/indicators", get(handlers::worldbank::indicators))
        .route("/worldbank/comparison", get(handlers::worldbank::comparison))
        .route("/worldbank/trends/{country}", get(handlers::worldbank::trends))
        .route("/worldbank/health", get(handlers::worldbank::health))
        .layer(from_fn_with_state(state.clone(), middleware::client_rate_limit));

    Router::new()
        .nest("/api", api)
        .route("/health", get(handlers::health))
        .layer(from_fn(middleware::log_responses))
        .with_state(state)
}
