use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use ecodash::application::crypto::CryptoService;
use ecodash::application::dataset::DatasetService;
use ecodash::application::files::FileBrowser;
use ecodash::application::sources::{CryptoSource, IndicatorSource};
use ecodash::application::worldbank::WorldBankService;
use ecodash::domain::indicators::{ObservationPoint, country_name};
use ecodash::domain::markets::{CoinMarket, MarketChart};
use ecodash::fetch::FetchConfig;
use ecodash::infra::error::InfraError;
use ecodash::infra::http::rate_limit::ApiRateLimiter;
use ecodash::infra::http::{AppState, build_router};

struct FakeCrypto {
    fail: bool,
}

#[async_trait]
impl CryptoSource for FakeCrypto {
    async fn markets(&self, _currency: &str, per_page: u32) -> Result<Vec<CoinMarket>, InfraError> {
        if self.fail {
            return Err(InfraError::upstream("coingecko", "scripted failure"));
        }
        let coins = [("bitcoin", "btc", "Bitcoin", 64_000.0), ("ethereum", "eth", "Ethereum", 3_100.0)];
        Ok(coins
            .iter()
            .take(per_page as usize)
            .enumerate()
            .map(|(rank, &(id, symbol, name, price))| CoinMarket {
                id: id.to_string(),
                symbol: symbol.to_string(),
                name: name.to_string(),
                image: String::new(),
                current_price: price,
                market_cap: Some(1_000_000_000),
                market_cap_rank: Some(rank as u32 + 1),
                total_volume: Some(40_000_000.0),
                price_change_percentage_24h: Some(1.5),
            })
            .collect())
    }

    async fn coin_history(
        &self,
        _coin_id: &str,
        _currency: &str,
        days: u32,
    ) -> Result<MarketChart, InfraError> {
        if self.fail {
            return Err(InfraError::upstream("coingecko", "scripted failure"));
        }
        let prices = (0..days).map(|i| (i64::from(i) * 86_400_000, 100.0)).collect();
        Ok(MarketChart {
            prices,
            market_caps: Vec::new(),
            total_volumes: Vec::new(),
        })
    }

    async fn global(&self) -> Result<Value, InfraError> {
        if self.fail {
            return Err(InfraError::upstream("coingecko", "scripted failure"));
        }
        Ok(serde_json::json!({ "data": { "markets": 800 } }))
    }
}

struct FakeIndicators {
    fail: bool,
}

#[async_trait]
impl IndicatorSource for FakeIndicators {
    async fn observations(
        &self,
        countries: &[String],
        indicator_codes: &[String],
        start_year: i32,
        end_year: i32,
    ) -> Result<Vec<ObservationPoint>, InfraError> {
        if self.fail {
            return Err(InfraError::upstream("worldbank", "scripted failure"));
        }
        let mut points = Vec::new();
        for iso in countries {
            for code in indicator_codes {
                for year in start_year..=end_year {
                    points.push(ObservationPoint {
                        country_iso: iso.clone(),
                        country_name: country_name(iso).to_string(),
                        indicator_code: code.clone(),
                        year,
                        value: Some(1_000.0 + f64::from(year - start_year)),
                    });
                }
            }
        }
        Ok(points)
    }
}

struct TestApp {
    router: Router,
    // Dropping the TempDir deletes the dataset directory.
    _data_dir: tempfile::TempDir,
}

fn test_app(upstreams_fail: bool, rate_limit_max: u32) -> TestApp {
    let data_dir = tempfile::tempdir().expect("tempdir");
    let dataset = Arc::new(
        DatasetService::init(data_dir.path().to_path_buf(), 30, 10, Some(7)).expect("dataset"),
    );
    let files = Arc::new(FileBrowser::new(data_dir.path().to_path_buf()));

    let config = FetchConfig {
        min_interval: Duration::ZERO,
        ..FetchConfig::default()
    };
    let crypto = Arc::new(CryptoService::new(
        Arc::new(FakeCrypto { fail: upstreams_fail }),
        config.clone(),
    ));
    let worldbank = Arc::new(WorldBankService::new(
        Arc::new(FakeIndicators { fail: upstreams_fail }),
        config,
    ));

    let state = AppState {
        dataset,
        files,
        crypto,
        worldbank,
        rate_limiter: ApiRateLimiter::new(Duration::from_secs(60), rate_limit_max),
    };

    TestApp {
        router: build_router(state),
        _data_dir: data_dir,
    }
}

fn app(upstreams_fail: bool) -> TestApp {
    test_app(upstreams_fail, 1_000)
}

async fn get(router: &Router, uri: &str) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri(uri)
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    let status = response.status();
    let bytes = response.into_body().collect().await.expect("body").to_bytes();
    let json = serde_json::from_slice(&bytes).expect("json body");
    (status, json)
}

async fn post(router: &Router, uri: &str) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    let status = response.status();
    let bytes = response.into_body().collect().await.expect("body").to_bytes();
    let json = serde_json::from_slice(&bytes).expect("json body");
    (status, json)
}

#[tokio::test]
async fn health_reports_dataset_counts() {
    let app = app(false);
    let (status, body) = get(&app.router, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["dataset"]["sales"].as_u64().unwrap() > 0);
    assert!(body["dataset"]["inventory"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn sales_filters_by_category_and_limit() {
    let app = app(false);
    let (status, body) = get(&app.router, "/api/sales?category=food&limit=5").await;

    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().expect("array body");
    assert!(rows.len() <= 5);
    assert!(rows.iter().all(|row| row["category"] == "food"));
}

#[tokio::test]
async fn malformed_date_is_rejected_with_invalid_input() {
    let app = app(false);
    let (status, body) = get(&app.router, "/api/sales?start_date=not-a-date").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "invalid_input");
    assert!(body["error"]["hint"].as_str().unwrap().contains("YYYY-MM-DD"));
}

#[tokio::test]
async fn unknown_category_is_rejected() {
    let app = app(false);
    let (status, body) = get(&app.router, "/api/inventory?category=gadgets").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "invalid_input");
}

#[tokio::test]
async fn weekly_trends_aggregate() {
    let app = app(false);
    let (status, body) = get(&app.router, "/api/trends?period=weekly").await;

    assert_eq!(status, StatusCode::OK);
    assert!(!body.as_array().expect("array body").is_empty());

    let (status, body) = get(&app.router, "/api/trends?period=century").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "invalid_input");
}

#[tokio::test]
async fn categories_and_regions_have_wrapper_keys() {
    let app = app(false);
    let (status, body) = get(&app.router, "/api/categories").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["categories"].as_array().unwrap().contains(&Value::from("food")));

    let (status, body) = get(&app.router, "/api/regions").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["regions"].is_array());
}

#[tokio::test]
async fn stats_exposes_kpi_summary() {
    let app = app(false);
    let (status, body) = get(&app.router, "/api/stats").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["total_revenue"].as_f64().unwrap() > 0.0);
    assert!(body["top_product"].is_string());
}

#[tokio::test]
async fn file_browser_lists_reads_and_summarizes() {
    let app = app(false);

    let (status, body) = get(&app.router, "/api/files").await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["files"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"sales.csv"));
    assert!(names.contains(&"stats.csv"));

    let (status, body) = get(&app.router, "/api/files/sales.csv?limit=3&offset=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["filename"], "sales.csv");
    assert_eq!(body["offset"], 1);
    assert_eq!(body["data"].as_array().unwrap().len(), 3);

    let (status, body) = get(&app.router, "/api/files/sales.csv/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["columns"].as_array().unwrap().iter().any(|c| c["name"] == "quantity"));
}

#[tokio::test]
async fn missing_file_is_a_404() {
    let app = app(false);
    let (status, body) = get(&app.router, "/api/files/absent.csv").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn traversal_names_are_rejected_not_served() {
    let app = app(false);
    let (status, _body) = get(&app.router, "/api/files/..%2Fsales.csv").await;
    assert_ne!(status, StatusCode::OK);
}

#[tokio::test]
async fn regenerate_replaces_the_dataset() {
    let app = app(false);
    let (status, body) = post(&app.router, "/api/regenerate").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Dataset regenerated");
    assert!(body["counts"]["sales"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn crypto_markets_report_their_source() {
    let app = app(false);

    let (status, body) = get(&app.router, "/api/crypto/markets?per_page=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "fresh");
    assert_eq!(body["data"][0]["id"], "bitcoin");

    let (_, body) = get(&app.router, "/api/crypto/markets?per_page=2").await;
    assert_eq!(body["source"], "cached");
}

#[tokio::test]
async fn failing_crypto_upstream_serves_samples() {
    let app = app(true);

    let (status, body) = get(&app.router, "/api/crypto/markets").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "sample");
    assert!(!body["data"].as_array().unwrap().is_empty());

    let (status, body) = get(&app.router, "/api/crypto/bitcoin/history?days=7").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "sample");
    assert_eq!(body["data"]["prices"].as_array().unwrap().len(), 7);
}

#[tokio::test]
async fn crypto_query_bounds_are_enforced() {
    let app = app(false);

    let (status, body) = get(&app.router, "/api/crypto/markets?per_page=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "invalid_input");

    let (status, _) = get(&app.router, "/api/crypto/bitcoin/history?days=9999").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn worldbank_indicators_pivot_to_wide_rows() {
    let app = app(false);

    let (status, body) = get(
        &app.router,
        "/api/worldbank/indicators?countries=UA,PL&indicators=GDP,INFLATION&start_year=2020&end_year=2021",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "fresh");

    let rows = body["data"].as_array().expect("rows");
    // 2 countries x 2 years.
    assert_eq!(rows.len(), 4);
    assert!(rows.iter().all(|row| row["GDP"].is_number() && row["INFLATION"].is_number()));
    assert!(rows.iter().any(|row| row["country"] == "UA"));
}

#[tokio::test]
async fn worldbank_currency_conversion_rescales_money_columns() {
    let app = app(false);

    let (status, plain) = get(
        &app.router,
        "/api/worldbank/indicators?countries=UA&indicators=GDP&start_year=2021&end_year=2021",
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, converted) = get(
        &app.router,
        "/api/worldbank/indicators?countries=UA&indicators=GDP&start_year=2021&end_year=2021&currency=UAH",
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let before = plain["data"][0]["GDP"].as_f64().expect("gdp");
    let after = converted["data"][0]["GDP"].as_f64().expect("gdp");
    assert!((after - before / 36.5).abs() < 1e-6);

    let (status, body) = get(
        &app.router,
        "/api/worldbank/indicators?countries=UA&currency=XYZ",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "invalid_input");
}

#[tokio::test]
async fn worldbank_rejects_inverted_year_range() {
    let app = app(false);
    let (status, body) = get(
        &app.router,
        "/api/worldbank/indicators?start_year=2023&end_year=2020",
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "invalid_input");
}

#[tokio::test]
async fn worldbank_failure_serves_deterministic_samples() {
    let app = app(true);

    let (status, body) = get(&app.router, "/api/worldbank/indicators?countries=UA").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "sample");
    assert!(!body["data"].as_array().unwrap().is_empty());

    let (status, body) = get(&app.router, "/api/worldbank/health?countries=UA,US").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "sample");
    assert!(body["data"]["UA"]["health_score"].is_number());
}

#[tokio::test]
async fn worldbank_trend_report_covers_requested_country() {
    let app = app(false);
    let (status, body) = get(&app.router, "/api/worldbank/trends/UA?years=5").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["country_code"], "UA");
    assert_eq!(body["data"]["country"], "Ukraine");
    assert!(body["data"]["trends"].is_object());
}

#[tokio::test]
async fn api_rate_limit_returns_429_with_retry_after() {
    let app = test_app(false, 1);

    let (status, _) = get(&app.router, "/api/stats").await;
    assert_eq!(status, StatusCode::OK);

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/stats")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key("retry-after"));

    let bytes = response.into_body().collect().await.expect("body").to_bytes();
    let body: Value = serde_json::from_slice(&bytes).expect("json body");
    assert_eq!(body["error"]["code"], "rate_limited");

    // Liveness stays outside the rate-limited surface.
    let (status, _) = get(&app.router, "/health").await;
    assert_eq!(status, StatusCode::OK);
}
