//! Crypto market service: the CoinGecko source behind the fetch layer, with
//! deterministic sample data as the bottom fallback.

use std::sync::Arc;

use serde_json::json;

use crate::application::sources::CryptoSource;
use crate::domain::markets::{CoinMarket, MarketChart};
use crate::fetch::{FetchConfig, Fetcher, MinIntervalLimiter, Served};

const PROVIDER: &str = "coingecko";

pub struct CryptoService {
    source: Arc<dyn CryptoSource>,
    markets: Fetcher<Vec<CoinMarket>>,
    history: Fetcher<MarketChart>,
    global: Fetcher<serde_json::Value>,
}

impl CryptoService {
    pub fn new(source: Arc<dyn CryptoSource>, config: FetchConfig) -> Self {
        // One departure gate for all three endpoints; CoinGecko rate limits
        // per client, not per route.
        let limiter = Arc::new(MinIntervalLimiter::new(config.min_interval));
        Self {
            source,
            markets: Fetcher::with_limiter(PROVIDER, config.clone(), limiter.clone()),
            history: Fetcher::with_limiter(PROVIDER, config.clone(), limiter.clone()),
            global: Fetcher::with_limiter(PROVIDER, config, limiter),
        }
    }

    pub async fn markets(&self, currency: &str, per_page: u32) -> (Vec<CoinMarket>, Served) {
        let key = format!("markets:{currency}:{per_page}");
        let source = self.source.clone();
        let currency = currency.to_string();
        self.markets
            .fetch(
                key,
                move || async move {
                    let markets = source.markets(&currency, per_page).await?;
                    Ok((!markets.is_empty()).then_some(markets))
                },
                sample_markets,
            )
            .await
    }

    pub async fn coin_history(
        &self,
        coin_id: &str,
        currency: &str,
        days: u32,
    ) -> (MarketChart, Served) {
        let key = format!("history:{coin_id}:{currency}:{days}");
        let source = self.source.clone();
        let coin_id_owned = coin_id.to_string();
        let currency = currency.to_string();
        self.history
            .fetch(
                key,
                move || async move {
                    let chart = source.coin_history(&coin_id_owned, &currency, days).await?;
                    Ok((!chart.is_empty()).then_some(chart))
                },
                || sample_history(coin_id, days),
            )
            .await
    }

    pub async fn global(&self) -> (serde_json::Value, Served) {
        let source = self.source.clone();
        self.global
            .fetch(
                "global".to_string(),
                move || async move {
                    let snapshot = source.global().await?;
                    Ok((!snapshot.is_null()).then_some(snapshot))
                },
                sample_global,
            )
            .await
    }

    pub fn invalidate(&self) {
        self.markets.invalidate();
        self.history.invalidate();
        self.global.invalidate();
    }
}

fn sample_markets() -> Vec<CoinMarket> {
    let rows = [
        ("bitcoin", "btc", "Bitcoin", 64_000.0, 1_260_000_000_000i64, 1),
        ("ethereum", "eth", "Ethereum", 3_100.0, 372_000_000_000, 2),
        ("tether", "usdt", "Tether", 1.0, 112_000_000_000, 3),
    ];
    rows.iter()
        .map(
            |&(id, symbol, name, price, market_cap, rank)| CoinMarket {
                id: id.to_string(),
                symbol: symbol.to_string(),
                name: name.to_string(),
                image: String::new(),
                current_price: price,
                market_cap: Some(market_cap),
                market_cap_rank: Some(rank),
                total_volume: Some(market_cap as f64 * 0.04),
                price_change_percentage_24h: Some(0.0),
            },
        )
        .collect()
}

/// Flat daily series at the coin's sample price, one point per day ending
/// now. Good enough for a chart that must render something.
fn sample_history(coin_id: &str, days: u32) -> MarketChart {
    let base_price = sample_markets()
        .iter()
        .find(|coin| coin.id == coin_id)
        .map(|coin| coin.current_price)
        .unwrap_or(100.0);

    let now_ms = chrono::Utc::now().timestamp_millis();
    let day_ms = 86_400_000i64;
    let points = days.max(1);

    let mut prices = Vec::with_capacity(points as usize);
    for i in 0..points {
        let ts = now_ms - day_ms * i64::from(points - 1 - i);
        prices.push((ts, base_price));
    }

    MarketChart {
        market_caps: Vec::new(),
        total_volumes: Vec::new(),
        prices,
    }
}

fn sample_global() -> serde_json::Value {
    json!({
        "data": {
            "active_cryptocurrencies": 10000,
            "markets": 800,
            "total_market_cap": { "usd": 2_300_000_000_000.0f64 },
            "total_volume": { "usd": 90_000_000_000.0f64 },
            "market_cap_percentage": { "btc": 54.0, "eth": 16.0 },
            "market_cap_change_percentage_24h_usd": 0.0
        }
    })
}
