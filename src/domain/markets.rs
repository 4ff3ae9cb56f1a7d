//! Crypto market data shapes, matching the CoinGecko public API.

use serde::{Deserialize, Serialize};

/// One row of the markets listing, ordered by market cap upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinMarket {
    pub id: String,
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub image: String,
    pub current_price: f64,
    #[serde(default)]
    pub market_cap: Option<i64>,
    #[serde(default)]
    pub market_cap_rank: Option<u32>,
    #[serde(default)]
    pub total_volume: Option<f64>,
    #[serde(default)]
    pub price_change_percentage_24h: Option<f64>,
}

/// Historical chart for a single coin: arrays of `[timestamp_ms, value]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketChart {
    #[serde(default)]
    pub prices: Vec<(i64, f64)>,
    #[serde(default)]
    pub market_caps: Vec<(i64, f64)>,
    #[serde(default)]
    pub total_volumes: Vec<(i64, f64)>,
}

impl MarketChart {
    pub fn is_empty(&self) -> bool {
        self.prices.is_empty() && self.market_caps.is_empty() && self.total_volumes.is_empty()
    }
}
