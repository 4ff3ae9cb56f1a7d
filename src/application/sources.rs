//! Upstream source seams.
//!
//! Services talk to external APIs through these traits so tests can swap in
//! scripted fakes without touching the network.

use async_trait::async_trait;

use crate::domain::indicators::ObservationPoint;
use crate::domain::markets::{CoinMarket, MarketChart};
use crate::infra::error::InfraError;

#[async_trait]
pub trait CryptoSource: Send + Sync {
    /// Top markets ordered by market cap.
    async fn markets(&self, currency: &str, per_page: u32) -> Result<Vec<CoinMarket>, InfraError>;

    /// Historical chart for one coin.
    async fn coin_history(
        &self,
        coin_id: &str,
        currency: &str,
        days: u32,
    ) -> Result<MarketChart, InfraError>;

    /// Global market snapshot, passed through as raw JSON.
    async fn global(&self) -> Result<serde_json::Value, InfraError>;
}

#[async_trait]
pub trait IndicatorSource: Send + Sync {
    /// Yearly observations in long form for the country × indicator grid.
    async fn observations(
        &self,
        countries: &[String],
        indicator_codes: &[String],
        start_year: i32,
        end_year: i32,
    ) -> Result<Vec<ObservationPoint>, InfraError>;
}
