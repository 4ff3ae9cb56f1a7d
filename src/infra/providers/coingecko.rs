//! CoinGecko API client.

use async_trait::async_trait;
use reqwest::Client;

use crate::application::sources::CryptoSource;
use crate::domain::markets::{CoinMarket, MarketChart};
use crate::infra::error::InfraError;

const PROVIDER: &str = "coingecko";

pub const DEFAULT_BASE_URL: &str = "https://api.coingecko.com/api/v3";

#[derive(Debug, Clone)]
pub struct CoinGeckoClient {
    client: Client,
    base_url: String,
}

impl CoinGeckoClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, InfraError> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|err| InfraError::upstream(PROVIDER, err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(InfraError::upstream(
                PROVIDER,
                format!("{path} returned HTTP {status}"),
            ));
        }

        response
            .json()
            .await
            .map_err(|err| InfraError::upstream(PROVIDER, format!("{path}: {err}")))
    }
}

#[async_trait]
impl CryptoSource for CoinGeckoClient {
    async fn markets(&self, currency: &str, per_page: u32) -> Result<Vec<CoinMarket>, InfraError> {
        self.get_json(
            "/coins/markets",
            &[
                ("vs_currency", currency.to_string()),
                ("order", "market_cap_desc".to_string()),
                ("per_page", per_page.to_string()),
                ("page", "1".to_string()),
                ("sparkline", "false".to_string()),
                ("price_change_percentage", "24h".to_string()),
            ],
        )
        .await
    }

    async fn coin_history(
        &self,
        coin_id: &str,
        currency: &str,
        days: u32,
    ) -> Result<MarketChart, InfraError> {
        self.get_json(
            &format!("/coins/{coin_id}/market_chart"),
            &[
                ("vs_currency", currency.to_string()),
                ("days", days.to_string()),
                ("interval", "daily".to_string()),
            ],
        )
        .await
    }

    async fn global(&self) -> Result<serde_json::Value, InfraError> {
        self.get_json("/global", &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markets_payload_deserializes() {
        let payload = r#"[
            {
                "id": "bitcoin",
                "symbol": "btc",
                "name": "Bitcoin",
                "image": "https://assets.coingecko.com/coins/images/1/large/bitcoin.png",
                "current_price": 64250.12,
                "market_cap": 1264523456789,
                "market_cap_rank": 1,
                "total_volume": 35124567890.0,
                "price_change_percentage_24h": -1.23,
                "circulating_supply": 19700000.0
            },
            {
                "id": "newcoin",
                "symbol": "new",
                "name": "New Coin",
                "current_price": 0.002,
                "market_cap": null,
                "market_cap_rank": null
            }
        ]"#;

        let markets: Vec<CoinMarket> = serde_json::from_str(payload).expect("deserialize");
        assert_eq!(markets.len(), 2);
        assert_eq!(markets[0].id, "bitcoin");
        assert_eq!(markets[0].market_cap_rank, Some(1));
        assert_eq!(markets[1].market_cap, None);
        assert!(markets[1].image.is_empty());
    }

    #[test]
    fn market_chart_payload_deserializes() {
        let payload = r#"{
            "prices": [[1716249600000, 67123.5], [1716336000000, 66980.1]],
            "market_caps": [[1716249600000, 1320000000000.0]],
            "total_volumes": []
        }"#;

        let chart: MarketChart = serde_json::from_str(payload).expect("deserialize");
        assert_eq!(chart.prices.len(), 2);
        assert_eq!(chart.prices[0], (1716249600000, 67123.5));
        assert!(!chart.is_empty());
    }
}
