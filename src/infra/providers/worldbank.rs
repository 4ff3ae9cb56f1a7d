//! World Bank v2 API client.
//!
//! The v2 JSON shape is a two-element array: request metadata first, then
//! the observation rows. Several countries go into one request separated by
//! semicolons; indicators are fetched one request each.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::application::sources::IndicatorSource;
use crate::domain::indicators::{ObservationPoint, country_name};
use crate::infra::error::InfraError;

const PROVIDER: &str = "worldbank";
const PER_PAGE: &str = "1000";

pub const DEFAULT_BASE_URL: &str = "https://api.worldbank.org/v2";

#[derive(Debug, Deserialize)]
struct WbRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct WbEntry {
    indicator: WbRef,
    country: WbRef,
    date: String,
    value: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct WorldBankClient {
    client: Client,
    base_url: String,
}

impl WorldBankClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    async fn indicator_page(
        &self,
        countries: &[String],
        code: &str,
        start_year: i32,
        end_year: i32,
    ) -> Result<Vec<ObservationPoint>, InfraError> {
        let url = format!(
            "{}/country/{}/indicator/{code}",
            self.base_url,
            countries.join(";")
        );
        let response = self
            .client
            .get(&url)
            .query(&[
                ("format", "json"),
                ("per_page", PER_PAGE),
                ("date", &format!("{start_year}:{end_year}")),
            ])
            .send()
            .await
            .map_err(|err| InfraError::upstream(PROVIDER, err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(InfraError::upstream(
                PROVIDER,
                format!("{code} returned HTTP {status}"),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|err| InfraError::upstream(PROVIDER, err.to_string()))?;
        parse_observations(&body)
    }
}

fn parse_observations(body: &str) -> Result<Vec<ObservationPoint>, InfraError> {
    let (_meta, entries): (serde_json::Value, Option<Vec<WbEntry>>) =
        serde_json::from_str(body)
            .map_err(|err| InfraError::upstream(PROVIDER, format!("malformed payload: {err}")))?;

    let mut observations = Vec::new();
    for entry in entries.unwrap_or_default() {
        // Dates are plain years for yearly series; anything else is skipped.
        let Ok(year) = entry.date.parse::<i32>() else {
            continue;
        };
        observations.push(ObservationPoint {
            country_name: country_name(&entry.country.id).to_string(),
            country_iso: entry.country.id,
            indicator_code: entry.indicator.id,
            year,
            value: entry.value,
        });
    }
    Ok(observations)
}

#[async_trait]
impl IndicatorSource for WorldBankClient {
    async fn observations(
        &self,
        countries: &[String],
        indicator_codes: &[String],
        start_year: i32,
        end_year: i32,
    ) -> Result<Vec<ObservationPoint>, InfraError> {
        let mut observations = Vec::new();
        for code in indicator_codes {
            observations
                .extend(self.indicator_page(countries, code, start_year, end_year).await?);
        }
        Ok(observations)
    }
}
