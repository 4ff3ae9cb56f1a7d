//! World Bank indicator service.
//!
//! Pulls yearly observations through the fetch layer, pivots the long form
//! into wide per-country rows, and runs the analytics on top. Upstream
//! failures degrade to a deterministic sample dataset.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Datelike, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::application::analytics;
use crate::application::error::AppError;
use crate::application::sources::IndicatorSource;
use crate::domain::indicators::{
    ComparisonRow, HealthReport, IndicatorRow, ObservationPoint, TrendReport, country_name,
    indicator_code, indicator_name, COUNTRIES, INDICATORS,
};
use crate::fetch::{FetchConfig, Fetcher, Served};

const PROVIDER: &str = "worldbank";

/// Upstream stability caps on one request's grid.
pub const MAX_COUNTRIES: usize = 8;
pub const MAX_INDICATORS: usize = 4;

const DEFAULT_TREND_INDICATORS: [&str; 4] =
    ["GDP", "GDP_PER_CAPITA", "INFLATION", "UNEMPLOYMENT"];
const HEALTH_INDICATORS: [&str; 4] = [
    "GDP_PER_CAPITA",
    "INFLATION",
    "UNEMPLOYMENT",
    "LIFE_EXPECTANCY",
];
const SAMPLE_SEED: u64 = 17;

pub struct WorldBankService {
    source: Arc<dyn IndicatorSource>,
    fetcher: Fetcher<Vec<ObservationPoint>>,
}

impl WorldBankService {
    pub fn new(source: Arc<dyn IndicatorSource>, config: FetchConfig) -> Self {
        Self {
            source,
            fetcher: Fetcher::new(PROVIDER, config),
        }
    }

    /// Wide indicator table. Countries and indicators beyond the caps are
    /// silently dropped; friendly names and raw series codes are both
    /// accepted. `currency` converts the monetary columns through the
    /// static rate table; unknown currencies are rejected.
    pub async fn indicators(
        &self,
        countries: Vec<String>,
        indicators: Vec<String>,
        start_year: i32,
        end_year: i32,
        normalize: bool,
        currency: Option<&str>,
    ) -> Result<(Vec<IndicatorRow>, Served), AppError> {
        validate_years(start_year, end_year)?;
        let currency = currency.map(str::to_uppercase);
        if let Some(currency) = &currency {
            if analytics::currency_rate(currency).is_none() {
                return Err(AppError::validation(format!(
                    "unknown currency `{currency}`"
                )));
            }
        }

        let countries = resolve_countries(countries);
        let codes = resolve_indicators(indicators);

        let (observations, served) = self
            .observations(&countries, &codes, start_year, end_year)
            .await;

        let mut rows = pivot(&observations, &codes);
        if let Some(currency) = &currency {
            analytics::convert_to_usd(&mut rows, currency);
        }
        if normalize {
            analytics::normalize_rows(&mut rows);
        }
        Ok((rows, served))
    }

    /// One indicator across countries over the trailing `years` years.
    pub async fn comparison(
        &self,
        countries: Vec<String>,
        indicator: &str,
        years: u32,
    ) -> Result<(Vec<ComparisonRow>, Served), AppError> {
        if years == 0 {
            return Err(AppError::validation("years must be at least 1"));
        }

        let countries = resolve_countries(countries);
        let code = indicator_code(indicator).to_string();
        let end_year = Utc::now().year();
        let start_year = end_year - years as i32;

        let (observations, served) = self
            .observations(&countries, std::slice::from_ref(&code), start_year, end_year)
            .await;

        let rows = observations
            .into_iter()
            .map(|point| ComparisonRow {
                country: point.country_iso,
                country_name: point.country_name,
                year: point.year,
                value: point.value,
            })
            .collect();
        Ok((rows, served))
    }

    /// Per-indicator least-squares trends for one country.
    pub async fn trend_analysis(
        &self,
        country: &str,
        indicators: Vec<String>,
        years: u32,
    ) -> Result<(TrendReport, Served), AppError> {
        if years == 0 {
            return Err(AppError::validation("years must be at least 1"));
        }

        let requested = if indicators.is_empty() {
            DEFAULT_TREND_INDICATORS
                .iter()
                .map(|name| (*name).to_string())
                .collect()
        } else {
            indicators
        };
        let codes = resolve_indicators(requested);

        let end_year = Utc::now().year();
        let start_year = end_year - years as i32;
        let countries = vec![country.to_uppercase()];

        let (observations, served) = self
            .observations(&countries, &codes, start_year, end_year)
            .await;
        let rows = pivot(&observations, &codes);

        let mut trends = BTreeMap::new();
        for code in &codes {
            let name = indicator_name(code);
            let values: Vec<f64> = rows.iter().filter_map(|row| row.value(name)).collect();
            if let Some(trend) = analytics::analyze_trend(&values) {
                trends.insert(name.to_string(), trend);
            }
        }

        let report = TrendReport {
            country: country_name(&countries[0]).to_string(),
            country_code: countries[0].clone(),
            analysis_period: format!("{start_year}-{end_year}"),
            trends,
            raw_data: rows,
        };
        Ok((report, served))
    }

    /// Weighted economic-health assessment from the latest available year.
    pub async fn economic_health(
        &self,
        countries: Vec<String>,
    ) -> Result<(BTreeMap<String, HealthReport>, Served), AppError> {
        let countries = resolve_countries(countries);
        let codes: Vec<String> = HEALTH_INDICATORS
            .iter()
            .map(|name| indicator_code(name).to_string())
            .collect();

        let end_year = Utc::now().year();
        let (observations, served) = self
            .observations(&countries, &codes, end_year - 5, end_year)
            .await;

        let rows = pivot(&observations, &codes);
        Ok((analytics::economic_health(&rows, &countries), served))
    }

    pub fn invalidate(&self) {
        self.fetcher.invalidate();
    }

    async fn observations(
        &self,
        countries: &[String],
        codes: &[String],
        start_year: i32,
        end_year: i32,
    ) -> (Vec<ObservationPoint>, Served) {
        let key = format!(
            "{}:{}:{start_year}:{end_year}",
            countries.join(","),
            codes.join(",")
        );
        let source = self.source.clone();
        let countries_owned = countries.to_vec();
        let codes_owned = codes.to_vec();
        self.fetcher
            .fetch(
                key,
                move || async move {
                    let observations = source
                        .observations(&countries_owned, &codes_owned, start_year, end_year)
                        .await?;
                    Ok((!observations.is_empty()).then_some(observations))
                },
                || sample_observations(countries, codes, start_year, end_year),
            )
            .await
    }
}

fn validate_years(start_year: i32, end_year: i32) -> Result<(), AppError> {
    if start_year > end_year {
        return Err(AppError::validation(format!(
            "start_year {start_year} is after end_year {end_year}"
        )));
    }
    if !(1960..=2100).contains(&start_year) || !(1960..=2100).contains(&end_year) {
        return Err(AppError::validation(
            "years must fall between 1960 and 2100",
        ));
    }
    Ok(())
}

/// Default to the full roster, uppercase, capped.
fn resolve_countries(countries: Vec<String>) -> Vec<String> {
    let mut resolved: Vec<String> = if countries.is_empty() {
        COUNTRIES.iter().map(|(iso, _)| (*iso).to_string()).collect()
    } else {
        countries.into_iter().map(|c| c.to_uppercase()).collect()
    };
    resolved.truncate(MAX_COUNTRIES);
    resolved
}

/// Map friendly names to series codes (raw codes pass through), capped.
fn resolve_indicators(indicators: Vec<String>) -> Vec<String> {
    let mut resolved: Vec<String> = if indicators.is_empty() {
        INDICATORS.iter().map(|(_, code)| (*code).to_string()).collect()
    } else {
        indicators
            .into_iter()
            .map(|name| indicator_code(&name).to_string())
            .collect()
    };
    resolved.truncate(MAX_INDICATORS);
    resolved
}

/// Pivot long observations into one row per country/year, with a column per
/// requested indicator. Rows are ordered by country then year.
fn pivot(observations: &[ObservationPoint], codes: &[String]) -> Vec<IndicatorRow> {
    let mut rows: BTreeMap<(String, i32), IndicatorRow> = BTreeMap::new();
    for point in observations {
        let row = rows
            .entry((point.country_iso.clone(), point.year))
            .or_insert_with(|| {
                let mut values = BTreeMap::new();
                for code in codes {
                    values.insert(indicator_name(code).to_string(), None);
                }
                IndicatorRow {
                    country: point.country_iso.clone(),
                    country_name: point.country_name.clone(),
                    year: point.year,
                    values,
                }
            });
        if let Some(value) = point.value {
            row.values
                .insert(indicator_name(&point.indicator_code).to_string(), Some(value));
        }
    }
    rows.into_values().collect()
}

struct SampleProfile {
    gdp_billions: f64,
    gdp_per_capita: f64,
    inflation: f64,
    unemployment: f64,
    life_expectancy: f64,
    population_millions: f64,
}

fn sample_profile(iso: &str) -> SampleProfile {
    let (gdp, per_capita, inflation, unemployment, life, population) = match iso {
        "US" => (25_000.0, 65_000.0, 3.0, 4.0, 79.0, 330.0),
        "DE" => (4_000.0, 48_000.0, 2.0, 3.0, 81.0, 83.0),
        "PL" => (700.0, 18_000.0, 4.0, 5.0, 78.0, 38.0),
        "UA" => (200.0, 4_500.0, 8.0, 8.0, 72.0, 40.0),
        // Unknown economies get a mid-size profile so charts stay plausible.
        _ => (1_000.0, 15_000.0, 5.0, 6.0, 75.0, 50.0),
    };
    SampleProfile {
        gdp_billions: gdp,
        gdp_per_capita: per_capita,
        inflation,
        unemployment,
        life_expectancy: life,
        population_millions: population,
    }
}

/// Deterministic sample grid covering every requested country, indicator and
/// year. Jitter comes from a fixed seed so repeated fallbacks agree.
fn sample_observations(
    countries: &[String],
    codes: &[String],
    start_year: i32,
    end_year: i32,
) -> Vec<ObservationPoint> {
    let mut rng = StdRng::seed_from_u64(SAMPLE_SEED);
    let mut observations = Vec::new();

    for iso in countries {
        let profile = sample_profile(iso);
        for year in start_year..=end_year {
            let gdp_variation: f64 = rng.gen_range(0.9..1.1);
            for code in codes {
                let value = match indicator_name(code) {
                    "GDP" => profile.gdp_billions * gdp_variation * 1_000_000_000.0,
                    "GDP_PER_CAPITA" => profile.gdp_per_capita * gdp_variation,
                    "INFLATION" => profile.inflation * rng.gen_range(0.8..1.2),
                    "UNEMPLOYMENT" => profile.unemployment + rng.gen_range(-1.0..1.0),
                    "EXPORTS" => profile.gdp_billions * 0.3 * gdp_variation * 1_000_000_000.0,
                    "IMPORTS" => profile.gdp_billions * 0.35 * gdp_variation * 1_000_000_000.0,
                    "POPULATION" => profile.population_millions * 1_000_000.0,
                    "LIFE_EXPECTANCY" => profile.life_expectancy + rng.gen_range(-1.0..1.0),
                    "INTERNET_USERS" => rng.gen_range(70.0..95.0),
                    "EDUCATION_EXPENDITURE" => rng.gen_range(3.0..6.0),
                    _ => rng.gen_range(0.0..100.0),
                };
                observations.push(ObservationPoint {
                    country_iso: iso.clone(),
                    country_name: country_name(iso).to_string(),
                    indicator_code: code.clone(),
                    year,
                    value: Some(value),
                });
            }
        }
    }

    observations
}
