//! Indicator analytics: trend fitting, unit normalization, and the weighted
//! economic-health score.

use std::collections::BTreeMap;

use crate::domain::indicators::{
    HealthIndicator, HealthReport, IndicatorRow, IndicatorTrend, TrendDirection, country_name,
};

/// Slope of the least-squares line through `values` at unit x spacing.
pub fn least_squares_slope(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean_x = (n - 1.0) / 2.0;
    let mean_y = values.iter().sum::<f64>() / n;

    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for (i, y) in values.iter().enumerate() {
        let dx = i as f64 - mean_x;
        numerator += dx * (y - mean_y);
        denominator += dx * dx;
    }

    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Fit a trend over the yearly values of one indicator. Needs at least two
/// observations; `values` must already be in year order.
pub fn analyze_trend(values: &[f64]) -> Option<IndicatorTrend> {
    if values.len() < 2 {
        return None;
    }
    let slope = least_squares_slope(values);
    Some(IndicatorTrend {
        slope,
        direction: if slope > 0.0 {
            TrendDirection::Rising
        } else {
            TrendDirection::Falling
        },
        latest_value: values[values.len() - 1],
        years_analyzed: values.len(),
    })
}

/// Rescale the large-magnitude columns for display: GDP, exports and imports
/// to billions USD, population to millions. Per-capita and percentage
/// indicators keep their native units.
pub fn normalize_rows(rows: &mut [IndicatorRow]) {
    for row in rows {
        for (indicator, value) in row.values.iter_mut() {
            let divisor = match indicator.as_str() {
                "GDP" | "EXPORTS" | "IMPORTS" => 1_000_000_000.0,
                "POPULATION" => 1_000_000.0,
                _ => continue,
            };
            if let Some(v) = value.as_mut() {
                *v /= divisor;
            }
        }
    }
}

fn score_gdp_per_capita(value: f64) -> u32 {
    match value {
        v if v > 50_000.0 => 100,
        v if v > 25_000.0 => 80,
        v if v > 10_000.0 => 60,
        v if v > 5_000.0 => 40,
        _ => 20,
    }
}

fn score_inflation(value: f64) -> u32 {
    match value {
        v if v < 2.0 => 100,
        v if v < 5.0 => 80,
        v if v < 10.0 => 60,
        v if v < 20.0 => 40,
        _ => 20,
    }
}

fn score_unemployment(value: f64) -> u32 {
    match value {
        v if v < 3.0 => 100,
        v if v < 5.0 => 80,
        v if v < 8.0 => 60,
        v if v < 15.0 => 40,
        _ => 20,
    }
}

fn score_life_expectancy(value: f64) -> u32 {
    match value {
        v if v > 80.0 => 100,
        v if v > 75.0 => 80,
        v if v > 70.0 => 60,
        v if v > 65.0 => 40,
        _ => 20,
    }
}

const HEALTH_COMPONENTS: [(&str, fn(f64) -> u32, f64); 4] = [
    ("GDP_PER_CAPITA", score_gdp_per_capita, 0.3),
    ("INFLATION", score_inflation, 0.25),
    ("UNEMPLOYMENT", score_unemployment, 0.25),
    ("LIFE_EXPECTANCY", score_life_expectancy, 0.2),
];

fn health_level(score: f64) -> &'static str {
    match score {
        s if s >= 80.0 => "Excellent",
        s if s >= 60.0 => "Good",
        s if s >= 40.0 => "Medium",
        s if s >= 20.0 => "Poor",
        _ => "Critical",
    }
}

/// Score each country from its latest-year row. Countries with no rows at
/// all get a zero score and the "No Data" level.
pub fn economic_health(
    rows: &[IndicatorRow],
    countries: &[String],
) -> BTreeMap<String, HealthReport> {
    let mut reports = BTreeMap::new();

    for country in countries {
        let latest = rows
            .iter()
            .filter(|row| row.country == *country)
            .max_by_key(|row| row.year);

        let Some(latest) = latest else {
            reports.insert(
                country.clone(),
                HealthReport {
                    country_name: country_name(country).to_string(),
                    health_score: 0.0,
                    health_level: "No Data".to_string(),
                    indicators: BTreeMap::new(),
                    latest_year: None,
                },
            );
            continue;
        };

        let mut health_score = 0.0;
        let mut indicators = BTreeMap::new();
        for (indicator, score_fn, weight) in HEALTH_COMPONENTS {
            if let Some(value) = latest.value(indicator) {
                let score = score_fn(value);
                health_score += f64::from(score) * weight;
                indicators.insert(
                    indicator.to_string(),
                    HealthIndicator {
                        value,
                        score,
                        weight,
                    },
                );
            }
        }

        let health_score = (health_score * 10.0).round() / 10.0;
        reports.insert(
            country.clone(),
            HealthReport {
                country_name: latest.country_name.clone(),
                health_score,
                health_level: health_level(health_score).to_string(),
                indicators,
                latest_year: Some(latest.year),
            },
        );
    }

    reports
}

/// Approximate conversion rates, USD base.
pub const CURRENCY_RATES: [(&str, f64); 8] = [
    ("USD", 1.0),
    ("EUR", 0.85),
    ("UAH", 36.5),
    ("PLN", 4.0),
    ("GBP", 0.8),
    ("JPY", 110.0),
    ("CNY", 6.5),
    ("RUB", 90.0),
];

pub fn currency_rate(currency: &str) -> Option<f64> {
    CURRENCY_RATES
        .iter()
        .find(|(code, _)| *code == currency)
        .map(|(_, rate)| *rate)
}

const MONEY_INDICATORS: [&str; 4] = ["GDP", "GDP_PER_CAPITA", "EXPORTS", "IMPORTS"];

/// Divide the monetary columns by the currency's per-USD rate. Unknown
/// currencies and USD itself leave the rows untouched.
pub fn convert_to_usd(rows: &mut [IndicatorRow], currency: &str) {
    let Some(rate) = currency_rate(currency) else {
        return;
    };
    if currency == "USD" {
        return;
    }
    for row in rows {
        for indicator in MONEY_INDICATORS {
            if let Some(Some(value)) = row.values.get_mut(indicator) {
                *value /= rate;
            }
        }
    }
}
