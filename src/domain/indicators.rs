//! Macroeconomic indicator shapes and the fixed roster of indicators and
//! countries the dashboard knows how to label.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Friendly indicator name → World Bank series code.
pub const INDICATORS: [(&str, &str); 10] = [
    ("GDP", "NY.GDP.MKTP.CD"),
    ("GDP_PER_CAPITA", "NY.GDP.PCAP.CD"),
    ("INFLATION", "FP.CPI.TOTL.ZG"),
    ("UNEMPLOYMENT", "SL.UEM.TOTL.ZS"),
    ("EXPORTS", "NE.EXP.GNFS.CD"),
    ("IMPORTS", "NE.IMP.GNFS.CD"),
    ("POPULATION", "SP.POP.TOTL"),
    ("LIFE_EXPECTANCY", "SP.DYN.LE00.IN"),
    ("INTERNET_USERS", "IT.NET.USER.ZS"),
    ("EDUCATION_EXPENDITURE", "SE.XPD.TOTL.GD.ZS"),
];

/// ISO alpha-2 code → display name for the countries the dashboard offers.
pub const COUNTRIES: [(&str, &str); 14] = [
    ("UA", "Ukraine"),
    ("US", "United States"),
    ("DE", "Germany"),
    ("FR", "France"),
    ("GB", "United Kingdom"),
    ("PL", "Poland"),
    ("CN", "China"),
    ("JP", "Japan"),
    ("IN", "India"),
    ("BR", "Brazil"),
    ("CA", "Canada"),
    ("AU", "Australia"),
    ("IT", "Italy"),
    ("ES", "Spain"),
];

/// Resolve a friendly name (`GDP`) or a raw series code to the series code.
pub fn indicator_code(name: &str) -> &str {
    INDICATORS
        .iter()
        .find(|(friendly, _)| *friendly == name)
        .map(|(_, code)| *code)
        .unwrap_or(name)
}

/// Resolve a series code back to the friendly name, keeping unknown codes as-is.
pub fn indicator_name(code: &str) -> &str {
    INDICATORS
        .iter()
        .find(|(_, known)| *known == code)
        .map(|(friendly, _)| *friendly)
        .unwrap_or(code)
}

/// Display name for an ISO code; unknown codes fall back to the code itself.
pub fn country_name(iso: &str) -> &str {
    COUNTRIES
        .iter()
        .find(|(code, _)| *code == iso)
        .map(|(_, name)| *name)
        .unwrap_or(iso)
}

/// One upstream observation in long form: country × indicator × year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationPoint {
    pub country_iso: String,
    pub country_name: String,
    pub indicator_code: String,
    pub year: i32,
    pub value: Option<f64>,
}

/// One wide row: a country/year pair with a column per requested indicator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRow {
    pub country: String,
    pub country_name: String,
    pub year: i32,
    #[serde(flatten)]
    pub values: BTreeMap<String, Option<f64>>,
}

impl IndicatorRow {
    pub fn value(&self, indicator: &str) -> Option<f64> {
        self.values.get(indicator).copied().flatten()
    }
}

/// One row of a single-indicator country comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub country: String,
    pub country_name: String,
    pub year: i32,
    pub value: Option<f64>,
}

/// Direction of a fitted indicator trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Rising,
    Falling,
}

/// Least-squares trend summary for one indicator of one country.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorTrend {
    pub slope: f64,
    pub direction: TrendDirection,
    pub latest_value: f64,
    pub years_analyzed: usize,
}

/// Full trend analysis response for one country.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendReport {
    pub country: String,
    pub country_code: String,
    pub analysis_period: String,
    pub trends: BTreeMap<String, IndicatorTrend>,
    pub raw_data: Vec<IndicatorRow>,
}

/// Score contribution of a single indicator to a country's health score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthIndicator {
    pub value: f64,
    pub score: u32,
    pub weight: f64,
}

/// Weighted economic-health assessment for one country.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub country_name: String,
    pub health_score: f64,
    pub health_level: String,
    pub indicators: BTreeMap<String, HealthIndicator>,
    pub latest_year: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indicator_lookup_accepts_names_and_codes() {
        assert_eq!(indicator_code("GDP"), "NY.GDP.MKTP.CD");
        assert_eq!(indicator_code("NY.GDP.MKTP.CD"), "NY.GDP.MKTP.CD");
        assert_eq!(indicator_name("FP.CPI.TOTL.ZG"), "INFLATION");
        assert_eq!(indicator_name("X.UNKNOWN"), "X.UNKNOWN");
    }

    #[test]
    fn country_names_fall_back_to_iso_code() {
        assert_eq!(country_name("UA"), "Ukraine");
        assert_eq!(country_name("ZZ"), "ZZ");
    }

    #[test]
    fn indicator_row_flattens_values() {
        let mut values = BTreeMap::new();
        values.insert("GDP".to_string(), Some(1.5));
        values.insert("INFLATION".to_string(), None);
        let row = IndicatorRow {
            country: "UA".to_string(),
            country_name: "Ukraine".to_string(),
            year: 2023,
            values,
        };

        let json = serde_json::to_value(&row).expect("serialize row");
        assert_eq!(json["country"], "UA");
        assert_eq!(json["GDP"], 1.5);
        assert!(json["INFLATION"].is_null());
    }
}
