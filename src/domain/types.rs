use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// Product categories carried by every sales, inventory, and profit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductCategory {
    Electronics,
    Clothing,
    Food,
    Books,
    Home,
    Sports,
}

impl ProductCategory {
    pub const ALL: [ProductCategory; 6] = [
        ProductCategory::Electronics,
        ProductCategory::Clothing,
        ProductCategory::Food,
        ProductCategory::Books,
        ProductCategory::Home,
        ProductCategory::Sports,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProductCategory::Electronics => "electronics",
            ProductCategory::Clothing => "clothing",
            ProductCategory::Food => "food",
            ProductCategory::Books => "books",
            ProductCategory::Home => "home",
            ProductCategory::Sports => "sports",
        }
    }
}

impl fmt::Display for ProductCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductCategory {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|category| category.as_str() == value)
            .ok_or_else(|| DomainError::validation(format!("unknown product category `{value}`")))
    }
}

/// Sales regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    Kyiv,
    Kharkiv,
    Lviv,
    Odesa,
    Dnipro,
}

impl Region {
    pub const ALL: [Region; 5] = [
        Region::Kyiv,
        Region::Kharkiv,
        Region::Lviv,
        Region::Odesa,
        Region::Dnipro,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Kyiv => "kyiv",
            Region::Kharkiv => "kharkiv",
            Region::Lviv => "lviv",
            Region::Odesa => "odesa",
            Region::Dnipro => "dnipro",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Region {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|region| region.as_str() == value)
            .ok_or_else(|| DomainError::validation(format!("unknown region `{value}`")))
    }
}

/// Aggregation period for trend queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendPeriod {
    Daily,
    Weekly,
    Monthly,
}

impl Default for TrendPeriod {
    fn default() -> Self {
        TrendPeriod::Daily
    }
}

impl FromStr for TrendPeriod {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "daily" => Ok(TrendPeriod::Daily),
            "weekly" => Ok(TrendPeriod::Weekly),
            "monthly" => Ok(TrendPeriod::Monthly),
            other => Err(DomainError::validation(format!(
                "unknown trend period `{other}`; expected daily, weekly or monthly"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_round_trips_through_str() {
        for category in ProductCategory::ALL {
            assert_eq!(category.as_str().parse::<ProductCategory>().ok(), Some(category));
        }
        assert!("gadgets".parse::<ProductCategory>().is_err());
    }

    #[test]
    fn region_round_trips_through_str() {
        for region in Region::ALL {
            assert_eq!(region.as_str().parse::<Region>().ok(), Some(region));
        }
        assert!("mars".parse::<Region>().is_err());
    }

    #[test]
    fn trend_period_rejects_unknown_values() {
        assert_eq!("weekly".parse::<TrendPeriod>().ok(), Some(TrendPeriod::Weekly));
        assert!("hourly".parse::<TrendPeriod>().is_err());
    }
}
