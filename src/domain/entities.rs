//! Dataset record types.
//!
//! These shapes mirror the CSV files on disk one-to-one; the CSV layer
//! round-trips them through serde.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::types::{ProductCategory, Region};

/// A single sale line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesRecord {
    pub id: u64,
    pub date: NaiveDate,
    pub product_name: String,
    pub category: ProductCategory,
    pub quantity: u32,
    pub unit_price: f64,
    pub total_revenue: f64,
    pub region: Region,
    pub customer_id: u32,
}

/// Stock position for one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub id: u64,
    pub product_name: String,
    pub category: ProductCategory,
    pub current_stock: u32,
    pub min_stock: u32,
    pub max_stock: u32,
    pub unit_cost: f64,
    pub last_updated: DateTime<Utc>,
}

impl InventoryRecord {
    /// True when the position has fallen to or below its reorder floor.
    pub fn is_low_stock(&self) -> bool {
        self.current_stock <= self.min_stock
    }
}

/// Profitability summary for one product, derived from its sales.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfitRecord {
    pub id: u64,
    pub product_name: String,
    pub category: ProductCategory,
    pub unit_cost: f64,
    pub unit_price: f64,
    pub profit_margin: f64,
    pub profit_percentage: f64,
    pub total_profit: f64,
}

/// One point of the daily revenue/profit time series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub total_revenue: f64,
    pub total_profit: f64,
    pub total_sales: u64,
    pub avg_order_value: f64,
}

/// Headline KPI metrics over the whole dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiSummary {
    pub total_revenue: f64,
    pub total_profit: f64,
    pub total_sales: u64,
    pub avg_profit_margin: f64,
    pub top_product: String,
    pub top_region: String,
    pub inventory_turnover: f64,
}
