//! Synthetic dataset generator.
//!
//! Produces a plausible year of retail activity for a mid-size trading
//! company: seasonal sales, stock positions, per-product profitability, and
//! the derived daily trend series. Seeded runs are fully reproducible.

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;

use crate::domain::entities::{
    InventoryRecord, KpiSummary, ProfitRecord, SalesRecord, TrendPoint,
};
use crate::domain::types::{ProductCategory, Region};

const PRODUCTS: [(ProductCategory, [&str; 6]); 6] = [
    (
        ProductCategory::Electronics,
        [
            "Samsung Galaxy smartphone",
            "Dell Inspiron laptop",
            "iPad tablet",
            "AirPods headphones",
            "Canon EOS camera",
            "LG OLED television",
        ],
    ),
    (
        ProductCategory::Clothing,
        [
            "Levis jeans",
            "Nike t-shirt",
            "The North Face jacket",
            "Adidas sneakers",
            "Zara dress",
            "H&M sweater",
        ],
    ),
    (
        ProductCategory::Food,
        [
            "Artisan bread",
            "Milk 3.2%",
            "Gouda cheese",
            "Greek yogurt",
            "Chicken fillet",
            "Seasonal vegetables",
        ],
    ),
    (
        ProductCategory::Books,
        [
            "Novel '1984'",
            "Mathematics textbook",
            "Agatha Christie mystery",
            "Encyclopedia",
            "Cookbook",
            "Fashion magazine",
        ],
    ),
    (
        ProductCategory::Home,
        [
            "Modular sofa",
            "Dining table",
            "Desk lamp",
            "Persian rug",
            "Decorative vase",
            "Flower pot",
        ],
    ),
    (
        ProductCategory::Sports,
        [
            "Dumbbells 10kg",
            "Mountain bike",
            "Running shoes",
            "Football",
            "Tennis racket",
            "Gym membership",
        ],
    ),
];

struct PriceRange {
    min_price: f64,
    max_price: f64,
    cost_ratio: f64,
}

fn price_range(category: ProductCategory) -> PriceRange {
    let (min_price, max_price, cost_ratio) = match category {
        ProductCategory::Electronics => (500.0, 5000.0, 0.6),
        ProductCategory::Clothing => (50.0, 500.0, 0.4),
        ProductCategory::Food => (10.0, 100.0, 0.7),
        ProductCategory::Books => (20.0, 200.0, 0.5),
        ProductCategory::Home => (100.0, 2000.0, 0.5),
        ProductCategory::Sports => (30.0, 800.0, 0.6),
    };
    PriceRange {
        min_price,
        max_price,
        cost_ratio,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// The five in-memory tables the service works from.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub sales: Vec<SalesRecord>,
    pub inventory: Vec<InventoryRecord>,
    pub profit: Vec<ProfitRecord>,
    pub trends: Vec<TrendPoint>,
    pub stats: KpiSummary,
}

pub struct Generator {
    rng: StdRng,
}

impl Generator {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }

    pub fn generate(&mut self, days: u32, records_per_day: u32) -> Dataset {
        let sales = self.generate_sales(days, records_per_day);
        let inventory = self.generate_inventory();
        let profit = self.derive_profit(&sales);
        let trends = derive_trends(&sales);
        let stats = self.derive_stats(&sales, &profit);
        Dataset {
            sales,
            inventory,
            profit,
            trends,
            stats,
        }
    }

    fn generate_sales(&mut self, days: u32, records_per_day: u32) -> Vec<SalesRecord> {
        let base_date = Utc::now().date_naive() - Duration::days(i64::from(days));
        let mut records = Vec::new();
        let mut next_id = 1u64;

        for day in 0..days {
            let date = base_date + Duration::days(i64::from(day));
            let weekend = matches!(date.weekday(), Weekday::Sat | Weekday::Sun);
            let holiday_season = matches!(date.month(), 12 | 1 | 6);

            let mut daily = f64::from(records_per_day);
            if weekend {
                daily *= 1.5;
            }
            if holiday_season {
                daily *= 2.0;
            }

            for _ in 0..daily as u32 {
                let (category, names) = PRODUCTS[self.rng.gen_range(0..PRODUCTS.len())];
                let product_name = names[self.rng.gen_range(0..names.len())].to_string();
                let quantity = self.rng.gen_range(1..=10u32);

                let range = price_range(category);
                let unit_price = round2(self.rng.gen_range(range.min_price..range.max_price));

                records.push(SalesRecord {
                    id: next_id,
                    date,
                    product_name,
                    category,
                    quantity,
                    unit_price,
                    total_revenue: round2(f64::from(quantity) * unit_price),
                    region: Region::ALL[self.rng.gen_range(0..Region::ALL.len())],
                    customer_id: self.rng.gen_range(1000..=9999u32),
                });
                next_id += 1;
            }
        }

        records
    }

    fn generate_inventory(&mut self) -> Vec<InventoryRecord> {
        // Anchored to midnight so seeded runs agree regardless of when in
        // the day they happen.
        let today = Utc::now().date_naive();
        let mut records = Vec::new();

        for (category, names) in PRODUCTS {
            for name in names {
                let range = price_range(category);
                let unit_cost = round2(self.rng.gen_range(
                    range.min_price * range.cost_ratio..range.max_price * range.cost_ratio,
                ));
                let current_stock = self.rng.gen_range(10..=500u32);

                records.push(InventoryRecord {
                    id: records.len() as u64 + 1,
                    product_name: name.to_string(),
                    category,
                    current_stock,
                    min_stock: self.rng.gen_range(5..=50u32),
                    max_stock: current_stock + self.rng.gen_range(100..=1000u32),
                    unit_cost,
                    last_updated: (today - Duration::days(self.rng.gen_range(1..=30i64)))
                        .and_time(NaiveTime::MIN)
                        .and_utc(),
                });
            }
        }

        records
    }

    fn derive_profit(&mut self, sales: &[SalesRecord]) -> Vec<ProfitRecord> {
        struct ProductTotals {
            category: ProductCategory,
            revenue: f64,
            quantity: u64,
        }

        let mut by_product: BTreeMap<String, ProductTotals> = BTreeMap::new();
        for sale in sales {
            let entry = by_product
                .entry(sale.product_name.clone())
                .or_insert(ProductTotals {
                    category: sale.category,
                    revenue: 0.0,
                    quantity: 0,
                });
            entry.revenue += sale.total_revenue;
            entry.quantity += u64::from(sale.quantity);
        }

        let mut records = Vec::new();
        for (product_name, totals) in by_product {
            let avg_price = totals.revenue / totals.quantity as f64;
            let ratio = price_range(totals.category).cost_ratio;
            // Cost jitters around the category norm so margins vary by product.
            let unit_cost = round2(avg_price * self.rng.gen_range(ratio * 0.8..ratio * 1.2));
            let profit_margin = avg_price - unit_cost;

            records.push(ProfitRecord {
                id: records.len() as u64 + 1,
                product_name,
                category: totals.category,
                unit_cost,
                unit_price: round2(avg_price),
                profit_margin: round2(profit_margin),
                profit_percentage: round2(profit_margin / avg_price * 100.0),
                total_profit: round2(profit_margin * totals.quantity as f64),
            });
        }

        records
    }

    fn derive_stats(&mut self, sales: &[SalesRecord], profit: &[ProfitRecord]) -> KpiSummary {
        let total_revenue: f64 = sales.iter().map(|s| s.total_revenue).sum();
        let total_profit: f64 = profit.iter().map(|p| p.total_profit).sum();
        let total_sales: u64 = sales.iter().map(|s| u64::from(s.quantity)).sum();

        let mut product_revenue: BTreeMap<&str, f64> = BTreeMap::new();
        for sale in sales {
            *product_revenue.entry(&sale.product_name).or_default() += sale.total_revenue;
        }
        let top_product = product_revenue
            .iter()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(name, _)| (*name).to_string())
            .unwrap_or_else(|| "No data".to_string());

        let mut region_sales: BTreeMap<&str, u64> = BTreeMap::new();
        for sale in sales {
            *region_sales.entry(sale.region.as_str()).or_default() += u64::from(sale.quantity);
        }
        let top_region = region_sales
            .iter()
            .max_by_key(|(_, quantity)| **quantity)
            .map(|(region, _)| (*region).to_string())
            .unwrap_or_else(|| "No data".to_string());

        let avg_profit_margin = if total_revenue > 0.0 {
            total_profit / total_revenue * 100.0
        } else {
            0.0
        };

        KpiSummary {
            total_revenue: round2(total_revenue),
            total_profit: round2(total_profit),
            total_sales,
            avg_profit_margin: round2(avg_profit_margin),
            top_product,
            top_region,
            inventory_turnover: round2(self.rng.gen_range(4.0..12.0)),
        }
    }
}

/// Daily roll-up of the sales table, sorted by date.
///
/// Profit per day is estimated at a flat 30% margin; exact per-product costs
/// only exist at the profit-table granularity.
pub fn derive_trends(sales: &[SalesRecord]) -> Vec<TrendPoint> {
    struct DayTotals {
        revenue: f64,
        quantity: u64,
        orders: u64,
    }

    let mut by_day: BTreeMap<NaiveDate, DayTotals> = BTreeMap::new();
    for sale in sales {
        let entry = by_day.entry(sale.date).or_insert(DayTotals {
            revenue: 0.0,
            quantity: 0,
            orders: 0,
        });
        entry.revenue += sale.total_revenue;
        entry.quantity += u64::from(sale.quantity);
        entry.orders += 1;
    }

    by_day
        .into_iter()
        .map(|(date, totals)| TrendPoint {
            date,
            total_revenue: round2(totals.revenue),
            total_profit: round2(totals.revenue * 0.3),
            total_sales: totals.quantity,
            avg_order_value: round2(totals.revenue / totals.orders as f64),
        })
        .collect()
}
