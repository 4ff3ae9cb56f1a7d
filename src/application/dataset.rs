//! In-memory dataset service.
//!
//! The five tables load once at startup, either from the CSV files in the
//! data directory or from a fresh generator run, and every query is a pure
//! filter over the in-memory copy.

use std::path::PathBuf;
use std::sync::RwLock;

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;
use tracing::{info, warn};

use crate::application::error::AppError;
use crate::application::generator::{Dataset, Generator};
use crate::domain::entities::{
    InventoryRecord, KpiSummary, ProfitRecord, SalesRecord, TrendPoint,
};
use crate::domain::types::{ProductCategory, Region, TrendPeriod};
use crate::fetch::sync::{read_guard, write_guard};
use crate::infra::csvio;

const DEFAULT_SALES_LIMIT: usize = 1000;

const SALES_FILE: &str = "sales.csv";
const INVENTORY_FILE: &str = "inventory.csv";
const PROFIT_FILE: &str = "profit.csv";
const TRENDS_FILE: &str = "trends.csv";
const STATS_FILE: &str = "stats.csv";

#[derive(Debug, Default, Clone)]
pub struct SalesFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub category: Option<ProductCategory>,
    pub region: Option<Region>,
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Clone)]
pub struct TrendFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub period: TrendPeriod,
}

/// Row counts per table, reported by the liveness endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct RowCounts {
    pub sales: usize,
    pub inventory: usize,
    pub profit: usize,
    pub trends: usize,
}

pub struct DatasetService {
    data_dir: PathBuf,
    days: u32,
    records_per_day: u32,
    seed: Option<u64>,
    dataset: RwLock<Dataset>,
}

impl DatasetService {
    /// Load the dataset from disk, or generate and persist a fresh one when
    /// the CSV files are missing or unreadable.
    pub fn init(
        data_dir: PathBuf,
        days: u32,
        records_per_day: u32,
        seed: Option<u64>,
    ) -> Result<Self, AppError> {
        let dataset = match load_dataset(&data_dir) {
            Ok(Some(dataset)) => {
                info!(
                    target: "ecodash::dataset",
                    sales = dataset.sales.len(),
                    "Loaded dataset from CSV files"
                );
                dataset
            }
            Ok(None) => {
                info!(target: "ecodash::dataset", "No dataset on disk; generating");
                generate_and_persist(&data_dir, days, records_per_day, seed)?
            }
            Err(error) => {
                warn!(
                    target: "ecodash::dataset",
                    %error,
                    "Dataset files unreadable; regenerating"
                );
                generate_and_persist(&data_dir, days, records_per_day, seed)?
            }
        };

        Ok(Self {
            data_dir,
            days,
            records_per_day,
            seed,
            dataset: RwLock::new(dataset),
        })
    }

    pub fn sales(&self, filter: &SalesFilter) -> Vec<SalesRecord> {
        let dataset = read_guard(&self.dataset, "dataset.sales");
        dataset
            .sales
            .iter()
            .filter(|sale| {
                filter.start_date.is_none_or(|start| sale.date >= start)
                    && filter.end_date.is_none_or(|end| sale.date <= end)
                    && filter.category.is_none_or(|c| sale.category == c)
                    && filter.region.is_none_or(|r| sale.region == r)
            })
            .take(filter.limit.unwrap_or(DEFAULT_SALES_LIMIT))
            .cloned()
            .collect()
    }

    pub fn inventory(
        &self,
        category: Option<ProductCategory>,
        low_stock: bool,
    ) -> Vec<InventoryRecord> {
        let dataset = read_guard(&self.dataset, "dataset.inventory");
        dataset
            .inventory
            .iter()
            .filter(|record| {
                category.is_none_or(|c| record.category == c)
                    && (!low_stock || record.is_low_stock())
            })
            .cloned()
            .collect()
    }

    pub fn profit(
        &self,
        category: Option<ProductCategory>,
        min_margin: Option<f64>,
    ) -> Vec<ProfitRecord> {
        let dataset = read_guard(&self.dataset, "dataset.profit");
        dataset
            .profit
            .iter()
            .filter(|record| {
                category.is_none_or(|c| record.category == c)
                    && min_margin.is_none_or(|m| record.profit_percentage >= m)
            })
            .cloned()
            .collect()
    }

    pub fn trends(&self, filter: &TrendFilter) -> Vec<TrendPoint> {
        let dataset = read_guard(&self.dataset, "dataset.trends");
        let daily: Vec<&TrendPoint> = dataset
            .trends
            .iter()
            .filter(|point| {
                filter.start_date.is_none_or(|start| point.date >= start)
                    && filter.end_date.is_none_or(|end| point.date <= end)
            })
            .collect();

        match filter.period {
            TrendPeriod::Daily => daily.into_iter().cloned().collect(),
            TrendPeriod::Weekly => aggregate(daily, week_start),
            TrendPeriod::Monthly => aggregate(daily, month_start),
        }
    }

    pub fn stats(&self) -> KpiSummary {
        read_guard(&self.dataset, "dataset.stats").stats.clone()
    }

    /// Distinct categories present in the sales table, in enum order.
    pub fn categories(&self) -> Vec<String> {
        let dataset = read_guard(&self.dataset, "dataset.categories");
        ProductCategory::ALL
            .iter()
            .filter(|category| dataset.sales.iter().any(|s| s.category == **category))
            .map(|category| category.to_string())
            .collect()
    }

    pub fn regions(&self) -> Vec<String> {
        let dataset = read_guard(&self.dataset, "dataset.regions");
        Region::ALL
            .iter()
            .filter(|region| dataset.sales.iter().any(|s| s.region == **region))
            .map(|region| region.to_string())
            .collect()
    }

    pub fn row_counts(&self) -> RowCounts {
        let dataset = read_guard(&self.dataset, "dataset.row_counts");
        RowCounts {
            sales: dataset.sales.len(),
            inventory: dataset.inventory.len(),
            profit: dataset.profit.len(),
            trends: dataset.trends.len(),
        }
    }

    /// Replace the dataset with a fresh generator run and rewrite the CSVs.
    pub fn regenerate(&self) -> Result<RowCounts, AppError> {
        let fresh = generate_and_persist(
            &self.data_dir,
            self.days,
            self.records_per_day,
            self.seed,
        )?;
        let counts = RowCounts {
            sales: fresh.sales.len(),
            inventory: fresh.inventory.len(),
            profit: fresh.profit.len(),
            trends: fresh.trends.len(),
        };
        *write_guard(&self.dataset, "dataset.regenerate") = fresh;
        info!(target: "ecodash::dataset", sales = counts.sales, "Dataset regenerated");
        Ok(counts)
    }
}

/// Generate a dataset straight to disk without standing up the service.
/// Used by the CLI `generate` subcommand.
pub fn generate_to(
    data_dir: &std::path::Path,
    days: u32,
    records_per_day: u32,
    seed: Option<u64>,
) -> Result<RowCounts, AppError> {
    let dataset = generate_and_persist(data_dir, days, records_per_day, seed)?;
    Ok(RowCounts {
        sales: dataset.sales.len(),
        inventory: dataset.inventory.len(),
        profit: dataset.profit.len(),
        trends: dataset.trends.len(),
    })
}

fn load_dataset(data_dir: &std::path::Path) -> Result<Option<Dataset>, AppError> {
    let all_present = [
        SALES_FILE,
        INVENTORY_FILE,
        PROFIT_FILE,
        TRENDS_FILE,
        STATS_FILE,
    ]
    .iter()
    .all(|name| data_dir.join(name).is_file());
    if !all_present {
        return Ok(None);
    }

    let stats_rows: Vec<KpiSummary> = csvio::read_records(data_dir, STATS_FILE)?;
    let stats = stats_rows
        .into_iter()
        .next()
        .ok_or_else(|| AppError::unexpected("stats.csv is empty"))?;

    Ok(Some(Dataset {
        sales: csvio::read_records(data_dir, SALES_FILE)?,
        inventory: csvio::read_records(data_dir, INVENTORY_FILE)?,
        profit: csvio::read_records(data_dir, PROFIT_FILE)?,
        trends: csvio::read_records(data_dir, TRENDS_FILE)?,
        stats,
    }))
}

fn generate_and_persist(
    data_dir: &std::path::Path,
    days: u32,
    records_per_day: u32,
    seed: Option<u64>,
) -> Result<Dataset, AppError> {
    let dataset = Generator::new(seed).generate(days, records_per_day);
    csvio::write_records(data_dir, SALES_FILE, &dataset.sales)?;
    csvio::write_records(data_dir, INVENTORY_FILE, &dataset.inventory)?;
    csvio::write_records(data_dir, PROFIT_FILE, &dataset.profit)?;
    csvio::write_records(data_dir, TRENDS_FILE, &dataset.trends)?;
    csvio::write_records(data_dir, STATS_FILE, std::slice::from_ref(&dataset.stats))?;
    Ok(dataset)
}

fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn aggregate(points: Vec<&TrendPoint>, bucket: fn(NaiveDate) -> NaiveDate) -> Vec<TrendPoint> {
    use std::collections::BTreeMap;

    struct Bucket {
        revenue: f64,
        profit: f64,
        sales: u64,
        order_value_sum: f64,
        days: u32,
    }

    let mut buckets: BTreeMap<NaiveDate, Bucket> = BTreeMap::new();
    for point in points {
        let entry = buckets.entry(bucket(point.date)).or_insert(Bucket {
            revenue: 0.0,
            profit: 0.0,
            sales: 0,
            order_value_sum: 0.0,
            days: 0,
        });
        entry.revenue += point.total_revenue;
        entry.profit += point.total_profit;
        entry.sales += point.total_sales;
        entry.order_value_sum += point.avg_order_value;
        entry.days += 1;
    }

    buckets
        .into_iter()
        .map(|(date, bucket)| TrendPoint {
            date,
            total_revenue: bucket.revenue,
            total_profit: bucket.profit,
            total_sales: bucket.sales,
            avg_order_value: bucket.order_value_sum / f64::from(bucket.days),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> (tempfile::TempDir, DatasetService) {
        let dir = tempfile::tempdir().expect("tempdir");
        let service =
            DatasetService::init(dir.path().to_path_buf(), 30, 10, Some(42)).expect("init");
        (dir, service)
    }

    #[test]
    fn init_persists_all_five_files() {
        let (dir, _service) = service();
        for name in [
            SALES_FILE,
            INVENTORY_FILE,
            PROFIT_FILE,
            TRENDS_FILE,
            STATS_FILE,
        ] {
            assert!(dir.path().join(name).is_file(), "missing {name}");
        }
    }

    #[test]
    fn second_init_loads_instead_of_regenerating() {
        let (dir, first) = service();
        let expected = first.stats();

        let reloaded =
            DatasetService::init(dir.path().to_path_buf(), 30, 10, None).expect("reload");
        assert_eq!(reloaded.stats(), expected);
    }

    #[test]
    fn sales_filter_respects_category_and_limit() {
        let (_dir, service) = service();

        let filtered = service.sales(&SalesFilter {
            category: Some(ProductCategory::Food),
            limit: Some(5),
            ..SalesFilter::default()
        });
        assert!(filtered.len() <= 5);
        assert!(filtered.iter().all(|s| s.category == ProductCategory::Food));
    }

    #[test]
    fn sales_date_range_is_inclusive() {
        let (_dir, service) = service();
        let all = service.sales(&SalesFilter {
            limit: Some(usize::MAX),
            ..SalesFilter::default()
        });
        let day = all[0].date;

        let filtered = service.sales(&SalesFilter {
            start_date: Some(day),
            end_date: Some(day),
            limit: Some(usize::MAX),
            ..SalesFilter::default()
        });
        assert!(!filtered.is_empty());
        assert!(filtered.iter().all(|s| s.date == day));
    }

    #[test]
    fn low_stock_keeps_only_reorder_candidates() {
        let (_dir, service) = service();
        let low = service.inventory(None, true);
        assert!(low.iter().all(|r| r.current_stock <= r.min_stock));
    }

    #[test]
    fn min_margin_filters_profit_rows() {
        let (_dir, service) = service();
        let rows = service.profit(None, Some(40.0));
        assert!(rows.iter().all(|r| r.profit_percentage >= 40.0));
    }

    #[test]
    fn weekly_trends_bucket_on_mondays() {
        let (_dir, service) = service();
        let weekly = service.trends(&TrendFilter {
            period: TrendPeriod::Weekly,
            ..TrendFilter::default()
        });
        assert!(!weekly.is_empty());
        assert!(
            weekly
                .iter()
                .all(|p| p.date.weekday() == chrono::Weekday::Mon)
        );

        let daily = service.trends(&TrendFilter::default());
        let weekly_revenue: f64 = weekly.iter().map(|p| p.total_revenue).sum();
        let daily_revenue: f64 = daily.iter().map(|p| p.total_revenue).sum();
        assert!((weekly_revenue - daily_revenue).abs() < 0.01);
    }

    #[test]
    fn monthly_trends_bucket_on_the_first() {
        let (_dir, service) = service();
        let monthly = service.trends(&TrendFilter {
            period: TrendPeriod::Monthly,
            ..TrendFilter::default()
        });
        assert!(!monthly.is_empty());
        assert!(monthly.iter().all(|p| p.date.day() == 1));
    }

    #[test]
    fn regenerate_swaps_the_dataset_and_reports_counts() {
        let (_dir, service) = service();
        let counts = service.regenerate().expect("regenerate");
        assert_eq!(counts.sales, service.row_counts().sales);
        assert!(counts.inventory > 0);
    }

    #[test]
    fn categories_and_regions_cover_generated_sales() {
        let (_dir, service) = service();
        // 300 records over 30 days make every category and region near-certain.
        assert_eq!(service.categories().len(), ProductCategory::ALL.len());
        assert_eq!(service.regions().len(), Region::ALL.len());
    }
}
