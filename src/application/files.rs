//! CSV file browser over the data directory.

use std::path::PathBuf;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::application::error::AppError;
use crate::infra::csvio::{self, ColumnType, CsvFileInfo};

const DEFAULT_LIMIT: usize = 100;

/// One page of rows from a browsed file.
#[derive(Debug, Serialize)]
pub struct CsvPage {
    pub filename: String,
    pub columns: Vec<String>,
    pub total_rows: usize,
    pub offset: usize,
    pub limit: usize,
    pub data: Vec<Map<String, Value>>,
}

#[derive(Debug, Serialize)]
pub struct ColumnStats {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    pub null_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct CsvStats {
    pub filename: String,
    pub total_rows: usize,
    pub total_columns: usize,
    pub columns: Vec<ColumnStats>,
}

pub struct FileBrowser {
    data_dir: PathBuf,
}

impl FileBrowser {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    pub fn list_files(&self) -> Result<Vec<CsvFileInfo>, AppError> {
        Ok(csvio::list_csv_files(&self.data_dir)?)
    }

    pub fn read_file(
        &self,
        name: &str,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<CsvPage, AppError> {
        let table = self.open(name)?;
        let limit = limit.unwrap_or(DEFAULT_LIMIT);
        let offset = offset.unwrap_or(0);

        Ok(CsvPage {
            filename: name.to_string(),
            total_rows: table.rows.len(),
            data: table.page(offset, limit),
            columns: table.columns,
            offset,
            limit,
        })
    }

    pub fn file_stats(&self, name: &str) -> Result<CsvStats, AppError> {
        let table = self.open(name)?;
        let types = table.column_types();

        let columns = table
            .columns
            .iter()
            .enumerate()
            .map(|(index, column)| {
                let cells = table
                    .rows
                    .iter()
                    .map(|row| row.get(index).map(String::as_str).unwrap_or(""));

                let null_count = cells.clone().filter(|cell| cell.is_empty()).count();
                let numeric = matches!(types[index], ColumnType::Int | ColumnType::Float);
                let values: Vec<f64> = if numeric {
                    cells.filter_map(|cell| cell.parse::<f64>().ok()).collect()
                } else {
                    Vec::new()
                };

                let (min, max, mean) = if values.is_empty() {
                    (None, None, None)
                } else {
                    let sum: f64 = values.iter().sum();
                    (
                        values.iter().copied().reduce(f64::min),
                        values.iter().copied().reduce(f64::max),
                        Some(sum / values.len() as f64),
                    )
                };

                ColumnStats {
                    name: column.clone(),
                    column_type: types[index],
                    null_count,
                    min,
                    max,
                    mean,
                }
            })
            .collect();

        Ok(CsvStats {
            filename: name.to_string(),
            total_rows: table.rows.len(),
            total_columns: table.columns.len(),
            columns,
        })
    }

    fn open(&self, name: &str) -> Result<csvio::CsvTable, AppError> {
        if !csvio::is_valid_csv_name(name) {
            return Err(AppError::NotFound);
        }
        let path = self.data_dir.join(name);
        if !path.is_file() {
            return Err(AppError::NotFound);
        }
        Ok(csvio::read_table(&path)?)
    }
}
