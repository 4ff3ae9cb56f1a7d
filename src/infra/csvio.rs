//! Flat-file CSV persistence and the raw primitives behind the file browser.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use super::error::InfraError;

/// Inferred column type for browser statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Int,
    Float,
    String,
}

/// Write serde-serializable records to `<dir>/<name>`, replacing the file.
pub fn write_records<T: Serialize>(dir: &Path, name: &str, records: &[T]) -> Result<(), InfraError> {
    fs::create_dir_all(dir)?;
    let mut writer = csv::Writer::from_path(dir.join(name))?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read typed records back from `<dir>/<name>`.
pub fn read_records<T: DeserializeOwned>(dir: &Path, name: &str) -> Result<Vec<T>, InfraError> {
    let mut reader = csv::Reader::from_path(dir.join(name))?;
    let mut records = Vec::new();
    for row in reader.deserialize() {
        records.push(row?);
    }
    Ok(records)
}

/// A bare `*.csv` file name is the only accepted browser path; anything that
/// could escape the data directory is rejected up front.
pub fn is_valid_csv_name(name: &str) -> bool {
    !name.is_empty()
        && name.ends_with(".csv")
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains("..")
}

#[derive(Debug, Clone, Serialize)]
pub struct CsvFileInfo {
    pub name: String,
    pub size: u64,
    pub modified: DateTime<Utc>,
    pub path: String,
}

/// List every CSV file in the data directory. A missing directory is an
/// empty listing, not an error.
pub fn list_csv_files(dir: &Path) -> Result<Vec<CsvFileInfo>, InfraError> {
    let mut files = Vec::new();
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(files),
        Err(err) => return Err(err.into()),
    };

    for entry in entries {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.ends_with(".csv") {
            continue;
        }
        let metadata = entry.metadata()?;
        let modified: DateTime<Utc> = metadata.modified()?.into();
        files.push(CsvFileInfo {
            path: format!("/api/files/{name}"),
            name,
            size: metadata.len(),
            modified,
        });
    }

    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

/// Raw table: header plus stringly cells, the shape both paging and stats
/// work from.
pub struct CsvTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

pub fn read_table(path: &Path) -> Result<CsvTable, InfraError> {
    let mut reader = csv::Reader::from_path(path)?;
    let columns = reader
        .headers()?
        .iter()
        .map(|header| header.to_string())
        .collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(|cell| cell.to_string()).collect());
    }
    Ok(CsvTable { columns, rows })
}

impl CsvTable {
    /// Infer a type per column: int if every non-empty cell parses as i64,
    /// float if every non-empty cell parses as f64, string otherwise.
    pub fn column_types(&self) -> Vec<ColumnType> {
        (0..self.columns.len())
            .map(|index| {
                let mut saw_value = false;
                let mut all_int = true;
                let mut all_float = true;
                for row in &self.rows {
                    let cell = row.get(index).map(String::as_str).unwrap_or("");
                    if cell.is_empty() {
                        continue;
                    }
                    saw_value = true;
                    if cell.parse::<i64>().is_err() {
                        all_int = false;
                    }
                    if cell.parse::<f64>().is_err() {
                        all_float = false;
                        break;
                    }
                }
                match (saw_value, all_int, all_float) {
                    (false, _, _) => ColumnType::String,
                    (true, true, _) => ColumnType::Int,
                    (true, false, true) => ColumnType::Float,
                    _ => ColumnType::String,
                }
            })
            .collect()
    }

    /// Materialize a window of rows as JSON objects keyed by header.
    pub fn page(&self, offset: usize, limit: usize) -> Vec<Map<String, Value>> {
        let types = self.column_types();
        self.rows
            .iter()
            .skip(offset)
            .take(limit)
            .map(|row| {
                let mut object = Map::new();
                for (index, column) in self.columns.iter().enumerate() {
                    let cell = row.get(index).map(String::as_str).unwrap_or("");
                    object.insert(column.clone(), cell_to_value(cell, types[index]));
                }
                object
            })
            .collect()
    }
}

fn cell_to_value(cell: &str, column_type: ColumnType) -> Value {
    if cell.is_empty() {
        return Value::Null;
    }
    match column_type {
        ColumnType::Int => cell
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(cell.to_string())),
        ColumnType::Float => cell
            .parse::<f64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(cell.to_string())),
        ColumnType::String => Value::String(cell.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Row {
        name: String,
        count: u32,
        score: f64,
    }

    #[test]
    fn records_round_trip_through_csv() {
        let dir = tempfile::tempdir().expect("tempdir");
        let rows = vec![
            Row {
                name: "alpha".to_string(),
                count: 3,
                score: 1.25,
            },
            Row {
                name: "beta".to_string(),
                count: 7,
                score: 0.5,
            },
        ];

        write_records(dir.path(), "rows.csv", &rows).expect("write");
        let restored: Vec<Row> = read_records(dir.path(), "rows.csv").expect("read");
        assert_eq!(restored, rows);
    }

    #[test]
    fn csv_name_validation_rejects_traversal() {
        assert!(is_valid_csv_name("sales.csv"));
        assert!(!is_valid_csv_name("sales.txt"));
        assert!(!is_valid_csv_name("../sales.csv"));
        assert!(!is_valid_csv_name("data/sales.csv"));
        assert!(!is_valid_csv_name(""));
    }

    #[test]
    fn column_types_are_inferred_from_cells() {
        let table = CsvTable {
            columns: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            rows: vec![
                vec!["1".to_string(), "1.5".to_string(), "x".to_string()],
                vec!["2".to_string(), "".to_string(), "y".to_string()],
            ],
        };

        assert_eq!(
            table.column_types(),
            vec![ColumnType::Int, ColumnType::Float, ColumnType::String]
        );
    }

    #[test]
    fn page_materializes_typed_json_with_nulls() {
        let table = CsvTable {
            columns: vec!["n".to_string(), "v".to_string()],
            rows: vec![
                vec!["1".to_string(), "a".to_string()],
                vec!["2".to_string(), "".to_string()],
                vec!["3".to_string(), "c".to_string()],
            ],
        };

        let page = table.page(1, 1);
        assert_eq!(page.len(), 1);
        assert_eq!(page[0]["n"], Value::from(2));
        assert_eq!(page[0]["v"], Value::Null);
    }

    #[test]
    fn listing_missing_directory_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("nope");
        let files = list_csv_files(&missing).expect("list");
        assert!(files.is_empty());
    }
}
