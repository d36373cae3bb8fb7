//! Delimited text (CSV/TSV) reader producing a [`Dataset`].
use std::collections::HashSet;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::StringRecord;

use crate::dataset::{Dataset, FeatureSeries};

/// Configuration for reading a dataset from delimited text.
#[derive(Debug, Clone)]
pub struct DatasetReaderConfig {
    /// Field delimiter.
    pub delimiter: u8,
    /// Column holding the row index. `None` uses the first column.
    pub index_column: Option<String>,
    /// Optional list of feature columns to load (in order).
    /// When `None`, every column except the index and `ignore_columns` is loaded.
    pub feature_columns: Option<Vec<String>>,
    /// Columns to skip when auto-selecting features.
    pub ignore_columns: Vec<String>,
    /// Cell values read as missing (compared case-insensitively after trimming).
    pub missing_values: Vec<String>,
}

impl Default for DatasetReaderConfig {
    fn default() -> Self {
        Self {
            delimiter: b',',
            index_column: None,
            feature_columns: None,
            ignore_columns: Vec::new(),
            missing_values: vec![
                "".to_string(),
                "NA".to_string(),
                "NaN".to_string(),
                "null".to_string(),
            ],
        }
    }
}

/// Read a delimited text file with a header row into a [`Dataset`].
pub fn read_dataset<P: AsRef<Path>>(path: P, config: &DatasetReaderConfig) -> Result<Dataset> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(config.delimiter)
        .has_headers(true)
        .from_path(&path)
        .with_context(|| format!("Failed to open dataset: {}", path.as_ref().display()))?;

    let headers = reader
        .headers()
        .context("Failed to read dataset header row")?
        .clone();

    let index_idx = match &config.index_column {
        Some(name) => {
            find_column(&headers, name).ok_or_else(|| anyhow!("Missing index column '{}'", name))?
        }
        None => 0,
    };
    let feature_indices = resolve_feature_indices(&headers, config, index_idx)?;
    if feature_indices.is_empty() {
        return Err(anyhow!("No feature columns detected in dataset header"));
    }

    let missing: HashSet<String> = config
        .missing_values
        .iter()
        .map(|v| v.to_ascii_lowercase())
        .collect();

    let mut index = Vec::new();
    let mut values: Vec<Vec<f64>> = vec![Vec::new(); feature_indices.len()];

    for (row_idx, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("Failed to read row {}", row_idx + 1))?;

        let raw_key = record
            .get(index_idx)
            .ok_or_else(|| anyhow!("Missing index value at row {}", row_idx + 1))?;
        let key = parse_index_key(raw_key)
            .ok_or_else(|| anyhow!("Invalid index '{}' at row {}", raw_key, row_idx + 1))?;
        index.push(key);

        for (column, &idx) in values.iter_mut().zip(&feature_indices) {
            let raw = record.get(idx).unwrap_or_default().trim();
            if missing.contains(&raw.to_ascii_lowercase()) {
                column.push(f64::NAN);
                continue;
            }
            let parsed = raw.parse::<f64>().with_context(|| {
                format!(
                    "Invalid feature '{}' at row {}",
                    headers.get(idx).unwrap_or(""),
                    row_idx + 1
                )
            })?;
            column.push(parsed);
        }
    }

    let columns = feature_indices
        .iter()
        .zip(values)
        .map(|(&idx, column)| FeatureSeries::new(headers.get(idx).unwrap_or(""), column))
        .collect();

    let dataset = Dataset::new(index, columns)
        .with_context(|| format!("Invalid dataset: {}", path.as_ref().display()))?;
    log::info!(
        "Loaded {} rows x {} columns from {}",
        dataset.nrows(),
        dataset.ncols(),
        path.as_ref().display()
    );
    Ok(dataset)
}

/// Parse an index cell: an integer, or a timestamp converted to epoch seconds.
///
/// Accepted timestamps are RFC 3339, `%Y-%m-%d %H:%M:%S`, `%Y-%m-%dT%H:%M:%S`
/// and plain `%Y-%m-%d` dates (naive values are taken as UTC).
pub fn parse_index_key(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(key) = raw.parse::<i64>() {
        return Some(key);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.timestamp());
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(ts.and_utc().timestamp());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ts| ts.and_utc().timestamp())
}

fn find_column(headers: &StringRecord, name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|header| header.eq_ignore_ascii_case(name))
}

fn resolve_feature_indices(
    headers: &StringRecord,
    config: &DatasetReaderConfig,
    index_idx: usize,
) -> Result<Vec<usize>> {
    if let Some(names) = &config.feature_columns {
        let mut indices = Vec::with_capacity(names.len());
        for name in names {
            let idx = find_column(headers, name)
                .ok_or_else(|| anyhow!("Missing feature column '{}'", name))?;
            indices.push(idx);
        }
        return Ok(indices);
    }

    let ignore: HashSet<String> = config
        .ignore_columns
        .iter()
        .map(|name| name.to_ascii_lowercase())
        .collect();

    Ok(headers
        .iter()
        .enumerate()
        .filter(|(idx, header)| *idx != index_idx && !ignore.contains(&header.to_ascii_lowercase()))
        .map(|(idx, _)| idx)
        .collect())
}
