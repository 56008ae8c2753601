use super::{
    types::DatasetMetadata,
    validator::DataValidator,
};
use crate::config::DataConfig;
use crate::error::{Result, TrialfeedError};
use chrono::{DateTime, Utc};
use polars::prelude::*;
use std::path::Path;

pub struct CsvConnector;

impl CsvConnector {
    /// Load CSV file into a frame, parsing date-like columns
    pub fn load<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
        let df = CsvReadOptions::default()
            .with_parse_options(CsvParseOptions::default().with_try_parse_dates(true))
            .try_into_reader_with_file_path(Some(path.as_ref().to_path_buf()))?
            .finish()
            .map_err(|e| TrialfeedError::DataLoading(format!("Failed to read CSV: {}", e)))?;

        Ok(df)
    }

    /// Load, validate and normalize a CSV file into a frame ready for
    /// `MarketDataset::from_frame`: canonical OHLCV names plus the
    /// configured timestamp column.
    pub fn load_and_validate<P: AsRef<Path>>(path: P, config: &DataConfig) -> Result<DataFrame> {
        let mut df = Self::load(&path)?;

        let column_map = DataValidator::validate_ohlcv(&df)?;

        // Rename OHLCV columns to standard lowercase names
        for (required, actual_name) in column_map {
            let standard_name = required.as_str();
            if actual_name != standard_name {
                df.rename(&actual_name, standard_name.into())
                    .map_err(|e| TrialfeedError::DataLoading(format!("Failed to rename column: {}", e)))?;
            }
        }

        // Normalize the datetime index column name
        let found = DataValidator::find_timestamp_column(&df)
            .ok_or_else(|| {
                TrialfeedError::DataLoading(format!(
                    "No datetime index column found (expected one of '{}' or a common alias)",
                    config.timestamp_column
                ))
            })?
            .to_string();
        if found != config.timestamp_column {
            df.rename(&found, config.timestamp_column.as_str().into())
                .map_err(|e| TrialfeedError::DataLoading(format!("Failed to rename column: {}", e)))?;
        }

        DataValidator::validate_minimum_rows(&df, config.min_rows)?;

        let null_report = DataValidator::check_nulls(&df)?;
        if !null_report.is_empty() {
            log::warn!("Null values detected: {:?}", null_report);
        }

        Ok(df)
    }

    /// Create metadata for a loaded frame
    pub fn create_metadata<P: AsRef<Path>>(
        path: P,
        df: &DataFrame,
        timestamp_column: &str,
    ) -> Result<DatasetMetadata> {
        let columns: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();

        let date_range = if df.height() > 0 {
            let ts = df
                .column(timestamp_column)?
                .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?;
            let ts = ts.datetime()?;
            match (ts.phys.get(0), ts.phys.get(df.height() - 1)) {
                (Some(first), Some(last)) => to_utc(first)
                    .zip(to_utc(last)),
                _ => None,
            }
        } else {
            None
        };

        Ok(DatasetMetadata {
            file_path: path.as_ref().to_string_lossy().to_string(),
            num_rows: df.height(),
            num_columns: df.width(),
            columns,
            timestamp_column: timestamp_column.to_string(),
            date_range,
        })
    }
}

fn to_utc(millis: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(millis)
}
