use crate::config::DataConfig;
use crate::error::{Result, TrialfeedError};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use polars::prelude::*;
use std::path::Path;

use super::connectors::CsvConnector;

/// Read-only, time-ordered view over a market data frame.
///
/// Row indices are the unit in which all trial and episode boundaries are
/// expressed; `timeframe_minutes` is the nominal spacing between consecutive
/// records. Calendar gaps (weekends, holidays) are simply absent rows.
pub struct MarketDataset {
    frame: DataFrame,
    /// Epoch milliseconds per row, strictly increasing.
    timestamps: Vec<i64>,
    timeframe_minutes: u32,
    timestamp_column: String,
}

impl MarketDataset {
    /// Wraps an already-loaded frame. The timestamp column must be a
    /// datetime column or epoch-millisecond integers, strictly increasing.
    pub fn from_frame(
        frame: DataFrame,
        timestamp_column: &str,
        timeframe_minutes: u32,
    ) -> Result<Self> {
        if timeframe_minutes == 0 {
            return Err(TrialfeedError::Configuration(
                "Timeframe must be at least 1 minute".to_string(),
            ));
        }
        if frame.height() == 0 {
            return Err(TrialfeedError::DataLoading("Dataset is empty".to_string()));
        }

        let timestamps = extract_millis(&frame, timestamp_column)?;

        for (i, pair) in timestamps.windows(2).enumerate() {
            if pair[1] <= pair[0] {
                return Err(TrialfeedError::Validation(format!(
                    "Timestamps must be strictly increasing; violated at row {}",
                    i + 1
                )));
            }
        }

        Ok(Self {
            frame,
            timestamps,
            timeframe_minutes,
            timestamp_column: timestamp_column.to_string(),
        })
    }

    /// Loads a CSV file and wraps it according to `config`.
    pub fn load_csv<P: AsRef<Path>>(path: P, config: &DataConfig) -> Result<Self> {
        let frame = CsvConnector::load_and_validate(path, config)?;
        Self::from_frame(frame, &config.timestamp_column, config.timeframe_minutes)
    }

    pub fn row_count(&self) -> usize {
        self.frame.height()
    }

    pub fn timeframe_minutes(&self) -> u32 {
        self.timeframe_minutes
    }

    pub fn timestamp_column(&self) -> &str {
        &self.timestamp_column
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn timestamp_at(&self, row: usize) -> Result<DateTime<Utc>> {
        let millis = self.timestamps.get(row).copied().ok_or_else(|| {
            TrialfeedError::Validation(format!("Cannot get timestamp at index {}", row))
        })?;
        DateTime::<Utc>::from_timestamp_millis(millis)
            .ok_or_else(|| TrialfeedError::Validation(format!("Invalid timestamp: {}", millis)))
    }

    /// Wall-clock span between the first and last record.
    pub fn span(&self) -> Duration {
        let first = self.timestamps[0];
        let last = self.timestamps[self.timestamps.len() - 1];
        Duration::milliseconds(last - first)
    }

    /// Index of the record closest to the given date's midnight.
    /// Distance ties favor the earlier row.
    pub fn nearest_row_for_date(&self, date: NaiveDate) -> Result<usize> {
        let target = date
            .and_time(NaiveTime::MIN)
            .and_utc()
            .timestamp_millis();

        let row = match self.timestamps.binary_search(&target) {
            Ok(i) => i,
            Err(0) => 0,
            Err(i) if i == self.timestamps.len() => self.timestamps.len() - 1,
            Err(i) => {
                let before = target - self.timestamps[i - 1];
                let after = self.timestamps[i] - target;
                if after < before {
                    i
                } else {
                    i - 1
                }
            }
        };
        Ok(row)
    }

    /// Contiguous sub-frame of `len` rows starting at `start_row`.
    pub fn slice(&self, start_row: usize, len: usize) -> DataFrame {
        self.frame.slice(start_row as i64, len)
    }
}

fn extract_millis(frame: &DataFrame, timestamp_column: &str) -> Result<Vec<i64>> {
    let column = frame.column(timestamp_column).map_err(|_| {
        TrialfeedError::DataLoading(format!("Missing timestamp column '{}'", timestamp_column))
    })?;

    let to_millis: fn(i64) -> i64 = match column.dtype() {
        DataType::Datetime(TimeUnit::Milliseconds, _) => |v| v,
        DataType::Datetime(TimeUnit::Microseconds, _) => |v| v / 1_000,
        DataType::Datetime(TimeUnit::Nanoseconds, _) => |v| v / 1_000_000,
        // Plain integers are taken as epoch milliseconds.
        DataType::Int64 => |v| v,
        other => {
            return Err(TrialfeedError::DataLoading(format!(
                "Timestamp column '{}' must be datetime or epoch milliseconds, found {:?}",
                timestamp_column, other
            )))
        }
    };

    let values = column.cast(&DataType::Int64)?;
    let values = values.i64()?;

    let mut millis = Vec::with_capacity(frame.height());
    for i in 0..frame.height() {
        let v = values.get(i).ok_or_else(|| {
            TrialfeedError::Validation(format!("Null timestamp at row {}", i))
        })?;
        millis.push(to_millis(v));
    }
    Ok(millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;

    const MINUTE_MS: i64 = 60_000;
    const DAY_MS: i64 = 86_400_000;

    /// Minute rows for the given days (day index -> calendar offset in days),
    /// anchored at 2016-01-04 00:00 UTC.
    fn dataset_for_days(day_offsets: &[i64]) -> MarketDataset {
        let base = NaiveDate::from_ymd_opt(2016, 1, 4)
            .unwrap()
            .and_time(NaiveTime::MIN)
            .and_utc()
            .timestamp_millis();
        let mut ts = Vec::new();
        for &offset in day_offsets {
            for minute in 0..1440 {
                ts.push(base + offset * DAY_MS + minute * MINUTE_MS);
            }
        }
        let close: Vec<f64> = (0..ts.len()).map(|i| 100.0 + i as f64 * 0.01).collect();
        let frame = df! {
            "timestamp" => &ts,
            "close" => &close,
        }
        .unwrap();
        MarketDataset::from_frame(frame, "timestamp", 1).unwrap()
    }

    #[test]
    fn nearest_row_exact_day_start() {
        // Mon, Tue, Wed
        let dataset = dataset_for_days(&[0, 1, 2]);
        let tuesday = NaiveDate::from_ymd_opt(2016, 1, 5).unwrap();
        assert_eq!(dataset.nearest_row_for_date(tuesday).unwrap(), 1440);
    }

    #[test]
    fn nearest_row_across_weekend_gap() {
        // Thu, Fri, Mon (2016-01-07, 08, 11)
        let dataset = dataset_for_days(&[3, 4, 7]);
        // Saturday midnight is 1 minute after the last Friday record and
        // 2 days before the first Monday record.
        let saturday = NaiveDate::from_ymd_opt(2016, 1, 9).unwrap();
        assert_eq!(dataset.nearest_row_for_date(saturday).unwrap(), 2879);
        // Monday itself resolves exactly.
        let monday = NaiveDate::from_ymd_opt(2016, 1, 11).unwrap();
        assert_eq!(dataset.nearest_row_for_date(monday).unwrap(), 2880);
    }

    #[test]
    fn nearest_row_tie_favors_earlier() {
        let base = NaiveDate::from_ymd_opt(2016, 1, 4)
            .unwrap()
            .and_time(NaiveTime::MIN)
            .and_utc()
            .timestamp_millis();
        // 23:00 and 01:00 around the 2016-01-05 midnight, equidistant.
        let frame = df! {
            "timestamp" => &[base + 23 * 3_600_000, base + 25 * 3_600_000],
            "close" => &[1.0, 2.0],
        }
        .unwrap();
        let dataset = MarketDataset::from_frame(frame, "timestamp", 60).unwrap();
        let date = NaiveDate::from_ymd_opt(2016, 1, 5).unwrap();
        assert_eq!(dataset.nearest_row_for_date(date).unwrap(), 0);
    }

    #[test]
    fn nearest_row_clamps_to_bounds() {
        let dataset = dataset_for_days(&[0]);
        let before = NaiveDate::from_ymd_opt(2015, 12, 1).unwrap();
        let after = NaiveDate::from_ymd_opt(2016, 2, 1).unwrap();
        assert_eq!(dataset.nearest_row_for_date(before).unwrap(), 0);
        assert_eq!(dataset.nearest_row_for_date(after).unwrap(), 1439);
    }

    #[test]
    fn span_covers_calendar_gaps() {
        // Fri + Mon: span is wall-clock, not row count.
        let dataset = dataset_for_days(&[4, 7]);
        let expected = Duration::days(3) + Duration::minutes(1439);
        assert_eq!(dataset.span(), expected);
    }

    #[test]
    fn rejects_unordered_timestamps() {
        let frame = df! {
            "timestamp" => &[1_000_i64, 3_000, 2_000],
            "close" => &[1.0, 2.0, 3.0],
        }
        .unwrap();
        let result = MarketDataset::from_frame(frame, "timestamp", 1);
        assert!(matches!(result, Err(TrialfeedError::Validation(_))));
    }

    #[test]
    fn rejects_empty_frame() {
        let frame = df! {
            "timestamp" => &Vec::<i64>::new(),
            "close" => &Vec::<f64>::new(),
        }
        .unwrap();
        assert!(MarketDataset::from_frame(frame, "timestamp", 1).is_err());
    }

    #[test]
    fn slice_returns_requested_rows() {
        let dataset = dataset_for_days(&[0, 1]);
        let window = dataset.slice(100, 50);
        assert_eq!(window.height(), 50);
    }
}
