use super::traits::ConfigSection;
use crate::error::TrialfeedError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Nominal sampling period of the dataset, minutes between consecutive
    /// records. Calendar gaps (weekends, holidays) are allowed on top.
    pub timeframe_minutes: u32,
    /// Name of the datetime index column.
    pub timestamp_column: String,
    /// Minimum rows required for a dataset to be usable.
    pub min_rows: usize,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            timeframe_minutes: 1,
            timestamp_column: "timestamp".to_string(),
            min_rows: 100,
        }
    }
}

impl ConfigSection for DataConfig {
    fn section_name() -> &'static str {
        "data"
    }

    fn validate(&self) -> Result<(), TrialfeedError> {
        if self.timeframe_minutes == 0 {
            return Err(TrialfeedError::Configuration(
                "Timeframe must be at least 1 minute".to_string(),
            ));
        }
        if self.timestamp_column.is_empty() {
            return Err(TrialfeedError::Configuration(
                "Timestamp column name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
