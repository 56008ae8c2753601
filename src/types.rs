use chrono::{DateTime, Utc};
use polars::prelude::*;

/// Whether an episode was drawn from a trial's train or test interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpisodeType {
    Train,
    Test,
}

/// Metadata stamped onto every episode by the trial iterators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpisodeMetadata {
    pub kind: EpisodeType,
    pub trial_num: usize,
    /// Ordinal of this draw within its trial, counted separately for
    /// train and test draws, starting at 1.
    pub sample_num: usize,
}

impl Default for EpisodeMetadata {
    fn default() -> Self {
        Self {
            kind: EpisodeType::Train,
            trial_num: 0,
            sample_num: 0,
        }
    }
}

/// Inclusive interval of dataset row indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowInterval {
    pub start: usize,
    pub end: usize,
}

impl RowInterval {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Number of rows covered, bounds included.
    pub fn num_rows(&self) -> usize {
        self.end - self.start + 1
    }
}

/// One sampled sub-window of the dataset.
#[derive(Debug, Clone)]
pub struct Episode {
    pub data: DataFrame,
    pub start_row: usize,
    pub end_row: usize,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub metadata: EpisodeMetadata,
}

impl Episode {
    pub fn num_rows(&self) -> usize {
        self.end_row - self.start_row + 1
    }
}
