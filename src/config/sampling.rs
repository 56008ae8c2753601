use super::traits::ConfigSection;
use crate::error::TrialfeedError;
use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Calendar length expressed in days, hours and minutes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeRange {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
}

impl TimeRange {
    pub fn days(days: i64) -> Self {
        Self {
            days,
            hours: 0,
            minutes: 0,
        }
    }

    pub fn to_duration(&self) -> Duration {
        Duration::days(self.days) + Duration::hours(self.hours) + Duration::minutes(self.minutes)
    }

    pub fn total_seconds(&self) -> i64 {
        self.to_duration().num_seconds()
    }

    /// Number of dataset rows this range spans at the given nominal timeframe.
    /// Calendar gaps are not accounted for; the range is nominal record count.
    pub fn to_rows(&self, timeframe_minutes: u32) -> usize {
        (self.total_seconds() / (timeframe_minutes as i64 * 60)).max(0) as usize
    }

    pub fn is_zero(&self) -> bool {
        self.total_seconds() == 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SequentialTrialConfig {
    /// Trial train interval in calendar time.
    pub train_range: TimeRange,
    /// Trial test interval in calendar time.
    pub test_range: TimeRange,
    /// Duration of a single sampled episode.
    pub episode_range: TimeRange,
    /// Train episodes per trial. Ignored when `reset` infers the quota from
    /// a total step budget.
    pub train_samples: usize,
    /// Test episodes drawn at every test pause.
    pub test_samples: usize,
    /// Draw test episodes after every `test_period` train samples.
    pub test_period: usize,
    /// Snap the trial start to the first record of its calendar day.
    pub trial_start_00: bool,
    /// Expanding-type trials: window start pinned at the dataset origin.
    pub expanding: bool,
    /// Start-position beta-distribution alpha parameter.
    pub b_alpha: f64,
    /// Start-position beta-distribution beta parameter.
    pub b_beta: f64,
    /// Anneal the beta-distribution to uniform in this many train samples,
    /// counted continuously over all trials. Non-positive disables annealing.
    pub b_anneal_steps: i64,
    pub seed: Option<u64>,
}

impl Default for SequentialTrialConfig {
    fn default() -> Self {
        Self {
            train_range: TimeRange::days(7),
            test_range: TimeRange::days(7),
            episode_range: TimeRange::days(1),
            train_samples: 0,
            test_samples: 0,
            test_period: 100,
            trial_start_00: true,
            expanding: false,
            b_alpha: 1.0,
            b_beta: 1.0,
            b_anneal_steps: -1,
            seed: None,
        }
    }
}

impl ConfigSection for SequentialTrialConfig {
    fn section_name() -> &'static str {
        "sequential"
    }

    fn validate(&self) -> Result<(), TrialfeedError> {
        if self.b_alpha <= 0.0 || self.b_beta <= 0.0 {
            return Err(TrialfeedError::Configuration(format!(
                "Expected positive beta-distribution alpha, beta; got: [{}, {}]",
                self.b_alpha, self.b_beta
            )));
        }
        if self.test_period == 0 {
            return Err(TrialfeedError::Configuration(
                "Test period must be at least 1".to_string(),
            ));
        }
        if self.train_range.is_zero() || self.test_range.is_zero() {
            return Err(TrialfeedError::Configuration(
                "Train and test ranges must be non-zero".to_string(),
            ));
        }
        if self.episode_range.is_zero() {
            return Err(TrialfeedError::Configuration(
                "Episode range must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomTrialConfig {
    /// Trial support interval in calendar time.
    pub trial_range: TimeRange,
    /// Stride between admissible trial positions.
    pub trial_stride: TimeRange,
    /// Duration of a single sampled episode.
    pub episode_range: TimeRange,
    /// Episodes per trial. Unlike the sequential case, has to be set
    /// explicitly.
    pub train_samples: usize,
    pub b_alpha: f64,
    pub b_beta: f64,
    pub seed: Option<u64>,
}

impl Default for RandomTrialConfig {
    fn default() -> Self {
        Self {
            trial_range: TimeRange::days(7),
            trial_stride: TimeRange::days(7),
            episode_range: TimeRange::days(1),
            train_samples: 0,
            b_alpha: 1.0,
            b_beta: 1.0,
            seed: None,
        }
    }
}

impl ConfigSection for RandomTrialConfig {
    fn section_name() -> &'static str {
        "random"
    }

    fn validate(&self) -> Result<(), TrialfeedError> {
        if self.b_alpha <= 0.0 || self.b_beta <= 0.0 {
            return Err(TrialfeedError::Configuration(format!(
                "Expected positive beta-distribution alpha, beta; got: [{}, {}]",
                self.b_alpha, self.b_beta
            )));
        }
        if self.trial_range.is_zero() || self.trial_stride.is_zero() {
            return Err(TrialfeedError::Configuration(
                "Trial range and stride must be non-zero".to_string(),
            ));
        }
        if self.episode_range.is_zero() {
            return Err(TrialfeedError::Configuration(
                "Episode range must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
