use std::sync::Arc;

use super::interval::IntervalSampler;
use super::{ResetOptions, TrialSampler};
use crate::config::{ConfigSection, RandomTrialConfig};
use crate::data::MarketDataset;
use crate::error::{Result, TrialfeedError};
use crate::types::{Episode, EpisodeMetadata, EpisodeType, RowInterval};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Fixed geometry of the trial distribution, computed once per `reset`.
#[derive(Debug, Clone, Copy)]
struct RandomGeometry {
    /// Trial support interval in number of records.
    trial_range_row: usize,
    /// Stride between admissible trial centers, in records.
    trial_stride_row: usize,
    /// Number of admissible trial positions.
    total_trials: usize,
    /// Episodes per trial.
    train_samples: usize,
}

/// Mutable state, created by `reset` and advanced by every `sample`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RandomTrialCursor {
    pub trial_num: usize,
    /// Draws taken from the current trial, starting at 0.
    pub sample_num: usize,
    /// Center row of the current trial window.
    pub trial_mean_row: usize,
}

/// Random trials iterator.
///
/// Shares the window machinery of the sequential iterator but draws an
/// independent, uniformly-random, stride-aligned trial location whenever the
/// per-trial quota is spent — trials are i.i.d. rather than a sweep, and
/// there is no test phase. All episodes are tagged as train data.
pub struct RandomTrialIterator<S: IntervalSampler> {
    config: RandomTrialConfig,
    dataset: Arc<MarketDataset>,
    sampler: S,
    rng: StdRng,
    geometry: Option<RandomGeometry>,
    cursor: RandomTrialCursor,
}

impl<S: IntervalSampler> RandomTrialIterator<S> {
    pub fn new(dataset: Arc<MarketDataset>, config: RandomTrialConfig, sampler: S) -> Result<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            config,
            dataset,
            sampler,
            rng,
            geometry: None,
            cursor: RandomTrialCursor::default(),
        })
    }

    pub fn cursor(&self) -> &RandomTrialCursor {
        &self.cursor
    }

    pub fn is_ready(&self) -> bool {
        self.geometry.is_some()
    }

    /// Number of admissible trial positions; `None` before the first `reset`.
    pub fn total_trials(&self) -> Option<usize> {
        self.geometry.map(|g| g.total_trials)
    }

    pub fn sampler(&self) -> &S {
        &self.sampler
    }

    /// Current trial support interval.
    pub fn trial_interval(&self) -> Option<RowInterval> {
        let g = self.geometry?;
        Some(RowInterval::new(
            self.cursor.trial_mean_row - g.trial_range_row / 2,
            self.cursor.trial_mean_row + g.trial_range_row / 2,
        ))
    }

    /// Uniformly random stride-aligned trial center.
    fn draw_trial_mean(&mut self, g: &RandomGeometry) -> usize {
        let position = (g.total_trials as f64 * self.rng.gen::<f64>()) as usize;
        g.trial_range_row / 2 + g.trial_stride_row * position
    }

    fn log_trial_layout(&self) {
        if let Some(interval) = self.trial_interval() {
            let last_row = self.dataset.row_count() - 1;
            let stamp = |row: usize| {
                self.dataset
                    .timestamp_at(row.min(last_row))
                    .map(|t| t.to_string())
                    .unwrap_or_else(|_| format!("row {}", row))
            };
            log::info!(
                "Trial #{} @ interval: {} <--> {}; mean row: {}",
                self.cursor.trial_num,
                stamp(interval.start),
                stamp(interval.end),
                self.cursor.trial_mean_row,
            );
        }
    }
}

impl<S: IntervalSampler> TrialSampler for RandomTrialIterator<S> {
    fn reset(&mut self, _options: ResetOptions) -> Result<()> {
        let rows = self.dataset.row_count();
        let span_seconds = self.dataset.span().num_seconds();
        let trial_seconds = self.config.trial_range.total_seconds();
        let stride_seconds = self.config.trial_stride.total_seconds();

        if span_seconds <= 0 {
            return Err(TrialfeedError::Configuration(
                "Dataset spans less than one second".to_string(),
            ));
        }

        // Cardinality of the distribution over trials:
        let total_trials = (span_seconds - trial_seconds) / stride_seconds;
        if total_trials < 1 {
            return Err(TrialfeedError::Configuration(
                "Trial cardinality below 1; check data parameters consistency".to_string(),
            ));
        }
        let total_trials = total_trials as usize;

        // Trial support interval and stride as dataset-relative fractions:
        let trial_range_row =
            (rows as f64 * (trial_seconds as f64 / span_seconds as f64)) as usize;
        let trial_stride_row =
            (rows as f64 * (stride_seconds as f64 / span_seconds as f64)) as usize;

        let train_samples = self.config.train_samples;
        if train_samples < 1 {
            return Err(TrialfeedError::Configuration(
                "Episodes per trial must be set explicitly for random trials".to_string(),
            ));
        }

        let geometry = RandomGeometry {
            trial_range_row,
            trial_stride_row,
            total_trials,
            train_samples,
        };
        let trial_mean_row = self.draw_trial_mean(&geometry);
        self.geometry = Some(geometry);
        self.cursor = RandomTrialCursor {
            trial_num: 0,
            sample_num: 0,
            trial_mean_row,
        };

        log::info!(
            "Trial support interval: {} rows; stride: {} rows; cardinality: {}; {} episodes per trial",
            trial_range_row,
            trial_stride_row,
            total_trials,
            train_samples,
        );
        self.log_trial_layout();
        Ok(())
    }

    fn sample(&mut self) -> Result<Episode> {
        let g = self.geometry.ok_or(TrialfeedError::NotReady)?;

        if self.cursor.sample_num >= g.train_samples {
            self.cursor.trial_num += 1;
            self.cursor.sample_num = 0;
            self.cursor.trial_mean_row = self.draw_trial_mean(&g);
            self.log_trial_layout();
        }
        self.cursor.sample_num += 1;
        log::debug!("trial sample #{}", self.cursor.sample_num);

        let interval = RowInterval::new(
            self.cursor.trial_mean_row - g.trial_range_row / 2,
            self.cursor.trial_mean_row + g.trial_range_row / 2,
        );
        let mut episode = self.sampler.sample_interval(
            &self.dataset,
            interval,
            self.config.b_alpha,
            self.config.b_beta,
        )?;
        episode.metadata = EpisodeMetadata {
            kind: EpisodeType::Train,
            trial_num: self.cursor.trial_num,
            sample_num: self.cursor.sample_num,
        };
        Ok(episode)
    }
}
