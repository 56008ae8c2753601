use std::sync::Arc;

use super::annealing::{exp_decay, DECAY_GAMMA};
use super::interval::IntervalSampler;
use super::{ResetOptions, TrialSampler};
use crate::config::{ConfigSection, SequentialTrialConfig};
use crate::data::MarketDataset;
use crate::error::{Result, TrialfeedError};
use crate::types::{Episode, EpisodeMetadata, EpisodeType, RowInterval};

/// Fixed sweep geometry, computed once per `reset`.
#[derive(Debug, Clone, Copy)]
struct TrialGeometry {
    /// Train interval half-span anchor: window rows per trial.
    train_range_row: usize,
    /// Test interval rows per trial; also the sweep stride.
    test_range_row: usize,
    /// Trial cardinality inferred from the dataset size.
    total_trials: usize,
    /// Train episodes per trial, configured or inferred from a step budget.
    train_samples: usize,
}

/// Mutable sweep state, created by `reset` and advanced by every `sample`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrialCursor {
    pub trial_num: usize,
    /// Train draws taken from the current trial, starting at 0.
    pub train_sample_num: usize,
    /// Test draws taken in the current test pause, starting at 0.
    pub test_sample_num: usize,
    /// Cumulative train draws over all trials; drives annealing.
    pub total_samples: u64,
    /// Center row of the current trial's train window.
    pub train_mean_row: usize,
    /// Center row of the test window that follows it.
    pub test_mean_row: usize,
}

/// Sequential trials iterator.
///
/// Sweeps sliding or expanding trial windows forward through one
/// time-ordered dataset. Each trial yields a quota of train episodes with a
/// block of test episodes after every `test_period` train draws; train
/// windows of consecutive trials overlap while their test windows tile the
/// traversed timeline back to back. Train episode start positions are drawn
/// from a beta distribution annealed toward uniform over the whole sweep;
/// test episodes are always drawn uniformly.
pub struct SequentialTrialIterator<S: IntervalSampler> {
    config: SequentialTrialConfig,
    dataset: Arc<MarketDataset>,
    sampler: S,
    geometry: Option<TrialGeometry>,
    cursor: TrialCursor,
}

impl<S: IntervalSampler> SequentialTrialIterator<S> {
    pub fn new(
        dataset: Arc<MarketDataset>,
        config: SequentialTrialConfig,
        sampler: S,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            dataset,
            sampler,
            geometry: None,
            cursor: TrialCursor::default(),
        })
    }

    pub fn cursor(&self) -> &TrialCursor {
        &self.cursor
    }

    pub fn is_ready(&self) -> bool {
        self.geometry.is_some()
    }

    /// Trial cardinality; `None` before the first `reset`.
    pub fn total_trials(&self) -> Option<usize> {
        self.geometry.map(|g| g.total_trials)
    }

    /// Train quota per trial; `None` before the first `reset`.
    pub fn train_samples(&self) -> Option<usize> {
        self.geometry.map(|g| g.train_samples)
    }

    pub fn sampler(&self) -> &S {
        &self.sampler
    }

    /// Current train support interval.
    pub fn train_interval(&self) -> Option<RowInterval> {
        let g = self.geometry?;
        Some(train_interval_rows(&self.cursor, &g, self.config.expanding))
    }

    /// Current test support interval.
    pub fn test_interval(&self) -> Option<RowInterval> {
        let g = self.geometry?;
        Some(test_interval_rows(&self.cursor, &g))
    }

    /// Moves the window center so the window's first record opens a
    /// calendar day.
    fn snap_to_day_start(&self, train_mean_row: usize, train_range_row: usize) -> Result<usize> {
        let first_row = train_mean_row - train_range_row / 2 + 1;
        let first_day = self.dataset.timestamp_at(first_row)?.date_naive();
        Ok(self.dataset.nearest_row_for_date(first_day)? + train_range_row / 2)
    }

    fn log_trial_layout(&self, g: &TrialGeometry) {
        let last_row = self.dataset.row_count() - 1;
        let stamp = |row: usize| {
            self.dataset
                .timestamp_at(row.min(last_row))
                .map(|t| t.to_string())
                .unwrap_or_else(|_| format!("row {}", row))
        };
        let train = train_interval_rows(&self.cursor, g, self.config.expanding);
        let test = test_interval_rows(&self.cursor, g);
        log::info!(
            "Trial #{}: training @ {} <--> {}; testing @ {} <--> {}",
            self.cursor.trial_num,
            stamp(train.start),
            stamp(train.end),
            stamp(test.start),
            stamp(test.end),
        );
    }

    /// One step of the train/test alternation state machine.
    fn next_draw(&mut self, g: TrialGeometry) -> Result<(Episode, usize, EpisodeType, usize)> {
        // Exhaustion is terminal until the next reset.
        if self.cursor.trial_num > g.total_trials {
            return Err(TrialfeedError::SequenceExhausted {
                trial_num: self.cursor.trial_num,
                total_trials: g.total_trials,
            });
        }

        // Is it time to run tests?
        if self.cursor.train_sample_num != 0
            && self.cursor.train_sample_num % self.config.test_period == 0
        {
            if self.cursor.test_sample_num < self.config.test_samples {
                self.cursor.test_sample_num += 1;
                log::debug!("test sample #{}", self.cursor.test_sample_num);
                let interval = test_interval_rows(&self.cursor, &g);
                // Test episodes are always sampled uniformly.
                let episode = self.sampler.sample_interval(&self.dataset, interval, 1.0, 1.0)?;
                return Ok((
                    episode,
                    self.cursor.trial_num,
                    EpisodeType::Test,
                    self.cursor.test_sample_num,
                ));
            } else {
                self.cursor.test_sample_num = 0;
            }
        }

        // Done with training on the current trial?
        if self.cursor.train_sample_num >= g.train_samples {
            self.cursor.trial_num += 1;
            self.cursor.train_sample_num = 0;
            self.cursor.train_mean_row += g.test_range_row;
            if self.cursor.trial_num > g.total_trials {
                return Err(TrialfeedError::SequenceExhausted {
                    trial_num: self.cursor.trial_num,
                    total_trials: g.total_trials,
                });
            }
            if self.config.trial_start_00 {
                self.cursor.train_mean_row =
                    self.snap_to_day_start(self.cursor.train_mean_row, g.train_range_row)?;
                log::debug!(
                    "trial train start adjusted to <00:00>: {}",
                    self.cursor.train_mean_row
                );
            }
            self.cursor.test_mean_row =
                self.cursor.train_mean_row + (g.train_range_row + g.test_range_row) / 2 + 1;
            self.log_trial_layout(&g);
        }

        self.cursor.train_sample_num += 1;
        self.cursor.total_samples += 1;
        log::debug!("train sample #{}", self.cursor.train_sample_num);

        let interval = train_interval_rows(&self.cursor, &g, self.config.expanding);
        let b_alpha = exp_decay(
            self.cursor.total_samples,
            self.config.b_alpha,
            self.config.b_anneal_steps,
            DECAY_GAMMA,
        );
        let b_beta = exp_decay(
            self.cursor.total_samples,
            self.config.b_beta,
            self.config.b_anneal_steps,
            DECAY_GAMMA,
        );
        let episode = self
            .sampler
            .sample_interval(&self.dataset, interval, b_alpha, b_beta)?;
        Ok((
            episode,
            self.cursor.trial_num,
            EpisodeType::Train,
            self.cursor.train_sample_num,
        ))
    }
}

fn train_interval_rows(cursor: &TrialCursor, g: &TrialGeometry, expanding: bool) -> RowInterval {
    if expanding {
        RowInterval::new(0, cursor.train_mean_row + g.train_range_row / 2)
    } else {
        RowInterval::new(
            cursor.train_mean_row - g.train_range_row / 2,
            cursor.train_mean_row + g.train_range_row / 2,
        )
    }
}

/// Exactly `test_range_row` rows starting one row past the train window, so
/// that consecutive trials' test windows tile the timeline without gap or
/// overlap.
fn test_interval_rows(cursor: &TrialCursor, g: &TrialGeometry) -> RowInterval {
    let start = cursor.test_mean_row - g.test_range_row / 2;
    RowInterval::new(start, start + g.test_range_row - 1)
}

impl<S: IntervalSampler> TrialSampler for SequentialTrialIterator<S> {
    fn reset(&mut self, options: ResetOptions) -> Result<()> {
        let timeframe = self.dataset.timeframe_minutes();
        let rows = self.dataset.row_count();

        let (global_step, total_steps) = match options.total_steps {
            Some(total) => {
                if options.global_step >= total {
                    return Err(TrialfeedError::Configuration(format!(
                        "global_step must lie below total_steps; got: {} of {}",
                        options.global_step, total
                    )));
                }
                (options.global_step, Some(total))
            }
            None => (0, None),
        };
        if options.skip_frame == 0 {
            return Err(TrialfeedError::Configuration(
                "skip_frame must be at least 1".to_string(),
            ));
        }

        // Trial support intervals in number of records:
        let train_range_row = self.config.train_range.to_rows(timeframe);
        let test_range_row = self.config.test_range.to_rows(timeframe);
        let episode_rows = self.config.episode_range.to_rows(timeframe);
        if train_range_row == 0 || test_range_row == 0 || episode_rows == 0 {
            return Err(TrialfeedError::Configuration(
                "Train, test and episode ranges must each span at least one row".to_string(),
            ));
        }

        // Cardinality of the distribution over trials:
        let total_trials = rows
            .checked_sub(train_range_row)
            .map(|rest| rest / test_range_row)
            .unwrap_or(0);
        if total_trials < 1 {
            return Err(TrialfeedError::Configuration(
                "Trial cardinality below 1; check data parameters consistency".to_string(),
            ));
        }

        // Train quota per trial, inferred from the step budget when given:
        let train_samples = match total_steps {
            Some(total) => {
                let steps_per_trial = total_trials * episode_rows / options.skip_frame;
                if steps_per_trial == 0 {
                    return Err(TrialfeedError::Configuration(
                        "Step budget resolves to zero steps per trial".to_string(),
                    ));
                }
                total as usize / steps_per_trial
            }
            None => {
                log::warn!(
                    "reset() got total_steps=None -> train_samples={}, iterating from 0",
                    self.config.train_samples
                );
                self.config.train_samples
            }
        };
        if train_samples < 1 {
            return Err(TrialfeedError::Configuration(
                "Number of train samples per trial below 1; check parameters consistency"
                    .to_string(),
            ));
        }
        if self.config.b_alpha <= 0.0 || self.config.b_beta <= 0.0 {
            return Err(TrialfeedError::Configuration(format!(
                "Expected positive beta-distribution alpha, beta; got: [{}, {}]",
                self.config.b_alpha, self.config.b_beta
            )));
        }

        // Trial to start with, and train draws notionally taken so far so
        // that annealing resumes consistently mid-sweep:
        let trial_num = match total_steps {
            Some(total) => (total_trials as u64 * global_step / total) as usize,
            None => 0,
        };
        let total_samples = trial_num as u64 * train_samples as u64;

        let mut train_mean_row = train_range_row / 2 + test_range_row * trial_num;
        if self.config.trial_start_00 {
            train_mean_row = self.snap_to_day_start(train_mean_row, train_range_row)?;
            log::info!("Trial train start time adjusted to <00:00>");
        }
        let test_mean_row = train_mean_row + (train_range_row + test_range_row) / 2 + 1;

        let geometry = TrialGeometry {
            train_range_row,
            test_range_row,
            total_trials,
            train_samples,
        };
        self.cursor = TrialCursor {
            trial_num,
            train_sample_num: 0,
            test_sample_num: 0,
            total_samples,
            train_mean_row,
            test_mean_row,
        };
        self.geometry = Some(geometry);

        log::info!(
            "Trial type: {}; cardinality: {}; iterating from: {}; {} train episodes per trial, {} test episodes after every {} train ones",
            if self.config.expanding { "EXPANDING" } else { "SLIDING" },
            total_trials,
            trial_num,
            train_samples,
            self.config.test_samples,
            self.config.test_period,
        );
        if self.config.b_anneal_steps > 0 {
            log::info!(
                "Annealing beta-distribution to uniform in {} train samples",
                self.config.b_anneal_steps
            );
        }
        self.log_trial_layout(&geometry);
        Ok(())
    }

    fn sample(&mut self) -> Result<Episode> {
        let geometry = self.geometry.ok_or(TrialfeedError::NotReady)?;
        let (mut episode, trial_num, kind, sample_num) = self.next_draw(geometry)?;
        episode.metadata = EpisodeMetadata {
            kind,
            trial_num,
            sample_num,
        };
        log::debug!("sample ready with metadata: {:?}", episode.metadata);
        Ok(episode)
    }
}
