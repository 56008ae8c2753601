use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use polars::df;
use trialfeed::config::{RandomTrialConfig, TimeRange};
use trialfeed::data::MarketDataset;
use trialfeed::error::TrialfeedError;
use trialfeed::sampling::{
    IntervalSampler, RandomTrialIterator, ResetOptions, TrialSampler,
};
use trialfeed::types::{Episode, EpisodeMetadata, EpisodeType, RowInterval};

const MINUTE_MS: i64 = 60_000;

fn continuous_minute_dataset(days: usize) -> Arc<MarketDataset> {
    let base = NaiveDate::from_ymd_opt(2016, 1, 4)
        .unwrap()
        .and_time(NaiveTime::MIN)
        .and_utc()
        .timestamp_millis();
    let rows = days * 1440;
    let ts: Vec<i64> = (0..rows as i64).map(|i| base + i * MINUTE_MS).collect();
    let close: Vec<f64> = (0..rows).map(|i| 100.0 + (i % 500) as f64 * 0.01).collect();
    let frame = df! {
        "timestamp" => &ts,
        "close" => &close,
    }
    .unwrap();
    Arc::new(MarketDataset::from_frame(frame, "timestamp", 1).unwrap())
}

/// Interval sampler stub: records requests, returns a one-row episode.
#[derive(Clone)]
struct RecordingSampler {
    calls: Rc<RefCell<Vec<RowInterval>>>,
}

impl RecordingSampler {
    fn new() -> (Self, Rc<RefCell<Vec<RowInterval>>>) {
        let calls = Rc::new(RefCell::new(Vec::new()));
        (
            Self {
                calls: calls.clone(),
            },
            calls,
        )
    }
}

impl IntervalSampler for RecordingSampler {
    fn sample_interval(
        &mut self,
        dataset: &MarketDataset,
        interval: RowInterval,
        _b_alpha: f64,
        _b_beta: f64,
    ) -> Result<Episode, TrialfeedError> {
        self.calls.borrow_mut().push(interval);
        let row = interval.start.min(dataset.row_count() - 1);
        Ok(Episode {
            data: dataset.slice(row, 1),
            start_row: row,
            end_row: row,
            start_time: dataset.timestamp_at(row)?,
            end_time: dataset.timestamp_at(row)?,
            metadata: EpisodeMetadata::default(),
        })
    }
}

fn base_config() -> RandomTrialConfig {
    RandomTrialConfig {
        trial_range: TimeRange::days(5),
        trial_stride: TimeRange::days(1),
        train_samples: 3,
        seed: Some(11),
        ..Default::default()
    }
}

#[test]
fn sample_before_reset_is_not_ready() {
    let dataset = continuous_minute_dataset(30);
    let (sampler, _) = RecordingSampler::new();
    let mut iterator = RandomTrialIterator::new(dataset, base_config(), sampler).unwrap();
    assert!(matches!(iterator.sample(), Err(TrialfeedError::NotReady)));
}

#[test]
fn geometry_follows_dataset_fractions() {
    let dataset = continuous_minute_dataset(30);
    let (sampler, _) = RecordingSampler::new();
    let mut iterator = RandomTrialIterator::new(dataset.clone(), base_config(), sampler).unwrap();
    iterator.reset(ResetOptions::default()).unwrap();

    // Wall-clock span is 30 days minus one minute.
    let span_seconds = dataset.span().num_seconds();
    let expected_trials = (span_seconds - 5 * 86_400) / 86_400;
    assert_eq!(iterator.total_trials(), Some(expected_trials as usize));

    // The trial interval is the dataset-relative fraction of the range.
    let rows = dataset.row_count();
    let expected_range =
        (rows as f64 * (5.0 * 86_400.0 / span_seconds as f64)) as usize;
    let interval = iterator.trial_interval().unwrap();
    assert_eq!(interval.num_rows(), expected_range + 1);
}

#[test]
fn draws_are_confined_to_current_trial() {
    let dataset = continuous_minute_dataset(30);
    let (sampler, calls) = RecordingSampler::new();
    let mut iterator = RandomTrialIterator::new(dataset.clone(), base_config(), sampler).unwrap();
    iterator.reset(ResetOptions::default()).unwrap();

    let first_interval = iterator.trial_interval().unwrap();
    for _ in 0..3 {
        let episode = iterator.sample().unwrap();
        assert_eq!(episode.metadata.trial_num, 0);
        assert_eq!(episode.metadata.kind, EpisodeType::Train);
    }
    let calls = calls.borrow();
    assert!(calls.iter().all(|interval| *interval == first_interval));

    // Stride-aligned placement keeps every admissible window inside the
    // dataset.
    let last_row = dataset.row_count() - 1;
    assert!(first_interval.end <= last_row);
}

#[test]
fn quota_exhaustion_redraws_trial_location() {
    let dataset = continuous_minute_dataset(60);
    let (sampler, _) = RecordingSampler::new();
    let config = RandomTrialConfig {
        train_samples: 2,
        ..base_config()
    };
    let mut iterator = RandomTrialIterator::new(dataset, config, sampler).unwrap();
    iterator.reset(ResetOptions::default()).unwrap();

    let mut means = vec![iterator.cursor().trial_mean_row];
    for trial in 0..20_usize {
        for draw in 1..=2_usize {
            let episode = iterator.sample().unwrap();
            assert_eq!(episode.metadata.trial_num, trial);
            assert_eq!(episode.metadata.sample_num, draw);
        }
        means.push(iterator.cursor().trial_mean_row);
    }
    // 21 i.i.d. placements over dozens of grid positions: the cursor must
    // have moved at least once.
    means.dedup();
    assert!(means.len() > 1, "trial placement never moved");
}

#[test]
fn trial_means_sit_on_stride_grid() {
    let dataset = continuous_minute_dataset(60);
    let (sampler, _) = RecordingSampler::new();
    let config = RandomTrialConfig {
        train_samples: 1,
        ..base_config()
    };
    let mut iterator = RandomTrialIterator::new(dataset.clone(), config, sampler).unwrap();
    iterator.reset(ResetOptions::default()).unwrap();

    let span_seconds = dataset.span().num_seconds() as f64;
    let rows = dataset.row_count() as f64;
    let range_row = (rows * (5.0 * 86_400.0 / span_seconds)) as usize;
    let stride_row = (rows * (86_400.0 / span_seconds)) as usize;
    let total_trials = iterator.total_trials().unwrap();

    for _ in 0..50 {
        let mean = iterator.cursor().trial_mean_row;
        let offset = mean - range_row / 2;
        assert_eq!(offset % stride_row, 0);
        assert!(offset / stride_row < total_trials);
        iterator.sample().unwrap();
    }
}

#[test]
fn seeded_iterators_are_reproducible() {
    let dataset = continuous_minute_dataset(60);
    let config = RandomTrialConfig {
        train_samples: 1,
        ..base_config()
    };

    let (sampler_a, _) = RecordingSampler::new();
    let (sampler_b, _) = RecordingSampler::new();
    let mut a = RandomTrialIterator::new(dataset.clone(), config.clone(), sampler_a).unwrap();
    let mut b = RandomTrialIterator::new(dataset, config, sampler_b).unwrap();
    a.reset(ResetOptions::default()).unwrap();
    b.reset(ResetOptions::default()).unwrap();

    for _ in 0..30 {
        a.sample().unwrap();
        b.sample().unwrap();
        assert_eq!(a.cursor().trial_mean_row, b.cursor().trial_mean_row);
    }
}

#[test]
fn missing_sample_quota_is_rejected() {
    let dataset = continuous_minute_dataset(30);
    let (sampler, _) = RecordingSampler::new();
    let config = RandomTrialConfig {
        train_samples: 0,
        ..base_config()
    };
    let mut iterator = RandomTrialIterator::new(dataset, config, sampler).unwrap();
    let result = iterator.reset(ResetOptions::default());
    assert!(matches!(result, Err(TrialfeedError::Configuration(_))));
}

#[test]
fn oversized_trial_range_is_rejected() {
    let dataset = continuous_minute_dataset(10);
    let (sampler, _) = RecordingSampler::new();
    let config = RandomTrialConfig {
        trial_range: TimeRange::days(20),
        ..base_config()
    };
    let mut iterator = RandomTrialIterator::new(dataset, config, sampler).unwrap();
    let result = iterator.reset(ResetOptions::default());
    assert!(matches!(result, Err(TrialfeedError::Configuration(_))));
}
