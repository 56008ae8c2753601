use anyhow::Result;
use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use polars::df;
use std::env;
use std::sync::Arc;
use trialfeed::config::{DataConfig, SequentialTrialConfig, TimeRange};
use trialfeed::data::MarketDataset;
use trialfeed::error::TrialfeedError;
use trialfeed::sampling::{
    BetaIntervalSampler, ResetOptions, SequentialTrialIterator, TrialSampler,
};
use trialfeed::types::EpisodeType;

/// Synthetic quarter of 1-minute bars, weekends excluded.
fn synthetic_dataset() -> Result<MarketDataset> {
    let mut ts = Vec::new();
    let mut day = NaiveDate::from_ymd_opt(2016, 1, 4).unwrap();
    let mut added = 0;
    while added < 65 {
        if day.weekday() != Weekday::Sat && day.weekday() != Weekday::Sun {
            let midnight = day.and_time(NaiveTime::MIN).and_utc().timestamp_millis();
            for minute in 0..1440_i64 {
                ts.push(midnight + minute * 60_000);
            }
            added += 1;
        }
        day = day.succ_opt().unwrap();
    }
    let close: Vec<f64> = (0..ts.len())
        .map(|i| 100.0 + (i as f64 * 0.001).sin() * 5.0)
        .collect();
    let frame = df! {
        "timestamp" => &ts,
        "close" => &close,
    }?;
    Ok(MarketDataset::from_frame(frame, "timestamp", 1)?)
}

fn main() -> Result<()> {
    env_logger::init();

    println!("=== Trial sweep demo ===\n");

    let args: Vec<String> = env::args().collect();
    let dataset = match args.get(1) {
        Some(path) => {
            println!("Loading {}...", path);
            MarketDataset::load_csv(path, &DataConfig::default())?
        }
        None => {
            println!("No CSV given, generating a synthetic quarter of minute bars...");
            synthetic_dataset()?
        }
    };
    println!(
        "Loaded {} rows spanning {} days\n",
        dataset.row_count(),
        dataset.span().num_days()
    );

    let config = SequentialTrialConfig {
        train_range: TimeRange::days(19),
        test_range: TimeRange::days(3),
        episode_range: TimeRange::days(1),
        train_samples: 100,
        test_samples: 10,
        test_period: 50,
        b_alpha: 10.0,
        b_beta: 0.8,
        b_anneal_steps: 500,
        seed: Some(42),
        ..Default::default()
    };

    let timeframe = dataset.timeframe_minutes();
    let sampler = BetaIntervalSampler::new(config.episode_range.to_rows(timeframe), config.seed);
    let dataset = Arc::new(dataset);
    let mut iterator = SequentialTrialIterator::new(dataset, config, sampler)?;
    iterator.reset(ResetOptions::default())?;

    println!(
        "Sweeping {} trials, {} train episodes each\n",
        iterator.total_trials().unwrap_or(0),
        iterator.train_samples().unwrap_or(0)
    );

    let mut train_draws = 0_usize;
    let mut test_draws = 0_usize;
    let mut current_trial = 0_usize;
    loop {
        match iterator.sample() {
            Ok(episode) => {
                if episode.metadata.trial_num != current_trial {
                    println!(
                        "Trial #{}: {} train / {} test episodes drawn so far",
                        current_trial, train_draws, test_draws
                    );
                    current_trial = episode.metadata.trial_num;
                }
                match episode.metadata.kind {
                    EpisodeType::Train => train_draws += 1,
                    EpisodeType::Test => test_draws += 1,
                }
            }
            Err(TrialfeedError::SequenceExhausted { .. }) => break,
            Err(e) => return Err(e.into()),
        }
    }

    println!("\nSweep complete: {} train, {} test episodes", train_draws, test_draws);
    Ok(())
}
