use crate::data::MarketDataset;
use crate::error::{Result, TrialfeedError};
use crate::types::{Episode, EpisodeMetadata, RowInterval};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Beta, Distribution};

/// Materializes one episode out of a row interval.
///
/// The trial iterators decide *where* episodes may start; the interval
/// sampler picks the concrete start row (biased by the beta parameters)
/// and extracts the rows. Metadata on the returned episode is left at its
/// default; the calling iterator stamps it.
pub trait IntervalSampler {
    fn sample_interval(
        &mut self,
        dataset: &MarketDataset,
        interval: RowInterval,
        b_alpha: f64,
        b_beta: f64,
    ) -> Result<Episode>;
}

/// Default sampler: fixed episode length in rows, start position drawn from
/// `Beta(b_alpha, b_beta)` over the admissible start range. `Beta(1, 1)` is
/// uniform; skewed parameters favor one end of the interval.
pub struct BetaIntervalSampler {
    episode_rows: usize,
    rng: StdRng,
}

impl BetaIntervalSampler {
    pub fn new(episode_rows: usize, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { episode_rows, rng }
    }

    pub fn episode_rows(&self) -> usize {
        self.episode_rows
    }
}

impl IntervalSampler for BetaIntervalSampler {
    fn sample_interval(
        &mut self,
        dataset: &MarketDataset,
        interval: RowInterval,
        b_alpha: f64,
        b_beta: f64,
    ) -> Result<Episode> {
        if self.episode_rows == 0 {
            return Err(TrialfeedError::Configuration(
                "Episode length must be at least 1 row".to_string(),
            ));
        }
        if b_alpha <= 0.0 || b_beta <= 0.0 {
            return Err(TrialfeedError::Configuration(format!(
                "Expected positive beta-distribution alpha, beta; got: [{}, {}]",
                b_alpha, b_beta
            )));
        }

        // Trial geometry may run past the final record near the end of the
        // dataset; the drawable range is clipped to what exists.
        let last_row = dataset.row_count() - 1;
        let start = interval.start.min(last_row);
        let end = interval.end.min(last_row);

        let width = end - start + 1;
        if width < self.episode_rows {
            return Err(TrialfeedError::Validation(format!(
                "Interval [{}, {}] is shorter than the episode length of {} rows",
                start, end, self.episode_rows
            )));
        }

        let beta = Beta::new(b_alpha, b_beta).map_err(|e| {
            TrialfeedError::Configuration(format!("Invalid beta distribution: {}", e))
        })?;
        let fraction: f64 = beta.sample(&mut self.rng);

        let max_offset = width - self.episode_rows;
        let episode_start = start + (max_offset as f64 * fraction) as usize;
        let episode_end = episode_start + self.episode_rows - 1;

        Ok(Episode {
            data: dataset.slice(episode_start, self.episode_rows),
            start_row: episode_start,
            end_row: episode_end,
            start_time: dataset.timestamp_at(episode_start)?,
            end_time: dataset.timestamp_at(episode_end)?,
            metadata: EpisodeMetadata::default(),
        })
    }
}
