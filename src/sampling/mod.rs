pub mod annealing;
pub mod interval;
pub mod random;
pub mod sequential;

pub use interval::{BetaIntervalSampler, IntervalSampler};
pub use random::{RandomTrialCursor, RandomTrialIterator};
pub use sequential::{SequentialTrialIterator, TrialCursor};

use crate::error::Result;
use crate::types::Episode;

/// Options for [re]starting a sampling sweep.
#[derive(Debug, Clone, Copy)]
pub struct ResetOptions {
    /// Position in `[0, total_steps)` to resume the sweep from.
    pub global_step: u64,
    /// Total environment steps budgeted for a full sweep over trials; when
    /// set, the per-trial train quota is inferred from it.
    pub total_steps: Option<u64>,
    /// Environment frame-skip divisor: one environment step consumes
    /// `skip_frame` episode rows.
    pub skip_frame: usize,
}

impl Default for ResetOptions {
    fn default() -> Self {
        Self {
            global_step: 0,
            total_steps: None,
            skip_frame: 10,
        }
    }
}

/// Common face of the trial iterators.
///
/// `reset` computes all fixed sweep geometry; `sample` advances the cursor
/// and returns one episode. Callers must serialize the two — an iterator
/// instance is single-threaded state.
pub trait TrialSampler {
    /// [Re]starts the sampling iterator from the specified position.
    fn reset(&mut self, options: ResetOptions) -> Result<()>;

    /// Draws the next episode according to the iterator's schedule.
    fn sample(&mut self) -> Result<Episode>;
}
