use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrialfeedError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Data not ready. Call .reset() first")]
    NotReady,

    #[error("Trial sequence exhausted: trial {trial_num} of {total_trials}")]
    SequenceExhausted {
        trial_num: usize,
        total_trials: usize,
    },

    #[error("Data loading error: {0}")]
    DataLoading(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),
}

pub type Result<T> = std::result::Result<T, TrialfeedError>;
