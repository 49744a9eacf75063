/*!
Error types of the crate. Configuration errors are kept apart from the other failures: they are
always raised before any record is moved, read or written.
*/
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
/// The configuration given to one of the components is not usable.
pub enum ConfigError {
    /// The upper limit must be in `(0, 1]`.
    #[error("upper limit must be in (0, 1], got {0}")]
    UpperLimitOutOfRange(f64),
    /// The balancing range must be positive and strictly smaller than the upper limit, otherwise
    /// the target band is empty or reaches below zero.
    #[error("balancing range must be in (0, {upper_limit}), got {balancing_range}")]
    BalancingRangeOutOfRange {
        balancing_range: f64,
        upper_limit: f64,
    },
    /// A ratio (undersampling, minimum entity share, test size) is outside of `(0, 1)`.
    #[error("{name} must be in (0, 1), got {value}")]
    RatioOutOfRange { name: &'static str, value: f64 },
    #[error("number of passes must be at least 1")]
    ZeroPasses,
    #[error("max length must be positive")]
    ZeroMaxLength,
    #[error("cannot split {n_samples} records into {n_splits} folds")]
    InvalidFoldCount { n_splits: usize, n_samples: usize },
    #[error("entity tier '{0}' is empty")]
    EmptyTier(String),
}

#[derive(Debug, Error)]
/// Main error type of the crate.
pub enum NerfoldError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("malformed corpus line {line}: {reason}")]
    Parse { line: usize, reason: String },
    #[error("record has {tokens} tokens but {tags} tags")]
    RecordLengthMismatch { tokens: usize, tags: usize },
    #[error("output directory {0} already exists")]
    OutputExists(PathBuf),
}
