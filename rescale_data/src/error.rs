use rescale_traits::{Quantity, StatisticMode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("dataset file is not valid: {0}")]
    Parse(#[from] serde_json::Error),
    /// A statistic needs a label some selected structure does not carry.
    #[error("structure {frame} is missing the `{field}` label")]
    MissingLabel { field: Quantity, frame: usize },
    #[error("`{mode}` is not available for `{field}`")]
    Unsupported { field: Quantity, mode: StatisticMode },
    #[error("unknown per-species algorithm `{0}` (expected `ridge` or `least_squares`)")]
    UnknownAlgorithm(String),
    #[error("per-species regression is singular; are species counts linearly dependent?")]
    Singular,
    #[error("structure {frame}: {reason}")]
    InvalidFrame { frame: usize, reason: String },
    /// An input handed to a model names a species the model was not built for.
    #[error("atom {atom} has species {species}, but the model knows {num_types} types")]
    UnknownSpecies {
        atom: usize,
        species: usize,
        num_types: usize,
    },
    #[error("stride {stride} over {len} structures selects nothing")]
    EmptySelection { stride: usize, len: usize },
    #[error("model configuration: {0}")]
    ModelConfig(String),
}

pub type Result<T> = std::result::Result<T, DataError>;
