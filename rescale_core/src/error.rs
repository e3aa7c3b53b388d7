use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CalibrationError {
    /// Two mutually exclusive normalization modes are both enabled.
    #[error("configuration conflict: {0}")]
    Conflict(String),
    /// A statistic was requested that the training setup cannot provide.
    #[error("cannot compute {statistic}: {reason}")]
    UnsatisfiableStatistic { statistic: String, reason: String },
    /// A scale/shift slot holds something that is neither a literal nor a known statistic.
    #[error("invalid {role} `{value}`")]
    InvalidValue { role: String, value: String },
    #[error(
        "{role} was very low: {value}. If dataset values were used, does the dataset contain insufficient variation? Maybe try disabling it with \"none\"."
    )]
    DegenerateScale { role: String, value: f64 },
    #[error(
        "training on `{0}` is not supported; loss_coeffs may only name forces and total_energy"
    )]
    UnsupportedTraining(String),
    #[error("unknown model initializer `{0}`")]
    UnknownInitializer(String),
    #[error("compile_model is set but no model compiler is available")]
    MissingCompiler,
    #[error("dataset error: {0}")]
    Dataset(String),
    #[error("model error: {0}")]
    Model(String),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
