pub mod frame;
pub mod tensor;

pub use frame::{AtomicFrame, ModelOutput};
pub use tensor::Tensor;

use std::fmt;

/// Error type used at every collaborator boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Output quantities a model may produce and a dataset may carry labels for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Quantity {
    TotalEnergy,
    PerAtomEnergy,
    Forces,
}

impl Quantity {
    pub const ALL: [Quantity; 3] = [
        Quantity::TotalEnergy,
        Quantity::PerAtomEnergy,
        Quantity::Forces,
    ];

    /// Stable field name used in configuration files and logs.
    pub const fn key(self) -> &'static str {
        match self {
            Quantity::TotalEnergy => "total_energy",
            Quantity::PerAtomEnergy => "atomic_energy",
            Quantity::Forces => "forces",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|q| q.key() == key)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Aggregate a dataset can compute over one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatisticMode {
    /// Root-mean-square over every component.
    Rms,
    /// Mean and standard deviation of a per-structure label.
    MeanStd,
    /// Per-species mean and standard deviation of a per-structure label.
    PerSpeciesMeanStd,
}

impl StatisticMode {
    pub const fn key(self) -> &'static str {
        match self {
            StatisticMode::Rms => "rms",
            StatisticMode::MeanStd => "mean_std",
            StatisticMode::PerSpeciesMeanStd => "atom_type_mean_std",
        }
    }
}

impl fmt::Display for StatisticMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Options shared by every aggregate of one `Dataset::statistics` call.
#[derive(Debug, Clone, PartialEq)]
pub struct StatisticsOptions {
    /// Use every `stride`-th structure.
    pub stride: usize,
    /// Smoothing parameter for per-species decompositions.
    pub sigma: Option<f64>,
    /// Algorithm selection and tuning, passed through untouched.
    pub algorithm_kwargs: toml::Table,
}

impl Default for StatisticsOptions {
    fn default() -> Self {
        Self {
            stride: 1,
            sigma: None,
            algorithm_kwargs: toml::Table::new(),
        }
    }
}

/// Result of one (field, mode) pair.
#[derive(Debug, Clone, PartialEq)]
pub enum Aggregate {
    Rms(Tensor),
    MeanStd { mean: Tensor, std: Tensor },
}

/// Read-only view of the labeled training structures.
pub trait Dataset {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of distinct species observed in the dataset.
    fn num_types(&self) -> usize;

    /// Species names ordered by species index.
    fn type_names(&self) -> &[String];

    /// Compute one aggregate per `(fields[i], modes[i])` pair, in order.
    fn statistics(
        &self,
        fields: &[Quantity],
        modes: &[StatisticMode],
        options: &StatisticsOptions,
    ) -> Result<Vec<Aggregate>, BoxError>;
}

/// Anything that maps a structure to predicted quantities.
pub trait Model {
    /// Capability query: does `forward` fill in `quantity`?
    fn produces(&self, quantity: Quantity) -> bool;

    fn forward(&self, frame: &AtomicFrame) -> Result<ModelOutput, BoxError>;
}

/// A trainable model whose parameters can be initialized in place.
pub trait CoreModel: Model {
    /// Visit every named parameter block once.
    fn visit_parameters_mut(&mut self, visit: &mut dyn FnMut(&str, &mut [f64]));
}

/// Builds the core model from the resolved configuration.
pub trait ModelBuilder {
    fn build(&self, config: &toml::Table) -> Result<Box<dyn CoreModel>, BoxError>;
}

/// Ahead-of-time transformation of an assembled model.
pub trait ModelCompiler {
    fn compile(&self, model: Box<dyn Model>) -> Result<Box<dyn Model>, BoxError>;
}

/// Receives the finished model and the final configuration.
pub trait TrainingLoop {
    fn train(&mut self, model: Box<dyn Model>, config: &toml::Table) -> Result<(), BoxError>;
}
