//! Aggregates over labeled structures.
//!
//! Every function takes the already strided selection as `(index, frame)`
//! pairs so errors can name the original structure index.

use rescale_traits::{AtomicFrame, Quantity, StatisticMode, StatisticsOptions, Tensor};

use crate::error::{DataError, Result};
use crate::linalg::ridge_fit;

/// Smoothing used by `ridge` when no `sigma` is configured.
pub const DEFAULT_SIGMA: f64 = 0.1;

/// How per-species energies are fitted from species counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerSpeciesAlgorithm {
    /// Penalized least squares with penalty `sigma²`.
    Ridge,
    LeastSquares,
}

impl PerSpeciesAlgorithm {
    /// Read `algorithm = "..."` from the pass-through kwargs; `ridge` when absent.
    pub fn from_kwargs(kwargs: &toml::Table) -> Result<Self> {
        match kwargs.get("algorithm") {
            None => Ok(Self::Ridge),
            Some(toml::Value::String(s)) if s == "ridge" => Ok(Self::Ridge),
            Some(toml::Value::String(s)) if s == "least_squares" => Ok(Self::LeastSquares),
            Some(toml::Value::String(s)) => Err(DataError::UnknownAlgorithm(s.clone())),
            Some(other) => Err(DataError::UnknownAlgorithm(other.to_string())),
        }
    }
}

pub type Selection<'a> = [(usize, &'a AtomicFrame)];

fn energies(frames: &Selection<'_>) -> Result<Vec<f64>> {
    frames
        .iter()
        .map(|(i, f)| {
            f.total_energy.ok_or(DataError::MissingLabel {
                field: Quantity::TotalEnergy,
                frame: *i,
            })
        })
        .collect()
}

fn force_components(frames: &Selection<'_>) -> Result<Vec<f64>> {
    let mut out = Vec::new();
    for (i, f) in frames {
        let forces = f.forces.as_ref().ok_or(DataError::MissingLabel {
            field: Quantity::Forces,
            frame: *i,
        })?;
        out.extend(forces.iter().flatten().copied());
    }
    Ok(out)
}

fn values_of(field: Quantity, mode: StatisticMode, frames: &Selection<'_>) -> Result<Vec<f64>> {
    match field {
        Quantity::TotalEnergy => energies(frames),
        Quantity::Forces => force_components(frames),
        Quantity::PerAtomEnergy => Err(DataError::Unsupported { field, mode }),
    }
}

pub fn rms(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    (values.iter().map(|v| v * v).sum::<f64>() / values.len() as f64).sqrt()
}

/// Mean and unbiased standard deviation; a single value has zero spread.
pub fn mean_std(values: &[f64]) -> (f64, f64) {
    let n = values.len();
    if n == 0 {
        return (0.0, 0.0);
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    if n == 1 {
        return (mean, 0.0);
    }
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    (mean, var.sqrt())
}

/// Per-species energy mean and spread fitted from species counts.
///
/// The mean solves `counts · μ ≈ E`. The spread regresses the squared
/// residuals on the same counts (independent per-atom noise), clamps
/// negative variances to zero and takes the square root.
pub fn per_species_mean_std(
    frames: &Selection<'_>,
    num_types: usize,
    options: &StatisticsOptions,
) -> Result<(Vec<f64>, Vec<f64>)> {
    let algorithm = PerSpeciesAlgorithm::from_kwargs(&options.algorithm_kwargs)?;
    let penalty = match algorithm {
        PerSpeciesAlgorithm::Ridge => options.sigma.unwrap_or(DEFAULT_SIGMA).powi(2),
        PerSpeciesAlgorithm::LeastSquares => 0.0,
    };
    let y = energies(frames)?;
    let rows: Vec<Vec<f64>> = frames
        .iter()
        .map(|(_, f)| f.species_counts(num_types))
        .collect();
    tracing::debug!(?algorithm, penalty, structures = rows.len(), "per-species fit");

    let mean = ridge_fit(&rows, &y, penalty)?;

    let residual2: Vec<f64> = rows
        .iter()
        .zip(&y)
        .map(|(row, e)| {
            let predicted: f64 = row.iter().zip(&mean).map(|(n, m)| n * m).sum();
            (e - predicted).powi(2)
        })
        .collect();
    let var = ridge_fit(&rows, &residual2, penalty)?;
    let std = var.into_iter().map(|v| v.max(0.0).sqrt()).collect();
    Ok((mean, std))
}

/// One aggregate for `(field, mode)` over `frames`.
pub fn aggregate(
    field: Quantity,
    mode: StatisticMode,
    frames: &Selection<'_>,
    num_types: usize,
    options: &StatisticsOptions,
) -> Result<rescale_traits::Aggregate> {
    use rescale_traits::Aggregate;

    match mode {
        StatisticMode::Rms => Ok(Aggregate::Rms(Tensor::Scalar(rms(&values_of(
            field, mode, frames,
        )?)))),
        StatisticMode::MeanStd => {
            let (mean, std) = mean_std(&values_of(field, mode, frames)?);
            Ok(Aggregate::MeanStd {
                mean: Tensor::Scalar(mean),
                std: Tensor::Scalar(std),
            })
        }
        StatisticMode::PerSpeciesMeanStd => {
            if field != Quantity::TotalEnergy {
                return Err(DataError::Unsupported { field, mode });
            }
            let (mean, std) = per_species_mean_std(frames, num_types, options)?;
            Ok(Aggregate::MeanStd {
                mean: Tensor::PerSpecies(mean),
                std: Tensor::PerSpecies(std),
            })
        }
    }
}
