//! Value Resolver: placeholders become measured values, literals pass through.

use rescale_config::RescaleValue;
use rescale_traits::Tensor;

use crate::error::{CalibrationError, Result};
use crate::statistics::DatasetStatistics;

/// Resolve one scale/shift slot.
///
/// `role` names the slot in error messages (e.g. `global_scale`).
pub fn resolve(
    variable: &RescaleValue,
    role: &str,
    statistics: &DatasetStatistics,
) -> Result<Option<Tensor>> {
    match variable {
        RescaleValue::Statistic(stat) => match statistics.get(&stat.key()) {
            Some(value) => Ok(Some(value.clone())),
            None => Err(invalid(role, stat.to_string())),
        },
        RescaleValue::None => Ok(None),
        RescaleValue::Scalar(v) => Ok(Some(Tensor::Scalar(*v))),
        RescaleValue::PerSpecies(vs) => Ok(Some(Tensor::PerSpecies(vs.clone()))),
        RescaleValue::Invalid(raw) => Err(invalid(role, raw.clone())),
    }
}

/// Resolve a slot that must be a single number (global scale and shift).
pub fn resolve_scalar(
    variable: &RescaleValue,
    role: &str,
    statistics: &DatasetStatistics,
) -> Result<Option<f64>> {
    match resolve(variable, role, statistics)? {
        None => Ok(None),
        Some(Tensor::Scalar(v)) => Ok(Some(v)),
        Some(other) => Err(invalid(role, other.to_string())),
    }
}

fn invalid(role: &str, value: String) -> eyre::Report {
    eyre::Report::new(CalibrationError::InvalidValue {
        role: role.to_string(),
        value,
    })
}
