//! Rescale Validator: degenerate scales are fatal.

use rescale_traits::Tensor;

use crate::error::{CalibrationError, Result};

/// Smallest scale accepted for normalizing outputs.
pub const RESCALE_THRESHOLD: f64 = 1e-6;

fn degenerate(role: &str, value: f64) -> eyre::Report {
    eyre::Report::new(CalibrationError::DegenerateScale {
        role: role.to_string(),
        value,
    })
}

fn too_small(value: f64) -> bool {
    value.is_nan() || value < RESCALE_THRESHOLD
}

/// Reject a resolved global scale below `RESCALE_THRESHOLD`. `None` disables scaling.
pub fn check_global_scale(scale: Option<f64>) -> Result<()> {
    match scale {
        Some(v) if too_small(v) => Err(degenerate("global_scale", v)),
        _ => Ok(()),
    }
}

/// Reject per-species scales with any entry below `RESCALE_THRESHOLD` or NaN.
///
/// Checked on the absolute values, before they are made relative to the
/// global scale. A NaN entry is reported as the minimum.
pub fn check_per_species_scales(scales: Option<&Tensor>) -> Result<()> {
    match scales.and_then(Tensor::min) {
        Some(v) if too_small(v) => Err(degenerate("per_species_scales", v)),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Some(5e-7), true)]
    #[case(Some(-1.0), true)]
    #[case(Some(f64::NAN), true)]
    #[case(Some(1.0), false)]
    #[case(Some(RESCALE_THRESHOLD), false)]
    #[case(None, false)]
    fn global_threshold(#[case] scale: Option<f64>, #[case] rejected: bool) {
        assert_eq!(check_global_scale(scale).is_err(), rejected);
    }

    #[test]
    fn per_species_uses_minimum_entry() {
        let ok = Tensor::PerSpecies(vec![4.0, 6.0]);
        assert!(check_per_species_scales(Some(&ok)).is_ok());
        let bad = Tensor::PerSpecies(vec![4.0, 1e-9, 6.0]);
        let err = check_per_species_scales(Some(&bad)).unwrap_err();
        assert_eq!(
            err.downcast_ref::<CalibrationError>(),
            Some(&CalibrationError::DegenerateScale {
                role: "per_species_scales".into(),
                value: 1e-9,
            })
        );
    }

    #[rstest]
    #[case(vec![f64::NAN, 4.0])]
    #[case(vec![4.0, f64::NAN])]
    fn per_species_nan_entry_is_degenerate(#[case] scales: Vec<f64>) {
        let err = check_per_species_scales(Some(&Tensor::PerSpecies(scales))).unwrap_err();
        match err.downcast_ref::<CalibrationError>() {
            Some(CalibrationError::DegenerateScale { role, value }) => {
                assert_eq!(role, "per_species_scales");
                assert!(value.is_nan());
            }
            other => panic!("expected DegenerateScale, got {other:?}"),
        }
    }

    #[rstest]
    #[case(Tensor::Scalar(f64::NAN), true)]
    #[case(Tensor::Scalar(5e-7), true)]
    #[case(Tensor::Scalar(2.0), false)]
    fn per_species_broadcast_scalar(#[case] scales: Tensor, #[case] rejected: bool) {
        assert_eq!(check_per_species_scales(Some(&scales)).is_err(), rejected);
    }
}
