//! Named parameter initializers for freshly built core models.

use std::str::FromStr;

use rescale_traits::CoreModel;

use crate::error::CalibrationError;

/// Fractional part of the golden ratio; drives the `uniform` spread.
const GOLDEN_FRAC: f64 = 0.618_033_988_749_895;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Initializer {
    Zeros,
    Ones,
    /// Deterministic low-discrepancy spread over [-1, 1).
    Uniform,
}

impl FromStr for Initializer {
    type Err = CalibrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "zeros" => Ok(Initializer::Zeros),
            "ones" => Ok(Initializer::Ones),
            "uniform" => Ok(Initializer::Uniform),
            other => Err(CalibrationError::UnknownInitializer(other.to_string())),
        }
    }
}

impl Initializer {
    pub fn fill(self, values: &mut [f64]) {
        match self {
            Initializer::Zeros => values.fill(0.0),
            Initializer::Ones => values.fill(1.0),
            Initializer::Uniform => {
                for (i, v) in values.iter_mut().enumerate() {
                    let frac = ((i as f64 + 1.0) * GOLDEN_FRAC).fract();
                    *v = 2.0 * frac - 1.0;
                }
            }
        }
    }

    /// Apply to every parameter block of `model`.
    pub fn apply(self, model: &mut dyn CoreModel) {
        model.visit_parameters_mut(&mut |name, values| {
            tracing::trace!(initializer = ?self, parameter = name, len = values.len(), "init");
            self.fill(values);
        });
    }
}

/// Parse every name first, then apply in order.
pub fn apply_all(names: &[String], model: &mut dyn CoreModel) -> Result<(), CalibrationError> {
    let inits = names
        .iter()
        .map(|n| n.parse::<Initializer>())
        .collect::<Result<Vec<_>, _>>()?;
    for init in inits {
        init.apply(model);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::StubModel;
    use rescale_traits::Quantity;

    #[test]
    fn uniform_stays_in_range_and_varies() {
        let mut v = vec![0.0; 64];
        Initializer::Uniform.fill(&mut v);
        assert!(v.iter().all(|x| (-1.0..1.0).contains(x)));
        assert!(v.windows(2).all(|w| w[0] != w[1]));
    }

    #[test]
    fn initializers_apply_in_order() {
        let mut m = StubModel::new(&[Quantity::TotalEnergy]);
        apply_all(&["uniform".into(), "ones".into()], &mut m).unwrap();
        assert!(m.params[0].1.iter().all(|x| *x == 1.0));
    }

    #[test]
    fn unknown_name_is_rejected_before_anything_runs() {
        let mut m = StubModel::new(&[Quantity::TotalEnergy]);
        let err = apply_all(&["zeros".into(), "xavier".into()], &mut m).unwrap_err();
        assert_eq!(err, CalibrationError::UnknownInitializer("xavier".into()));
        assert_eq!(m.params[0].1, vec![0.5; 4]);
    }
}
