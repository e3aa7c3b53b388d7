//! Output-rescaling adapter around a core model.
//!
//! Forward:  `y = x * scale_by` for scaled keys, then `y += shift_by` for
//! shifted keys. `unscale` applies the inverse so reference labels can be
//! compared in the model's normalized units.

use rescale_traits::{AtomicFrame, BoxError, CoreModel, Model, ModelOutput, Quantity};

/// Affine parameters of a `RescaleOutput`.
#[derive(Debug, Clone, PartialEq)]
pub struct RescaleParams {
    pub scale_keys: Vec<Quantity>,
    pub shift_keys: Vec<Quantity>,
    /// `None` leaves scaled keys untouched.
    pub scale_by: Option<f64>,
    /// `None` leaves shifted keys untouched.
    pub shift_by: Option<f64>,
    pub trainable_scale: bool,
    pub trainable_shift: bool,
}

pub struct RescaleOutput {
    model: Box<dyn CoreModel>,
    params: RescaleParams,
}

impl core::fmt::Debug for RescaleOutput {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RescaleOutput")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl RescaleOutput {
    pub fn new(model: Box<dyn CoreModel>, params: RescaleParams) -> Self {
        Self { model, params }
    }

    pub fn params(&self) -> &RescaleParams {
        &self.params
    }

    pub fn scale_keys(&self) -> &[Quantity] {
        &self.params.scale_keys
    }

    pub fn shift_keys(&self) -> &[Quantity] {
        &self.params.shift_keys
    }

    pub fn scale_by(&self) -> Option<f64> {
        self.params.scale_by
    }

    pub fn shift_by(&self) -> Option<f64> {
        self.params.shift_by
    }

    /// Effective scale applied to `quantity` (1.0 when it is not rescaled).
    pub fn scale_for(&self, quantity: Quantity) -> f64 {
        match self.params.scale_by {
            Some(s) if self.params.scale_keys.contains(&quantity) => s,
            _ => 1.0,
        }
    }

    /// Effective shift applied to `quantity` (0.0 when it is not shifted).
    pub fn shift_for(&self, quantity: Quantity) -> f64 {
        match self.params.shift_by {
            Some(s) if self.params.shift_keys.contains(&quantity) => s,
            _ => 0.0,
        }
    }

    pub fn core(&self) -> &dyn CoreModel {
        self.model.as_ref()
    }

    /// Map physical values back into the core model's normalized units.
    pub fn unscale(&self, output: &ModelOutput) -> ModelOutput {
        self.apply(output, |q, x| (x - self.shift_for(q)) / self.scale_for(q))
    }

    fn apply(&self, output: &ModelOutput, f: impl Fn(Quantity, f64) -> f64) -> ModelOutput {
        ModelOutput {
            total_energy: output
                .total_energy
                .map(|e| f(Quantity::TotalEnergy, e)),
            per_atom_energy: output.per_atom_energy.as_ref().map(|es| {
                es.iter()
                    .map(|e| f(Quantity::PerAtomEnergy, *e))
                    .collect()
            }),
            forces: output.forces.as_ref().map(|fs| {
                fs.iter()
                    .map(|v| v.map(|c| f(Quantity::Forces, c)))
                    .collect()
            }),
        }
    }
}

impl Model for RescaleOutput {
    fn produces(&self, quantity: Quantity) -> bool {
        self.model.produces(quantity)
    }

    fn forward(&self, frame: &AtomicFrame) -> Result<ModelOutput, BoxError> {
        let raw = self.model.forward(frame)?;
        Ok(self.apply(&raw, |q, x| x * self.scale_for(q) + self.shift_for(q)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::StubModel;

    fn frame(n: usize) -> AtomicFrame {
        AtomicFrame {
            species: vec![0; n],
            ..AtomicFrame::default()
        }
    }

    fn wrapped(scale_by: Option<f64>, shift_by: Option<f64>) -> RescaleOutput {
        RescaleOutput::new(
            Box::new(StubModel::new(&Quantity::ALL)),
            RescaleParams {
                scale_keys: vec![Quantity::TotalEnergy, Quantity::Forces],
                shift_keys: vec![Quantity::TotalEnergy],
                scale_by,
                shift_by,
                trainable_scale: false,
                trainable_shift: false,
            },
        )
    }

    #[test]
    fn forward_scales_then_shifts() {
        let out = wrapped(Some(2.5), Some(-1.0)).forward(&frame(3)).unwrap();
        assert_eq!(out.total_energy, Some(3.0 * 2.5 - 1.0));
        assert_eq!(out.forces.unwrap()[0], [2.5, 0.0, 0.0]);
        // not a scale key
        assert_eq!(out.per_atom_energy.unwrap(), vec![1.0; 3]);
    }

    #[test]
    fn unscale_inverts_forward() {
        let m = wrapped(Some(4.0), Some(10.0));
        let physical = m.forward(&frame(2)).unwrap();
        let normalized = m.unscale(&physical);
        assert_eq!(normalized.total_energy, Some(2.0));
        assert_eq!(normalized.forces.unwrap()[1], [1.0, 0.0, 0.0]);
    }

    #[test]
    fn disabled_scale_and_shift_are_identity() {
        let out = wrapped(None, None).forward(&frame(2)).unwrap();
        assert_eq!(out.total_energy, Some(2.0));
    }
}
