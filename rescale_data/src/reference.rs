//! Reference core model: one harmonic well per species.
//!
//! Atom `i` of species `t` at position `r` contributes
//! `e = s_t · (E_t + ½ k_t |r|²) + b_t` and feels `f = -s_t · k_t · r`,
//! where `s`/`b` are the relative per-species scales and shifts written into
//! the configuration by calibration. Unset positions mean the atom sits at
//! the origin.

use rescale_config::{PerSpeciesKey, RescaleValue};
use rescale_traits::{
    AtomicFrame, BoxError, CoreModel, Model, ModelBuilder, ModelOutput, Quantity, Tensor,
};

use crate::error::DataError;

const DEFAULT_OUTPUTS: [Quantity; 2] = [Quantity::TotalEnergy, Quantity::Forces];

#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceModel {
    outputs: Vec<Quantity>,
    species_energy: Vec<f64>,
    stiffness: Vec<f64>,
    /// Relative per-species scales; `None` when per-species rescaling is off.
    scales: Option<Tensor>,
    shifts: Option<Tensor>,
}

impl ReferenceModel {
    pub fn new(num_types: usize, outputs: &[Quantity]) -> Self {
        Self {
            outputs: outputs.to_vec(),
            species_energy: vec![0.0; num_types],
            stiffness: vec![1.0; num_types],
            scales: None,
            shifts: None,
        }
    }

    pub fn with_per_species(mut self, scales: Option<Tensor>, shifts: Option<Tensor>) -> Self {
        self.scales = scales;
        self.shifts = shifts;
        self
    }

    pub fn num_types(&self) -> usize {
        self.species_energy.len()
    }

    fn scale(&self, t: usize) -> f64 {
        self.scales.as_ref().and_then(|s| s.at(t)).unwrap_or(1.0)
    }

    fn shift(&self, t: usize) -> f64 {
        self.shifts.as_ref().and_then(|s| s.at(t)).unwrap_or(0.0)
    }
}

impl Model for ReferenceModel {
    fn produces(&self, quantity: Quantity) -> bool {
        self.outputs.contains(&quantity)
    }

    fn forward(&self, frame: &AtomicFrame) -> Result<ModelOutput, BoxError> {
        let mut energies = Vec::with_capacity(frame.num_atoms());
        let mut forces = Vec::with_capacity(frame.num_atoms());
        for (i, &t) in frame.species.iter().enumerate() {
            if t >= self.num_types() {
                return Err(DataError::UnknownSpecies {
                    atom: i,
                    species: t,
                    num_types: self.num_types(),
                }
                .into());
            }
            let r = frame.positions.get(i).copied().unwrap_or([0.0; 3]);
            let r2: f64 = r.iter().map(|c| c * c).sum();
            let (s, k) = (self.scale(t), self.stiffness[t]);
            energies.push(s * (self.species_energy[t] + 0.5 * k * r2) + self.shift(t));
            forces.push(r.map(|c| -s * k * c));
        }

        Ok(ModelOutput {
            total_energy: self
                .produces(Quantity::TotalEnergy)
                .then(|| energies.iter().sum()),
            forces: self.produces(Quantity::Forces).then_some(forces),
            per_atom_energy: self.produces(Quantity::PerAtomEnergy).then_some(energies),
        })
    }
}

impl CoreModel for ReferenceModel {
    fn visit_parameters_mut(&mut self, visit: &mut dyn FnMut(&str, &mut [f64])) {
        visit("species_energy", self.species_energy.as_mut_slice());
        visit("stiffness", self.stiffness.as_mut_slice());
    }
}

/// Builds a `ReferenceModel` from the resolved configuration.
///
/// Reads `num_types`, `model_outputs` and the `PerSpeciesScaleShift_*` keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceModelBuilder;

fn config_error(msg: impl Into<String>) -> BoxError {
    DataError::ModelConfig(msg.into()).into()
}

fn per_species(config: &toml::Table, key: PerSpeciesKey) -> Result<Option<Tensor>, BoxError> {
    match config.get(&key.canonical()).map(RescaleValue::from_toml) {
        None | Some(RescaleValue::None) => Ok(None),
        Some(v) => v.literal().map(Some).ok_or_else(|| {
            config_error(format!("{} must be resolved to numbers, got `{v}`", key.canonical()))
        }),
    }
}

impl ModelBuilder for ReferenceModelBuilder {
    fn build(&self, config: &toml::Table) -> Result<Box<dyn CoreModel>, BoxError> {
        let num_types = config
            .get("num_types")
            .and_then(toml::Value::as_integer)
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| config_error("num_types is missing"))?;

        let outputs = match config.get("model_outputs") {
            None => DEFAULT_OUTPUTS.to_vec(),
            Some(toml::Value::Array(items)) => items
                .iter()
                .map(|v| {
                    v.as_str()
                        .and_then(Quantity::from_key)
                        .ok_or_else(|| config_error(format!("unknown model output {v}")))
                })
                .collect::<Result<Vec<_>, _>>()?,
            Some(other) => {
                return Err(config_error(format!(
                    "model_outputs must be a list, got {other}"
                )));
            }
        };

        let enabled = config
            .get(&PerSpeciesKey::Enable.canonical())
            .and_then(toml::Value::as_bool)
            .unwrap_or(false);
        let (scales, shifts) = if enabled {
            (
                per_species(config, PerSpeciesKey::Scales)?,
                per_species(config, PerSpeciesKey::Shifts)?,
            )
        } else {
            (None, None)
        };
        tracing::debug!(num_types, ?outputs, per_species = enabled, "building reference model");

        Ok(Box::new(
            ReferenceModel::new(num_types, &outputs).with_per_species(scales, shifts),
        ))
    }
}
