use serde::{Deserialize, Serialize};

use crate::Quantity;

/// One labeled structure: species per atom, positions and optional labels.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AtomicFrame {
    /// Species index of each atom.
    pub species: Vec<usize>,
    #[serde(default)]
    pub positions: Vec<[f64; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_energy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forces: Option<Vec<[f64; 3]>>,
}

impl AtomicFrame {
    pub fn num_atoms(&self) -> usize {
        self.species.len()
    }

    /// Number of atoms of each species, as floats for regression.
    pub fn species_counts(&self, num_types: usize) -> Vec<f64> {
        let mut counts = vec![0.0; num_types];
        for &t in &self.species {
            if let Some(c) = counts.get_mut(t) {
                *c += 1.0;
            }
        }
        counts
    }
}

/// Predictions of one forward pass. Absent fields were not produced.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModelOutput {
    pub total_energy: Option<f64>,
    pub per_atom_energy: Option<Vec<f64>>,
    pub forces: Option<Vec<[f64; 3]>>,
}

impl ModelOutput {
    pub fn has(&self, quantity: Quantity) -> bool {
        match quantity {
            Quantity::TotalEnergy => self.total_energy.is_some(),
            Quantity::PerAtomEnergy => self.per_atom_energy.is_some(),
            Quantity::Forces => self.forces.is_some(),
        }
    }
}
