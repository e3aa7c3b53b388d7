use std::path::Path;

use rescale_traits::{
    Aggregate, AtomicFrame, BoxError, Dataset, Quantity, StatisticMode, StatisticsOptions,
};
use serde::{Deserialize, Serialize};

use crate::error::{DataError, Result};
use crate::stats;

/// On-disk layout of a dataset file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DatasetFile {
    type_names: Vec<String>,
    frames: Vec<AtomicFrame>,
}

/// Labeled structures held in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct InMemoryDataset {
    frames: Vec<AtomicFrame>,
    type_names: Vec<String>,
}

impl InMemoryDataset {
    /// Check every structure against `type_names` and its own atom count.
    pub fn new(frames: Vec<AtomicFrame>, type_names: Vec<String>) -> Result<Self> {
        let num_types = type_names.len();
        for (i, f) in frames.iter().enumerate() {
            let invalid = |reason: String| DataError::InvalidFrame { frame: i, reason };
            if f.species.is_empty() {
                return Err(invalid("no atoms".into()));
            }
            if let Some(t) = f.species.iter().find(|t| **t >= num_types) {
                return Err(invalid(format!(
                    "species index {t} out of range for {num_types} types"
                )));
            }
            if !f.positions.is_empty() && f.positions.len() != f.num_atoms() {
                return Err(invalid(format!(
                    "{} positions for {} atoms",
                    f.positions.len(),
                    f.num_atoms()
                )));
            }
            if let Some(forces) = &f.forces
                && forces.len() != f.num_atoms()
            {
                return Err(invalid(format!(
                    "{} forces for {} atoms",
                    forces.len(),
                    f.num_atoms()
                )));
            }
        }
        Ok(Self { frames, type_names })
    }

    /// Parse `{"type_names": [...], "frames": [...]}`.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let file: DatasetFile = serde_json::from_str(s)?;
        Self::new(file.frames, file.type_names)
    }

    pub fn load_json(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let ds = Self::from_json_str(&text)?;
        tracing::info!(
            path = %path.display(),
            structures = ds.frames.len(),
            types = ds.type_names.len(),
            "loaded dataset"
        );
        Ok(ds)
    }

    pub fn to_json_string(&self) -> Result<String> {
        let file = DatasetFile {
            type_names: self.type_names.clone(),
            frames: self.frames.clone(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    pub fn frames(&self) -> &[AtomicFrame] {
        &self.frames
    }

    /// Keep the first `n_train` structures (all of them when `None` or larger).
    pub fn split(self, n_train: Option<usize>) -> Self {
        match n_train {
            Some(n) if n < self.frames.len() => {
                tracing::debug!(n_train = n, total = self.frames.len(), "training subset");
                Self {
                    frames: self.frames.into_iter().take(n).collect(),
                    type_names: self.type_names,
                }
            }
            _ => self,
        }
    }

    fn select(&self, stride: usize) -> Result<Vec<(usize, &AtomicFrame)>> {
        let selected: Vec<_> = self
            .frames
            .iter()
            .enumerate()
            .step_by(stride.max(1))
            .collect();
        if selected.is_empty() {
            return Err(DataError::EmptySelection {
                stride,
                len: self.frames.len(),
            });
        }
        Ok(selected)
    }

    /// Typed counterpart of `Dataset::statistics`.
    pub fn compute(
        &self,
        fields: &[Quantity],
        modes: &[StatisticMode],
        options: &StatisticsOptions,
    ) -> Result<Vec<Aggregate>> {
        let selected = self.select(options.stride)?;
        fields
            .iter()
            .zip(modes)
            .map(|(field, mode)| {
                tracing::debug!(%field, %mode, stride = options.stride, "aggregate");
                stats::aggregate(*field, *mode, &selected, self.num_types(), options)
            })
            .collect()
    }
}

impl Dataset for InMemoryDataset {
    fn len(&self) -> usize {
        self.frames.len()
    }

    fn num_types(&self) -> usize {
        self.type_names.len()
    }

    fn type_names(&self) -> &[String] {
        &self.type_names
    }

    fn statistics(
        &self,
        fields: &[Quantity],
        modes: &[StatisticMode],
        options: &StatisticsOptions,
    ) -> std::result::Result<Vec<Aggregate>, BoxError> {
        self.compute(fields, modes, options).map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(species: Vec<usize>, energy: f64) -> AtomicFrame {
        AtomicFrame {
            species,
            total_energy: Some(energy),
            ..AtomicFrame::default()
        }
    }

    #[test]
    fn rejects_out_of_range_species() {
        let err = InMemoryDataset::new(vec![frame(vec![0, 2], 1.0)], vec!["H".into(), "O".into()])
            .unwrap_err();
        assert!(matches!(err, DataError::InvalidFrame { frame: 0, .. }));
    }

    #[test]
    fn rejects_force_count_mismatch() {
        let mut f = frame(vec![0, 0], 1.0);
        f.forces = Some(vec![[0.0; 3]]);
        let err = InMemoryDataset::new(vec![f], vec!["H".into()]).unwrap_err();
        assert!(err.to_string().contains("1 forces for 2 atoms"));
    }

    #[test]
    fn split_keeps_leading_structures() {
        let ds = InMemoryDataset::new(
            (0..5).map(|i| frame(vec![0], f64::from(i))).collect(),
            vec!["H".into()],
        )
        .unwrap()
        .split(Some(2));
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.frames()[1].total_energy, Some(1.0));
    }

    #[test]
    fn stride_selects_every_nth() {
        let ds = InMemoryDataset::new(
            (0..5).map(|i| frame(vec![0], f64::from(i))).collect(),
            vec!["H".into()],
        )
        .unwrap();
        let out = ds
            .compute(
                &[Quantity::TotalEnergy],
                &[StatisticMode::MeanStd],
                &StatisticsOptions {
                    stride: 2,
                    ..StatisticsOptions::default()
                },
            )
            .unwrap();
        // structures 0, 2, 4
        match &out[0] {
            Aggregate::MeanStd { mean, .. } => assert_eq!(mean.as_scalar(), Some(2.0)),
            other => panic!("unexpected aggregate {other:?}"),
        }
    }
}
