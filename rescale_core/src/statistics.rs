//! Dataset Statistics Collector.
//!
//! Each statistic family is one aggregate pass over the training set; a pass
//! fills every key of its family, so `energy_mean` and `energy_std` share a
//! single computation.

use std::collections::{BTreeMap, BTreeSet};

use rescale_config::StatisticRef;
use rescale_traits::{Aggregate, Dataset, Quantity, StatisticMode, StatisticsOptions, Tensor};

use crate::data_error::map_dataset_error;
use crate::error::{CalibrationError, Result};

/// Aggregate passes the collector knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StatisticFamily {
    /// `force_rms`
    ForceRms,
    /// `energy_mean`, `energy_std`
    Energy,
    /// `per_species_energy_mean`, `per_species_energy_std`
    PerSpeciesEnergy,
}

impl StatisticFamily {
    pub const ALL: [StatisticFamily; 3] = [
        StatisticFamily::ForceRms,
        StatisticFamily::Energy,
        StatisticFamily::PerSpeciesEnergy,
    ];

    /// Family that produces `stat`; `None` for names no pass produces.
    pub fn of(stat: &StatisticRef) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|family| family.names().contains(&stat.name()))
    }

    /// Statistic names produced by one pass, in aggregate order.
    pub const fn names(self) -> &'static [&'static str] {
        match self {
            StatisticFamily::ForceRms => &["force_rms"],
            StatisticFamily::Energy => &["energy_mean", "energy_std"],
            StatisticFamily::PerSpeciesEnergy => {
                &["per_species_energy_mean", "per_species_energy_std"]
            }
        }
    }

    pub const fn field(self) -> Quantity {
        match self {
            StatisticFamily::ForceRms => Quantity::Forces,
            StatisticFamily::Energy | StatisticFamily::PerSpeciesEnergy => Quantity::TotalEnergy,
        }
    }

    pub const fn mode(self) -> StatisticMode {
        match self {
            StatisticFamily::ForceRms => StatisticMode::Rms,
            StatisticFamily::Energy => StatisticMode::MeanStd,
            StatisticFamily::PerSpeciesEnergy => StatisticMode::PerSpeciesMeanStd,
        }
    }
}

/// Measured statistics keyed by their placeholder spelling (`dataset_<name>`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetStatistics {
    values: BTreeMap<String, Tensor>,
}

impl DatasetStatistics {
    pub fn get(&self, key: &str) -> Option<&Tensor> {
        self.values.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Tensor)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(String, Tensor)> for DatasetStatistics {
    fn from_iter<I: IntoIterator<Item = (String, Tensor)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Inputs of one collection run.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectOptions {
    pub stride: usize,
    pub force_training: bool,
    /// Only used by the per-species pass.
    pub sigma: Option<f64>,
    /// Only used by the per-species pass.
    pub algorithm_kwargs: toml::Table,
}

impl Default for CollectOptions {
    fn default() -> Self {
        Self {
            stride: 1,
            force_training: false,
            sigma: None,
            algorithm_kwargs: toml::Table::new(),
        }
    }
}

/// Families needed for `required`, each listed once.
pub fn families_for(required: &BTreeSet<StatisticRef>) -> BTreeSet<StatisticFamily> {
    required.iter().filter_map(StatisticFamily::of).collect()
}

/// Compute every statistic in `required`, one pass per family.
///
/// Names that no family produces are skipped here; they fail later when a
/// slot tries to resolve them.
pub fn collect(
    dataset: &dyn Dataset,
    required: &BTreeSet<StatisticRef>,
    opts: &CollectOptions,
) -> Result<DatasetStatistics> {
    let families = families_for(required);

    if families.contains(&StatisticFamily::ForceRms) && !opts.force_training {
        return Err(eyre::Report::new(CalibrationError::UnsatisfiableStatistic {
            statistic: StatisticRef::new("force_rms").key(),
            reason: "force training is not enabled (add `forces` to loss_coeffs)".to_string(),
        }));
    }

    let mut values = BTreeMap::new();
    for family in families {
        let options = match family {
            StatisticFamily::PerSpeciesEnergy => StatisticsOptions {
                stride: opts.stride,
                sigma: opts.sigma,
                algorithm_kwargs: opts.algorithm_kwargs.clone(),
            },
            _ => StatisticsOptions {
                stride: opts.stride,
                ..StatisticsOptions::default()
            },
        };
        let label = StatisticRef::new(family.names()[0]).key();
        tracing::debug!(
            field = %family.field(),
            mode = %family.mode(),
            stride = opts.stride,
            "computing dataset statistics"
        );
        let mut aggregates = dataset
            .statistics(&[family.field()], &[family.mode()], &options)
            .map_err(|e| eyre::Report::new(map_dataset_error(e.as_ref(), &label)))?;
        if aggregates.len() != 1 {
            return Err(eyre::Report::new(CalibrationError::Dataset(format!(
                "expected one aggregate for {} {}, got {}",
                family.field(),
                family.mode(),
                aggregates.len()
            ))));
        }
        let aggregate = aggregates.remove(0);
        let tensors = match (family, aggregate) {
            (StatisticFamily::ForceRms, Aggregate::Rms(rms)) => vec![rms],
            (
                StatisticFamily::Energy | StatisticFamily::PerSpeciesEnergy,
                Aggregate::MeanStd { mean, std },
            ) => vec![mean, std],
            (family, other) => {
                return Err(eyre::Report::new(CalibrationError::Dataset(format!(
                    "unexpected aggregate for {}: {other:?}",
                    family.mode()
                ))));
            }
        };
        for (name, tensor) in family.names().iter().zip(tensors) {
            tracing::debug!(statistic = %name, value = %tensor, "dataset statistic");
            values.insert(StatisticRef::new(*name).key(), tensor);
        }
    }

    Ok(DatasetStatistics { values })
}
