//! Config Resolver: training targets, global defaults, per-species overrides.

use std::collections::BTreeSet;

use rescale_config::{
    Config, GLOBAL_SCALE_KEY, GLOBAL_SHIFT_KEY, PerSpeciesKey, RescaleValue, Settings,
    StatisticRef,
};
use rescale_traits::Quantity;

use crate::error::{CalibrationError, Result};

/// Fields the run is supervised on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingTargets {
    fields: BTreeSet<Quantity>,
}

impl TrainingTargets {
    /// Derive the trained fields from `loss_coeffs`.
    ///
    /// Only forces and total energy are supported.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let mut fields = BTreeSet::new();
        for name in settings.loss_coeffs.fields() {
            match Quantity::from_key(&name) {
                Some(q @ (Quantity::Forces | Quantity::TotalEnergy)) => {
                    fields.insert(q);
                }
                _ => {
                    return Err(eyre::Report::new(CalibrationError::UnsupportedTraining(
                        name,
                    )));
                }
            }
        }
        Ok(Self { fields })
    }

    pub fn force_training(&self) -> bool {
        self.fields.contains(&Quantity::Forces)
    }

    pub fn fields(&self) -> impl Iterator<Item = Quantity> + '_ {
        self.fields.iter().copied()
    }
}

/// Scale/shift requests extracted from the configuration, still unresolved.
#[derive(Debug, Clone, PartialEq)]
pub struct RescaleOptions {
    pub global_shift: RescaleValue,
    pub global_scale: RescaleValue,
    pub per_species_enabled: bool,
    pub per_species_scales: RescaleValue,
    pub per_species_shifts: RescaleValue,
    pub sigma: Option<f64>,
    pub algorithm_kwargs: toml::Table,
}

impl RescaleOptions {
    /// The four slots that may reference dataset statistics.
    pub fn candidates(&self) -> [&RescaleValue; 4] {
        [
            &self.global_shift,
            &self.global_scale,
            &self.per_species_scales,
            &self.per_species_shifts,
        ]
    }
}

/// Default global shift: the mean total energy of the training set.
pub fn default_global_shift() -> RescaleValue {
    RescaleValue::Statistic(StatisticRef::new("energy_mean"))
}

/// Default global scale: force RMS under force training, else the energy spread.
pub fn default_global_scale(force_training: bool) -> RescaleValue {
    if force_training {
        RescaleValue::Statistic(StatisticRef::new("force_rms"))
    } else {
        RescaleValue::Statistic(StatisticRef::new("energy_std"))
    }
}

/// Extract the rescale options from `config`.
///
/// Per-species `scales`, `shifts` and `sigma` are consumed (removed from the
/// configuration); the global options, the enable flag and the algorithm
/// keyword table stay in place. Fails when a global shift and per-species
/// shifting are both enabled.
pub fn resolve_options(config: &mut Config, force_training: bool) -> Result<RescaleOptions> {
    let global_shift = RescaleValue::from_option(config.get(GLOBAL_SHIFT_KEY), default_global_shift());
    let global_scale = RescaleValue::from_option(
        config.get(GLOBAL_SCALE_KEY),
        default_global_scale(force_training),
    );

    let per_species_enabled = match config.per_species(PerSpeciesKey::Enable) {
        None => false,
        Some(toml::Value::Boolean(b)) => *b,
        Some(other) => {
            return Err(eyre::Report::new(CalibrationError::InvalidValue {
                role: PerSpeciesKey::Enable.canonical(),
                value: other.to_string(),
            }));
        }
    };

    let per_species_scales = RescaleValue::from_option(
        config.pop_per_species(PerSpeciesKey::Scales).as_ref(),
        RescaleValue::None,
    );
    let per_species_shifts = RescaleValue::from_option(
        config.pop_per_species(PerSpeciesKey::Shifts).as_ref(),
        RescaleValue::None,
    );
    let sigma = match config.pop_per_species(PerSpeciesKey::Sigma) {
        None => None,
        Some(toml::Value::Float(f)) => Some(f),
        Some(toml::Value::Integer(i)) => Some(i as f64),
        Some(other) => {
            return Err(eyre::Report::new(CalibrationError::InvalidValue {
                role: "per_species_sigma".to_string(),
                value: other.to_string(),
            }));
        }
    };

    if !global_shift.is_none() && per_species_enabled {
        return Err(eyre::Report::new(CalibrationError::Conflict(
            "one can only enable either global shift or per-species shift".to_string(),
        )));
    }
    tracing::info!(enabled = per_species_enabled, "per-species scale/shift");

    let algorithm_kwargs = match config.per_species(PerSpeciesKey::AlgorithmKwargs) {
        None => toml::Table::new(),
        Some(toml::Value::Table(t)) => t.clone(),
        Some(other) => {
            return Err(eyre::Report::new(CalibrationError::InvalidValue {
                role: PerSpeciesKey::AlgorithmKwargs.canonical(),
                value: other.to_string(),
            }));
        }
    };

    Ok(RescaleOptions {
        global_shift,
        global_scale,
        per_species_enabled,
        per_species_scales,
        per_species_shifts,
        sigma,
        algorithm_kwargs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rescale_config::load_toml;

    fn downcast(err: &eyre::Report) -> &CalibrationError {
        err.downcast_ref::<CalibrationError>()
            .expect("typed calibration error")
    }

    #[test]
    fn defaults_follow_training_mode() {
        let mut cfg = load_toml("").unwrap();
        let opts = resolve_options(&mut cfg, true).unwrap();
        assert_eq!(opts.global_shift, default_global_shift());
        assert_eq!(
            opts.global_scale,
            RescaleValue::Statistic(StatisticRef::new("force_rms"))
        );
        let opts = resolve_options(&mut cfg, false).unwrap();
        assert_eq!(
            opts.global_scale,
            RescaleValue::Statistic(StatisticRef::new("energy_std"))
        );
        assert!(!opts.per_species_enabled);
    }

    #[test]
    fn default_global_shift_conflicts_with_per_species() {
        let mut cfg = load_toml("PerSpeciesScaleShift_enable = true").unwrap();
        let err = resolve_options(&mut cfg, false).unwrap_err();
        assert!(matches!(downcast(&err), CalibrationError::Conflict(_)));
    }

    #[test]
    fn per_species_with_disabled_global_shift() {
        let mut cfg = load_toml(
            r#"
global_rescale_shift = "none"
per_species_scale_shift_enable = true
per_species_scale_shift_scales = "dataset_per_species_energy_std"
PerSpeciesScaleShift_sigma = 2
"#,
        )
        .unwrap();
        let opts = resolve_options(&mut cfg, false).unwrap();
        assert!(opts.per_species_enabled);
        assert!(opts.global_shift.is_none());
        assert_eq!(opts.sigma, Some(2.0));
        assert_eq!(
            opts.per_species_scales,
            RescaleValue::Statistic(StatisticRef::new("per_species_energy_std"))
        );
        // consumed
        assert!(cfg.per_species(PerSpeciesKey::Scales).is_none());
        assert!(cfg.per_species(PerSpeciesKey::Sigma).is_none());
        // kept
        assert!(cfg.per_species(PerSpeciesKey::Enable).is_some());
    }

    #[test]
    fn loss_coeffs_outside_energy_and_forces_are_rejected() {
        let cfg = load_toml("loss_coeffs = [\"forces\", \"stress\"]").unwrap();
        let err = TrainingTargets::from_settings(&cfg.settings().unwrap()).unwrap_err();
        assert_eq!(
            downcast(&err),
            &CalibrationError::UnsupportedTraining("stress".to_string())
        );
    }

    #[test]
    fn force_training_detected_from_table_form() {
        let cfg = load_toml("[loss_coeffs]\nforces = 1.0\ntotal_energy = 1.0").unwrap();
        let targets = TrainingTargets::from_settings(&cfg.settings().unwrap()).unwrap();
        assert!(targets.force_training());
        assert_eq!(targets.fields().count(), 2);
    }
}
