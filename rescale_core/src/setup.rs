//! Training setup: calibrate rescaling from the dataset, build and wrap the
//! core model, persist the final configuration, hand off to training.

use std::path::PathBuf;

use rescale_config::{Config, PerSpeciesKey, RescaleValue};
use rescale_traits::{Dataset, Model, ModelBuilder, ModelCompiler, Tensor, TrainingLoop};

use crate::assembler::{GlobalRescale, assemble, finalize};
use crate::data_error::map_model_error;
use crate::error::{CalibrationError, Result};
use crate::init;
use crate::rescale::RescaleParams;
use crate::requirements::required_statistics;
use crate::resolver::{TrainingTargets, resolve_options};
use crate::statistics::{CollectOptions, DatasetStatistics, collect};
use crate::validate::{check_global_scale, check_per_species_scales};
use crate::value::{resolve, resolve_scalar};

/// Outcome of the calibration pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    pub force_training: bool,
    pub per_species_enabled: bool,
    pub statistics: DatasetStatistics,
    pub global_shift: Option<f64>,
    pub global_scale: Option<f64>,
    /// Absolute per-species scales (before division by the global scale).
    pub per_species_scales: Option<Tensor>,
    /// Absolute per-species shifts (before division by the global scale).
    pub per_species_shifts: Option<Tensor>,
}

/// Resolve every scale/shift parameter for `config` against `dataset`.
///
/// Consumes the per-species override keys and writes back `num_types`,
/// `type_names` and, when per-species rescaling is enabled, the relative
/// `PerSpeciesScaleShift_scales` / `PerSpeciesScaleShift_shifts`.
pub fn calibrate(config: &mut Config, dataset: &dyn Dataset) -> Result<Calibration> {
    let settings = config.settings()?;
    let targets = TrainingTargets::from_settings(&settings)?;
    let force_training = targets.force_training();
    tracing::debug!(force_training, "training mode");

    let num_types = dataset.num_types();
    config.insert("num_types", num_types as i64);
    config.insert("type_names", dataset.type_names().to_vec());

    let options = resolve_options(config, force_training)?;

    let required = required_statistics(options.candidates());
    let statistics = collect(
        dataset,
        &required,
        &CollectOptions {
            stride: settings.dataset_statistics_stride,
            force_training,
            sigma: options.sigma,
            algorithm_kwargs: options.algorithm_kwargs.clone(),
        },
    )?;

    let global_shift = resolve_scalar(&options.global_shift, "global_shift", &statistics)?;
    let global_scale = resolve_scalar(&options.global_scale, "global_scale", &statistics)?;
    check_global_scale(global_scale)?;

    let mut per_species_scales = None;
    let mut per_species_shifts = None;
    if options.per_species_enabled {
        let gs = global_scale.unwrap_or(1.0);

        let scales = resolve(&options.per_species_scales, "per_species_scales", &statistics)?;
        let shifts = resolve(&options.per_species_shifts, "per_species_shifts", &statistics)?;
        check_species_len(scales.as_ref(), num_types, "per_species_scales")?;
        check_species_len(shifts.as_ref(), num_types, "per_species_shifts")?;
        check_per_species_scales(scales.as_ref())?;

        config.insert(
            PerSpeciesKey::Scales.canonical(),
            RescaleValue::from(scales.as_ref().map(|s| s.divided_by(gs))).to_toml(),
        );
        config.insert(
            PerSpeciesKey::Shifts.canonical(),
            RescaleValue::from(shifts.as_ref().map(|s| s.divided_by(gs))).to_toml(),
        );
        tracing::info!(
            scales = %RescaleValue::from(scales.clone()),
            shifts = %RescaleValue::from(shifts.clone()),
            "initially per-atom outputs are scaled and shifted"
        );
        per_species_scales = scales;
        per_species_shifts = shifts;
    }

    Ok(Calibration {
        force_training,
        per_species_enabled: options.per_species_enabled,
        statistics,
        global_shift,
        global_scale,
        per_species_scales,
        per_species_shifts,
    })
}

fn check_species_len(value: Option<&Tensor>, num_types: usize, role: &str) -> Result<()> {
    if let Some(Tensor::PerSpecies(vs)) = value
        && vs.len() != num_types
    {
        return Err(eyre::Report::new(CalibrationError::InvalidValue {
            role: role.to_string(),
            value: format!(
                "{} (expected {num_types} entries, one per species)",
                Tensor::PerSpecies(vs.clone())
            ),
        }));
    }
    Ok(())
}

/// Calibrated model and the configuration to persist with it.
pub struct Prepared {
    pub model: Box<dyn Model>,
    pub config: Config,
    pub calibration: Calibration,
    /// Parameters of the rescaling layer wrapped around the core model.
    pub rescale: RescaleParams,
}

impl core::fmt::Debug for Prepared {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Prepared")
            .field("calibration", &self.calibration)
            .field("rescale", &self.rescale)
            .finish_non_exhaustive()
    }
}

impl Prepared {
    /// Write `config_final.toml` under `<root>/<run_name>`.
    pub fn write_final_config(&self) -> Result<PathBuf> {
        let dir = self.config.settings()?.run_dir();
        self.config.write_final(&dir)
    }
}

/// Calibrate, build the core model, initialize it, wrap it and optionally compile it.
pub fn prepare(
    mut config: Config,
    dataset: &dyn Dataset,
    builder: &dyn ModelBuilder,
    compiler: Option<&dyn ModelCompiler>,
) -> Result<Prepared> {
    config.validate()?;
    let calibration = calibrate(&mut config, dataset)?;
    let settings = config.settings()?;

    let mut core = builder
        .build(config.as_table())
        .map_err(|e| eyre::Report::new(map_model_error(e.as_ref())))?;
    init::apply_all(&settings.model_initializers, core.as_mut()).map_err(eyre::Report::new)?;

    let wrapped = assemble(
        core,
        GlobalRescale {
            scale: calibration.global_scale,
            shift: calibration.global_shift,
            trainable_scale: settings.trainable_global_rescale_scale,
            trainable_shift: settings.trainable_global_rescale_shift,
        },
    );
    tracing::info!("successfully built the network");
    let rescale = wrapped.params().clone();
    let model = finalize(wrapped, settings.compile_model, compiler)?;

    Ok(Prepared {
        model,
        config,
        calibration,
        rescale,
    })
}

/// Full setup: prepare, persist the final configuration, then train.
pub fn run(
    config: Config,
    dataset: &dyn Dataset,
    builder: &dyn ModelBuilder,
    compiler: Option<&dyn ModelCompiler>,
    trainer: &mut dyn TrainingLoop,
) -> Result<PathBuf> {
    let prepared = prepare(config, dataset, builder, compiler)?;
    let path = prepared.write_final_config()?;
    tracing::info!(path = %path.display(), "wrote final configuration");
    let Prepared { model, config, .. } = prepared;
    trainer
        .train(model, config.as_table())
        .map_err(|e| eyre::eyre!("training failed: {e}"))?;
    Ok(path)
}
