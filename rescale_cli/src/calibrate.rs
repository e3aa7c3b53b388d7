//! Subcommand bodies: load config and dataset, run the calibration engine, report.

use std::path::{Path, PathBuf};

use eyre::{Result, WrapErr};
use rescale_config::Config;
use rescale_core::{Calibration, DatasetStatistics, RescaleParams};
use rescale_data::{InMemoryDataset, ReferenceModelBuilder};
use rescale_traits::{Dataset, Tensor};
use serde_json::{Value, json};

/// Load and validate the config, then the training subset of the dataset.
pub fn load_inputs(config_path: &Path, dataset: Option<&Path>) -> Result<(Config, InMemoryDataset)> {
    let mut config = rescale_config::load_file(config_path)?;
    config.validate()?;
    let settings = config.settings()?;

    let path: PathBuf = match dataset {
        Some(p) => {
            config.insert("dataset_file_name", p.display().to_string());
            p.to_path_buf()
        }
        None => settings.dataset_file_name.ok_or_else(|| {
            eyre::eyre!("no dataset given: pass --dataset or set dataset_file_name in the config")
        })?,
    };
    let dataset = InMemoryDataset::load_json(&path)
        .wrap_err_with(|| format!("load dataset {}", path.display()))?
        .split(settings.n_train);
    tracing::info!(structures = dataset.len(), "training set ready");
    Ok((config, dataset))
}

pub fn run_calibrate(
    config_path: &Path,
    dataset: Option<&Path>,
    output: Option<&Path>,
    run_name: Option<&str>,
    json: bool,
) -> Result<()> {
    let (mut config, dataset) = load_inputs(config_path, dataset)?;
    if let Some(dir) = output {
        config.insert("root", dir.display().to_string());
    }
    if let Some(name) = run_name {
        config.insert("run_name", name);
    }

    let prepared = rescale_core::prepare(config, &dataset, &ReferenceModelBuilder, None)?;
    let path = prepared.write_final_config()?;
    tracing::info!(path = %path.display(), "wrote final configuration");

    if json {
        println!(
            "{}",
            json!({
                "final_config": path.display().to_string(),
                "statistics": statistics_json(&prepared.calibration.statistics),
                "rescale": rescale_json(&prepared.rescale),
                "per_species": per_species_json(&prepared.calibration),
            })
        );
    } else {
        print_statistics(&prepared.calibration.statistics);
        let r = &prepared.rescale;
        println!("global scale: {}", fmt_opt(r.scale_by));
        println!("global shift: {}", fmt_opt(r.shift_by));
        let keys: Vec<&str> = r.scale_keys.iter().map(|q| q.key()).collect();
        println!("scaled outputs: {}", keys.join(", "));
        if prepared.calibration.per_species_enabled {
            println!(
                "per-species scales: {}",
                fmt_tensor(prepared.calibration.per_species_scales.as_ref())
            );
            println!(
                "per-species shifts: {}",
                fmt_tensor(prepared.calibration.per_species_shifts.as_ref())
            );
        }
        println!("Final config written to {}", path.display());
    }
    Ok(())
}

/// Calibrate without building a model: report what the config resolves to.
pub fn run_stats(config_path: &Path, dataset: Option<&Path>, json: bool) -> Result<()> {
    let (mut config, dataset) = load_inputs(config_path, dataset)?;
    let calibration = rescale_core::calibrate(&mut config, &dataset)?;

    if json {
        println!(
            "{}",
            json!({
                "structures": dataset.len(),
                "type_names": dataset.type_names(),
                "statistics": statistics_json(&calibration.statistics),
                "global_scale": calibration.global_scale,
                "global_shift": calibration.global_shift,
                "per_species": per_species_json(&calibration),
            })
        );
    } else {
        println!(
            "{} structures, species: {}",
            dataset.len(),
            dataset.type_names().join(", ")
        );
        print_statistics(&calibration.statistics);
        println!("global scale: {}", fmt_opt(calibration.global_scale));
        println!("global shift: {}", fmt_opt(calibration.global_shift));
    }
    Ok(())
}

fn print_statistics(stats: &DatasetStatistics) {
    if stats.is_empty() {
        println!("no dataset statistics referenced");
    }
    for (key, value) in stats.iter() {
        println!("{key} = {value}");
    }
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map_or_else(|| "none".to_string(), |v| v.to_string())
}

fn fmt_tensor(t: Option<&Tensor>) -> String {
    t.map_or_else(|| "none".to_string(), ToString::to_string)
}

fn tensor_json(t: &Tensor) -> Value {
    match t {
        Tensor::Scalar(v) => json!(v),
        Tensor::PerSpecies(vs) => json!(vs),
    }
}

fn statistics_json(stats: &DatasetStatistics) -> Value {
    Value::Object(
        stats
            .iter()
            .map(|(k, v)| (k.to_string(), tensor_json(v)))
            .collect(),
    )
}

fn rescale_json(r: &RescaleParams) -> Value {
    json!({
        "scale_by": r.scale_by,
        "shift_by": r.shift_by,
        "scale_keys": r.scale_keys.iter().map(|q| q.key()).collect::<Vec<_>>(),
        "shift_keys": r.shift_keys.iter().map(|q| q.key()).collect::<Vec<_>>(),
        "trainable_scale": r.trainable_scale,
        "trainable_shift": r.trainable_shift,
    })
}

fn per_species_json(c: &Calibration) -> Value {
    if !c.per_species_enabled {
        return Value::Null;
    }
    json!({
        "scales": c.per_species_scales.as_ref().map(tensor_json),
        "shifts": c.per_species_shifts.as_ref().map(tensor_json),
    })
}
