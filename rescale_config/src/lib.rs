#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Configuration for the rescale calibration workspace.
//!
//! - `Config` is the ordered key/value table loaded from TOML. The calibration
//!   engine consumes some keys and writes derived keys back before the final
//!   configuration is persisted.
//! - Per-species options accept two spellings; they are folded into the
//!   preferred `PerSpeciesScaleShift_*` spelling once, at load time.
//! - `Settings` is the typed view of the plain options, with defaults.
pub mod value;

pub use value::{RescaleValue, STATISTIC_PREFIX, StatisticRef};

use std::path::{Path, PathBuf};

use eyre::WrapErr;
use rescale_traits::Quantity;
use serde::Deserialize;

/// File name of the persisted, fully resolved configuration.
pub const FINAL_CONFIG_FILE: &str = "config_final.toml";

/// Preferred spelling of per-species options.
pub const PER_SPECIES_PREFIX: &str = "PerSpeciesScaleShift_";
/// Accepted alternative spelling; loses to `PER_SPECIES_PREFIX` when both are set.
pub const PER_SPECIES_ALIAS_PREFIX: &str = "per_species_scale_shift_";

pub const GLOBAL_SHIFT_KEY: &str = "global_rescale_shift";
pub const GLOBAL_SCALE_KEY: &str = "global_rescale_scale";

/// Per-species options that accept both spellings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerSpeciesKey {
    Enable,
    Scales,
    Shifts,
    Sigma,
    AlgorithmKwargs,
}

impl PerSpeciesKey {
    pub const ALL: [PerSpeciesKey; 5] = [
        PerSpeciesKey::Enable,
        PerSpeciesKey::Scales,
        PerSpeciesKey::Shifts,
        PerSpeciesKey::Sigma,
        PerSpeciesKey::AlgorithmKwargs,
    ];

    pub const fn suffix(self) -> &'static str {
        match self {
            PerSpeciesKey::Enable => "enable",
            PerSpeciesKey::Scales => "scales",
            PerSpeciesKey::Shifts => "shifts",
            PerSpeciesKey::Sigma => "sigma",
            PerSpeciesKey::AlgorithmKwargs => "algorithm_kwargs",
        }
    }

    /// e.g. `PerSpeciesScaleShift_scales`
    pub fn canonical(self) -> String {
        format!("{PER_SPECIES_PREFIX}{}", self.suffix())
    }

    /// e.g. `per_species_scale_shift_scales`
    pub fn alias(self) -> String {
        format!("{PER_SPECIES_ALIAS_PREFIX}{}", self.suffix())
    }
}

/// Fields a training run may be supervised on.
///
/// Accepts a single field name, a list of names, or a table keyed by field
/// name (weights and loss kinds are left to the training loop).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum LossCoeffs {
    Single(String),
    List(Vec<String>),
    Weighted(toml::Table),
}

impl LossCoeffs {
    /// Field names in declaration order, without duplicates.
    pub fn fields(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let mut push = |s: &str| {
            if !out.iter().any(|o| o == s) {
                out.push(s.to_string());
            }
        };
        match self {
            LossCoeffs::Single(s) => push(s.as_str()),
            LossCoeffs::List(items) => items.iter().for_each(|s| push(s.as_str())),
            LossCoeffs::Weighted(table) => table.keys().for_each(|s| push(s.as_str())),
        }
        out
    }
}

impl Default for LossCoeffs {
    fn default() -> Self {
        LossCoeffs::Single(Quantity::TotalEnergy.key().to_string())
    }
}

/// Typed view of the plain (non scale/shift) options.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Output root directory.
    pub root: PathBuf,
    /// Run directory under `root`.
    pub run_name: String,
    /// JSON frame file for the training dataset.
    pub dataset_file_name: Option<PathBuf>,
    /// Number of leading frames used for training; all frames when absent.
    pub n_train: Option<usize>,
    /// Use every n-th training frame for dataset statistics.
    pub dataset_statistics_stride: usize,
    pub loss_coeffs: LossCoeffs,
    /// Run the ahead-of-time compile step on the assembled model.
    pub compile_model: bool,
    /// Parameter initializers applied in order to the freshly built core model.
    pub model_initializers: Vec<String>,
    pub trainable_global_rescale_shift: bool,
    pub trainable_global_rescale_scale: bool,
    /// Outputs declared by the reference model (all when absent).
    pub model_outputs: Option<Vec<String>>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            root: PathBuf::from("results"),
            run_name: "run".to_string(),
            dataset_file_name: None,
            n_train: None,
            dataset_statistics_stride: 1,
            loss_coeffs: LossCoeffs::default(),
            compile_model: false,
            model_initializers: Vec::new(),
            trainable_global_rescale_shift: false,
            trainable_global_rescale_scale: false,
            model_outputs: None,
        }
    }
}

impl Settings {
    /// Directory that receives the final configuration.
    pub fn run_dir(&self) -> PathBuf {
        self.root.join(&self.run_name)
    }
}

/// Ordered configuration table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    table: toml::Table,
}

impl Config {
    /// Wrap a parsed table, folding per-species aliases into the preferred spelling.
    pub fn from_table(mut table: toml::Table) -> Self {
        for key in PerSpeciesKey::ALL {
            let alias = key.alias();
            let Some(alias_value) = table.remove(&alias) else {
                continue;
            };
            let canonical = key.canonical();
            if table.contains_key(&canonical) {
                tracing::warn!(
                    ignored = %alias,
                    kept = %canonical,
                    "both spellings of a per-species option are set; ignoring the alias"
                );
            } else {
                table.insert(canonical, alias_value);
            }
        }
        Self { table }
    }

    pub fn get(&self, key: &str) -> Option<&toml::Value> {
        self.table.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.table.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<toml::Value>) {
        self.table.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<toml::Value> {
        self.table.remove(key)
    }

    pub fn per_species(&self, key: PerSpeciesKey) -> Option<&toml::Value> {
        self.table.get(&key.canonical())
    }

    /// Remove and return a per-species option.
    pub fn pop_per_species(&mut self, key: PerSpeciesKey) -> Option<toml::Value> {
        self.table.remove(&key.canonical())
    }

    pub fn as_table(&self) -> &toml::Table {
        &self.table
    }

    pub fn into_table(self) -> toml::Table {
        self.table
    }

    pub fn settings(&self) -> eyre::Result<Settings> {
        toml::Value::Table(self.table.clone())
            .try_into::<Settings>()
            .map_err(|e| eyre::eyre!("invalid configuration: {e}"))
    }

    pub fn validate(&self) -> eyre::Result<()> {
        let settings = self.settings()?;

        if settings.dataset_statistics_stride == 0 {
            eyre::bail!("dataset_statistics_stride must be >= 1");
        }
        if settings.n_train == Some(0) {
            eyre::bail!("n_train must be >= 1");
        }
        if settings.run_name.trim().is_empty() {
            eyre::bail!("run_name must not be empty");
        }
        if settings.loss_coeffs.fields().is_empty() {
            eyre::bail!("loss_coeffs must name at least one field");
        }
        if let Some(outputs) = &settings.model_outputs {
            for name in outputs {
                if Quantity::from_key(name).is_none() {
                    eyre::bail!(
                        "model_outputs: unknown quantity `{name}` (expected total_energy, atomic_energy or forces)"
                    );
                }
            }
        }

        // Per-species
        if let Some(v) = self.per_species(PerSpeciesKey::Enable)
            && !v.is_bool()
        {
            eyre::bail!("{} must be a boolean", PerSpeciesKey::Enable.canonical());
        }
        if let Some(v) = self.per_species(PerSpeciesKey::Sigma) {
            let sigma = match v {
                toml::Value::Float(f) => *f,
                toml::Value::Integer(i) => *i as f64,
                _ => eyre::bail!("{} must be a number", PerSpeciesKey::Sigma.canonical()),
            };
            if !(sigma.is_finite() && sigma > 0.0) {
                eyre::bail!("{} must be > 0", PerSpeciesKey::Sigma.canonical());
            }
        }
        if let Some(v) = self.per_species(PerSpeciesKey::AlgorithmKwargs)
            && !v.is_table()
        {
            eyre::bail!(
                "{} must be a table",
                PerSpeciesKey::AlgorithmKwargs.canonical()
            );
        }

        Ok(())
    }

    pub fn to_toml_string(&self) -> eyre::Result<String> {
        toml::to_string_pretty(&self.table).wrap_err("serialize configuration")
    }

    /// Write the configuration to `dir/config_final.toml`, creating `dir`.
    pub fn write_final(&self, dir: &Path) -> eyre::Result<PathBuf> {
        std::fs::create_dir_all(dir)
            .wrap_err_with(|| format!("create output directory {}", dir.display()))?;
        let path = dir.join(FINAL_CONFIG_FILE);
        std::fs::write(&path, self.to_toml_string()?)
            .wrap_err_with(|| format!("write {}", path.display()))?;
        Ok(path)
    }
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<toml::Table>(s).map(Config::from_table)
}

pub fn load_file(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("read config {}", path.display()))?;
    load_toml(&text).wrap_err_with(|| format!("parse config {}", path.display()))
}
