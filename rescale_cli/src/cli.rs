//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "rescale", version, about = "Dataset-driven output rescaling for interatomic potentials")]
pub struct Cli {
    /// Path to the training config TOML
    #[arg(long, value_name = "FILE", default_value = "config.toml")]
    pub config: PathBuf,

    /// Dataset JSON file (overrides dataset_file_name from the config)
    #[arg(long, value_name = "FILE")]
    pub dataset: Option<PathBuf>,

    /// Log and report as JSON lines instead of pretty text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); RUST_LOG takes precedence
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Also write JSON logs to this file
    #[arg(long = "log-file", value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve every scale/shift, build the model and write config_final.toml
    Calibrate {
        /// Output root directory (overrides `root`)
        #[arg(long, value_name = "DIR")]
        output: Option<PathBuf>,
        /// Run directory name under the output root (overrides `run_name`)
        #[arg(long, value_name = "NAME")]
        run_name: Option<String>,
    },
    /// Compute the dataset statistics the config references and print them
    Stats,
}
