#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Rescale calibration engine (backend-agnostic).
//!
//! This crate decides, from the configuration, which training-set statistics
//! a run needs, measures exactly those once, resolves `dataset_<name>`
//! placeholders into numbers and wraps the core model in an output-rescaling
//! layer. All dataset and model interactions go through the `rescale_traits`
//! contracts.
//!
//! ## Architecture
//!
//! - **Config Resolver**: training targets, defaults, per-species overrides (`resolver`)
//! - **Requirement Analyzer**: which statistics are referenced (`requirements`)
//! - **Statistics Collector**: one aggregate pass per family (`statistics`)
//! - **Value Resolver**: placeholders to numbers (`value`)
//! - **Validator**: degenerate scale guard (`validate`)
//! - **Assembler**: core model + `RescaleOutput` (+ compile) (`assembler`, `rescale`)
//! - **Setup**: the sequential pass tying it together (`setup`)
//!
//! Every failure is a typed `CalibrationError` inside an `eyre::Report`;
//! nothing is retried.

pub mod assembler;
pub mod data_error;
pub mod error;
pub mod init;
pub mod mocks;
pub mod requirements;
pub mod rescale;
pub mod resolver;
pub mod setup;
pub mod statistics;
pub mod validate;
pub mod value;

pub use crate::error::{CalibrationError, Report, Result};
pub use crate::rescale::{RescaleOutput, RescaleParams};
pub use crate::setup::{Calibration, Prepared, calibrate, prepare, run};
pub use crate::statistics::{DatasetStatistics, StatisticFamily};
pub use crate::validate::RESCALE_THRESHOLD;
