//! Human-readable error descriptions and structured JSON error formatting.

use rescale_core::CalibrationError;
use rescale_data::DataError;

/// Stable name of a calibration failure, used as the JSON `reason`.
pub fn reason_name(e: &CalibrationError) -> &'static str {
    match e {
        CalibrationError::Conflict(_) => "Conflict",
        CalibrationError::UnsatisfiableStatistic { .. } => "UnsatisfiableStatistic",
        CalibrationError::InvalidValue { .. } => "InvalidValue",
        CalibrationError::DegenerateScale { .. } => "DegenerateScale",
        CalibrationError::UnsupportedTraining(_) => "UnsupportedTraining",
        CalibrationError::UnknownInitializer(_) => "UnknownInitializer",
        CalibrationError::MissingCompiler => "MissingCompiler",
        CalibrationError::Dataset(_) => "Dataset",
        CalibrationError::Model(_) => "Model",
    }
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(ce) = err.downcast_ref::<CalibrationError>() {
        return match ce {
            CalibrationError::Conflict(msg) => format!(
                "What happened: Conflicting normalization settings ({msg}).\nLikely causes: global_rescale_shift is set (it defaults to dataset_energy_mean) while PerSpeciesScaleShift_enable = true.\nHow to fix: Set global_rescale_shift = \"none\" or disable per-species scale/shift."
            ),
            CalibrationError::UnsatisfiableStatistic { statistic, reason } => format!(
                "What happened: {statistic} cannot be computed: {reason}.\nLikely causes: The statistic needs force labels but forces are not trained, or the dataset lacks the labels.\nHow to fix: Add `forces` to loss_coeffs, label every structure, or pick another statistic."
            ),
            CalibrationError::InvalidValue { role, value } => format!(
                "What happened: {role} has an invalid value `{value}`.\nLikely causes: A typo in a dataset_<name> placeholder, or a vector where a single number is required.\nHow to fix: Use a number, a per-species list, \"none\", or one of dataset_force_rms, dataset_energy_mean, dataset_energy_std, dataset_per_species_energy_mean, dataset_per_species_energy_std."
            ),
            CalibrationError::DegenerateScale { role, value } => format!(
                "What happened: {role} was very low: {value}.\nLikely causes: The dataset has too little variation for the requested statistic.\nHow to fix: Check the training data, use a literal scale, or disable scaling with \"none\"."
            ),
            CalibrationError::UnsupportedTraining(field) => format!(
                "What happened: Training on `{field}` is not supported.\nLikely causes: loss_coeffs names a field other than forces or total_energy.\nHow to fix: Restrict loss_coeffs to forces and total_energy."
            ),
            CalibrationError::UnknownInitializer(name) => format!(
                "What happened: Unknown model initializer `{name}`.\nLikely causes: A typo in model_initializers.\nHow to fix: Use zeros, ones or uniform."
            ),
            CalibrationError::MissingCompiler => "What happened: compile_model is set but no compiler is available.\nLikely causes: This build has no ahead-of-time compiler backend.\nHow to fix: Set compile_model = false.".to_string(),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    if let Some(de) = err.downcast_ref::<DataError>() {
        return match de {
            DataError::Io(e) => format!(
                "What happened: The dataset file could not be read ({e}).\nLikely causes: Wrong path or missing permissions.\nHow to fix: Check --dataset or dataset_file_name in the config."
            ),
            DataError::Parse(e) => format!(
                "What happened: The dataset file is not valid JSON for this tool ({e}).\nLikely causes: Missing `type_names` or `frames`, or a malformed structure.\nHow to fix: Provide {{\"type_names\": [...], \"frames\": [{{\"species\": [...], \"total_energy\": ...}}]}}."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: Inconsistent structures in the dataset.\nHow to fix: Fix the reported structure and try again."
            ),
        };
    }

    // String-based heuristics for errors coming from config loading
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("parse config") || lower.contains("read config") {
        let cause = err.root_cause();
        return format!(
            "What happened: The config file could not be loaded.\nLikely causes: Wrong --config path or invalid TOML ({cause}).\nHow to fix: Check the path and the TOML syntax."
        );
    }

    if lower.contains("invalid configuration") || lower.contains("must be") {
        return format!(
            "What happened: Configuration is invalid ({msg}).\nLikely causes: A value of the wrong type or out of range.\nHow to fix: Edit the TOML config and try again."
        );
    }

    if lower.contains("no dataset given") {
        return "What happened: No dataset was given.\nLikely causes: Neither --dataset nor dataset_file_name is set.\nHow to fix: Pass --dataset FILE or set dataset_file_name in the config.".to_string();
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes per failure class; anything else returns 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match err.downcast_ref::<CalibrationError>() {
        Some(CalibrationError::Conflict(_)) => 2,
        Some(CalibrationError::UnsatisfiableStatistic { .. }) => 3,
        Some(CalibrationError::InvalidValue { .. }) => 4,
        Some(CalibrationError::DegenerateScale { .. }) => 5,
        _ => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    if let Some(ce) = err.downcast_ref::<CalibrationError>() {
        let details = match ce {
            CalibrationError::UnsatisfiableStatistic { statistic, .. } => {
                Some(json!({ "statistic": statistic }))
            }
            CalibrationError::InvalidValue { role, value } => {
                Some(json!({ "role": role, "value": value }))
            }
            CalibrationError::DegenerateScale { role, value } => {
                Some(json!({ "role": role, "value": value }))
            }
            _ => None,
        };
        let obj = match details {
            Some(d) => json!({ "reason": reason_name(ce), "details": d, "message": humanize(err) }),
            None => json!({ "reason": reason_name(ce), "message": humanize(err) }),
        };
        return obj.to_string();
    }

    // Generic error JSON
    json!({ "reason": "Error", "message": humanize(err) }).to_string()
}
