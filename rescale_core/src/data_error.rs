//! Maps `Box<dyn Error>` from collaborator boundaries to typed `CalibrationError`.
//!
//! The traits in `rescale_traits` use `Box<dyn Error + Send + Sync>`; this
//! module converts those to our typed error enum, with an optional
//! feature-gated path for `rescale_data::DataError` downcasting.

use crate::error::CalibrationError;

/// Map a dataset error raised while computing `statistic`.
///
/// A dataset that lacks the labels a statistic needs makes the request
/// unsatisfiable; everything else is a plain dataset failure.
pub fn map_dataset_error(e: &(dyn std::error::Error + 'static), statistic: &str) -> CalibrationError {
    #[cfg(feature = "data-errors")]
    {
        if let Some(de) = e.downcast_ref::<rescale_data::DataError>() {
            return match de {
                rescale_data::DataError::MissingLabel { .. }
                | rescale_data::DataError::Unsupported { .. } => {
                    CalibrationError::UnsatisfiableStatistic {
                        statistic: statistic.to_string(),
                        reason: de.to_string(),
                    }
                }
                other => CalibrationError::Dataset(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("missing") {
        CalibrationError::UnsatisfiableStatistic {
            statistic: statistic.to_string(),
            reason: s,
        }
    } else {
        CalibrationError::Dataset(s)
    }
}

pub fn map_model_error(e: &(dyn std::error::Error + 'static)) -> CalibrationError {
    CalibrationError::Model(e.to_string())
}
