//! Statistics Requirement Analyzer.

use std::collections::BTreeSet;

use rescale_config::{RescaleValue, StatisticRef};

/// The deduplicated set of statistics referenced by any of `candidates`.
pub fn required_statistics<'a>(
    candidates: impl IntoIterator<Item = &'a RescaleValue>,
) -> BTreeSet<StatisticRef> {
    candidates
        .into_iter()
        .filter_map(RescaleValue::statistic)
        .cloned()
        .collect()
}
