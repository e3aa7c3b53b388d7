//! Scale/shift option values as written in the configuration.
//!
//! A scale or shift slot holds either a literal (number or per-species list),
//! an explicit "no normalization", or a reference to a dataset statistic
//! (`"dataset_<name>"`). Anything else is kept verbatim as `Invalid` so the
//! resolver can report it against the option it came from.

use std::fmt;

use rescale_traits::Tensor;

/// Prefix that marks a string as a dataset statistic reference.
pub const STATISTIC_PREFIX: &str = "dataset_";

/// Name of a dataset statistic, stored without the `dataset_` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StatisticRef(String);

impl StatisticRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Parse `dataset_<name>`; `None` when the prefix is missing or the name is empty.
    pub fn parse(s: &str) -> Option<Self> {
        s.strip_prefix(STATISTIC_PREFIX)
            .filter(|name| !name.is_empty())
            .map(Self::new)
    }

    /// Name without the prefix, e.g. `force_rms`.
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Full key as used in configuration and statistics maps, e.g. `dataset_force_rms`.
    pub fn key(&self) -> String {
        format!("{STATISTIC_PREFIX}{}", self.0)
    }
}

impl fmt::Display for StatisticRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{STATISTIC_PREFIX}{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RescaleValue {
    /// Normalization disabled for this slot.
    None,
    Scalar(f64),
    PerSpecies(Vec<f64>),
    /// Resolve from a measured dataset statistic.
    Statistic(StatisticRef),
    /// Unrecognized input, kept in its TOML rendering.
    Invalid(String),
}

impl RescaleValue {
    /// Interpret a TOML value.
    ///
    /// TOML has no null, so `false` and the string `"none"` (any case) both
    /// mean "no normalization".
    pub fn from_toml(value: &toml::Value) -> Self {
        match value {
            toml::Value::Float(f) => RescaleValue::Scalar(*f),
            toml::Value::Integer(i) => RescaleValue::Scalar(*i as f64),
            toml::Value::Boolean(false) => RescaleValue::None,
            toml::Value::String(s) => {
                if s.eq_ignore_ascii_case("none") || s.eq_ignore_ascii_case("null") {
                    RescaleValue::None
                } else if let Some(stat) = StatisticRef::parse(s) {
                    RescaleValue::Statistic(stat)
                } else {
                    RescaleValue::Invalid(s.clone())
                }
            }
            toml::Value::Array(items) => {
                let nums: Option<Vec<f64>> = items
                    .iter()
                    .map(|v| match v {
                        toml::Value::Float(f) => Some(*f),
                        toml::Value::Integer(i) => Some(*i as f64),
                        _ => None,
                    })
                    .collect();
                match nums {
                    Some(vs) => RescaleValue::PerSpecies(vs),
                    None => RescaleValue::Invalid(value.to_string()),
                }
            }
            other => RescaleValue::Invalid(other.to_string()),
        }
    }

    /// Like `from_toml`, with `default` used when the option is absent.
    pub fn from_option(value: Option<&toml::Value>, default: RescaleValue) -> Self {
        value.map_or(default, Self::from_toml)
    }

    pub fn is_none(&self) -> bool {
        matches!(self, RescaleValue::None)
    }

    pub fn statistic(&self) -> Option<&StatisticRef> {
        match self {
            RescaleValue::Statistic(s) => Some(s),
            _ => None,
        }
    }

    /// The literal tensor, if this slot holds one.
    pub fn literal(&self) -> Option<Tensor> {
        match self {
            RescaleValue::Scalar(v) => Some(Tensor::Scalar(*v)),
            RescaleValue::PerSpecies(vs) => Some(Tensor::PerSpecies(vs.clone())),
            _ => None,
        }
    }

    /// TOML rendering for persistence. `None` renders as the string `"none"`.
    pub fn to_toml(&self) -> toml::Value {
        match self {
            RescaleValue::None => toml::Value::String("none".to_string()),
            RescaleValue::Scalar(v) => toml::Value::Float(*v),
            RescaleValue::PerSpecies(vs) => {
                toml::Value::Array(vs.iter().map(|v| toml::Value::Float(*v)).collect())
            }
            RescaleValue::Statistic(s) => toml::Value::String(s.key()),
            RescaleValue::Invalid(raw) => toml::Value::String(raw.clone()),
        }
    }
}

impl From<Tensor> for RescaleValue {
    fn from(t: Tensor) -> Self {
        match t {
            Tensor::Scalar(v) => RescaleValue::Scalar(v),
            Tensor::PerSpecies(vs) => RescaleValue::PerSpecies(vs),
        }
    }
}

impl From<Option<Tensor>> for RescaleValue {
    fn from(t: Option<Tensor>) -> Self {
        t.map_or(RescaleValue::None, RescaleValue::from)
    }
}

impl fmt::Display for RescaleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RescaleValue::None => f.write_str("none"),
            RescaleValue::Scalar(v) => write!(f, "{v}"),
            RescaleValue::PerSpecies(vs) => write!(f, "{}", Tensor::PerSpecies(vs.clone())),
            RescaleValue::Statistic(s) => write!(f, "{s}"),
            RescaleValue::Invalid(raw) => f.write_str(raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> RescaleValue {
        let table: toml::Table = toml::from_str(&format!("v = {src}")).unwrap();
        RescaleValue::from_toml(&table["v"])
    }

    #[test]
    fn literals_and_placeholders_are_distinct() {
        assert_eq!(parse("2.5"), RescaleValue::Scalar(2.5));
        assert_eq!(parse("3"), RescaleValue::Scalar(3.0));
        assert_eq!(parse("[1.0, 2]"), RescaleValue::PerSpecies(vec![1.0, 2.0]));
        assert_eq!(
            parse("\"dataset_force_rms\""),
            RescaleValue::Statistic(StatisticRef::new("force_rms"))
        );
    }

    #[test]
    fn none_spellings() {
        assert_eq!(parse("false"), RescaleValue::None);
        assert_eq!(parse("\"None\""), RescaleValue::None);
        assert_eq!(parse("\"null\""), RescaleValue::None);
    }

    #[test]
    fn unrecognized_values_are_kept_verbatim() {
        assert_eq!(parse("\"dataset_\""), RescaleValue::Invalid("dataset_".into()));
        assert_eq!(parse("\"energy\""), RescaleValue::Invalid("energy".into()));
        assert!(matches!(parse("true"), RescaleValue::Invalid(_)));
        assert!(matches!(parse("[1.0, \"a\"]"), RescaleValue::Invalid(_)));
    }

    #[test]
    fn statistic_key_round_trips_through_display() {
        let s = StatisticRef::parse("dataset_per_species_energy_std").unwrap();
        assert_eq!(s.name(), "per_species_energy_std");
        assert_eq!(s.to_string(), s.key());
    }
}
