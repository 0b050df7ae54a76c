//! Core type definitions with validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types and analysis configuration.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// Bin size was zero or negative.
    #[error("bin size must be positive, got {minutes} minutes")]
    NonPositiveBinSize { minutes: i64 },

    /// Bin size does not divide a day evenly.
    #[error("bin size must divide 1440 minutes evenly, got {minutes} minutes")]
    BinSizeNotDividingDay { minutes: i64 },

    /// The analysis window is empty or inverted.
    #[error("analysis end {end} must be after analysis start {start}")]
    WindowEndNotAfterStart { start: String, end: String },

    /// A percentile was outside [0.0, 1.0].
    #[error("percentile must be between 0.0 and 1.0, got {value}")]
    PercentileOutOfRange { value: f64 },

    /// Invalid edge policy value.
    #[error("invalid edge policy: {value} (expected \"fractional\" or \"whole\")")]
    InvalidEdgePolicy { value: String },
}

/// How a stay's entry and exit bins are credited.
///
/// This enum encodes the valid edge policies, preventing invalid string values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgePolicy {
    /// Entry and exit bins receive the fraction of the bin given by the timestamp offset.
    #[default]
    Fractional,
    /// Entry and exit bins are credited as fully occupied.
    Whole,
}

impl EdgePolicy {
    /// String representation used in configuration files.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Fractional => "fractional",
            Self::Whole => "whole",
        }
    }
}

impl fmt::Display for EdgePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EdgePolicy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Numeric codes are accepted for older scenario files: 1=fractional, 2=whole.
        match s {
            "fractional" | "1" => Ok(Self::Fractional),
            "whole" | "2" => Ok(Self::Whole),
            _ => Err(ValidationError::InvalidEdgePolicy {
                value: s.to_string(),
            }),
        }
    }
}

/// Generates a validated string newtype with common trait implementations.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new value after validation.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                Ok(Self(id))
            }

            /// Returns the value as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_string_id!(
    /// A validated category value.
    ///
    /// Categories partition the stay records (e.g., "ART", "IVT", "OTH"). The
    /// set of categories is fixed for a run.
    Category, "category"
);

define_string_id!(
    /// A validated scenario name.
    ///
    /// Used as the prefix of every exported file name.
    ScenarioName, "scenario name"
);

/// A quantile level in the range \[0.0, 1.0\].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Percentile(f64);

impl Percentile {
    /// Creates a new percentile after validation.
    ///
    /// Returns an error if the value is outside \[0.0, 1.0\] or is NaN.
    pub fn new(value: f64) -> Result<Self, ValidationError> {
        if value.is_nan() || !(0.0..=1.0).contains(&value) {
            return Err(ValidationError::PercentileOutOfRange { value });
        }
        Ok(Self(value))
    }

    /// Returns the inner f64 value.
    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }

    /// Column label for this percentile, e.g. `p95` or `p975`.
    #[must_use]
    pub fn label(self) -> String {
        // Round to a tenth of a percent so 0.55 labels as p55, not p5500000000000001.
        let scaled = (self.0 * 1000.0).round() / 10.0;
        let digits = format!("{scaled}").replace('.', "");
        format!("p{digits}")
    }
}

impl fmt::Display for Percentile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<f64> for Percentile {
    type Error = ValidationError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl Serialize for Percentile {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Percentile {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = f64::deserialize(deserializer)?;
        Self::new(value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_rejects_empty() {
        assert!(Category::new("").is_err());
        assert!(Category::new("ART").is_ok());
    }

    #[test]
    fn scenario_name_rejects_empty() {
        assert!(ScenarioName::new("").is_err());
        assert!(ScenarioName::new("ss_example").is_ok());
    }

    #[test]
    fn category_serde_roundtrip() {
        let cat = Category::new("IVT").unwrap();
        let json = serde_json::to_string(&cat).unwrap();
        assert_eq!(json, "\"IVT\"");
        let parsed: Category = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, cat);
    }

    #[test]
    fn category_serde_rejects_empty() {
        let result: Result<Category, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }

    #[test]
    fn categories_order_lexically() {
        let mut cats = vec![Category::new("OTH").unwrap(), Category::new("ART").unwrap()];
        cats.sort();
        assert_eq!(cats[0].as_str(), "ART");
    }

    #[test]
    fn edge_policy_from_str() {
        assert_eq!(
            "fractional".parse::<EdgePolicy>().unwrap(),
            EdgePolicy::Fractional
        );
        assert_eq!("whole".parse::<EdgePolicy>().unwrap(), EdgePolicy::Whole);
        assert_eq!("1".parse::<EdgePolicy>().unwrap(), EdgePolicy::Fractional);
        assert_eq!("2".parse::<EdgePolicy>().unwrap(), EdgePolicy::Whole);
        assert!("partial".parse::<EdgePolicy>().is_err());
    }

    #[test]
    fn edge_policy_serde_roundtrip() {
        let json = serde_json::to_string(&EdgePolicy::Whole).unwrap();
        assert_eq!(json, "\"whole\"");
        let parsed: EdgePolicy = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, EdgePolicy::Whole);
    }

    #[test]
    fn edge_policy_defaults_to_fractional() {
        assert_eq!(EdgePolicy::default(), EdgePolicy::Fractional);
    }

    #[test]
    fn percentile_validates_range() {
        assert!(Percentile::new(0.0).is_ok());
        assert!(Percentile::new(0.95).is_ok());
        assert!(Percentile::new(1.0).is_ok());
        assert!(Percentile::new(-0.1).is_err());
        assert!(Percentile::new(1.5).is_err());
        assert!(Percentile::new(f64::NAN).is_err());
    }

    #[test]
    fn percentile_labels() {
        assert_eq!(Percentile::new(0.95).unwrap().label(), "p95");
        assert_eq!(Percentile::new(0.975).unwrap().label(), "p975");
        assert_eq!(Percentile::new(0.5).unwrap().label(), "p50");
    }

    #[test]
    fn percentile_serde_rejects_out_of_range() {
        let result: Result<Percentile, _> = serde_json::from_str("1.5");
        assert!(result.is_err());
        let parsed: Percentile = serde_json::from_str("0.75").unwrap();
        assert!((parsed.value() - 0.75).abs() < f64::EPSILON);
    }
}
