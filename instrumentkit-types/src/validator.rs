//! Validator descriptors for parameters.
//!
//! Kept as small serializable tags rather than closures so a
//! [`crate::ParameterBlueprint`] — and a parameter-manager profile built from
//! one — can round-trip through JSON.

use serde::{Deserialize, Serialize};

use crate::value::ParamValue;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ValidatorSpec {
    /// Inclusive numeric range, for `Integer`/`Float` parameters.
    Range { min: f64, max: f64 },
    /// Allowed set of string values, for `Enum` parameters.
    Enum { allowed: Vec<String> },
    /// A named predicate resolved against the server's predicate registry.
    Predicate { name: String },
    /// No validation; any value of the declared kind is accepted.
    None,
}

impl ValidatorSpec {
    /// Validate `value` against this spec. `predicate` resolves a named
    /// predicate id to a boolean test; unknown predicate names reject.
    pub fn validate(&self, value: &ParamValue, predicate: impl Fn(&str, &ParamValue) -> bool) -> bool {
        match self {
            ValidatorSpec::Range { min, max } => match value.as_f64() {
                Some(v) => v >= *min && v <= *max,
                None => false,
            },
            // `allowed` is carried as strings so this one variant covers both
            // string enumerations and fixed numeric option sets (e.g. a
            // dial with settings {0.1, 1, 10, 100}) with one wire shape.
            ValidatorSpec::Enum { allowed } => match value {
                ParamValue::String(s) => allowed.iter().any(|a| a == s),
                _ => match value.as_f64() {
                    Some(v) => allowed.iter().filter_map(|a| a.parse::<f64>().ok()).any(|a| a == v),
                    None => false,
                },
            },
            ValidatorSpec::Predicate { name } => predicate(name, value),
            ValidatorSpec::None => true,
        }
    }
}
