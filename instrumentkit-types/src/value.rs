//! Parameter value representation.

use serde::{Deserialize, Serialize};

/// The declared type of a parameter, as carried on a [`crate::ParameterBlueprint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Integer,
    Float,
    Bool,
    String,
    Enum,
    Json,
}

/// The current value of a parameter.
///
/// An `Enum`-kind parameter's value is carried as [`ParamValue::String`]; the
/// declared kind and the [`crate::ValidatorSpec::Enum`] on the parameter are
/// what distinguish it from a plain string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Integer(i64),
    Float(f64),
    Bool(bool),
    String(String),
    Json(serde_json::Value),
}

impl ParamValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            ParamValue::Integer(_) => ValueKind::Integer,
            ParamValue::Float(_) => ValueKind::Float,
            ParamValue::Bool(_) => ValueKind::Bool,
            ParamValue::String(_) => ValueKind::String,
            ParamValue::Json(_) => ValueKind::Json,
        }
    }

    /// View this value as `f64`, for range validation of numeric kinds.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Integer(v) => Some(*v as f64),
            ParamValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::String(v) => Some(v),
            _ => None,
        }
    }
}

impl From<serde_json::Value> for ParamValue {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Bool(b) => ParamValue::Bool(b),
            serde_json::Value::String(s) => ParamValue::String(s),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    ParamValue::Integer(i)
                } else if let Some(f) = n.as_f64() {
                    ParamValue::Float(f)
                } else {
                    ParamValue::Json(serde_json::Value::Number(n))
                }
            }
            other => ParamValue::Json(other),
        }
    }
}

impl From<ParamValue> for serde_json::Value {
    fn from(v: ParamValue) -> Self {
        match v {
            ParamValue::Integer(i) => serde_json::json!(i),
            ParamValue::Float(f) => serde_json::json!(f),
            ParamValue::Bool(b) => serde_json::json!(b),
            ParamValue::String(s) => serde_json::json!(s),
            ParamValue::Json(j) => j,
        }
    }
}
