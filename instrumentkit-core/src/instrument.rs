//! The `Instrument` trait: the contract every registered tree (hardware
//! driver, the built-in dummy, the parameter manager) implements.

use std::collections::BTreeMap;
use std::fmt;

use instrumentkit_types::{ErrorKind, InstrumentBlueprint, ParamValue};
use serde_json::Value;

/// A handler-level failure, classified the same way a wire [`Response`] is.
///
/// [`Response`]: instrumentkit_types::Response
#[derive(Debug, Clone)]
pub struct HandlerError {
    pub kind: ErrorKind,
    pub message: String,
}

impl HandlerError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        HandlerError { kind, message: message.into() }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        HandlerError::new(ErrorKind::NotFound, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        HandlerError::new(ErrorKind::Validation, message)
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        HandlerError::new(ErrorKind::Unsupported, message)
    }

    pub fn instrument_failure(message: impl Into<String>) -> Self {
        HandlerError::new(ErrorKind::InstrumentFailure, message)
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for HandlerError {}

/// A registered tree: parameters, methods, and nested sub-modules behind one
/// name in the registry.
///
/// `path` arguments address a sub-module by its dotted segments relative to
/// the instrument root (empty for the root itself); the final segment of a
/// `get`/`set` is the parameter name, and of a `call` is carried separately
/// as `method_name`.
pub trait Instrument: Send + Sync {
    /// Enables downcasting to a concrete instrument type for operations
    /// outside the generic contract, e.g. the parameter manager's
    /// `add_parameter`/`remove_parameter`/`save`.
    fn as_any(&self) -> &dyn std::any::Any;

    fn class_path(&self) -> &str;

    fn describe(&self, name: &str) -> InstrumentBlueprint;

    fn get(&self, path: &[&str]) -> Result<ParamValue, HandlerError>;

    fn set(&self, path: &[&str], value: ParamValue) -> Result<(), HandlerError>;

    fn call(
        &self,
        path: &[&str],
        method_name: &str,
        args: &[Value],
        kwargs: &BTreeMap<String, Value>,
    ) -> Result<Value, HandlerError>;

    /// All parameter values reachable from this instrument, keyed by dotted
    /// path relative to the instrument root.
    fn snapshot(&self) -> BTreeMap<String, ParamValue>;
}
