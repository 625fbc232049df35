//! Internal, non-wire error type for the core crate.

use std::fmt;
use std::io;

/// Failures that can occur while building or running the registry/dispatcher
/// that don't map cleanly onto the wire [`instrumentkit_types::ErrorKind`]
/// taxonomy — config loading, profile I/O, startup.
#[derive(Debug)]
pub enum CoreError {
    Io(io::Error),
    Json(serde_json::Error),
    Yaml(serde_yaml::Error),
    Config(String),
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::Io(e) => write!(f, "io error: {e}"),
            CoreError::Json(e) => write!(f, "json error: {e}"),
            CoreError::Yaml(e) => write!(f, "yaml error: {e}"),
            CoreError::Config(msg) => write!(f, "configuration error: {msg}"),
        }
    }
}

impl std::error::Error for CoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CoreError::Io(e) => Some(e),
            CoreError::Json(e) => Some(e),
            CoreError::Yaml(e) => Some(e),
            CoreError::Config(_) => None,
        }
    }
}

impl From<io::Error> for CoreError {
    fn from(e: io::Error) -> Self {
        CoreError::Io(e)
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Json(e)
    }
}

impl From<serde_yaml::Error> for CoreError {
    fn from(e: serde_yaml::Error) -> Self {
        CoreError::Yaml(e)
    }
}
