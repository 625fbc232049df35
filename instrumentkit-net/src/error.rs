//! Client-side error type. Carries the two kinds that never reach the wire
//! (`Timeout`, `Disconnected`) alongside whatever `ErrorKind` the server did
//! send back.

use std::fmt;
use std::io;

use instrumentkit_types::ErrorKind;

#[derive(Debug)]
pub enum ClientError {
    /// The server replied with an error response.
    Remote { kind: ErrorKind, message: String },
    /// No reply arrived within the request deadline.
    Timeout,
    /// The socket failed across the configured retry envelope.
    Disconnected,
    Io(io::Error),
    Json(serde_json::Error),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Remote { kind, message } => write!(f, "{kind}: {message}"),
            ClientError::Timeout => write!(f, "timed out waiting for a reply"),
            ClientError::Disconnected => write!(f, "disconnected after repeated failures"),
            ClientError::Io(e) => write!(f, "io error: {e}"),
            ClientError::Json(e) => write!(f, "json error: {e}"),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClientError::Io(e) => Some(e),
            ClientError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ClientError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::WouldBlock || e.kind() == io::ErrorKind::TimedOut {
            ClientError::Timeout
        } else {
            ClientError::Io(e)
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::Json(e)
    }
}
