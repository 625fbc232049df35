//! The error taxonomy carried on the wire inside a failed [`crate::Response`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Classification of a server-side failure, as seen by a client.
///
/// `Timeout` and `Disconnected` are never produced by the server — they are
/// synthesized client-side when a reply never arrives — but are kept on this
/// enum so client code has one error-kind type to match on end to end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ErrorKind {
    /// Malformed instruction: missing a required field, wrong shape, unknown operation.
    ProtocolError,
    /// Target instrument, submodule path, parameter, or method does not exist.
    NotFound,
    /// Value failed its parameter's validator, or a method argument was invalid.
    Validation,
    /// The operation is not supported on this target (e.g. `set` on a read-only parameter).
    Unsupported,
    /// The instrument driver itself raised an error while handling the instruction.
    InstrumentFailure,
    /// Unexpected server-side failure not attributable to the instruction itself.
    Internal,
    /// Client-only: no reply arrived within the request timeout.
    Timeout,
    /// Client-only: the connection dropped before a reply arrived.
    Disconnected,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::ProtocolError => "ProtocolError",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::Validation => "Validation",
            ErrorKind::Unsupported => "Unsupported",
            ErrorKind::InstrumentFailure => "InstrumentFailure",
            ErrorKind::Internal => "Internal",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::Disconnected => "Disconnected",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_to_pascal_case() {
        assert_eq!(serde_json::to_string(&ErrorKind::NotFound).unwrap(), "\"NotFound\"");
        assert_eq!(
            serde_json::to_string(&ErrorKind::InstrumentFailure).unwrap(),
            "\"InstrumentFailure\""
        );
    }
}
