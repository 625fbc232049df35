//! The broadcast wire format published on the subscriber socket whenever a
//! parameter's value changes.

use serde::{Deserialize, Serialize};

use crate::value::ParamValue;

/// One parameter-changed event, keyed externally by its dotted path (the
/// publisher sends the path as a topic frame ahead of the JSON body).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BroadcastBody {
    pub value: ParamValue,
    pub unit: String,
    /// Unix epoch seconds, as observed by the server at publish time.
    pub ts: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_through_json() {
        let body = BroadcastBody {
            value: ParamValue::Float(3.3),
            unit: "V".into(),
            ts: 1_700_000_000.5,
        };
        let json = serde_json::to_string(&body).unwrap();
        let back: BroadcastBody = serde_json::from_str(&json).unwrap();
        assert_eq!(back, body);
    }
}
