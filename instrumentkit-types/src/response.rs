//! The response wire format: every reply is exactly one of these two shapes.

use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::ErrorKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub message: String,
}

/// `{"ok": true, "value": <any>}` or `{"ok": false, "error": {"kind": ..., "message": ...}}`.
///
/// `ok` carries a JSON boolean, not a string tag, so this type is hand-coded
/// rather than derived — serde's internally-tagged representation only
/// supports string tag values.
#[derive(Debug, Clone)]
pub enum Response {
    Ok { value: Option<Value> },
    Err { error: ErrorBody },
}

impl Serialize for Response {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Response::Ok { value } => {
                let len = if value.is_some() { 2 } else { 1 };
                let mut map = serializer.serialize_map(Some(len))?;
                map.serialize_entry("ok", &true)?;
                if let Some(v) = value {
                    map.serialize_entry("value", v)?;
                }
                map.end()
            }
            Response::Err { error } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("ok", &false)?;
                map.serialize_entry("error", error)?;
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Response {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut value = Value::deserialize(deserializer)?;
        let obj = value.as_object_mut().ok_or_else(|| D::Error::custom("response must be a JSON object"))?;
        let ok = obj
            .remove("ok")
            .and_then(|v| v.as_bool())
            .ok_or_else(|| D::Error::custom("response missing boolean `ok` field"))?;
        if ok {
            Ok(Response::Ok { value: obj.remove("value") })
        } else {
            let error = obj.remove("error").ok_or_else(|| D::Error::custom("error response missing `error` field"))?;
            let error: ErrorBody = serde_json::from_value(error).map_err(D::Error::custom)?;
            Ok(Response::Err { error })
        }
    }
}

impl Response {
    pub fn ok(value: impl Into<Value>) -> Self {
        Response::Ok { value: Some(value.into()) }
    }

    pub fn ok_empty() -> Self {
        Response::Ok { value: None }
    }

    pub fn err(kind: ErrorKind, message: impl Into<String>) -> Self {
        Response::Err {
            error: ErrorBody { kind, message: message.into() },
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Response::Ok { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_response_serializes_with_bool_tag() {
        let r = Response::ok(serde_json::json!(42));
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["ok"], serde_json::json!(true));
        assert_eq!(json["value"], serde_json::json!(42));
    }

    #[test]
    fn err_response_carries_kind_and_message() {
        let r = Response::err(ErrorKind::NotFound, "no such parameter");
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["ok"], serde_json::json!(false));
        assert_eq!(json["error"]["kind"], serde_json::json!("NotFound"));
        assert_eq!(json["error"]["message"], serde_json::json!("no such parameter"));
    }

    #[test]
    fn ok_empty_omits_value_field() {
        let r = Response::ok_empty();
        let json = serde_json::to_value(&r).unwrap();
        assert!(json.get("value").is_none());
    }
}
