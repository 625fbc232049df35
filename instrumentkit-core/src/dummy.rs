//! The built-in `t.Dummy` instrument: a bare handful of simulated parameters
//! used for smoke tests and documentation examples (spec scenario 1:
//! `create_instrument(name="dmm", classPath="t.Dummy")`).

use std::collections::BTreeMap;

use instrumentkit_types::{InstrumentBlueprint, ParamValue, ValidatorSpec, ValueKind};
use serde_json::Value;

use crate::instrument::{HandlerError, Instrument};
use crate::node::{Method, Node, Parameter};

pub struct DummyInstrument {
    root: Node,
}

impl DummyInstrument {
    pub fn new() -> Self {
        let root = Node::new()
            .with_parameter(
                "voltage",
                Parameter::new(ValueKind::Float, "V", ValidatorSpec::Range { min: -10.0, max: 10.0 }, ParamValue::Float(0.0)),
            )
            .with_parameter(
                "enabled",
                Parameter::new(ValueKind::Bool, "", ValidatorSpec::None, ParamValue::Bool(false)),
            )
            .with_method(
                "reset",
                Method {
                    positional: vec![],
                    keywords: vec![],
                    return_type: "null".into(),
                    handler: Box::new(|_args, _kwargs| Ok(Value::Null)),
                },
            );
        DummyInstrument { root }
    }
}

impl Default for DummyInstrument {
    fn default() -> Self {
        DummyInstrument::new()
    }
}

impl Instrument for DummyInstrument {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn class_path(&self) -> &str {
        "t.Dummy"
    }

    fn describe(&self, name: &str) -> InstrumentBlueprint {
        let (parameters, methods, submodules) = self.root.describe_into(name);
        InstrumentBlueprint {
            name: name.to_string(),
            class_path: self.class_path().to_string(),
            parameters,
            methods,
            submodules,
        }
    }

    fn get(&self, path: &[&str]) -> Result<ParamValue, HandlerError> {
        self.root.get(path)
    }

    fn set(&self, path: &[&str], value: ParamValue) -> Result<(), HandlerError> {
        self.root.set(path, value)
    }

    fn call(
        &self,
        path: &[&str],
        method_name: &str,
        args: &[Value],
        kwargs: &BTreeMap<String, Value>,
    ) -> Result<Value, HandlerError> {
        self.root.call(path, method_name, args, kwargs)
    }

    fn snapshot(&self) -> BTreeMap<String, ParamValue> {
        let mut out = BTreeMap::new();
        self.root.snapshot_into("", &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describes_default_shape() {
        let dummy = DummyInstrument::new();
        let bp = dummy.describe("dmm");
        assert_eq!(bp.class_path, "t.Dummy");
        assert!(bp.parameters.iter().any(|p| p.path == "voltage" && p.unit == "V"));
    }

    #[test]
    fn set_then_get_round_trips() {
        let dummy = DummyInstrument::new();
        dummy.set(&["voltage"], ParamValue::Float(1.25)).unwrap();
        assert_eq!(dummy.get(&["voltage"]).unwrap(), ParamValue::Float(1.25));
    }
}
