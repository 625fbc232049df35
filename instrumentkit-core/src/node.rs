//! `Node`: a generic, recursive parameter/method/sub-module tree.
//!
//! This is the shared backing store for the built-in dummy instrument and the
//! parameter manager — anything whose shape is "a `BTreeMap` of parameters, a
//! `BTreeMap` of methods, a `BTreeMap` of nested nodes" rather than a
//! hand-written hardware driver.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, RwLock};

use instrumentkit_types::{InstrumentBlueprint, MethodBlueprint, ParamValue, ParameterBlueprint, ValidatorSpec, ValueKind};
use serde_json::Value;

use crate::instrument::HandlerError;
use crate::predicate::PredicateRegistry;

pub type MethodHandler = Box<dyn Fn(&[Value], &BTreeMap<String, Value>) -> Result<Value, HandlerError> + Send + Sync>;

pub struct Parameter {
    pub kind: ValueKind,
    pub unit: String,
    pub validator: ValidatorSpec,
    pub readable: bool,
    pub settable: bool,
    value: Mutex<ParamValue>,
}

impl Parameter {
    pub fn new(kind: ValueKind, unit: impl Into<String>, validator: ValidatorSpec, initial: ParamValue) -> Self {
        Parameter {
            kind,
            unit: unit.into(),
            validator,
            readable: true,
            settable: true,
            value: Mutex::new(initial),
        }
    }

    pub fn read_only(mut self) -> Self {
        self.settable = false;
        self
    }

    fn get(&self) -> ParamValue {
        self.value.lock().expect("parameter mutex poisoned").clone()
    }

    fn set(&self, v: ParamValue) {
        *self.value.lock().expect("parameter mutex poisoned") = v;
    }
}

pub struct Method {
    pub positional: Vec<String>,
    pub keywords: Vec<String>,
    pub return_type: String,
    pub handler: MethodHandler,
}

/// A node in the tree. The root node of an instrument has no name of its
/// own — callers supply the instrument's registry name when describing or
/// snapshotting.
#[derive(Default)]
pub struct Node {
    parameters: RwLock<BTreeMap<String, Parameter>>,
    methods: BTreeMap<String, Method>,
    submodules: RwLock<BTreeMap<String, Node>>,
    predicates: Arc<PredicateRegistry>,
}

impl Node {
    pub fn new() -> Self {
        Node::default()
    }

    pub fn with_parameter(self, path: impl Into<String>, param: Parameter) -> Self {
        self.parameters.write().expect("poisoned").insert(path.into(), param);
        self
    }

    pub fn with_method(mut self, name: impl Into<String>, method: Method) -> Self {
        self.methods.insert(name.into(), method);
        self
    }

    pub fn with_submodule(self, name: impl Into<String>, node: Node) -> Self {
        self.submodules.write().expect("poisoned").insert(name.into(), node);
        self
    }

    pub fn get(&self, path: &[&str]) -> Result<ParamValue, HandlerError> {
        match path {
            [] => Err(HandlerError::not_found("empty parameter path")),
            [name] => {
                let params = self.parameters.read().expect("poisoned");
                let p = params
                    .get(*name)
                    .ok_or_else(|| HandlerError::not_found(format!("no such parameter `{name}`")))?;
                if !p.readable {
                    return Err(HandlerError::unsupported(format!("parameter `{name}` is not readable")));
                }
                Ok(p.get())
            }
            [head, rest @ ..] => {
                let subs = self.submodules.read().expect("poisoned");
                let sub = subs
                    .get(*head)
                    .ok_or_else(|| HandlerError::not_found(format!("no such sub-module `{head}`")))?;
                sub.get(rest)
            }
        }
    }

    pub fn set(&self, path: &[&str], value: ParamValue) -> Result<(), HandlerError> {
        match path {
            [] => Err(HandlerError::not_found("empty parameter path")),
            [name] => {
                let params = self.parameters.read().expect("poisoned");
                let p = params
                    .get(*name)
                    .ok_or_else(|| HandlerError::not_found(format!("no such parameter `{name}`")))?;
                if !p.settable {
                    return Err(HandlerError::unsupported(format!("parameter `{name}` is not settable")));
                }
                if !p.validator.validate(&value, |name, v| self.predicates.resolve(name, v)) {
                    return Err(HandlerError::validation(format!(
                        "value does not satisfy validator for `{name}`"
                    )));
                }
                p.set(value);
                Ok(())
            }
            [head, rest @ ..] => {
                let subs = self.submodules.read().expect("poisoned");
                let sub = subs
                    .get(*head)
                    .ok_or_else(|| HandlerError::not_found(format!("no such sub-module `{head}`")))?;
                sub.set(rest, value)
            }
        }
    }

    pub fn call(
        &self,
        path: &[&str],
        method_name: &str,
        args: &[Value],
        kwargs: &BTreeMap<String, Value>,
    ) -> Result<Value, HandlerError> {
        match path {
            [] => {
                let m = self
                    .methods
                    .get(method_name)
                    .ok_or_else(|| HandlerError::not_found(format!("no such method `{method_name}`")))?;
                if args.len() != m.positional.len() {
                    return Err(HandlerError::validation(format!(
                        "method `{method_name}` takes {} positional argument(s), got {}",
                        m.positional.len(),
                        args.len()
                    )));
                }
                for key in kwargs.keys() {
                    if !m.keywords.iter().any(|k| k == key) {
                        return Err(HandlerError::validation(format!(
                            "method `{method_name}` has no keyword argument `{key}`"
                        )));
                    }
                }
                (m.handler)(args, kwargs)
            }
            [head, rest @ ..] => {
                let subs = self.submodules.read().expect("poisoned");
                let sub = subs
                    .get(*head)
                    .ok_or_else(|| HandlerError::not_found(format!("no such sub-module `{head}`")))?;
                sub.call(rest, method_name, args, kwargs)
            }
        }
    }

    pub fn snapshot_into(&self, prefix: &str, out: &mut BTreeMap<String, ParamValue>) {
        let params = self.parameters.read().expect("poisoned");
        for (name, p) in params.iter() {
            let key = if prefix.is_empty() { name.clone() } else { format!("{prefix}.{name}") };
            out.insert(key, p.get());
        }
        let subs = self.submodules.read().expect("poisoned");
        for (name, sub) in subs.iter() {
            let sub_prefix = if prefix.is_empty() { name.clone() } else { format!("{prefix}.{name}") };
            sub.snapshot_into(&sub_prefix, out);
        }
    }

    pub fn describe_into(&self, name: &str) -> (Vec<ParameterBlueprint>, Vec<MethodBlueprint>, Vec<InstrumentBlueprint>) {
        let params = self.parameters.read().expect("poisoned");
        let parameters = params
            .iter()
            .map(|(path, p)| ParameterBlueprint {
                path: path.clone(),
                kind: p.kind,
                unit: p.unit.clone(),
                validator: p.validator.clone(),
                readable: p.readable,
                settable: p.settable,
            })
            .collect();

        let methods = self
            .methods
            .iter()
            .map(|(name, m)| MethodBlueprint {
                name: name.clone(),
                positional: m.positional.clone(),
                keywords: m.keywords.clone(),
                return_type: m.return_type.clone(),
            })
            .collect();

        let subs = self.submodules.read().expect("poisoned");
        let submodules = subs
            .iter()
            .map(|(sub_name, sub)| {
                let (p, m, s) = sub.describe_into(sub_name);
                InstrumentBlueprint {
                    name: sub_name.clone(),
                    class_path: String::new(),
                    parameters: p,
                    methods: m,
                    submodules: s,
                }
            })
            .collect();

        let _ = name;
        (parameters, methods, submodules)
    }

    /// Ensure every intermediate sub-module on `path` exists, creating empty
    /// nodes as needed, then insert `param` as the leaf named `path.last()`.
    pub fn add_parameter(&self, path: &[&str], param: Parameter) -> Result<(), HandlerError> {
        match path {
            [] => Err(HandlerError::validation("parameter path must not be empty")),
            [name] => {
                self.parameters.write().expect("poisoned").insert(name.to_string(), param);
                Ok(())
            }
            [head, rest @ ..] => {
                {
                    let mut subs = self.submodules.write().expect("poisoned");
                    subs.entry(head.to_string()).or_insert_with(Node::new);
                }
                let subs = self.submodules.read().expect("poisoned");
                let sub = subs.get(*head).expect("just inserted");
                sub.add_parameter(rest, param)
            }
        }
    }

    pub fn remove_parameter(&self, path: &[&str]) -> Result<(), HandlerError> {
        match path {
            [] => Err(HandlerError::validation("parameter path must not be empty")),
            [name] => {
                self.parameters
                    .write()
                    .expect("poisoned")
                    .remove(*name)
                    .map(|_| ())
                    .ok_or_else(|| HandlerError::not_found(format!("no such parameter `{name}`")))
            }
            [head, rest @ ..] => {
                let subs = self.submodules.read().expect("poisoned");
                let sub = subs
                    .get(*head)
                    .ok_or_else(|| HandlerError::not_found(format!("no such sub-module `{head}`")))?;
                sub.remove_parameter(rest)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use instrumentkit_types::ValidatorSpec;

    fn voltage_param() -> Parameter {
        Parameter::new(ValueKind::Float, "V", ValidatorSpec::Range { min: 0.0, max: 10.0 }, ParamValue::Float(0.0))
    }

    #[test]
    fn get_and_set_round_trip_at_root() {
        let node = Node::new().with_parameter("voltage", voltage_param());
        node.set(&["voltage"], ParamValue::Float(1.25)).unwrap();
        assert_eq!(node.get(&["voltage"]).unwrap(), ParamValue::Float(1.25));
    }

    #[test]
    fn set_rejects_value_outside_validator() {
        let node = Node::new().with_parameter("voltage", voltage_param());
        let err = node.set(&["voltage"], ParamValue::Float(100.0)).unwrap_err();
        assert_eq!(err.kind, instrumentkit_types::ErrorKind::Validation);
    }

    #[test]
    fn set_against_a_predicate_validator_resolves_against_the_builtin_registry() {
        let node = Node::new().with_parameter(
            "count",
            Parameter::new(ValueKind::Integer, "", ValidatorSpec::Predicate { name: "even".to_string() }, ParamValue::Integer(0)),
        );
        node.set(&["count"], ParamValue::Integer(4)).unwrap();
        assert_eq!(node.get(&["count"]).unwrap(), ParamValue::Integer(4));

        let err = node.set(&["count"], ParamValue::Integer(3)).unwrap_err();
        assert_eq!(err.kind, instrumentkit_types::ErrorKind::Validation);
    }

    #[test]
    fn set_against_an_unregistered_predicate_name_always_rejects() {
        let node = Node::new().with_parameter(
            "count",
            Parameter::new(ValueKind::Integer, "", ValidatorSpec::Predicate { name: "no_such_predicate".to_string() }, ParamValue::Integer(0)),
        );
        let err = node.set(&["count"], ParamValue::Integer(4)).unwrap_err();
        assert_eq!(err.kind, instrumentkit_types::ErrorKind::Validation);
    }

    #[test]
    fn get_on_unknown_parameter_is_not_found() {
        let node = Node::new();
        let err = node.get(&["missing"]).unwrap_err();
        assert_eq!(err.kind, instrumentkit_types::ErrorKind::NotFound);
    }

    #[test]
    fn add_parameter_creates_intermediate_submodules() {
        let node = Node::new();
        node.add_parameter(&["qubit", "pi", "length"], Parameter::new(ValueKind::Integer, "ns", ValidatorSpec::None, ParamValue::Integer(0)))
            .unwrap();
        node.set(&["qubit", "pi", "length"], ParamValue::Integer(40)).unwrap();
        assert_eq!(node.get(&["qubit", "pi", "length"]).unwrap(), ParamValue::Integer(40));
    }

    #[test]
    fn remove_parameter_makes_subsequent_get_not_found() {
        let node = Node::new();
        node.add_parameter(&["qubit", "pi", "length"], Parameter::new(ValueKind::Integer, "ns", ValidatorSpec::None, ParamValue::Integer(40)))
            .unwrap();
        node.remove_parameter(&["qubit", "pi", "length"]).unwrap();
        let err = node.get(&["qubit", "pi", "length"]).unwrap_err();
        assert_eq!(err.kind, instrumentkit_types::ErrorKind::NotFound);
    }

    #[test]
    fn call_rejects_wrong_arity() {
        let node = Node::new().with_method(
            "reset",
            Method {
                positional: vec!["level".to_string()],
                keywords: vec![],
                return_type: "null".to_string(),
                handler: Box::new(|_args, _kwargs| Ok(Value::Null)),
            },
        );
        let err = node.call(&[], "reset", &[], &BTreeMap::new()).unwrap_err();
        assert_eq!(err.kind, instrumentkit_types::ErrorKind::Validation);
        node.call(&[], "reset", &[Value::from(1)], &BTreeMap::new()).unwrap();
    }

    #[test]
    fn call_rejects_unknown_keyword() {
        let node = Node::new().with_method(
            "reset",
            Method {
                positional: vec![],
                keywords: vec!["hard".to_string()],
                return_type: "null".to_string(),
                handler: Box::new(|_args, _kwargs| Ok(Value::Null)),
            },
        );
        let mut kwargs = BTreeMap::new();
        kwargs.insert("soft".to_string(), Value::from(true));
        let err = node.call(&[], "reset", &[], &kwargs).unwrap_err();
        assert_eq!(err.kind, instrumentkit_types::ErrorKind::Validation);
    }

    #[test]
    fn snapshot_flattens_nested_parameters() {
        let node = Node::new().with_parameter("voltage", voltage_param()).with_submodule(
            "pi",
            Node::new().with_parameter("length", Parameter::new(ValueKind::Integer, "ns", ValidatorSpec::None, ParamValue::Integer(40))),
        );
        let mut out = BTreeMap::new();
        node.snapshot_into("", &mut out);
        assert_eq!(out.get("voltage"), Some(&ParamValue::Float(0.0)));
        assert_eq!(out.get("pi.length"), Some(&ParamValue::Integer(40)));
    }
}
