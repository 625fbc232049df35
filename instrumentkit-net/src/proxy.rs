//! Client-side proxy tree: a local mirror of a server instrument's shape,
//! built once from a [`InstrumentBlueprint`].
//!
//! Proxies cache metadata only — unit, validator, readable/settable — never
//! values; every `get`/`set`/`call` round-trips to the server.

use std::collections::BTreeMap;

use instrumentkit_types::{InstrumentBlueprint, Instruction, Operation, ParamValue, ValidatorSpec};
use serde_json::Value;

use crate::client::Client;
use crate::error::ClientError;

pub struct ParameterProxy {
    instrument: String,
    submodule_path: Vec<String>,
    name: String,
    pub unit: String,
    pub validator: ValidatorSpec,
    pub readable: bool,
    pub settable: bool,
}

impl ParameterProxy {
    pub fn get(&self, client: &mut Client) -> Result<ParamValue, ClientError> {
        let mut instr = Instruction::new(Operation::Get).with_target(self.instrument.as_str()).with_name(self.name.as_str());
        instr.path = path_string(&self.submodule_path);
        match client.ask(instr)? {
            instrumentkit_types::Response::Ok { value: Some(v) } => Ok(v.into()),
            instrumentkit_types::Response::Ok { value: None } => {
                Err(ClientError::Remote { kind: instrumentkit_types::ErrorKind::Internal, message: "get returned no value".into() })
            }
            instrumentkit_types::Response::Err { error } => Err(ClientError::Remote { kind: error.kind, message: error.message }),
        }
    }

    pub fn set(&self, client: &mut Client, value: ParamValue) -> Result<(), ClientError> {
        let mut instr = Instruction::new(Operation::Set).with_target(self.instrument.as_str()).with_name(self.name.as_str()).with_value(value.into());
        instr.path = path_string(&self.submodule_path);
        match client.ask(instr)? {
            instrumentkit_types::Response::Ok { .. } => Ok(()),
            instrumentkit_types::Response::Err { error } => Err(ClientError::Remote { kind: error.kind, message: error.message }),
        }
    }
}

pub struct MethodProxy {
    instrument: String,
    submodule_path: Vec<String>,
    name: String,
    pub positional: Vec<String>,
    pub keywords: Vec<String>,
    pub return_type: String,
}

impl MethodProxy {
    pub fn call(&self, client: &mut Client, args: Vec<Value>, kwargs: BTreeMap<String, Value>) -> Result<Value, ClientError> {
        let mut instr = Instruction::new(Operation::Call).with_target(self.instrument.as_str()).with_name(self.name.as_str()).with_args(args);
        instr.path = path_string(&self.submodule_path);
        instr.kwargs = Some(kwargs);
        match client.ask(instr)? {
            instrumentkit_types::Response::Ok { value } => Ok(value.unwrap_or(Value::Null)),
            instrumentkit_types::Response::Err { error } => Err(ClientError::Remote { kind: error.kind, message: error.message }),
        }
    }
}

pub struct InstrumentProxy {
    pub name: String,
    pub class_path: String,
    pub parameters: BTreeMap<String, ParameterProxy>,
    pub methods: BTreeMap<String, MethodProxy>,
    pub submodules: BTreeMap<String, InstrumentProxy>,
}

impl InstrumentProxy {
    pub fn from_blueprint(blueprint: &InstrumentBlueprint) -> Self {
        build(blueprint, &blueprint.name, Vec::new())
    }
}

fn build(blueprint: &InstrumentBlueprint, instrument: &str, submodule_path: Vec<String>) -> InstrumentProxy {
    let parameters = blueprint
        .parameters
        .iter()
        .map(|p| {
            (
                p.path.clone(),
                ParameterProxy {
                    instrument: instrument.to_string(),
                    submodule_path: submodule_path.clone(),
                    name: p.path.clone(),
                    unit: p.unit.clone(),
                    validator: p.validator.clone(),
                    readable: p.readable,
                    settable: p.settable,
                },
            )
        })
        .collect();

    let methods = blueprint
        .methods
        .iter()
        .map(|m| {
            (
                m.name.clone(),
                MethodProxy {
                    instrument: instrument.to_string(),
                    submodule_path: submodule_path.clone(),
                    name: m.name.clone(),
                    positional: m.positional.clone(),
                    keywords: m.keywords.clone(),
                    return_type: m.return_type.clone(),
                },
            )
        })
        .collect();

    let submodules = blueprint
        .submodules
        .iter()
        .map(|sub| {
            let mut nested_path = submodule_path.clone();
            nested_path.push(sub.name.clone());
            (sub.name.clone(), build(sub, instrument, nested_path))
        })
        .collect();

    InstrumentProxy { name: blueprint.name.clone(), class_path: blueprint.class_path.clone(), parameters, methods, submodules }
}

fn path_string(segs: &[String]) -> Option<String> {
    if segs.is_empty() {
        None
    } else {
        Some(segs.join("."))
    }
}
