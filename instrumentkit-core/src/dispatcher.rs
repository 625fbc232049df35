//! The dispatcher: decodes an [`Instruction`], resolves the target's lock,
//! runs the handler, and encodes a [`Response`].

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;

use instrumentkit_types::{ErrorKind, Instruction, Operation, ParamValue, Response, ValidatorSpec};
use serde_json::Value;

use crate::broadcast::BroadcastBus;
use crate::instrument::HandlerError;
use crate::paramgr::ParameterManager;
use crate::registry::Registry;

pub struct Dispatcher {
    registry: Arc<Registry>,
    bus: Arc<BroadcastBus>,
}

/// Run `f` (a single call into instrument-supplied code) and turn a panic
/// into an `Internal` error rather than letting it unwind past the worker
/// thread and take the dispatcher down with it.
fn guarded<T>(f: impl FnOnce() -> Result<T, HandlerError>) -> Result<T, HandlerError> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "instrument code panicked".to_string());
            log::error!("instrument handler panicked: {message}");
            Err(HandlerError::new(ErrorKind::Internal, message))
        }
    }
}

impl Dispatcher {
    pub fn new(registry: Arc<Registry>, bus: Arc<BroadcastBus>) -> Self {
        Dispatcher { registry, bus }
    }

    pub fn dispatch(&self, instruction: &Instruction) -> Response {
        match self.handle(instruction) {
            Ok(value) => Response::Ok { value },
            Err(e) => Response::err(e.kind, e.message),
        }
    }

    fn handle(&self, instr: &Instruction) -> Result<Option<Value>, HandlerError> {
        match instr.operation {
            Operation::ListInstruments => {
                let mut names = self.registry.list();
                names.sort();
                Ok(Some(serde_json::json!(names)))
            }
            Operation::GetBlueprint => {
                let target = require_target(instr)?;
                let blueprint = self
                    .registry
                    .with_locked(target, |inst| inst.describe(target))?;
                Ok(Some(serde_json::to_value(blueprint).expect("blueprint always serializes")))
            }
            Operation::Get => {
                let target = require_target(instr)?;
                let segs = leaf_path(instr)?;
                let refs: Vec<&str> = segs.iter().map(String::as_str).collect();
                let value = self.registry.with_locked(target, |inst| guarded(|| inst.get(&refs)))??;
                Ok(Some(value.into()))
            }
            Operation::Set => {
                let target = require_target(instr)?;
                let segs = leaf_path(instr)?;
                let refs: Vec<&str> = segs.iter().map(String::as_str).collect();
                let raw = instr.value.clone().ok_or_else(|| HandlerError::new(ErrorKind::ProtocolError, "`set` requires a `value`"))?;
                let value: ParamValue = raw.into();
                let topic = format!("{target}.{}", segs.join("."));
                self.registry.with_locked(target, |inst| -> Result<(), HandlerError> {
                    guarded(|| inst.set(&refs, value.clone()))?;
                    self.bus.publish(&topic, value.clone(), "");
                    Ok(())
                })??;
                Ok(None)
            }
            Operation::Call => {
                let target = require_target(instr)?;
                let method_name = instr
                    .name
                    .as_deref()
                    .ok_or_else(|| HandlerError::new(ErrorKind::ProtocolError, "`call` requires a `name`"))?;
                let segs: Vec<String> = instr.path.as_deref().map(split_path).unwrap_or_default();
                let refs: Vec<&str> = segs.iter().map(String::as_str).collect();
                let args = instr.args.clone().unwrap_or_default();
                let kwargs = instr.kwargs.clone().unwrap_or_default();
                let result = self
                    .registry
                    .with_locked(target, |inst| guarded(|| inst.call(&refs, method_name, &args, &kwargs)))??;
                Ok(Some(result))
            }
            Operation::CreateInstrument => {
                let target = require_target(instr)?;
                let class_path = instr
                    .name
                    .as_deref()
                    .ok_or_else(|| HandlerError::new(ErrorKind::ProtocolError, "`create_instrument` requires a `name` (class path)"))?;
                let args = instr.args.clone().unwrap_or_default();
                let kwargs = instr.kwargs.clone().unwrap_or_default();
                let find_or_create = kwargs.get("find_or_create").and_then(Value::as_bool).unwrap_or(false);
                self.registry.create(target, class_path, &args, &kwargs, find_or_create)?;
                Ok(None)
            }
            Operation::Snapshot => {
                let target = require_target(instr)?;
                let snapshot = self.registry.with_locked(target, |inst| inst.snapshot())?;
                let as_json: BTreeMap<String, Value> = snapshot.into_iter().map(|(k, v)| (k, v.into())).collect();
                Ok(Some(serde_json::json!(as_json)))
            }
            Operation::AddParameter => {
                let target = require_target(instr)?;
                let path = instr
                    .path
                    .as_deref()
                    .ok_or_else(|| HandlerError::new(ErrorKind::ProtocolError, "`add_parameter` requires a `path`"))?;
                let raw = instr.value.clone().ok_or_else(|| HandlerError::new(ErrorKind::ProtocolError, "`add_parameter` requires a `value`"))?;
                let value: ParamValue = raw.into();
                let unit = instr.kwargs.as_ref().and_then(|k| k.get("unit")).and_then(Value::as_str).unwrap_or("").to_string();
                let validator = instr
                    .kwargs
                    .as_ref()
                    .and_then(|k| k.get("validator"))
                    .map(|v| serde_json::from_value::<ValidatorSpec>(v.clone()))
                    .transpose()
                    .map_err(|e| HandlerError::new(ErrorKind::ProtocolError, format!("invalid validator: {e}")))?
                    .unwrap_or(ValidatorSpec::None);

                self.registry.with_locked(target, |inst| -> Result<(), HandlerError> {
                    with_param_manager(inst, |mgr| mgr.add_parameter(path, value.clone(), &unit, validator.clone()))?;
                    self.bus.publish(&format!("{target}.{path}"), ParamValue::Bool(true), "structural");
                    Ok(())
                })??;
                Ok(None)
            }
            Operation::RemoveParameter => {
                let target = require_target(instr)?;
                let path = instr
                    .path
                    .as_deref()
                    .ok_or_else(|| HandlerError::new(ErrorKind::ProtocolError, "`remove_parameter` requires a `path`"))?;
                self.registry.with_locked(target, |inst| -> Result<(), HandlerError> {
                    with_param_manager(inst, |mgr| mgr.remove_parameter(path))?;
                    self.bus.publish(&format!("{target}.{path}"), ParamValue::Bool(false), "structural");
                    Ok(())
                })??;
                Ok(None)
            }
            Operation::Save => {
                let target = require_target(instr)?;
                let path_str = instr
                    .kwargs
                    .as_ref()
                    .and_then(|k| k.get("path"))
                    .and_then(Value::as_str)
                    .ok_or_else(|| HandlerError::new(ErrorKind::ProtocolError, "`save` requires a `path` kwarg"))?;
                let path = Path::new(path_str);
                self.registry
                    .with_locked(target, |inst| {
                        with_param_manager(inst, |mgr| {
                            mgr.save_profile(path).map_err(|e| HandlerError::instrument_failure(e.to_string()))
                        })
                    })??;
                Ok(None)
            }
        }
    }
}

fn require_target(instr: &Instruction) -> Result<&str, HandlerError> {
    instr
        .target
        .as_deref()
        .ok_or_else(|| HandlerError::new(ErrorKind::ProtocolError, "instruction requires a `target`"))
}

fn split_path(path: &str) -> Vec<String> {
    path.split('.').map(str::to_string).collect()
}

/// Combine `instr.path` (sub-module segments) and `instr.name` (leaf
/// parameter name) into the full navigation path for `get`/`set`.
fn leaf_path(instr: &Instruction) -> Result<Vec<String>, HandlerError> {
    let name = instr
        .name
        .as_deref()
        .ok_or_else(|| HandlerError::new(ErrorKind::ProtocolError, "instruction requires a `name`"))?;
    let mut segs: Vec<String> = instr.path.as_deref().map(split_path).unwrap_or_default();
    segs.push(name.to_string());
    Ok(segs)
}

fn with_param_manager<T>(
    inst: &Arc<dyn crate::instrument::Instrument>,
    f: impl FnOnce(&ParameterManager) -> Result<T, HandlerError>,
) -> Result<T, HandlerError> {
    let mgr = inst
        .as_any()
        .downcast_ref::<ParameterManager>()
        .ok_or_else(|| HandlerError::unsupported("target is not a parameter manager"))?;
    f(mgr)
}
