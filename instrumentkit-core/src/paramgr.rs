//! The parameter manager: a virtual instrument for ad hoc, runtime-declared
//! parameters, registered under a default name.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::RwLock;

use instrumentkit_types::{InstrumentBlueprint, ParamValue, ValidatorSpec};
use serde_json::Value;

use crate::error::CoreError;
use crate::instrument::{HandlerError, Instrument};
use crate::node::{Node, Parameter};
use crate::profile;

pub const DEFAULT_NAME: &str = "parameter_manager";
pub const CLASS_PATH: &str = "instrumentkit.ParameterManager";

pub struct ParameterManager {
    root: Node,
    /// Units by dotted path, tracked alongside `Node` (which doesn't expose
    /// per-parameter metadata queries) so `save` can round-trip units.
    units: RwLock<BTreeMap<String, String>>,
}

impl ParameterManager {
    pub fn new() -> Self {
        ParameterManager { root: Node::new(), units: RwLock::new(BTreeMap::new()) }
    }

    /// `add_parameter(path, initial_value, unit, validator_spec)`. Creates
    /// any missing intermediate sub-modules implied by `path`'s dots.
    pub fn add_parameter(&self, path: &str, initial_value: ParamValue, unit: &str, validator: ValidatorSpec) -> Result<(), HandlerError> {
        let segs: Vec<&str> = path.split('.').collect();
        let kind = initial_value.kind();
        let param = Parameter::new(kind, unit, validator, initial_value);
        self.root.add_parameter(&segs, param)?;
        self.units.write().expect("poisoned").insert(path.to_string(), unit.to_string());
        Ok(())
    }

    pub fn remove_parameter(&self, path: &str) -> Result<(), HandlerError> {
        let segs: Vec<&str> = path.split('.').collect();
        self.root.remove_parameter(&segs)?;
        self.units.write().expect("poisoned").remove(path);
        Ok(())
    }

    pub fn load_profile(&self, path: &Path) -> Result<(), CoreError> {
        let entries = profile::load(path)?;
        for (dotted_path, (value, unit)) in entries {
            let unit = unit.unwrap_or_default();
            let _ = self.add_parameter(&dotted_path, value, &unit, ValidatorSpec::None);
        }
        Ok(())
    }

    pub fn save_profile(&self, path: &Path) -> Result<(), CoreError> {
        let snapshot = self.snapshot();
        let units = self.units.read().expect("poisoned");
        let entries: BTreeMap<String, (ParamValue, String)> = snapshot
            .into_iter()
            .map(|(path, value)| {
                let unit = units.get(&path).cloned().unwrap_or_default();
                (path, (value, unit))
            })
            .collect();
        profile::save(path, &entries)
    }
}

impl Default for ParameterManager {
    fn default() -> Self {
        ParameterManager::new()
    }
}

impl Instrument for ParameterManager {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn class_path(&self) -> &str {
        CLASS_PATH
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
