//! Blueprint types: a transport-safe snapshot of an instrument's tree shape.
//!
//! Blueprints carry paths, not live references, and never carry current
//! values — they describe shape only, so a client can build a faithful
//! local proxy tree from a single `get_blueprint` round-trip.

use serde::{Deserialize, Serialize};

use crate::validator::ValidatorSpec;
use crate::value::ValueKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterBlueprint {
    /// Dotted path relative to the owning instrument, e.g. `"qubit.pi.length"`.
    pub path: String,
    pub kind: ValueKind,
    pub unit: String,
    pub validator: ValidatorSpec,
    pub readable: bool,
    pub settable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodBlueprint {
    pub name: String,
    /// Declared positional parameter names, in call order.
    pub positional: Vec<String>,
    /// Declared keyword-only parameter names.
    pub keywords: Vec<String>,
    pub return_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentBlueprint {
    pub name: String,
    pub class_path: String,
    /// Depth-first, alphabetical within this node.
    pub parameters: Vec<ParameterBlueprint>,
    pub methods: Vec<MethodBlueprint>,
    pub submodules: Vec<InstrumentBlueprint>,
}

impl InstrumentBlueprint {
    /// All parameter paths reachable from this node, `instrument.` prefixed,
    /// depth-first in blueprint order.
    pub fn leaf_paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_leaf_paths(&self.name, &mut out);
        out
    }

    fn collect_leaf_paths(&self, prefix: &str, out: &mut Vec<String>) {
        for p in &self.parameters {
            out.push(format!("{prefix}.{}", p.path));
        }
        for sub in &self.submodules {
            self.collect_submodule_paths(sub, prefix, out);
        }
    }

    fn collect_submodule_paths(&self, sub: &InstrumentBlueprint, prefix: &str, out: &mut Vec<String>) {
        for p in &sub.parameters {
            out.push(format!("{prefix}.{}.{}", sub.name, p.path));
        }
        for nested in &sub.submodules {
            self.collect_submodule_paths(nested, &format!("{prefix}.{}", sub.name), out);
        }
    }
}
