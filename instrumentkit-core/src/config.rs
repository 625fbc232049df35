//! Startup configuration: a YAML file naming pre-loaded instruments and
//! networking overrides.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::error::CoreError;
use crate::registry::Registry;

#[derive(Debug, Clone, Deserialize)]
pub struct InstrumentConfig {
    #[serde(rename = "type")]
    pub class_path: String,
    #[serde(default)]
    pub initialize: bool,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub init: BTreeMap<String, Value>,
    /// Carried through for the benefit of drivers that poll; the dispatcher
    /// itself has no polling loop of its own.
    #[serde(default, rename = "pollingRate")]
    pub polling_rate: BTreeMap<String, Value>,
    /// GUI hints for an external front-end; this server never acts on them.
    #[serde(default)]
    pub gui: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NetworkingConfig {
    #[serde(default, rename = "listeningAddress")]
    pub listening_address: Option<String>,
    #[serde(default, rename = "externalBroadcast")]
    pub external_broadcast: Option<bool>,
    /// Explicit broadcast-port override; defaults to the primary port + 1
    /// when absent.
    #[serde(default, rename = "broadcastPort")]
    pub broadcast_port: Option<u16>,
}

/// Startup options for the parameter-manager's default instance, read from
/// the same config file rather than requiring a separate flag.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParameterManagerConfig {
    #[serde(default)]
    pub profile: Option<std::path::PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StartupConfig {
    #[serde(default)]
    pub instruments: BTreeMap<String, InstrumentConfig>,
    #[serde(default)]
    pub networking: Option<NetworkingConfig>,
    #[serde(default, rename = "parameterManager")]
    pub parameter_manager: Option<ParameterManagerConfig>,
}

impl StartupConfig {
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let text = fs::read_to_string(path)?;
        let cfg: StartupConfig = serde_yaml::from_str(&text)?;
        Ok(cfg)
    }

    /// Instantiate every configured instrument into `registry`, skipping
    /// entries with `initialize: false`.
    pub fn apply(&self, registry: &Registry) -> Result<(), CoreError> {
        for (name, cfg) in &self.instruments {
            if !cfg.initialize {
                continue;
            }
            let kwargs: BTreeMap<String, Value> = cfg.init.clone();
            registry
                .create(name, &cfg.class_path, &[], &kwargs, false)
                .map_err(|e| CoreError::Config(format!("failed to create `{name}`: {e}")))?;
        }
        Ok(())
    }
}
