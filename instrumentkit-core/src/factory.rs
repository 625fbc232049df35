//! Construction of instruments from a class path.
//!
//! The registry does not know how to build any particular driver; it
//! delegates to a [`Factory`] keyed by class path string, so new drivers can
//! be registered without the registry itself changing.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use crate::dummy::DummyInstrument;
use crate::instrument::{HandlerError, Instrument};
use crate::paramgr::{self, ParameterManager};

type Builder = Box<dyn Fn(&[Value], &BTreeMap<String, Value>) -> Result<Arc<dyn Instrument>, HandlerError> + Send + Sync>;

/// A class-path-keyed registry of instrument constructors.
pub struct Factory {
    builders: BTreeMap<String, Builder>,
}

impl Factory {
    /// A factory pre-loaded with the built-in `t.Dummy` driver and the
    /// parameter manager's class path, so a client can `create_instrument`
    /// additional parameter-manager instances under any name it likes, not
    /// just the default one the server registers at startup.
    pub fn with_builtins() -> Self {
        let mut f = Factory { builders: BTreeMap::new() };
        f.register("t.Dummy", |_args, _kwargs| Ok(Arc::new(DummyInstrument::new()) as Arc<dyn Instrument>));
        f.register(paramgr::CLASS_PATH, |_args, _kwargs| Ok(Arc::new(ParameterManager::new()) as Arc<dyn Instrument>));
        f
    }

    pub fn register<F>(&mut self, class_path: impl Into<String>, builder: F)
    where
        F: Fn(&[Value], &BTreeMap<String, Value>) -> Result<Arc<dyn Instrument>, HandlerError> + Send + Sync + 'static,
    {
        self.builders.insert(class_path.into(), Box::new(builder));
    }

    pub fn build(&self, class_path: &str, args: &[Value], kwargs: &BTreeMap<String, Value>) -> Result<Arc<dyn Instrument>, HandlerError> {
        let builder = self
            .builders
            .get(class_path)
            .ok_or_else(|| HandlerError::not_found(format!("no factory registered for class path `{class_path}`")))?;
        builder(args, kwargs)
    }
}

impl Default for Factory {
    fn default() -> Self {
        Factory::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_the_builtin_dummy() {
        let factory = Factory::with_builtins();
        let inst = factory.build("t.Dummy", &[], &BTreeMap::new()).unwrap();
        assert_eq!(inst.class_path(), "t.Dummy");
    }

    #[test]
    fn unknown_class_path_is_not_found() {
        let factory = Factory::with_builtins();
        let err = factory.build("t.NoSuchDriver", &[], &BTreeMap::new()).unwrap_err();
        assert_eq!(err.kind, instrumentkit_types::ErrorKind::NotFound);
    }
}
