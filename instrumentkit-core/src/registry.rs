//! The instrument registry: a name-keyed map of live instruments, each
//! guarded by its own lock, distinct from the registry's own lock over the
//! map itself.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use serde_json::Value;

use crate::factory::Factory;
use crate::instrument::{HandlerError, Instrument};

/// The live instrument set.
///
/// `instruments` and `locks` are maintained as two maps with identical key
/// sets at every point observable from outside `create`/`close` — inside
/// those two operations the sets may transiently diverge by exactly the key
/// being inserted or removed.
pub struct Registry {
    instruments: RwLock<HashMap<String, Arc<dyn Instrument>>>,
    locks: RwLock<HashMap<String, Arc<Mutex<()>>>>,
    factory: Factory,
}

impl Registry {
    pub fn new(factory: Factory) -> Self {
        Registry {
            instruments: RwLock::new(HashMap::new()),
            locks: RwLock::new(HashMap::new()),
            factory,
        }
    }

    pub fn with_builtins() -> Self {
        Registry::new(Factory::with_builtins())
    }

    pub fn factory_mut(&mut self) -> &mut Factory {
        &mut self.factory
    }

    /// Names of every registered instrument, in no particular order (callers
    /// that need determinism sort the result themselves).
    pub fn list(&self) -> Vec<String> {
        self.instruments.read().expect("poisoned").keys().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Instrument>> {
        self.instruments.read().expect("poisoned").get(name).cloned()
    }

    /// Acquire the named instrument's lock for the duration of `f`, then run
    /// `f` against the locked instrument and release the lock before
    /// returning. This is the only way callers touch an instrument's lock —
    /// keeping acquire/use/release in one call avoids a self-referential
    /// guard type over the `Arc<Mutex<()>>` housed in `locks`.
    pub fn with_locked<T>(&self, name: &str, f: impl FnOnce(&Arc<dyn Instrument>) -> T) -> Result<T, HandlerError> {
        let instrument = self
            .get(name)
            .ok_or_else(|| HandlerError::not_found(format!("no such instrument `{name}`")))?;
        let lock = self
            .locks
            .read()
            .expect("poisoned")
            .get(name)
            .cloned()
            .ok_or_else(|| HandlerError::not_found(format!("no such instrument `{name}`")))?;
        let _guard = lock.lock().expect("poisoned");
        Ok(f(&instrument))
    }

    /// Register `instrument` under `name` and create its lock. Registers
    /// the lock before the instrument map entry is observable by the empty
    /// window only inside this function's own critical section.
    fn insert(&self, name: String, instrument: Arc<dyn Instrument>) {
        self.locks.write().expect("poisoned").insert(name.clone(), Arc::new(Mutex::new(())));
        self.instruments.write().expect("poisoned").insert(name, instrument);
    }

    /// `create_instrument`: instantiate by class path and register under
    /// `name`. If `find_or_create` is true and `name` already exists with a
    /// matching class path, succeeds idempotently; a class-path mismatch on
    /// an existing name always fails with `Validation` regardless of
    /// `find_or_create`.
    pub fn create(
        &self,
        name: &str,
        class_path: &str,
        args: &[Value],
        kwargs: &std::collections::BTreeMap<String, Value>,
        find_or_create: bool,
    ) -> Result<Arc<dyn Instrument>, HandlerError> {
        if let Some(existing) = self.get(name) {
            if existing.class_path() == class_path && find_or_create {
                return Ok(existing);
            }
            return Err(HandlerError::validation(format!(
                "instrument `{name}` already exists with class path `{}`",
                existing.class_path()
            )));
        }
        let instrument = self.factory.build(class_path, args, kwargs)?;
        self.insert(name.to_string(), instrument.clone());
        Ok(instrument)
    }

    /// Register an instrument pre-built by the caller (startup config,
    /// parameter manager) under `name`, bypassing the factory.
    pub fn register(&self, name: impl Into<String>, instrument: Arc<dyn Instrument>) {
        self.insert(name.into(), instrument);
    }

    pub fn close(&self, name: &str) -> bool {
        let removed = self.instruments.write().expect("poisoned").remove(name).is_some();
        self.locks.write().expect("poisoned").remove(name);
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn create_then_get_round_trips() {
        let reg = Registry::with_builtins();
        reg.create("dmm", "t.Dummy", &[], &BTreeMap::new(), false).unwrap();
        assert!(reg.get("dmm").is_some());
        assert_eq!(reg.list(), vec!["dmm".to_string()]);
    }

    #[test]
    fn find_or_create_is_idempotent_on_matching_class_path() {
        let reg = Registry::with_builtins();
        reg.create("dmm", "t.Dummy", &[], &BTreeMap::new(), false).unwrap();
        let again = reg.create("dmm", "t.Dummy", &[], &BTreeMap::new(), true);
        assert!(again.is_ok());
    }

    #[test]
    fn create_with_conflicting_class_path_fails_validation() {
        let reg = Registry::with_builtins();
        reg.create("dmm", "t.Dummy", &[], &BTreeMap::new(), false).unwrap();
        let err = reg.create("dmm", "t.OtherDriver", &[], &BTreeMap::new(), true).unwrap_err();
        assert_eq!(err.kind, instrumentkit_types::ErrorKind::Validation);
    }

    #[test]
    fn close_removes_from_both_maps() {
        let reg = Registry::with_builtins();
        reg.create("dmm", "t.Dummy", &[], &BTreeMap::new(), false).unwrap();
        assert!(reg.close("dmm"));
        assert!(reg.get("dmm").is_none());
        assert!(reg.with_locked("dmm", |_| ()).is_err());
    }

    #[test]
    fn with_locked_sees_effects_of_a_prior_call() {
        let reg = Arc::new(Registry::with_builtins());
        reg.create("dmm", "t.Dummy", &[], &BTreeMap::new(), false).unwrap();
        reg.with_locked("dmm", |inst| inst.set(&["voltage"], instrumentkit_types::ParamValue::Float(1.0)).unwrap())
            .unwrap();
        let seen = reg
            .with_locked("dmm", |inst| inst.get(&["voltage"]).unwrap())
            .unwrap();
        assert_eq!(seen, instrumentkit_types::ParamValue::Float(1.0));
    }
}
