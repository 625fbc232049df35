//! The named-predicate registry backing `ValidatorSpec::Predicate`.
//!
//! Validators must round-trip through JSON (a profile is just a JSON file),
//! so a `Predicate` variant can only ever carry a name, never a closure.
//! This registry is the other half: a string-keyed table of predicates a
//! name can resolve to, the same shape [`crate::factory::Factory`] uses for
//! class-path-keyed instrument constructors.

use std::collections::BTreeMap;

use instrumentkit_types::ParamValue;

type Predicate = Box<dyn Fn(&ParamValue) -> bool + Send + Sync>;

pub struct PredicateRegistry {
    predicates: BTreeMap<String, Predicate>,
}

impl PredicateRegistry {
    /// A registry pre-loaded with the handful of predicates generic enough
    /// to be useful across arbitrary instrument drivers.
    pub fn with_builtins() -> Self {
        let mut r = PredicateRegistry { predicates: BTreeMap::new() };
        r.register("even", |v| matches!(v, ParamValue::Integer(i) if i % 2 == 0));
        r.register("odd", |v| matches!(v, ParamValue::Integer(i) if i % 2 != 0));
        r.register("positive", |v| v.as_f64().is_some_and(|f| f > 0.0));
        r.register("non_negative", |v| v.as_f64().is_some_and(|f| f >= 0.0));
        r.register("non_empty", |v| matches!(v, ParamValue::String(s) if !s.is_empty()));
        r
    }

    pub fn register<F>(&mut self, name: impl Into<String>, predicate: F)
    where
        F: Fn(&ParamValue) -> bool + Send + Sync + 'static,
    {
        self.predicates.insert(name.into(), Box::new(predicate));
    }

    /// Resolve `name` against `value`; an unregistered name always rejects,
    /// same as an out-of-range value against a `Range` validator.
    pub fn resolve(&self, name: &str, value: &ParamValue) -> bool {
        match self.predicates.get(name) {
            Some(predicate) => predicate(value),
            None => false,
        }
    }
}

impl Default for PredicateRegistry {
    fn default() -> Self {
        PredicateRegistry::with_builtins()
    }
}
