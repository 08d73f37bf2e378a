//! Module environment variables.
//!
//! A module declares named variables with a fixed type and an initial
//! value. Playback owns a shadow [`EnvState`] so that event-driven writes
//! never touch the immutable declarations and a playback reset restores
//! the initial values.

use crate::events::{Value, ValueType};
use crate::limits::NAME_LEN_MAX;
use indexmap::IndexMap;
use serde::Serialize;

/// One declared environment variable.
#[derive(Debug, Clone, Serialize)]
pub struct EnvVar {
    name: String,
    initial: Value,
}

impl EnvVar {
    /// Declare a variable. Only bool, int, float and timestamp types are
    /// allowed.
    pub fn new(name: &str, initial: Value) -> Option<Self> {
        if name.is_empty() || name.len() > NAME_LEN_MAX {
            return None;
        }
        match initial.type_of() {
            ValueType::Bool | ValueType::Int | ValueType::Float | ValueType::Tstamp => {
                Some(Self {
                    name: name.to_string(),
                    initial,
                })
            }
            _ => None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_of(&self) -> ValueType {
        self.initial.type_of()
    }

    pub fn initial(&self) -> &Value {
        &self.initial
    }
}

/// The immutable set of declarations owned by a module.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: IndexMap<String, EnvVar>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a declaration. Fails on duplicate names.
    pub fn declare(&mut self, var: EnvVar) -> bool {
        if self.vars.contains_key(var.name()) {
            return false;
        }
        self.vars.insert(var.name().to_string(), var);
        true
    }

    pub fn get(&self, name: &str) -> Option<&EnvVar> {
        self.vars.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EnvVar> {
        self.vars.values()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// The per-playback view of the environment.
#[derive(Debug, Clone, Default)]
pub struct EnvState {
    values: IndexMap<String, Value>,
}

impl EnvState {
    /// Build the shadow state from the declarations.
    pub fn from_environment(env: &Environment) -> Self {
        let mut state = Self::default();
        state.reset(env);
        state
    }

    /// Restore every variable to its declared initial value.
    pub fn reset(&mut self, env: &Environment) {
        self.values.clear();
        for var in env.iter() {
            self.values
                .insert(var.name().to_string(), var.initial().clone());
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Write a variable. The write is ignored when the name is unknown and
    /// rejected when the type does not match the declaration.
    ///
    /// Returns `false` only for a type mismatch.
    pub fn set(&mut self, name: &str, value: Value) -> bool {
        match self.values.get_mut(name) {
            Some(slot) => {
                if slot.type_of() != value.type_of() {
                    return false;
                }
                *slot = value;
                true
            }
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tstamp::Tstamp;

    #[test]
    fn test_declare_rejects_duplicates() {
        let mut env = Environment::new();
        assert!(env.declare(EnvVar::new("vol", Value::Float(0.0)).unwrap()));
        assert!(!env.declare(EnvVar::new("vol", Value::Float(1.0)).unwrap()));
        assert_eq!(env.len(), 1);
    }

    #[test]
    fn test_declare_rejects_bad_types() {
        assert!(EnvVar::new("s", Value::String("x".into())).is_none());
        assert!(EnvVar::new("n", Value::None).is_none());
        assert!(EnvVar::new("ts", Value::Tstamp(Tstamp::zero())).is_some());
    }

    #[test]
    fn test_state_resets_to_initial() {
        let mut env = Environment::new();
        env.declare(EnvVar::new("count", Value::Int(3)).unwrap());
        let mut state = EnvState::from_environment(&env);

        assert!(state.set("count", Value::Int(10)));
        assert_eq!(state.get("count"), Some(&Value::Int(10)));

        state.reset(&env);
        assert_eq!(state.get("count"), Some(&Value::Int(3)));
    }

    #[test]
    fn test_set_type_mismatch_is_rejected() {
        let mut env = Environment::new();
        env.declare(EnvVar::new("flag", Value::Bool(false)).unwrap());
        let mut state = EnvState::from_environment(&env);

        assert!(!state.set("flag", Value::Int(1)));
        assert_eq!(state.get("flag"), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_unknown_name_is_silently_ignored() {
        let env = Environment::new();
        let mut state = EnvState::from_environment(&env);
        assert!(state.set("missing", Value::Int(1)));
        assert_eq!(state.get("missing"), None);
    }
}
