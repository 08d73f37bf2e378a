//! Audio units: instrument-like groupings of processors.
//!
//! An audio unit owns a slice of the device graph (its processors) and a
//! set of declared control variables that events can drive. Channels bind
//! to audio units through their input selector.

use crate::error::KunquatError;
use crate::events::{Value, ValueType};
use crate::limits::{AUDIO_UNITS_MAX, NAME_LEN_MAX, PROCESSORS_MAX};
use indexmap::IndexMap;

/// A control variable declaration on an audio unit.
#[derive(Debug, Clone)]
pub struct ControlVarDecl {
    name: String,
    initial: Value,
}

impl ControlVarDecl {
    /// Declare a control variable; the initial value fixes its type and
    /// must be realtime-safe (bool, int or float).
    pub fn new(name: &str, initial: Value) -> Option<Self> {
        if name.is_empty() || name.len() > NAME_LEN_MAX {
            return None;
        }
        if !ValueType::Realtime.accepts(&initial) {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            initial,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn initial(&self) -> &Value {
        &self.initial
    }
}

/// One audio unit.
#[derive(Debug, Clone, Default)]
pub struct AudioUnit {
    /// Device ids of this unit's processors, in graph order.
    procs: Vec<usize>,
    control_vars: IndexMap<String, ControlVarDecl>,
    /// Hit index -> pitch in cents.
    hits: IndexMap<i64, f64>,
}

impl AudioUnit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_proc(&mut self, device_id: usize) -> Result<(), KunquatError> {
        if self.procs.len() >= PROCESSORS_MAX {
            return Err(KunquatError::Format(
                "too many processors in audio unit".to_string(),
            ));
        }
        self.procs.push(device_id);
        Ok(())
    }

    pub fn procs(&self) -> &[usize] {
        &self.procs
    }

    pub fn declare_control_var(&mut self, decl: ControlVarDecl) -> bool {
        if self.control_vars.contains_key(decl.name()) {
            return false;
        }
        self.control_vars.insert(decl.name().to_string(), decl);
        true
    }

    pub fn control_var(&self, name: &str) -> Option<&ControlVarDecl> {
        self.control_vars.get(name)
    }

    pub fn control_vars(&self) -> impl Iterator<Item = &ControlVarDecl> {
        self.control_vars.values()
    }

    pub fn set_hit(&mut self, index: i64, cents: f64) {
        self.hits.insert(index, cents);
    }

    pub fn hit_pitch(&self, index: i64) -> Option<f64> {
        self.hits.get(&index).copied()
    }
}

/// Sparse table of audio units.
#[derive(Debug, Clone, Default)]
pub struct AuTable {
    units: Vec<Option<AudioUnit>>,
}

impl AuTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, index: usize, au: AudioUnit) -> Result<(), KunquatError> {
        if index >= AUDIO_UNITS_MAX {
            return Err(KunquatError::Format(format!(
                "audio unit index {} out of range",
                index
            )));
        }
        if self.units.len() <= index {
            self.units.resize(index + 1, None);
        }
        self.units[index] = Some(au);
        Ok(())
    }

    pub fn get(&self, index: usize) -> Option<&AudioUnit> {
        self.units.get(index).and_then(|slot| slot.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_var_types() {
        assert!(ControlVarDecl::new("cutoff", Value::Float(0.5)).is_some());
        assert!(ControlVarDecl::new("steps", Value::Int(4)).is_some());
        assert!(ControlVarDecl::new("on", Value::Bool(true)).is_some());
        assert!(ControlVarDecl::new("name", Value::String("x".into())).is_none());
        assert!(ControlVarDecl::new("", Value::Int(0)).is_none());
    }

    #[test]
    fn test_duplicate_control_var_rejected() {
        let mut au = AudioUnit::new();
        assert!(au.declare_control_var(ControlVarDecl::new("a", Value::Int(0)).unwrap()));
        assert!(!au.declare_control_var(ControlVarDecl::new("a", Value::Int(1)).unwrap()));
    }

    #[test]
    fn test_hits() {
        let mut au = AudioUnit::new();
        au.set_hit(3, -1200.0);
        assert_eq!(au.hit_pitch(3), Some(-1200.0));
        assert_eq!(au.hit_pitch(4), None);
    }

    #[test]
    fn test_au_table_bounds() {
        let mut table = AuTable::new();
        assert!(table.set(AUDIO_UNITS_MAX, AudioUnit::new()).is_err());
        assert!(table.set(1, AudioUnit::new()).is_ok());
        assert!(table.get(0).is_none());
        assert!(table.get(1).is_some());
    }
}
