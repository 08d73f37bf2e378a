//! Typed event argument values.

use crate::tstamp::Tstamp;
use serde::de::{SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// The argument type an event accepts.
///
/// `Realtime` is a type class, not a concrete value shape: it accepts any
/// of bool, int and float, and is used by control-variable paths that must
/// stay cheap to route while rendering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueType {
    None,
    Bool,
    Int,
    Float,
    Tstamp,
    String,
    Realtime,
}

impl ValueType {
    /// Whether a concrete value is acceptable as this argument type.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            ValueType::None => matches!(value, Value::None),
            ValueType::Bool => matches!(value, Value::Bool(_)),
            ValueType::Int => matches!(value, Value::Int(_)),
            ValueType::Float => matches!(value, Value::Float(_)),
            ValueType::Tstamp => matches!(value, Value::Tstamp(_)),
            ValueType::String => matches!(value, Value::String(_)),
            ValueType::Realtime => {
                matches!(value, Value::Bool(_) | Value::Int(_) | Value::Float(_))
            }
        }
    }
}

/// A concrete event argument.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Tstamp(Tstamp),
    String(String),
}

impl Value {
    /// The concrete type of this value.
    pub fn type_of(&self) -> ValueType {
        match self {
            Value::None => ValueType::None,
            Value::Bool(_) => ValueType::Bool,
            Value::Int(_) => ValueType::Int,
            Value::Float(_) => ValueType::Float,
            Value::Tstamp(_) => ValueType::Tstamp,
            Value::String(_) => ValueType::String,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view: floats directly, ints widened.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_tstamp(&self) -> Option<Tstamp> {
        match self {
            Value::Tstamp(ts) => Some(*ts),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::Tstamp(ts) => write!(f, "{}", ts),
            Value::String(s) => write!(f, "{:?}", s),
        }
    }
}

// Wire form: null, bool, integer, number, string or [beats, rem].

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::None => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(v) => serializer.serialize_f64(*v),
            Value::Tstamp(ts) => ts.serialize(serializer),
            Value::String(s) => serializer.serialize_str(s),
        }
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("null, bool, integer, number, string or [beats, rem]")
    }

    fn visit_unit<E>(self) -> Result<Value, E> {
        Ok(Value::None)
    }

    fn visit_none<E>(self) -> Result<Value, E> {
        Ok(Value::None)
    }

    fn visit_bool<E>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Value, E> {
        Ok(Value::Int(v))
    }

    fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Value, E> {
        i64::try_from(v)
            .map(Value::Int)
            .map_err(|_| E::custom("integer out of range"))
    }

    fn visit_f64<E>(self, v: f64) -> Result<Value, E> {
        Ok(Value::Float(v))
    }

    fn visit_str<E>(self, v: &str) -> Result<Value, E> {
        Ok(Value::String(v.to_string()))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let beats: i64 = seq
            .next_element()?
            .ok_or_else(|| serde::de::Error::invalid_length(0, &self))?;
        let rem: i32 = seq
            .next_element()?
            .ok_or_else(|| serde::de::Error::invalid_length(1, &self))?;
        if !(0..crate::tstamp::BEAT).contains(&rem) {
            return Err(serde::de::Error::custom("timestamp remainder out of range"));
        }
        Ok(Value::Tstamp(Tstamp::new(beats, rem)))
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_shapes() {
        assert_eq!(serde_json::to_string(&Value::None).unwrap(), "null");
        assert_eq!(serde_json::to_string(&Value::Bool(true)).unwrap(), "true");
        assert_eq!(serde_json::to_string(&Value::Int(-3)).unwrap(), "-3");
        assert_eq!(serde_json::to_string(&Value::Float(1.5)).unwrap(), "1.5");
        assert_eq!(
            serde_json::to_string(&Value::Tstamp(Tstamp::new(2, 7))).unwrap(),
            "[2,7]"
        );
        assert_eq!(
            serde_json::to_string(&Value::String("n+\"".to_string())).unwrap(),
            r#""n+\"""#
        );
    }

    #[test]
    fn test_round_trip_every_type() {
        let values = [
            Value::None,
            Value::Bool(false),
            Value::Int(1 << 40),
            Value::Float(-0.25),
            Value::Tstamp(Tstamp::new(0, 36_756_720)),
            Value::String("arp".to_string()),
        ];
        for value in values {
            let json = serde_json::to_string(&value).unwrap();
            let back: Value = serde_json::from_str(&json).unwrap();
            assert_eq!(back, value);
        }
    }

    #[test]
    fn test_realtime_accepts_numeric_and_bool() {
        assert!(ValueType::Realtime.accepts(&Value::Bool(true)));
        assert!(ValueType::Realtime.accepts(&Value::Int(4)));
        assert!(ValueType::Realtime.accepts(&Value::Float(0.5)));
        assert!(!ValueType::Realtime.accepts(&Value::String("x".into())));
        assert!(!ValueType::Realtime.accepts(&Value::None));
    }

    #[test]
    fn test_as_float_widens_int() {
        assert_eq!(Value::Int(3).as_float(), Some(3.0));
        assert_eq!(Value::Float(0.5).as_float(), Some(0.5));
        assert_eq!(Value::None.as_float(), None);
    }
}
