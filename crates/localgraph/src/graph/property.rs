//! Property system for node and relationship metadata.
//!
//! Properties are scalar only. They serialize as plain JSON values so the
//! persisted documents read like a graph database export.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Scalar property value for node/relationship metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// JSON `null`; only ever equal to another null
    Null,
    /// Boolean flag (is_async, is_exported)
    Bool(bool),
    /// Whole number (line numbers)
    Int(i64),
    /// Non-integral number
    Float(f64),
    /// String value (names, paths, project ids)
    String(String),
}

impl PropertyValue {
    /// Human readable name of the variant, used in type mismatch errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::Null => "null",
            PropertyValue::Bool(_) => "boolean",
            PropertyValue::Int(_) => "integer",
            PropertyValue::Float(_) => "float",
            PropertyValue::String(_) => "string",
        }
    }

    /// False for NaN and infinities, which JSON cannot carry.
    pub fn is_finite(&self) -> bool {
        match *self {
            PropertyValue::Float(x) => x.is_finite(),
            _ => true,
        }
    }

    /// Query equality: numbers compare by value across `Int` and `Float`,
    /// and null equals nothing.
    pub fn query_eq(&self, other: &PropertyValue) -> bool {
        match (self, other) {
            (PropertyValue::Null, _) | (_, PropertyValue::Null) => false,
            (PropertyValue::Int(i), PropertyValue::Float(x))
            | (PropertyValue::Float(x), PropertyValue::Int(i)) => float_to_int(*x) == Some(*i),
            _ => self == other,
        }
    }

    /// The string payload, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// The integer payload. Floats are not converted.
    pub fn as_int(&self) -> Option<i64> {
        match *self {
            PropertyValue::Int(i) => Some(i),
            _ => None,
        }
    }

    /// The float payload. Integers are not converted.
    pub fn as_float(&self) -> Option<f64> {
        match *self {
            PropertyValue::Float(x) => Some(x),
            _ => None,
        }
    }

    /// The boolean payload.
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            PropertyValue::Bool(b) => Some(b),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Null => write!(f, "null"),
            PropertyValue::Bool(b) => write!(f, "{b}"),
            PropertyValue::Int(i) => write!(f, "{i}"),
            PropertyValue::Float(x) => write!(f, "{x}"),
            PropertyValue::String(s) => write!(f, "{s}"),
        }
    }
}

/// `x` as an `i64` if it is integral and in range.
pub(crate) fn float_to_int(x: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, which is already out of range
    const BOUND: f64 = 9_223_372_036_854_775_808.0;
    (x.is_finite() && x.fract() == 0.0 && (-BOUND..BOUND).contains(&x)).then_some(x as i64)
}

macro_rules! property_from {
    ($($ty:ty => |$v:ident| $body:expr),* $(,)?) => {
        $(
            impl From<$ty> for PropertyValue {
                fn from($v: $ty) -> Self {
                    $body
                }
            }
        )*
    };
}

property_from! {
    String => |v| PropertyValue::String(v),
    &str => |v| PropertyValue::String(v.to_owned()),
    &String => |v| PropertyValue::String(v.clone()),
    i64 => |v| PropertyValue::Int(v),
    i32 => |v| PropertyValue::Int(i64::from(v)),
    u32 => |v| PropertyValue::Int(i64::from(v)),
    f64 => |v| PropertyValue::Float(v),
    bool => |v| PropertyValue::Bool(v),
}

/// Key-value metadata store for nodes and relationships.
///
/// Keys are kept sorted so persisted documents are stable across saves.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyMap {
    data: BTreeMap<String, PropertyValue>,
}

impl PropertyMap {
    /// Empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Chainable insert, for building match and extra maps inline.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Set `key`, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<PropertyValue>) {
        self.data.insert(key.into(), value.into());
    }

    /// Raw value for `key`.
    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.data.get(key)
    }

    /// Whether `key` is set (possibly to null).
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// No keys at all.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &PropertyValue)> {
        self.data.iter()
    }

    /// First key holding a NaN or infinite float.
    pub fn non_finite_key(&self) -> Option<&str> {
        self.data
            .iter()
            .find(|(_, value)| !value.is_finite())
            .map(|(key, _)| key.as_str())
    }

    /// Every key in `pattern` is present here with a [`PropertyValue::query_eq`] value.
    pub fn matches_query(&self, pattern: &PropertyMap) -> bool {
        pattern
            .iter()
            .all(|(key, expected)| self.data.get(key).is_some_and(|v| v.query_eq(expected)))
    }

    /// Every key in `pattern` is present here with an equal value.
    ///
    /// Keys stored here but absent from `pattern` are ignored.
    pub fn matches_subset(&self, pattern: &PropertyMap) -> bool {
        pattern
            .iter()
            .all(|(key, expected)| self.data.get(key) == Some(expected))
    }

    /// Copy every key from `other` that is not already present.
    ///
    /// Returns the number of keys added. Existing values are never overwritten.
    pub fn merge_missing(&mut self, other: &PropertyMap) -> usize {
        let before = self.data.len();
        for (key, value) in other.iter() {
            self.data
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
        self.data.len() - before
    }

    /// String property, `None` if absent or another type.
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(PropertyValue::as_str)
    }

    /// Integer property, `None` if absent or another type.
    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(PropertyValue::as_int)
    }

    /// Float property.
    pub fn get_float(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(PropertyValue::as_float)
    }

    /// Boolean property.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(PropertyValue::as_bool)
    }
}

impl FromIterator<(String, PropertyValue)> for PropertyMap {
    fn from_iter<I: IntoIterator<Item = (String, PropertyValue)>>(entries: I) -> Self {
        Self {
            data: entries.into_iter().collect(),
        }
    }
}
