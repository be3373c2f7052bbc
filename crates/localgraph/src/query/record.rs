//! Result values and driver-style records.
//!
//! A [`Record`] behaves like a row handed back by a remote graph-database
//! client: columns are looked up by name and coerced on access, so callers
//! written against that client work unchanged against the embedded engine.

use crate::error::{GraphError, Result};
use crate::graph::{float_to_int, Node, PropertyValue, Relationship};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::Serialize;
use std::fmt;

/// A single value in a result row.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing property or literal `null`
    Null,
    /// Boolean
    Bool(bool),
    /// 64-bit integer
    Int(i64),
    /// 64-bit float
    Float(f64),
    /// String
    String(String),
    /// List (`labels(n)`)
    List(Vec<Value>),
    /// Whole node
    Node(Node),
    /// Whole relationship
    Relationship(Relationship),
}

impl Value {
    /// Human readable name of the variant, used in type mismatch errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Node(_) => "node",
            Value::Relationship(_) => "relationship",
        }
    }

    /// Whether this is [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<PropertyValue> for Value {
    fn from(value: PropertyValue) -> Self {
        match value {
            PropertyValue::Null => Value::Null,
            PropertyValue::Bool(b) => Value::Bool(b),
            PropertyValue::Int(i) => Value::Int(i),
            PropertyValue::Float(f) => Value::Float(f),
            PropertyValue::String(s) => Value::String(s),
        }
    }
}

impl From<Node> for Value {
    fn from(node: Node) -> Self {
        Value::Node(node)
    }
}

impl From<Relationship> for Value {
    fn from(rel: Relationship) -> Self {
        Value::Relationship(rel)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::String(s) => write!(f, "{s}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Node(n) => write!(f, "({}:{})", n.identity, n.labels.join(":")),
            Value::Relationship(r) => write!(
                f,
                "({})-[{}:{}]->({})",
                r.start_node_id, r.identity, r.rel_type, r.end_node_id
            ),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::String(s) => serializer.serialize_str(s),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Node(n) => n.serialize(serializer),
            Value::Relationship(r) => r.serialize(serializer),
        }
    }
}

/// Conversion from a result [`Value`], used by [`Record::get`].
pub trait FromValue: Sized {
    /// Convert `value` found under column `key`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::PropertyTypeMismatch`] if the value cannot be
    /// represented as `Self`.
    fn from_value(key: &str, value: &Value) -> Result<Self>;
}

fn mismatch(key: &str, expected: &str, value: &Value) -> GraphError {
    GraphError::PropertyTypeMismatch {
        key: key.to_string(),
        expected: expected.to_string(),
        actual: value.type_name().to_string(),
    }
}

impl FromValue for i64 {
    fn from_value(key: &str, value: &Value) -> Result<Self> {
        let coerced = match value {
            Value::Int(i) => Some(*i),
            Value::Float(f) => float_to_int(*f),
            Value::String(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(float_to_int))
            }
            _ => None,
        };
        coerced.ok_or_else(|| mismatch(key, "integer", value))
    }
}

impl FromValue for f64 {
    fn from_value(key: &str, value: &Value) -> Result<Self> {
        match value {
            Value::Int(i) => Ok(*i as f64),
            Value::Float(f) => Ok(*f),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| mismatch(key, "float", value)),
            _ => Err(mismatch(key, "float", value)),
        }
    }
}

impl FromValue for bool {
    fn from_value(key: &str, value: &Value) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(*b),
            _ => Err(mismatch(key, "boolean", value)),
        }
    }
}

impl FromValue for String {
    fn from_value(key: &str, value: &Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(s.clone()),
            _ => Err(mismatch(key, "string", value)),
        }
    }
}

impl FromValue for Node {
    fn from_value(key: &str, value: &Value) -> Result<Self> {
        match value {
            Value::Node(n) => Ok(n.clone()),
            _ => Err(mismatch(key, "node", value)),
        }
    }
}

impl FromValue for Relationship {
    fn from_value(key: &str, value: &Value) -> Result<Self> {
        match value {
            Value::Relationship(r) => Ok(r.clone()),
            _ => Err(mismatch(key, "relationship", value)),
        }
    }
}

impl FromValue for Value {
    fn from_value(_key: &str, value: &Value) -> Result<Self> {
        Ok(value.clone())
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(key: &str, value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(key, other).map(Some),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(key: &str, value: &Value) -> Result<Self> {
        match value {
            Value::List(items) => items.iter().map(|v| T::from_value(key, v)).collect(),
            _ => Err(mismatch(key, "list", value)),
        }
    }
}

/// One result row: named columns in projection order.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    keys: Vec<String>,
    values: Vec<Value>,
}

impl Record {
    /// Build a record from parallel column names and values.
    pub(crate) fn new(keys: Vec<String>, values: Vec<Value>) -> Self {
        debug_assert_eq!(keys.len(), values.len());
        Self { keys, values }
    }

    /// Column names, in projection order.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the record has no columns.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Iterate `(column, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.keys.iter().map(String::as_str).zip(self.values.iter())
    }

    /// Raw value of a column.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::ColumnNotFound`] if the column does not exist.
    pub fn get_value(&self, key: &str) -> Result<&Value> {
        self.keys
            .iter()
            .position(|k| k == key)
            .map(|i| &self.values[i])
            .ok_or_else(|| GraphError::ColumnNotFound {
                column: key.to_string(),
            })
    }

    /// Typed value of a column.
    ///
    /// ```
    /// use localgraph::{execute_query, GraphStore};
    ///
    /// let store = GraphStore::in_memory().unwrap();
    /// let records = execute_query(&store, "RETURN 1 AS test").unwrap();
    /// let test: i64 = records[0].get("test").unwrap();
    /// assert_eq!(test, 1);
    /// ```
    ///
    /// # Errors
    ///
    /// [`GraphError::ColumnNotFound`] or [`GraphError::PropertyTypeMismatch`].
    pub fn get<T: FromValue>(&self, key: &str) -> Result<T> {
        T::from_value(key, self.get_value(key)?)
    }

    /// Column as an integer (integers, integral floats, numeric strings).
    pub fn get_i64(&self, key: &str) -> Result<i64> {
        self.get(key)
    }

    /// Column as a float (integers, floats, numeric strings).
    pub fn get_f64(&self, key: &str) -> Result<f64> {
        self.get(key)
    }

    /// Column as a borrowed string.
    pub fn get_str(&self, key: &str) -> Result<&str> {
        match self.get_value(key)? {
            Value::String(s) => Ok(s),
            other => Err(mismatch(key, "string", other)),
        }
    }

    /// Column as an owned string.
    pub fn get_string(&self, key: &str) -> Result<String> {
        self.get(key)
    }

    /// Column as a boolean.
    pub fn get_bool(&self, key: &str) -> Result<bool> {
        self.get(key)
    }

    /// Column as a node.
    pub fn get_node(&self, key: &str) -> Result<Node> {
        self.get(key)
    }
}

impl Serialize for Record {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.keys.len()))?;
        for (key, value) in self.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
