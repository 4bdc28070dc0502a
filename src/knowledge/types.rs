//! Knowledge base value types
//!
//! A knowledge base is an ordered mapping of topic → [`KbValue`]. Objects
//! that sit directly under a mapping are sub-mappings (topics); objects that
//! sit inside a list are records (rows such as a course listing).

use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use std::fmt;

/// Ordered mapping of keys to knowledge base values
pub type KbMap = IndexMap<String, KbValue>;

/// A scalar leaf
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}

/// A knowledge base entry
#[derive(Debug, Clone, PartialEq)]
pub enum KbValue {
    Scalar(Scalar),
    /// Structured row found inside a list
    Record(KbMap),
    List(Vec<KbValue>),
    /// Nested topic
    Mapping(KbMap),
}

impl KbValue {
    /// Convert a JSON value found under a mapping
    pub fn from_json(value: serde_json::Value) -> Self {
        Self::convert(value, false)
    }

    fn convert(value: serde_json::Value, in_list: bool) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => Self::Scalar(Scalar::Null),
            Value::Bool(b) => Self::Scalar(Scalar::Bool(b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Scalar(Scalar::Integer(i)),
                None => Self::Scalar(Scalar::Float(n.as_f64().unwrap_or(f64::NAN))),
            },
            Value::String(s) => Self::Scalar(Scalar::Text(s)),
            Value::Array(items) => {
                Self::List(items.into_iter().map(|v| Self::convert(v, true)).collect())
            }
            Value::Object(obj) => {
                let map: KbMap = obj
                    .into_iter()
                    .map(|(k, v)| (k, Self::convert(v, false)))
                    .collect();
                if in_list {
                    Self::Record(map)
                } else {
                    Self::Mapping(map)
                }
            }
        }
    }

    /// Convert back to JSON for API responses
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;
        match self {
            Self::Scalar(Scalar::Null) => Value::Null,
            Self::Scalar(Scalar::Bool(b)) => Value::Bool(*b),
            Self::Scalar(Scalar::Integer(i)) => Value::from(*i),
            Self::Scalar(Scalar::Float(x)) => serde_json::Number::from_f64(*x)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Self::Scalar(Scalar::Text(s)) => Value::String(s.clone()),
            Self::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Record(map) | Self::Mapping(map) => Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }

    pub fn is_mapping(&self) -> bool {
        matches!(self, Self::Mapping(_))
    }
}

impl From<&str> for KbValue {
    fn from(s: &str) -> Self {
        Self::Scalar(Scalar::Text(s.to_string()))
    }
}

impl From<i64> for KbValue {
    fn from(i: i64) -> Self {
        Self::Scalar(Scalar::Integer(i))
    }
}

impl From<f64> for KbValue {
    fn from(x: f64) -> Self {
        Self::Scalar(Scalar::Float(x))
    }
}

fn write_map(f: &mut fmt::Formatter<'_>, map: &KbMap) -> fmt::Result {
    write!(f, "{{")?;
    for (i, (key, value)) in map.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}: {}", key, value)?;
    }
    write!(f, "}}")
}

impl fmt::Display for KbValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(s) => write!(f, "{}", s),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Self::Record(map) | Self::Mapping(map) => write_map(f, map),
        }
    }
}

impl Serialize for KbValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}
