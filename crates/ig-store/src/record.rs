use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Store-unique identifier of a record (UUID v7 for insertion ordering).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(uuid::Uuid);

impl RecordId {
    /// Generate a fresh time-ordered id.
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7())
    }

    /// Create from an existing UUID.
    pub fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordId({})", self.0)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A labeled record with a flat property map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphRecord {
    pub id: RecordId,
    pub label: String,
    pub properties: BTreeMap<String, Value>,
}

impl GraphRecord {
    /// Create an empty record with a fresh id.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            id: RecordId::new(),
            label: label.into(),
            properties: BTreeMap::new(),
        }
    }

    /// Builder-style property setter.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Look up a property. Missing keys and JSON null both yield `None`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key).filter(|v| !v.is_null())
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_i64)
    }

    /// Returns `true` if every predicate matches this record.
    pub fn matches(&self, predicates: &[Predicate]) -> bool {
        predicates.iter().all(|p| p.matches(self))
    }
}

/// A directed, typed edge between two records.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphEdge {
    pub kind: String,
    pub source: RecordId,
    pub target: RecordId,
}

impl GraphEdge {
    pub fn new(kind: impl Into<String>, source: RecordId, target: RecordId) -> Self {
        Self {
            kind: kind.into(),
            source,
            target,
        }
    }
}

/// A condition over one record property.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    Eq(String, Value),
    In(String, Vec<Value>),
    Lt(String, Value),
    Gt(String, Value),
}

impl Predicate {
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq(field.into(), value.into())
    }

    pub fn is_in<V: Into<Value>>(field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Self::In(field.into(), values.into_iter().map(Into::into).collect())
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Lt(field.into(), value.into())
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Gt(field.into(), value.into())
    }

    /// Evaluate against a record. A missing field never matches.
    pub fn matches(&self, record: &GraphRecord) -> bool {
        match self {
            Self::Eq(field, expected) => record.properties.get(field) == Some(expected),
            Self::In(field, options) => record
                .properties
                .get(field)
                .is_some_and(|v| options.contains(v)),
            Self::Lt(field, bound) => compare_field(record, field, bound) == Some(Ordering::Less),
            Self::Gt(field, bound) => {
                compare_field(record, field, bound) == Some(Ordering::Greater)
            }
        }
    }
}

fn compare_field(record: &GraphRecord, field: &str, bound: &Value) -> Option<Ordering> {
    compare_values(record.properties.get(field)?, bound)
}

/// Order two JSON scalars. Integers compare exactly, other numbers as
/// floats, strings lexically; anything else is incomparable.
fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => Some(x.cmp(&y)),
            _ => x.as_f64()?.partial_cmp(&y.as_f64()?),
        },
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Label-scoped conjunctive record query.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordQuery {
    pub label: String,
    pub predicates: Vec<Predicate>,
}

impl RecordQuery {
    pub fn label(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            predicates: Vec::new(),
        }
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn matches(&self, record: &GraphRecord) -> bool {
        record.label == self.label && record.matches(&self.predicates)
    }
}
