use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A reference to another record, as stored in a lookup attribute.
///
/// The display name is optional: query results frequently carry it, but a
/// reference built by hand usually has only the target entity and id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    /// Logical name of the target entity.
    pub entity: String,
    /// Unique id of the target record.
    pub id: Uuid,
    /// Cached display name of the target record, when the source supplied one.
    pub name: Option<String>,
}

impl Reference {
    /// Create a reference without a cached display name.
    pub fn new(entity: impl Into<String>, id: Uuid) -> Self {
        Self {
            entity: entity.into(),
            id,
            name: None,
        }
    }

    /// Create a reference carrying a cached display name.
    pub fn named(entity: impl Into<String>, id: Uuid, name: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            id,
            name: Some(name.into()),
        }
    }
}

/// A typed attribute value.
///
/// Records are partial projections: an attribute that was not requested is
/// simply absent, which is distinct from any `Value` here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Text.
    String(String),
    /// Whole number.
    Int(i64),
    /// Exact decimal number.
    Decimal(Decimal),
    /// Boolean (two-option) value.
    Bool(bool),
    /// Timestamp, always UTC on the wire.
    DateTime(DateTime<Utc>),
    /// Lookup to another record.
    Reference(Reference),
    /// Option-set (choice) code. The label lives in metadata.
    OptionSet(i64),
    /// Multi-select option-set codes.
    MultiOptionSet(Vec<i64>),
    /// Currency amount.
    Money(Decimal),
    /// A value produced by a joined query, wrapping the origin entity and
    /// attribute it was read from.
    Aliased {
        entity: String,
        attribute: String,
        value: Box<Value>,
    },
}

impl Value {
    /// The raw base-type rendition used by the `<value>` format sentinel.
    ///
    /// References stringify to their id, option sets to their integer code
    /// (multi-selects joined with `;`), money to its bare decimal amount.
    pub fn raw_string(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Int(n) => n.to_string(),
            Value::Decimal(d) => d.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::DateTime(dt) => dt.to_rfc3339(),
            Value::Reference(r) => r.id.to_string(),
            Value::OptionSet(n) => n.to_string(),
            Value::MultiOptionSet(ns) => ns
                .iter()
                .map(|n| n.to_string())
                .collect::<Vec<_>>()
                .join(";"),
            Value::Money(d) => d.to_string(),
            Value::Aliased { value, .. } => value.raw_string(),
        }
    }

    /// Unwrap aliased values down to the value they carry.
    pub fn unaliased(&self) -> &Value {
        match self {
            Value::Aliased { value, .. } => value.unaliased(),
            other => other,
        }
    }

    /// Get this value as a lookup reference, if it is one.
    pub fn as_reference(&self) -> Option<&Reference> {
        match self.unaliased() {
            Value::Reference(r) => Some(r),
            _ => None,
        }
    }
}

// From implementations for common types

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n as i64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Decimal(d)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(dt: DateTime<Utc>) -> Self {
        Value::DateTime(dt)
    }
}

impl From<Reference> for Value {
    fn from(r: Reference) -> Self {
        Value::Reference(r)
    }
}
