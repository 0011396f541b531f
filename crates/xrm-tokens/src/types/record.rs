use std::collections::HashMap;

use bon::Builder;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Value;

/// A logical-name-tagged, id-tagged mapping from attribute name to value.
///
/// Attribute names are case-sensitive opaque strings. A record is not required
/// to contain every schema-defined attribute; queries return only the columns
/// they projected.
///
/// # Example
///
/// ```
/// use uuid::Uuid;
/// use xrm_tokens::{Record, Value};
///
/// let account = Record::builder()
///     .entity("account")
///     .id(Uuid::new_v4())
///     .build()
///     .with("name", "Acme");
///
/// assert_eq!(account.get("name"), Some(&Value::String("Acme".into())));
/// assert_eq!(account.get("revenue"), None);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, Builder)]
pub struct Record {
    /// Logical name of the entity this record belongs to.
    #[builder(into)]
    pub entity: String,

    /// Unique id of the record.
    #[builder(default)]
    pub id: Uuid,

    /// Attribute values present on this projection.
    #[builder(default)]
    pub attributes: HashMap<String, Value>,

    /// Server-computed display strings keyed by attribute name, when the
    /// data source supplies them (option-set labels, lookup names, formatted
    /// money and dates).
    #[builder(default)]
    pub formatted: HashMap<String, String>,
}

impl Record {
    /// Create an empty record with a fresh id.
    pub fn new(entity: impl Into<String>) -> Self {
        Record::builder().entity(entity).id(Uuid::new_v4()).build()
    }

    /// Get an attribute value, `None` when the projection does not carry it.
    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.attributes.get(attribute)
    }

    /// Get the server-computed display string for an attribute, if present.
    pub fn formatted(&self, attribute: &str) -> Option<&str> {
        self.formatted.get(attribute).map(String::as_str)
    }

    /// Set an attribute value in place.
    pub fn set(&mut self, attribute: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(attribute.into(), value.into());
    }

    /// Set a display string in place.
    pub fn set_formatted(&mut self, attribute: impl Into<String>, text: impl Into<String>) {
        self.formatted.insert(attribute.into(), text.into());
    }

    /// Builder-style attribute insertion.
    pub fn with(mut self, attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(attribute, value);
        self
    }

    /// Builder-style display-string insertion.
    pub fn with_formatted(mut self, attribute: impl Into<String>, text: impl Into<String>) -> Self {
        self.set_formatted(attribute, text);
        self
    }
}
