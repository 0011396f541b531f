//! Entity and attribute metadata models.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Metadata for one entity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityMetadata {
    pub logical_name: String,
    /// The attribute that holds the record's display name.
    pub primary_name_attribute: String,
    pub attributes: HashMap<String, AttributeMetadata>,
}

impl EntityMetadata {
    pub fn new(logical_name: impl Into<String>, primary_name_attribute: impl Into<String>) -> Self {
        Self {
            logical_name: logical_name.into(),
            primary_name_attribute: primary_name_attribute.into(),
            attributes: HashMap::new(),
        }
    }

    /// Builder-style attribute registration.
    pub fn with_attribute(mut self, attribute: AttributeMetadata) -> Self {
        self.attributes
            .insert(attribute.logical_name.clone(), attribute);
        self
    }
}

/// Metadata for one attribute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeMetadata {
    pub logical_name: String,
    pub attribute_type: AttributeType,
    /// Target entity for lookups, used to resolve a bare-id hop where the
    /// stored value carries no logical name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_entity: Option<String>,
    /// Option code to label, for option-set attributes.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub option_labels: HashMap<i64, String>,
}

impl AttributeMetadata {
    pub fn new(logical_name: impl Into<String>, attribute_type: AttributeType) -> Self {
        Self {
            logical_name: logical_name.into(),
            attribute_type,
            related_entity: None,
            option_labels: HashMap::new(),
        }
    }

    /// A lookup attribute targeting the given entity.
    pub fn lookup(logical_name: impl Into<String>, related_entity: impl Into<String>) -> Self {
        Self {
            logical_name: logical_name.into(),
            attribute_type: AttributeType::Lookup,
            related_entity: Some(related_entity.into()),
            option_labels: HashMap::new(),
        }
    }

    /// An option-set attribute with the given code-to-label pairs.
    pub fn option_set(
        logical_name: impl Into<String>,
        labels: impl IntoIterator<Item = (i64, String)>,
    ) -> Self {
        Self {
            logical_name: logical_name.into(),
            attribute_type: AttributeType::OptionSet,
            related_entity: None,
            option_labels: labels.into_iter().collect(),
        }
    }
}

/// Attribute data types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeType {
    String,
    Memo,
    Integer,
    Decimal,
    Boolean,
    DateTime,
    Lookup,
    OptionSet,
    MultiSelectOptionSet,
    Money,
    UniqueIdentifier,
    Other(String),
}
