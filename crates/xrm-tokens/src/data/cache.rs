//! Metadata cache, one per data-access connection.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{DataAccess, DataError, EntityMetadata};
use crate::data::AttributeMetadata;

/// Process-lifetime cache of entity metadata, keyed by logical name.
///
/// Construct one per connection and pass it alongside the [`DataAccess`]
/// handle. Entries are loaded lazily on first lookup and never evicted.
/// Lookups are safe from multiple threads; a server host can run template
/// expansions concurrently against one cache.
#[derive(Debug, Default)]
pub struct MetadataCache {
    entities: Mutex<HashMap<String, Arc<EntityMetadata>>>,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the metadata for an entity, loading it on first use.
    pub fn entity(
        &self,
        data: &dyn DataAccess,
        entity: &str,
    ) -> Result<Arc<EntityMetadata>, DataError> {
        if let Some(cached) = self.lock().get(entity) {
            return Ok(Arc::clone(cached));
        }

        log::debug!("loading metadata for entity '{entity}'");
        let loaded = Arc::new(data.entity_metadata(entity)?);

        // A concurrent load may have won the race; keep whichever landed first.
        let mut entities = self.lock();
        let entry = entities
            .entry(entity.to_string())
            .or_insert_with(|| Arc::clone(&loaded));
        Ok(Arc::clone(entry))
    }

    /// Get the metadata for one attribute, if the entity defines it.
    pub fn attribute(
        &self,
        data: &dyn DataAccess,
        entity: &str,
        attribute: &str,
    ) -> Result<Option<AttributeMetadata>, DataError> {
        let meta = self.entity(data, entity)?;
        Ok(meta.attributes.get(attribute).cloned())
    }

    /// Resolve an option-set code to its label, if metadata has one.
    pub fn option_label(
        &self,
        data: &dyn DataAccess,
        entity: &str,
        attribute: &str,
        code: i64,
    ) -> Result<Option<String>, DataError> {
        let meta = self.entity(data, entity)?;
        Ok(meta
            .attributes
            .get(attribute)
            .and_then(|a| a.option_labels.get(&code))
            .cloned())
    }

    /// The primary-name attribute of an entity.
    pub fn primary_name(&self, data: &dyn DataAccess, entity: &str) -> Result<String, DataError> {
        let meta = self.entity(data, entity)?;
        Ok(meta.primary_name_attribute.clone())
    }

    /// The number of cached entities, for tests and diagnostics.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<EntityMetadata>>> {
        self.entities.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
