//! Integration tests for engine-level behavior: scoping, cancellation,
//! depth limits, and metadata caching.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use uuid::Uuid;

use xrm_tokens::data::memory::MemoryStore;
use xrm_tokens::data::{
    AttributeMetadata, ColumnSet, DataAccess, DataError, EntityMetadata, RelatedQuery,
};
use xrm_tokens::{
    Engine, EngineOptions, MetadataCache, Record, Reference, TemplateError, Value,
};

// =============================================================================
// Scoping
// =============================================================================

#[test]
fn foreign_scope_passes_through_verbatim() {
    let store = MemoryStore::new();
    let cache = MetadataCache::new();
    let engine = Engine::new(&store, &cache);
    let record = Record::new("account").with("name", "Acme");

    let out = engine
        .substitute(&record, "{name} / {fax:name} / <fax:system|NOW|>")
        .unwrap();
    assert_eq!(out, "Acme / {fax:name} / <fax:system|NOW|>");
}

#[test]
fn matching_scope_resolves() {
    let store = MemoryStore::new();
    let cache = MetadataCache::new();
    let options = EngineOptions::builder().scope("fax").build();
    let engine = Engine::with_options(&store, &cache, options);
    let record = Record::new("account").with("name", "Acme");

    let out = engine.substitute(&record, "{fax:name} / {name}").unwrap();
    assert_eq!(out, "Acme / {name}");
}

#[test]
fn empty_scope_option_means_unscoped() {
    let store = MemoryStore::new();
    let cache = MetadataCache::new();
    let options = EngineOptions::builder().scope("").build();
    let engine = Engine::with_options(&store, &cache, options);
    let record = Record::new("account").with("name", "Acme");

    let out = engine.substitute(&record, "{name} / {fax:name}").unwrap();
    assert_eq!(out, "Acme / {fax:name}");
}

#[test]
fn two_pass_expansion_over_scopes() {
    let store = MemoryStore::new();
    let cache = MetadataCache::new();
    let record = Record::new("account").with("name", "Acme");

    let first = Engine::new(&store, &cache);
    let pass1 = first.substitute(&record, "{name} ({fax:name})").unwrap();
    assert_eq!(pass1, "Acme ({fax:name})");

    let options = EngineOptions::builder().scope("fax").build();
    let second = Engine::with_options(&store, &cache, options);
    let pass2 = second.substitute(&record, &pass1).unwrap();
    assert_eq!(pass2, "Acme (Acme)");
}

// =============================================================================
// Cancellation and Depth
// =============================================================================

#[test]
fn cancellation_stops_substitution() {
    let store = MemoryStore::new();
    let cache = MetadataCache::new();
    let cancel = Arc::new(AtomicBool::new(true));
    let options = EngineOptions::builder().cancel(Arc::clone(&cancel)).build();
    let engine = Engine::with_options(&store, &cache, options);
    let record = Record::new("account").with("name", "Acme");

    let err = engine.substitute(&record, "Hello {name}").unwrap_err();
    assert!(matches!(err, TemplateError::Cancelled));
}

#[test]
fn token_free_text_ignores_cancellation() {
    let store = MemoryStore::new();
    let cache = MetadataCache::new();
    let cancel = Arc::new(AtomicBool::new(true));
    let options = EngineOptions::builder().cancel(cancel).build();
    let engine = Engine::with_options(&store, &cache, options);
    let record = Record::new("account");

    let out = engine.substitute(&record, "plain text").unwrap();
    assert_eq!(out, "plain text");
}

#[test]
fn nesting_beyond_the_depth_limit_fails() {
    let store = MemoryStore::new();
    let cache = MetadataCache::new();
    let options = EngineOptions::builder().max_depth(3).build();
    let engine = Engine::with_options(&store, &cache, options);
    let record = Record::new("account");

    let mut template = "ok".to_string();
    for _ in 0..5 {
        template = format!("<iif|1|eq|1|{template}|no>");
    }

    let err = engine.substitute(&record, &template).unwrap_err();
    assert!(matches!(err, TemplateError::TooDeep { max: 3 }));
}

#[test]
fn nesting_within_the_depth_limit_succeeds() {
    let store = MemoryStore::new();
    let cache = MetadataCache::new();
    let options = EngineOptions::builder().max_depth(3).build();
    let engine = Engine::with_options(&store, &cache, options);
    let record = Record::new("account");

    let out = engine
        .substitute(&record, "<iif|1|eq|1|<iif|2|eq|2|deep enough|b>|c>")
        .unwrap();
    assert_eq!(out, "deep enough");
}

// =============================================================================
// Metadata Caching
// =============================================================================

/// Wraps a store and counts metadata loads.
struct CountingStore {
    inner: MemoryStore,
    metadata_loads: AtomicUsize,
}

impl DataAccess for CountingStore {
    fn retrieve(&self, entity: &str, id: Uuid, columns: &ColumnSet) -> Result<Record, DataError> {
        self.inner.retrieve(entity, id, columns)
    }

    fn retrieve_related(&self, query: &RelatedQuery) -> Result<Vec<Record>, DataError> {
        self.inner.retrieve_related(query)
    }

    fn entity_metadata(&self, entity: &str) -> Result<EntityMetadata, DataError> {
        self.metadata_loads.fetch_add(1, Ordering::Relaxed);
        self.inner.entity_metadata(entity)
    }

    fn current_user_id(&self) -> Result<Uuid, DataError> {
        self.inner.current_user_id()
    }

    fn record_url(&self, reference: &Reference) -> Result<String, DataError> {
        self.inner.record_url(reference)
    }
}

#[test]
fn metadata_loads_once_per_entity() {
    let mut inner = MemoryStore::new();
    inner.insert_metadata(EntityMetadata::new("account", "name").with_attribute(
        AttributeMetadata::option_set("category", [(1, "Gold".to_string())]),
    ));
    let store = CountingStore {
        inner,
        metadata_loads: AtomicUsize::new(0),
    };

    let cache = MetadataCache::new();
    let engine = Engine::new(&store, &cache);
    let record = Record::new("account").with("category", Value::OptionSet(1));

    for _ in 0..3 {
        let out = engine.substitute(&record, "{category}").unwrap();
        assert_eq!(out, "Gold");
    }

    assert_eq!(store.metadata_loads.load(Ordering::Relaxed), 1);
    assert_eq!(cache.len(), 1);
}

#[test]
fn unknown_entity_metadata_does_not_break_display() {
    let store = MemoryStore::new();
    let cache = MetadataCache::new();
    let engine = Engine::new(&store, &cache);
    let record = Record::new("account").with("category", Value::OptionSet(7));

    // No metadata registered: the option code itself is the display.
    let out = engine.substitute(&record, "{category}").unwrap();
    assert_eq!(out, "7");
}
