//! Integration tests for the `expand` related-record construct.

use uuid::Uuid;

use xrm_tokens::data::memory::MemoryStore;
use xrm_tokens::{Engine, MetadataCache, Record, Reference, Value};

fn contact(parent: Uuid, name: &str) -> Record {
    Record::new("contact")
        .with("parentcustomerid", Reference::new("account", parent))
        .with("fullname", name)
}

fn parent_account() -> Record {
    Record::new("account").with("name", "Acme")
}

// =============================================================================
// Basics
// =============================================================================

#[test]
fn expand_renders_each_child() {
    let mut store = MemoryStore::new();
    let record = parent_account();
    store.insert(contact(record.id, "Bea"));
    store.insert(contact(record.id, "Ana"));
    store.insert(contact(record.id, "Cy"));

    let cache = MetadataCache::new();
    let engine = Engine::new(&store, &cache);
    let out = engine
        .substitute(
            &record,
            "<expand|contact|parentcustomerid|{fullname}||, |||>",
        )
        .unwrap();
    // No explicit order: fragments sort alphabetically.
    assert_eq!(out, "Ana, Bea, Cy");
}

#[test]
fn expand_with_no_children_is_empty() {
    let store = MemoryStore::new();
    let record = parent_account();

    let cache = MetadataCache::new();
    let engine = Engine::new(&store, &cache);
    let out = engine
        .substitute(&record, "[<expand|contact|parentcustomerid|{fullname}||, |||>]")
        .unwrap();
    assert_eq!(out, "[]");
}

#[test]
fn unrelated_children_are_not_included() {
    let mut store = MemoryStore::new();
    let record = parent_account();
    store.insert(contact(record.id, "Mine"));
    store.insert(contact(Uuid::new_v4(), "Theirs"));

    let cache = MetadataCache::new();
    let engine = Engine::new(&store, &cache);
    let out = engine
        .substitute(&record, "<expand|contact|parentcustomerid|{fullname}||, |||>")
        .unwrap();
    assert_eq!(out, "Mine");
}

#[test]
fn empty_fragments_are_dropped() {
    let mut store = MemoryStore::new();
    let record = parent_account();
    store.insert(contact(record.id, "Ana"));
    store.insert(
        Record::new("contact").with("parentcustomerid", Reference::new("account", record.id)),
    );

    let cache = MetadataCache::new();
    let engine = Engine::new(&store, &cache);
    let out = engine
        .substitute(&record, "<expand|contact|parentcustomerid|{fullname}||, |||>")
        .unwrap();
    assert_eq!(out, "Ana");
}

// =============================================================================
// Ordering, Separator, Limits
// =============================================================================

#[test]
fn explicit_order_is_respected() {
    let mut store = MemoryStore::new();
    let record = parent_account();
    store.insert(contact(record.id, "Ana").with("age", 31));
    store.insert(contact(record.id, "Bea").with("age", 52));
    store.insert(contact(record.id, "Cy").with("age", 44));

    let cache = MetadataCache::new();
    let engine = Engine::new(&store, &cache);
    let out = engine
        .substitute(
            &record,
            "<expand|contact|parentcustomerid|{fullname}|age/DESC|, |||>",
        )
        .unwrap();
    assert_eq!(out, "Bea, Cy, Ana");
}

#[test]
fn separator_escapes_are_unescaped() {
    let mut store = MemoryStore::new();
    let record = parent_account();
    store.insert(contact(record.id, "Ana"));
    store.insert(contact(record.id, "Bea"));

    let cache = MetadataCache::new();
    let engine = Engine::new(&store, &cache);
    let out = engine
        .substitute(&record, "<expand|contact|parentcustomerid|{fullname}||\\n|||>")
        .unwrap();
    assert_eq!(out, "Ana\nBea");
}

#[test]
fn maxcount_caps_the_retrieved_set() {
    let mut store = MemoryStore::new();
    let record = parent_account();
    store.insert(contact(record.id, "Ana"));
    store.insert(contact(record.id, "Bea"));
    store.insert(contact(record.id, "Cy"));

    let cache = MetadataCache::new();
    let engine = Engine::new(&store, &cache);
    let out = engine
        .substitute(
            &record,
            "<expand|contact|parentcustomerid|{fullname}|fullname|, |||2>",
        )
        .unwrap();
    assert_eq!(out, "Ana, Bea");
}

#[test]
fn active_only_filters_by_statecode() {
    let mut store = MemoryStore::new();
    let record = parent_account();
    store.insert(contact(record.id, "Active one").with("statecode", Value::Int(0)));
    store.insert(contact(record.id, "Disabled one").with("statecode", Value::Int(1)));

    let cache = MetadataCache::new();
    let engine = Engine::new(&store, &cache);
    let out = engine
        .substitute(
            &record,
            "<expand|contact|parentcustomerid|{fullname}||, ||true|>",
        )
        .unwrap();
    assert_eq!(out, "Active one");
}

// =============================================================================
// Distinct and Row Numbering
// =============================================================================

#[test]
fn distinct_drops_repeated_fragments() {
    let mut store = MemoryStore::new();
    let record = parent_account();
    store.insert(contact(record.id, "Dup"));
    store.insert(contact(record.id, "Dup"));
    store.insert(contact(record.id, "Other"));

    let cache = MetadataCache::new();
    let engine = Engine::new(&store, &cache);
    let out = engine
        .substitute(&record, "<expand|contact|parentcustomerid|{fullname}||, |true||>")
        .unwrap();
    assert_eq!(out, "Dup, Other");
}

#[test]
fn row_number_marker_counts_the_full_set() {
    let mut store = MemoryStore::new();
    let record = parent_account();
    store.insert(contact(record.id, "Ana"));
    store.insert(contact(record.id, "Bea"));

    let cache = MetadataCache::new();
    let engine = Engine::new(&store, &cache);
    let out = engine
        .substitute(
            &record,
            "<expand|contact|parentcustomerid|##. {fullname}|fullname|, |||>",
        )
        .unwrap();
    assert_eq!(out, "1. Ana, 2. Bea");
}

#[test]
fn distinct_keeps_the_winners_own_row_number() {
    // Dedup happens before the ## marker is filled in, so repeated fragments
    // collapse while the survivor keeps its 1-based position.
    let mut store = MemoryStore::new();
    let record = parent_account();
    store.insert(contact(record.id, "Dup"));
    store.insert(contact(record.id, "Dup"));
    store.insert(contact(record.id, "Solo"));

    let cache = MetadataCache::new();
    let engine = Engine::new(&store, &cache);
    let out = engine
        .substitute(
            &record,
            "<expand|contact|parentcustomerid|{fullname}-##|fullname|, |true||>",
        )
        .unwrap();
    assert_eq!(out, "Dup-1, Solo-3");
}

// =============================================================================
// Nesting
// =============================================================================

#[test]
fn expand_bodies_may_contain_iif() {
    let mut store = MemoryStore::new();
    let record = parent_account();
    store.insert(contact(record.id, "Ana").with("age", 31));
    store.insert(contact(record.id, "Bea").with("age", 17));

    let cache = MetadataCache::new();
    let engine = Engine::new(&store, &cache);
    let out = engine
        .substitute(
            &record,
            "<expand|contact|parentcustomerid|{fullname}: <iif|{age}|ge|18|adult|minor>|fullname|, |||>",
        )
        .unwrap();
    assert_eq!(out, "Ana: adult, Bea: minor");
}
