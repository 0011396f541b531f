//! In-memory [`DataAccess`] implementation.
//!
//! Backs the crate's own test suites and works as a test double for plugin
//! code built on the engine. Every point retrieve is appended to a call log
//! so tests can assert how many fetches ran and what they projected.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use uuid::Uuid;

use super::{ColumnSet, DataAccess, DataError, EntityMetadata, RelatedQuery};
use crate::types::{Record, Reference, Value};

/// One recorded `retrieve` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrieveCall {
    pub entity: String,
    pub id: Uuid,
    pub columns: ColumnSet,
}

/// In-memory record store implementing [`DataAccess`].
///
/// Records are kept per entity in insertion order, which makes related-record
/// queries deterministic without an explicit sort.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: HashMap<String, Vec<Record>>,
    metadata: HashMap<String, EntityMetadata>,
    user_id: Uuid,
    base_url: String,
    calls: Mutex<Vec<RetrieveCall>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            base_url: "https://crm.example.com".to_string(),
            ..Self::default()
        }
    }

    /// Add a record to the store.
    pub fn insert(&mut self, record: Record) {
        self.records
            .entry(record.entity.clone())
            .or_default()
            .push(record);
    }

    /// Register metadata for an entity.
    pub fn insert_metadata(&mut self, metadata: EntityMetadata) {
        self.metadata.insert(metadata.logical_name.clone(), metadata);
    }

    /// Set the id returned by [`DataAccess::current_user_id`].
    pub fn set_user_id(&mut self, id: Uuid) {
        self.user_id = id;
    }

    /// Set the organization base URL used for record deep links.
    pub fn set_base_url(&mut self, url: impl Into<String>) {
        self.base_url = url.into();
    }

    /// The point retrieves performed so far, in order.
    pub fn calls(&self) -> Vec<RetrieveCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of point retrieves performed so far.
    pub fn call_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn project(record: &Record, columns: &ColumnSet) -> Record {
        match columns {
            ColumnSet::All => record.clone(),
            ColumnSet::Columns(names) => {
                let mut out = Record::builder()
                    .entity(record.entity.clone())
                    .id(record.id)
                    .build();
                for name in names {
                    if let Some(value) = record.get(name) {
                        out.set(name.clone(), value.clone());
                    }
                    if let Some(text) = record.formatted(name) {
                        out.set_formatted(name.clone(), text);
                    }
                }
                out
            }
        }
    }

    fn is_active(record: &Record) -> bool {
        match record.get("statecode") {
            Some(Value::Int(n)) => *n == 0,
            Some(Value::OptionSet(n)) => *n == 0,
            _ => true,
        }
    }

    fn compare(a: &Record, b: &Record, attribute: &str) -> Ordering {
        match (a.get(attribute), b.get(attribute)) {
            (Some(Value::Int(x)), Some(Value::Int(y))) => x.cmp(y),
            (Some(Value::Decimal(x)), Some(Value::Decimal(y))) => x.cmp(y),
            (Some(Value::DateTime(x)), Some(Value::DateTime(y))) => x.cmp(y),
            (Some(x), Some(y)) => x.raw_string().cmp(&y.raw_string()),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => Ordering::Equal,
        }
    }
}

impl DataAccess for MemoryStore {
    fn retrieve(&self, entity: &str, id: Uuid, columns: &ColumnSet) -> Result<Record, DataError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RetrieveCall {
                entity: entity.to_string(),
                id,
                columns: columns.clone(),
            });

        self.records
            .get(entity)
            .and_then(|rows| rows.iter().find(|r| r.id == id))
            .map(|r| Self::project(r, columns))
            .ok_or_else(|| DataError::NotFound {
                entity: entity.to_string(),
                id,
            })
    }

    fn retrieve_related(&self, query: &RelatedQuery) -> Result<Vec<Record>, DataError> {
        let mut rows: Vec<&Record> = self
            .records
            .get(&query.entity)
            .map(|rows| {
                rows.iter()
                    .filter(|r| {
                        r.get(&query.attribute)
                            .and_then(Value::as_reference)
                            .is_some_and(|parent| parent.id == query.id)
                    })
                    .filter(|r| !query.active_only || Self::is_active(r))
                    .collect()
            })
            .unwrap_or_default();

        for order in query.order.iter().rev() {
            rows.sort_by(|a, b| {
                let cmp = Self::compare(a, b, &order.attribute);
                if order.descending { cmp.reverse() } else { cmp }
            });
        }

        if let Some(max) = query.max_count {
            rows.truncate(max);
        }

        Ok(rows
            .into_iter()
            .map(|r| Self::project(r, &query.columns))
            .collect())
    }

    fn entity_metadata(&self, entity: &str) -> Result<EntityMetadata, DataError> {
        self.metadata
            .get(entity)
            .cloned()
            .ok_or_else(|| DataError::UnknownEntity {
                entity: entity.to_string(),
            })
    }

    fn current_user_id(&self) -> Result<Uuid, DataError> {
        Ok(self.user_id)
    }

    fn record_url(&self, reference: &Reference) -> Result<String, DataError> {
        Ok(format!(
            "{}/main.aspx?etn={}&pagetype=entityrecord&id={}",
            self.base_url, reference.entity, reference.id
        ))
    }
}
