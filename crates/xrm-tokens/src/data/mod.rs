//! The data-access seam the template engine evaluates against.
//!
//! The engine never talks to a live organization service directly; it goes
//! through [`DataAccess`], a synchronous, blocking contract covering the five
//! operations template expansion needs: point retrieve, related-record
//! queries, entity metadata, the calling user, and record deep links.

pub mod memory;

mod cache;
mod metadata;

use thiserror::Error;
use uuid::Uuid;

use crate::types::{Record, Reference};

pub use cache::MetadataCache;
pub use metadata::{AttributeMetadata, AttributeType, EntityMetadata};

/// Errors surfaced by a [`DataAccess`] implementation.
#[derive(Debug, Error)]
pub enum DataError {
    /// No record with the given id exists.
    #[error("no '{entity}' record with id {id}")]
    NotFound { entity: String, id: Uuid },

    /// No metadata is known for the entity.
    #[error("no metadata for entity '{entity}'")]
    UnknownEntity { entity: String },

    /// Anything the backing service reports: transport faults, rejected
    /// queries, authorization failures.
    #[error("data access failed: {message}")]
    Backend { message: String },
}

/// Which columns a retrieve should project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnSet {
    /// Every attribute the record has.
    All,
    /// Only the named attributes.
    Columns(Vec<String>),
}

impl ColumnSet {
    /// A projection of a single column.
    pub fn single(column: impl Into<String>) -> Self {
        ColumnSet::Columns(vec![column.into()])
    }
}

/// One sort criterion for a related-record query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub attribute: String,
    pub descending: bool,
}

impl OrderBy {
    pub fn ascending(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            descending: false,
        }
    }

    pub fn descending(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            descending: true,
        }
    }
}

/// A query for the records of one entity whose lookup attribute points at a
/// given parent id. This is the shape the `expand` construct needs.
#[derive(Debug, Clone, PartialEq)]
pub struct RelatedQuery {
    /// Logical name of the child entity.
    pub entity: String,
    /// The lookup attribute on the child that points at the parent.
    pub attribute: String,
    /// The parent record id to match.
    pub id: Uuid,
    /// Restrict to active records (`statecode == 0`).
    pub active_only: bool,
    /// Sort criteria, applied server-side.
    pub order: Vec<OrderBy>,
    /// Columns to project on each returned record.
    pub columns: ColumnSet,
    /// Cap on the number of returned records.
    pub max_count: Option<usize>,
}

/// Synchronous data access used by template expansion.
///
/// Implementations must present `retrieve_related` as a flat sequence; any
/// server-side paging is their concern, not the caller's.
pub trait DataAccess {
    /// Retrieve one record by id, projecting the given columns.
    fn retrieve(&self, entity: &str, id: Uuid, columns: &ColumnSet) -> Result<Record, DataError>;

    /// Retrieve the records matching a [`RelatedQuery`].
    fn retrieve_related(&self, query: &RelatedQuery) -> Result<Vec<Record>, DataError>;

    /// Load metadata for an entity. Callers go through [`MetadataCache`];
    /// implementations do not need to cache themselves.
    fn entity_metadata(&self, entity: &str) -> Result<EntityMetadata, DataError>;

    /// The id of the calling user, for the `system|USER` construct.
    fn current_user_id(&self) -> Result<Uuid, DataError>;

    /// A deep-link URL for a record, for the `<recordurl>` format sentinel.
    fn record_url(&self, reference: &Reference) -> Result<String, DataError>;
}
