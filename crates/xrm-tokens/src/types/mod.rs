//! Core data model: attribute values, lookup references, and records.

mod record;
mod value;

pub use record::Record;
pub use value::{Reference, Value};
