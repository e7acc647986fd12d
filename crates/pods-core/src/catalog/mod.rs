//! Field catalogs for Pods.
//!
//! Every Pod carries two disjoint field sets: custom fields stored as child
//! records and object fields derived from the underlying host type.

mod cache;
mod catalog;
mod field;

pub use cache::VersionedCache;
pub use catalog::{FieldCatalog, OBJECT_FIELDS_OPTION};
pub use field::{Field, FieldMap, FieldType, PickFormat, PickTarget};
