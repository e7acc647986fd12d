//! Pods Core - Pod definition resolution, field catalogs, and relationship
//! traversal.
//!
//! A Pod describes a content type: a host post type, taxonomy, users,
//! media, comments, or a custom type. This crate resolves Pods from names,
//! ids, records or payloads, exposes their custom and object fields, walks
//! relationship chains across Pods, and persists definitions through an
//! [`ObjectStore`].

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

pub mod catalog;
pub mod error;
pub mod pod;
pub mod store;
pub mod tenant;
pub mod traverse;
pub mod value;

pub use catalog::{Field, FieldCatalog, FieldMap, FieldType, PickFormat, PickTarget};
pub use error::Error;
pub use pod::{
    derive_table_info, ParentRef, Pod, PodDefinition, PodInput, PodOptions, PodType, Storage,
    TableInfo,
};
pub use store::{
    BuiltinKind, BuiltinType, HostStore, ObjectStore, RawRecord, StoreConfig, FIELD_RECORD_TYPE,
    POD_RECORD_TYPE,
};
pub use traverse::{traverse, Traversal, TraversalMode, TraverseParams};
pub use value::Options;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;
