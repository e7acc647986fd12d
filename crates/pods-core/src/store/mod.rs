//! Object store adapter.
//!
//! The core never touches host storage directly. Everything it needs goes
//! through [`ObjectStore`]; [`HostStore`] is the sled-backed implementation.

mod builtin;
mod config;
mod host;
mod record;

pub mod key;

pub use builtin::{builtin_object_fields, BuiltinKind, BuiltinType};
pub use config::{StoreConfig, DEFAULT_TABLE_PREFIX};
pub use host::HostStore;
pub use record::{RawRecord, StoredRecord};

use crate::catalog::{Field, FieldMap};
use crate::error::Error;
use crate::pod::{PodDefinition, PodType, TableInfo};
use crate::value::Options;
use serde_json::Value;

/// Host record type of persisted Pod definitions.
pub const POD_RECORD_TYPE: &str = "_pods_pod";

/// Host record type of persisted field definitions.
pub const FIELD_RECORD_TYPE: &str = "_pods_field";

/// Host storage primitives required by the core.
pub trait ObjectStore {
    /// Fetch a record by id.
    fn fetch_by_id(&self, id: u64) -> Result<Option<RawRecord>, Error>;

    /// Fetch a record of `record_type` by name within a parent scope.
    fn fetch_by_name(
        &self,
        name: &str,
        record_type: &str,
        parent_id: u64,
    ) -> Result<Option<RawRecord>, Error>;

    /// Fetch all children of `parent_id` with the given record type, in
    /// creation order.
    fn fetch_children(&self, parent_id: u64, record_type: &str) -> Result<Vec<RawRecord>, Error>;

    /// Look up a registered host post type or taxonomy.
    fn builtin_type(&self, kind: BuiltinKind, name: &str) -> Result<Option<BuiltinType>, Error>;

    /// Read one meta value.
    fn get_meta(&self, key: &str, object_id: u64) -> Result<Option<Value>, Error>;

    /// Write one meta value.
    fn set_meta(&self, key: &str, object_id: u64, value: Value) -> Result<(), Error>;

    /// Create or update a Pod. Params carry `id` (0 to create).
    fn save_pod(&self, params: &Options) -> Result<u64, Error>;

    /// Copy a Pod. Params carry the source `id` and `name`.
    fn duplicate_pod(&self, params: &Options) -> Result<u64, Error>;

    /// Delete a Pod and its fields.
    fn delete_pod(&self, params: &Options) -> Result<bool, Error>;

    /// Create or update a field. Params carry `pod_id` or `pod`.
    fn save_field(&self, params: &Options) -> Result<u64, Error>;

    /// Resolve a persisted field belonging to `pod_id`.
    fn resolve_field(&self, pod_id: u64, field_id: u64) -> Result<Option<Field>, Error>;

    /// Built-in columns of a host object kind, as fields.
    fn builtin_object_fields(
        &self,
        pod_type: PodType,
        definition: &PodDefinition,
    ) -> Result<FieldMap, Error>;

    /// Table and column metadata for a Pod.
    fn table_info(
        &self,
        pod_type: PodType,
        object: &str,
        name: &str,
        definition: &PodDefinition,
    ) -> Result<TableInfo, Error>;
}
