//! Per-Pod field catalogs.

use super::cache::VersionedCache;
use super::{Field, FieldMap};
use crate::error::Error;
use crate::pod::PodDefinition;
use crate::store::{ObjectStore, FIELD_RECORD_TYPE};
use crate::value;
use tracing::debug;

/// Option listing the object field ids declared on a custom Pod.
pub const OBJECT_FIELDS_OPTION: &str = "_object_fields";

/// Custom and object field sets of one Pod, filled lazily.
///
/// Both sets are keyed by the owning Pod's version token and recomputed
/// whenever it changes.
#[derive(Debug, Default)]
pub struct FieldCatalog {
    custom: VersionedCache<u64, FieldMap>,
    object: VersionedCache<u64, FieldMap>,
}

impl FieldCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Custom fields: the Pod's persisted field records.
    pub fn fields<S: ObjectStore + ?Sized>(
        &mut self,
        store: &S,
        definition: &PodDefinition,
        version: u64,
    ) -> Result<&FieldMap, Error> {
        self.custom
            .get_or_try_insert_with(version, || load_custom_fields(store, definition))
    }

    /// Object fields: declared ids for custom Pods, host columns otherwise.
    pub fn object_fields<S: ObjectStore + ?Sized>(
        &mut self,
        store: &S,
        definition: &PodDefinition,
        version: u64,
    ) -> Result<&FieldMap, Error> {
        self.object
            .get_or_try_insert_with(version, || load_object_fields(store, definition))
    }

    /// Look a field up by name, custom fields first.
    pub fn field<S: ObjectStore + ?Sized>(
        &mut self,
        store: &S,
        definition: &PodDefinition,
        version: u64,
        name: &str,
    ) -> Result<Option<Field>, Error> {
        if let Some(field) = self.fields(store, definition, version)?.get(name) {
            return Ok(Some(field.clone()));
        }
        Ok(self
            .object_fields(store, definition, version)?
            .get(name)
            .cloned())
    }

    /// Drop both sets.
    pub fn clear(&mut self) {
        self.custom.clear();
        self.object.clear();
    }
}

fn load_custom_fields<S: ObjectStore + ?Sized>(
    store: &S,
    definition: &PodDefinition,
) -> Result<FieldMap, Error> {
    let mut fields = FieldMap::new();
    if definition.id == 0 {
        return Ok(fields);
    }

    for record in store.fetch_children(definition.id, FIELD_RECORD_TYPE)? {
        if let Some(field) = store.resolve_field(definition.id, record.id)? {
            fields.insert(field.name.clone(), field);
        }
    }

    debug!(pod = %definition.name, count = fields.len(), "loaded custom fields");
    Ok(fields)
}

fn load_object_fields<S: ObjectStore + ?Sized>(
    store: &S,
    definition: &PodDefinition,
) -> Result<FieldMap, Error> {
    if !definition.is_custom() {
        return store.builtin_object_fields(definition.pod_type, definition);
    }

    let mut fields = FieldMap::new();
    let declared = definition
        .extra
        .get(OBJECT_FIELDS_OPTION)
        .map(value::as_id_list)
        .unwrap_or_default();

    for field_id in declared {
        if let Some(field) = store.resolve_field(definition.id, field_id)? {
            fields.insert(field.name.clone(), field);
        }
    }

    debug!(pod = %definition.name, count = fields.len(), "loaded declared object fields");
    Ok(fields)
}
