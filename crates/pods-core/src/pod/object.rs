//! The Pod handle.

use super::input::{ParentRef, PodInput, PodOptions};
use super::resolver;
use super::{PodDefinition, TableInfo};
use crate::catalog::{Field, FieldCatalog, FieldMap, VersionedCache};
use crate::error::Error;
use crate::store::ObjectStore;
use crate::tenant;
use crate::value::Options;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info};

static NO_FIELDS: FieldMap = BTreeMap::new();

/// A resolved Pod and its lazily filled caches.
///
/// A handle is either valid (holds a definition) or invalid. Every time the
/// definition is replaced or dropped the handle's version advances, which
/// invalidates the field catalogs and table info in one step. Table info is
/// additionally keyed by the tenant generation.
///
/// Handles borrow their store and are not meant to be shared between
/// threads; each request builds its own.
pub struct Pod<'s, S: ObjectStore + ?Sized> {
    store: &'s S,
    definition: Option<PodDefinition>,
    version: u64,
    catalog: FieldCatalog,
    table_info: VersionedCache<(u64, u64), TableInfo>,
}

impl<'s, S: ObjectStore + ?Sized> Pod<'s, S> {
    /// An invalid handle.
    pub fn new(store: &'s S) -> Self {
        Self {
            store,
            definition: None,
            version: 0,
            catalog: FieldCatalog::new(),
            table_info: VersionedCache::new(),
        }
    }

    /// Resolve from a name, record or definition payload.
    pub fn load(store: &'s S, input: impl Into<PodInput>) -> Result<Self, Error> {
        let mut pod = Self::new(store);
        pod.init(input, 0, ParentRef::None)?;
        Ok(pod)
    }

    /// Resolve a name within a parent Pod.
    pub fn load_in(
        store: &'s S,
        input: impl Into<PodInput>,
        parent: impl Into<ParentRef>,
    ) -> Result<Self, Error> {
        let mut pod = Self::new(store);
        pod.init(input, 0, parent)?;
        Ok(pod)
    }

    /// Resolve a persisted Pod by id.
    pub fn by_id(store: &'s S, id: u64) -> Result<Self, Error> {
        let mut pod = Self::new(store);
        pod.init(PodInput::Unset, id, ParentRef::None)?;
        Ok(pod)
    }

    /// Resolve and adopt a definition.
    ///
    /// With nothing given on a valid handle this re-resolves the current
    /// Pod by id. Pods without a persisted record (`user`, host post types)
    /// have nothing to re-read and are kept as they are.
    ///
    /// Returns the resolved id (0 for synthetic Pods), or `None` when
    /// nothing matched; the current definition is kept in that case unless
    /// it was dropped for a refresh.
    pub fn init(
        &mut self,
        input: impl Into<PodInput>,
        id: u64,
        parent: impl Into<ParentRef>,
    ) -> Result<Option<u64>, Error> {
        let input = input.into();
        let parent = parent.into();
        let mut id = id;

        if matches!(input, PodInput::Unset) && id == 0 && parent.is_none() {
            if let Some(current) = &self.definition {
                if current.id == 0 {
                    return Ok(Some(0));
                }
                id = current.id;
                debug!(pod = %current.name, id, "refreshing pod");
                self.destroy();
            }
        }

        match resolver::resolve(self.store, &input, id, parent)? {
            Some(definition) => {
                let id = definition.id;
                self.adopt(definition);
                Ok(Some(id))
            }
            None => Ok(None),
        }
    }

    /// Re-resolve the current Pod.
    pub fn refresh(&mut self) -> Result<Option<u64>, Error> {
        self.init(PodInput::Unset, 0, ParentRef::None)
    }

    fn adopt(&mut self, definition: PodDefinition) {
        self.definition = Some(definition);
        self.invalidate();
    }

    fn invalidate(&mut self) {
        self.version += 1;
        self.catalog.clear();
        self.table_info.clear();
    }

    /// Whether the handle holds a definition.
    pub fn is_valid(&self) -> bool {
        self.definition.is_some()
    }

    /// The current definition.
    pub fn definition(&self) -> Option<&PodDefinition> {
        self.definition.as_ref()
    }

    /// Persisted id, 0 when invalid or synthetic.
    pub fn id(&self) -> u64 {
        self.definition.as_ref().map_or(0, |d| d.id)
    }

    /// Pod name, empty when invalid.
    pub fn name(&self) -> &str {
        self.definition.as_ref().map_or("", |d| d.name.as_str())
    }

    /// Version token of the current definition.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Drop the definition and every cache.
    pub fn destroy(&mut self) {
        self.definition = None;
        self.invalidate();
    }

    /// Read a definition option.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.definition.as_ref().and_then(|d| d.get(key))
    }

    /// Overwrite a definition option in memory. Caches are left alone.
    pub fn set(&mut self, key: &str, value: Value) {
        if let Some(definition) = self.definition.as_mut() {
            definition.set(key, value);
        }
    }

    /// Custom fields, by name.
    pub fn fields(&mut self) -> Result<&FieldMap, Error> {
        let Some(definition) = self.definition.as_ref() else {
            return Ok(&NO_FIELDS);
        };
        self.catalog.fields(self.store, definition, self.version)
    }

    /// Look up a field by name: custom fields first, then object fields.
    pub fn field(&mut self, name: &str) -> Result<Option<Field>, Error> {
        let Some(definition) = self.definition.as_ref() else {
            return Ok(None);
        };
        self.catalog.field(self.store, definition, self.version, name)
    }

    /// One option of a field.
    pub fn field_option(&mut self, name: &str, option: &str) -> Result<Option<Value>, Error> {
        Ok(self.field(name)?.and_then(|field| field.option(option)))
    }

    /// Object fields, by name.
    pub fn object_fields(&mut self) -> Result<&FieldMap, Error> {
        let Some(definition) = self.definition.as_ref() else {
            return Ok(&NO_FIELDS);
        };
        self.catalog.object_fields(self.store, definition, self.version)
    }

    /// Look up an object field by name.
    pub fn object_field(&mut self, name: &str) -> Result<Option<Field>, Error> {
        Ok(self.object_fields()?.get(name).cloned())
    }

    /// One option of an object field.
    pub fn object_field_option(
        &mut self,
        name: &str,
        option: &str,
    ) -> Result<Option<Value>, Error> {
        Ok(self
            .object_fields()?
            .get(name)
            .and_then(|field| field.option(option)))
    }

    /// Table info for the current tenant, computed once per version.
    pub fn table_info(&mut self) -> Result<Option<TableInfo>, Error> {
        let Some(definition) = self.definition.as_ref() else {
            return Ok(None);
        };
        let store = self.store;
        let token = (self.version, tenant::generation());
        let info = self.table_info.get_or_try_insert_with(token, || {
            store.table_info(
                definition.pod_type,
                &definition.object,
                &definition.name,
                definition,
            )
        })?;
        Ok(Some(info.clone()))
    }

    /// Drop tenant-derived caches after the host switched context.
    pub fn on_context_switch(&mut self) {
        self.table_info.clear();
    }

    /// Persist options.
    ///
    /// Empty options are a no-op returning the current id. With `refresh`
    /// the definition is re-resolved from the store; otherwise the saved
    /// options are applied in memory and caches are kept.
    pub fn save(
        &mut self,
        options: impl Into<PodOptions>,
        refresh: bool,
    ) -> Result<Option<u64>, Error> {
        let Some(definition) = self.definition.as_ref() else {
            return Ok(None);
        };
        let options = options.into().into_options();
        if options.is_empty() {
            return Ok(Some(definition.id));
        }

        let mut params = options.clone();
        params.insert("id".into(), Value::from(definition.id));
        let id = self.store.save_pod(&params)?;
        info!(pod_id = id, "pod saved");

        if refresh {
            return self.init(PodInput::Unset, id, ParentRef::None);
        }

        if let Some(definition) = self.definition.as_mut() {
            for (key, value) in options {
                if key != "id" {
                    definition.set(&key, value);
                }
            }
        }
        Ok(Some(id))
    }

    /// Copy the Pod. With `replace` the handle switches to the copy.
    ///
    /// Empty options are a no-op returning the current id.
    pub fn duplicate(
        &mut self,
        options: impl Into<PodOptions>,
        replace: bool,
    ) -> Result<Option<u64>, Error> {
        let Some(definition) = self.definition.as_ref() else {
            return Ok(None);
        };
        let mut params = options.into().into_options();
        if params.is_empty() {
            return Ok(Some(definition.id));
        }
        params.insert("id".into(), Value::from(definition.id));
        params.insert("name".into(), Value::from(definition.name.clone()));
        params.insert("parent_id".into(), Value::from(definition.parent_id));

        let new_id = self.store.duplicate_pod(&params)?;
        if replace {
            return self.init(PodInput::Unset, new_id, ParentRef::None);
        }
        Ok(Some(new_id))
    }

    /// Delete the Pod from the store. The handle is always destroyed.
    pub fn delete(&mut self) -> Result<bool, Error> {
        let params = self.definition.as_ref().map(|definition| {
            let mut params = Options::new();
            params.insert("id".into(), Value::from(definition.id));
            params.insert("name".into(), Value::from(definition.name.clone()));
            params
        });

        let result = match params {
            Some(params) if self.id() > 0 => self.store.delete_pod(&params),
            _ => Ok(false),
        };
        self.destroy();
        result
    }
}

impl<S: ObjectStore + ?Sized> std::fmt::Debug for Pod<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pod")
            .field("definition", &self.definition)
            .field("version", &self.version)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pod::PodType;
    use crate::store::{HostStore, POD_RECORD_TYPE};
    use serde_json::json;

    fn create(store: &HostStore, pairs: &[(&str, Value)]) -> u64 {
        let params: Options = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        store.save_pod(&params).unwrap()
    }

    #[test]
    fn test_invalid_handle() {
        let store = HostStore::temporary().unwrap();
        let mut pod = Pod::load(&store, "missing").unwrap();

        assert!(!pod.is_valid());
        assert!(pod.fields().unwrap().is_empty());
        assert!(pod.field("anything").unwrap().is_none());
        assert!(pod.table_info().unwrap().is_none());
        assert_eq!(pod.save(("label", "x"), false).unwrap(), None);
        assert!(!pod.delete().unwrap());
    }

    #[test]
    fn test_refresh_picks_up_store_changes() {
        let store = HostStore::temporary().unwrap();
        let id = create(&store, &[("name", json!("book"))]);
        let mut pod = Pod::by_id(&store, id).unwrap();
        assert_eq!(pod.get("label"), Some(json!("book")));

        store.set_meta("alias", id, json!("tome")).unwrap();
        assert_eq!(pod.get("alias"), Some(json!("")));

        let version = pod.version();
        assert_eq!(pod.refresh().unwrap(), Some(id));
        assert!(pod.version() > version);
        assert_eq!(pod.get("alias"), Some(json!("tome")));
    }

    #[test]
    fn test_refresh_keeps_builtin_pod() {
        let store = HostStore::temporary().unwrap();
        let mut user = Pod::load(&store, "user").unwrap();
        let version = user.version();

        assert_eq!(user.refresh().unwrap(), Some(0));
        assert!(user.is_valid());
        assert_eq!(user.name(), "user");
        assert_eq!(user.version(), version);
    }

    #[test]
    fn test_set_keeps_caches() {
        let store = HostStore::temporary().unwrap();
        let mut pod = Pod::load(&store, "post").unwrap();
        let version = pod.version();

        pod.set("label", json!("Articles"));
        assert_eq!(pod.version(), version);
        assert_eq!(pod.get("post_title"), Some(json!("Articles")));
    }

    #[test]
    fn test_save_without_refresh_applies_in_memory() {
        let store = HostStore::temporary().unwrap();
        let id = create(&store, &[("name", json!("book"))]);
        let mut pod = Pod::by_id(&store, id).unwrap();
        let version = pod.version();

        assert_eq!(pod.save(("post_title", "Books"), false).unwrap(), Some(id));
        assert_eq!(pod.get("label"), Some(json!("Books")));
        assert_eq!(pod.version(), version);

        let reloaded = Pod::by_id(&store, id).unwrap();
        assert_eq!(reloaded.get("label"), Some(json!("Books")));
    }

    #[test]
    fn test_save_empty_is_noop() {
        let store = HostStore::temporary().unwrap();
        let id = create(&store, &[("name", json!("book"))]);
        let mut pod = Pod::by_id(&store, id).unwrap();
        let version = pod.version();

        assert_eq!(pod.save(Options::new(), true).unwrap(), Some(id));
        assert_eq!(pod.version(), version);
    }

    #[test]
    fn test_save_with_refresh() {
        let store = HostStore::temporary().unwrap();
        let id = create(&store, &[("name", json!("book"))]);
        let mut pod = Pod::by_id(&store, id).unwrap();
        let version = pod.version();

        assert_eq!(pod.save(("storage", "table"), true).unwrap(), Some(id));
        assert!(pod.version() > version);
        assert_eq!(pod.get("storage"), Some(json!("table")));
    }

    #[test]
    fn test_duplicate_and_replace() {
        let store = HostStore::temporary().unwrap();
        let id = create(&store, &[("name", json!("book")), ("type", json!("pod"))]);
        let mut pod = Pod::by_id(&store, id).unwrap();

        assert_eq!(pod.duplicate(Options::new(), true).unwrap(), Some(id));
        assert!(store.fetch_by_name("book2", POD_RECORD_TYPE, 0).unwrap().is_none());

        let copy = pod.duplicate(("label", "Copies"), false).unwrap().unwrap();
        assert_ne!(copy, id);
        assert_eq!(pod.id(), id);

        let replaced = pod.duplicate(("label", "Books"), true).unwrap().unwrap();
        assert_eq!(pod.id(), replaced);
        assert_eq!(pod.name(), "book3");
        assert_eq!(pod.definition().unwrap().pod_type, PodType::Pod);
    }

    #[test]
    fn test_delete_destroys() {
        let store = HostStore::temporary().unwrap();
        let id = create(&store, &[("name", json!("book"))]);
        let mut pod = Pod::by_id(&store, id).unwrap();

        assert!(pod.delete().unwrap());
        assert!(!pod.is_valid());
        assert!(!Pod::by_id(&store, id).unwrap().is_valid());
    }

    #[test]
    fn test_delete_synthetic_is_false() {
        let store = HostStore::temporary().unwrap();
        let mut pod = Pod::load(&store, "user").unwrap();
        assert!(pod.is_valid());
        assert!(!pod.delete().unwrap());
        assert!(!pod.is_valid());
    }

    #[test]
    fn test_table_info_for_host_post_type() {
        let store = HostStore::temporary().unwrap();
        let mut pod = Pod::load(&store, "page").unwrap();

        let info = pod.table_info().unwrap().unwrap();
        assert_eq!(info.table, "wp_posts");
        assert_eq!(info.object_name, "page");
        assert_eq!(info.meta_table.as_deref(), Some("wp_postmeta"));
    }

    #[test]
    fn test_object_field_option() {
        let store = HostStore::temporary().unwrap();
        let mut pod = Pod::load(&store, "post").unwrap();
        assert_eq!(
            pod.object_field_option("post_author", "pick_object").unwrap(),
            Some(json!("user"))
        );
        assert!(pod.object_field("post_author").unwrap().unwrap().is_relationship());
        assert!(pod.object_field("missing").unwrap().is_none());
    }

    #[test]
    fn test_load_in_parent() {
        let store = HostStore::temporary().unwrap();
        let parent = create(&store, &[("name", json!("library"))]);
        create(&store, &[("name", json!("shelf")), ("parent_id", json!(parent))]);

        let parent_pod = Pod::by_id(&store, parent).unwrap();
        let shelf = Pod::load_in(&store, "shelf", parent_pod.definition()).unwrap();
        assert!(shelf.is_valid());
        assert_eq!(shelf.definition().unwrap().parent_id, parent);
    }
}
