//! Sled-backed host store.

use super::builtin::{builtin_object_fields, BuiltinKind, BuiltinType};
use super::key::{child_key, decode_id, id_key, meta_key, name_key, ID_SIZE};
use super::{ObjectStore, RawRecord, StoreConfig, StoredRecord, FIELD_RECORD_TYPE, POD_RECORD_TYPE};
use crate::catalog::{Field, FieldMap};
use crate::error::Error;
use crate::pod::{derive_table_info, PodDefinition, PodType, TableInfo};
use crate::value::{self, Options};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde_json::Value;
use sled::{Db, Tree};
use std::collections::HashMap;
use tracing::{debug, info};

/// Tree name for host records.
const RECORDS_TREE: &str = "records";

/// Tree name for record meta.
const META_TREE: &str = "meta";

/// Tree name for the (record type, parent, name) → id index.
const NAME_INDEX_TREE: &str = "index:name";

/// Tree name for the (parent, child) index.
const CHILD_INDEX_TREE: &str = "index:parent";

/// Option keys that map onto record columns instead of meta.
const RECORD_KEYS: &[&str] = &["id", "name", "label", "description", "parent_id"];

/// Option keys consumed by duplicate and never copied into meta.
const DUPLICATE_KEYS: &[&str] = &["id", "name", "new_name"];

/// Option keys that locate a field's Pod.
const FIELD_POD_KEYS: &[&str] = &["pod_id", "pod"];

/// Memo key for built-in object fields: (kind, pod name, object, pod id).
type ObjectFieldKey = (PodType, String, String, u64);

/// A host store persisting Pods, fields and meta in sled.
pub struct HostStore {
    /// The underlying sled database.
    db: Db,

    /// Host records keyed by id.
    records: Tree,

    /// Meta keyed by (object id, key).
    meta: Tree,

    /// Name lookup index.
    name_index: Tree,

    /// Parent → child index.
    child_index: Tree,

    /// Table prefix and sled settings.
    config: StoreConfig,

    /// Registered host post types.
    post_types: RwLock<HashMap<String, BuiltinType>>,

    /// Registered host taxonomies.
    taxonomies: RwLock<HashMap<String, BuiltinType>>,

    /// Built-in object fields, synthesized once per Pod shape.
    object_fields: DashMap<ObjectFieldKey, FieldMap>,
}

impl HostStore {
    /// Open or create a store with the given configuration.
    pub fn open(config: StoreConfig) -> Result<Self, Error> {
        let db = config.to_sled_config().open()?;
        let records = db.open_tree(RECORDS_TREE)?;
        let meta = db.open_tree(META_TREE)?;
        let name_index = db.open_tree(NAME_INDEX_TREE)?;
        let child_index = db.open_tree(CHILD_INDEX_TREE)?;

        let registry = |kind| {
            BuiltinType::defaults(kind)
                .into_iter()
                .map(|t| (t.name.clone(), t))
                .collect::<HashMap<_, _>>()
        };

        Ok(Self {
            db,
            records,
            meta,
            name_index,
            child_index,
            config,
            post_types: RwLock::new(registry(BuiltinKind::PostType)),
            taxonomies: RwLock::new(registry(BuiltinKind::Taxonomy)),
            object_fields: DashMap::new(),
        })
    }

    /// Open a temporary store.
    pub fn temporary() -> Result<Self, Error> {
        Self::open(StoreConfig::temporary())
    }

    /// The configuration this store was opened with.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Register a host post type.
    pub fn register_post_type(&self, post_type: BuiltinType) {
        self.post_types
            .write()
            .insert(post_type.name.clone(), post_type);
    }

    /// Register a host taxonomy.
    pub fn register_taxonomy(&self, taxonomy: BuiltinType) {
        self.taxonomies
            .write()
            .insert(taxonomy.name.clone(), taxonomy);
    }

    /// Flush pending writes to disk.
    pub fn flush(&self) -> Result<(), Error> {
        self.db.flush()?;
        Ok(())
    }

    fn next_id(&self) -> Result<u64, Error> {
        Ok(self.db.generate_id()? + 1)
    }

    fn load_stored(&self, id: u64) -> Result<Option<StoredRecord>, Error> {
        match self.records.get(id_key(id))? {
            Some(bytes) => Ok(Some(StoredRecord::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    fn load_meta(&self, id: u64) -> Result<Options, Error> {
        let mut meta = Options::new();
        for entry in self.meta.scan_prefix(id_key(id)) {
            let (key, bytes) = entry?;
            let name = String::from_utf8_lossy(&key[ID_SIZE..]).into_owned();
            meta.insert(name, serde_json::from_slice(&bytes)?);
        }
        Ok(meta)
    }

    fn load(&self, id: u64) -> Result<Option<RawRecord>, Error> {
        match self.load_stored(id)? {
            Some(stored) => {
                let meta = self.load_meta(id)?;
                Ok(Some(RawRecord::from_stored(stored, meta)))
            }
            None => Ok(None),
        }
    }

    fn find_id(&self, name: &str, record_type: &str, parent_id: u64) -> Result<Option<u64>, Error> {
        Ok(self
            .name_index
            .get(name_key(record_type, parent_id, name))?
            .and_then(|bytes| decode_id(&bytes)))
    }

    fn load_typed(&self, id: u64, record_type: &str) -> Result<Option<RawRecord>, Error> {
        Ok(self.load(id)?.filter(|r| r.record_type == record_type))
    }

    /// Write a record and its indexes. Existing meta is left untouched.
    fn put_record(&self, record: &StoredRecord, previous: Option<&StoredRecord>) -> Result<(), Error> {
        if let Some(old) = previous {
            if old.name != record.name || old.parent_id != record.parent_id {
                self.name_index
                    .remove(name_key(&old.record_type, old.parent_id, &old.name))?;
            }
            if old.parent_id != record.parent_id {
                self.child_index.remove(child_key(old.parent_id, old.id))?;
            }
        }

        self.records.insert(id_key(record.id), record.to_bytes()?)?;
        self.name_index.insert(
            name_key(&record.record_type, record.parent_id, &record.name),
            id_key(record.id).to_vec(),
        )?;
        self.child_index
            .insert(child_key(record.parent_id, record.id), Vec::<u8>::new())?;
        Ok(())
    }

    fn remove_record(&self, record: &StoredRecord) -> Result<(), Error> {
        for entry in self.meta.scan_prefix(id_key(record.id)) {
            let (key, _) = entry?;
            self.meta.remove(key)?;
        }
        self.name_index
            .remove(name_key(&record.record_type, record.parent_id, &record.name))?;
        self.child_index
            .remove(child_key(record.parent_id, record.id))?;
        self.records.remove(id_key(record.id))?;
        Ok(())
    }

    fn write_meta(&self, id: u64, options: &Options, skip: &[&str]) -> Result<(), Error> {
        for (key, value) in options {
            if skip.contains(&key.as_str()) {
                continue;
            }
            self.set_meta(key, id, value.clone())?;
        }
        Ok(())
    }

    /// Apply record-column options onto a stored record.
    fn apply_columns(record: &mut StoredRecord, options: &Options) {
        if let Some(name) = options.get("name").map(value::as_string) {
            if !name.is_empty() {
                record.name = name;
            }
        }
        if let Some(label) = options.get("label") {
            record.title = value::as_string(label);
        }
        if let Some(description) = options.get("description") {
            record.content = value::as_string(description);
        }
        if let Some(parent_id) = options.get("parent_id").and_then(value::as_u64) {
            record.parent_id = parent_id;
        }
    }

    fn ensure_unique(&self, record: &StoredRecord) -> Result<(), Error> {
        match self.find_id(&record.name, &record.record_type, record.parent_id)? {
            Some(existing) if existing != record.id => Err(Error::InvalidData(format!(
                "{} {} already exists",
                kind_noun(&record.record_type),
                record.name
            ))),
            _ => Ok(()),
        }
    }

    /// Create or update a record of `record_type` from options.
    fn save_record(
        &self,
        record_type: &str,
        options: &Options,
        parent_id: Option<u64>,
        meta_skip: &[&str],
    ) -> Result<u64, Error> {
        let id = options.get("id").and_then(value::as_u64).unwrap_or(0);

        let (mut record, previous) = if id > 0 {
            let existing = self.load_stored(id)?.filter(|r| r.record_type == record_type);
            let existing = existing.ok_or_else(|| {
                Error::InvalidData(format!("{} {id} not found", kind_noun(record_type)))
            })?;
            (existing.clone(), Some(existing))
        } else {
            let name = options.get("name").map(value::as_string).unwrap_or_default();
            if name.is_empty() {
                return Err(Error::InvalidData(format!(
                    "{} name is required",
                    kind_noun(record_type)
                )));
            }
            let record = StoredRecord {
                id: self.next_id()?,
                record_type: record_type.to_string(),
                name,
                title: String::new(),
                content: String::new(),
                parent_id: 0,
            };
            (record, None)
        };

        Self::apply_columns(&mut record, options);
        if let Some(parent_id) = parent_id {
            record.parent_id = parent_id;
        }
        self.ensure_unique(&record)?;
        self.put_record(&record, previous.as_ref())?;

        let skip: Vec<&str> = RECORD_KEYS.iter().chain(meta_skip).copied().collect();
        self.write_meta(record.id, options, &skip)?;

        Ok(record.id)
    }

    /// First free `<base><n>` name for a copy, starting at 2.
    fn free_name(&self, base: &str, parent_id: u64) -> Result<String, Error> {
        let mut attempt = 2u32;
        loop {
            let candidate = format!("{base}{attempt}");
            if self.find_id(&candidate, POD_RECORD_TYPE, parent_id)?.is_none() {
                return Ok(candidate);
            }
            attempt += 1;
        }
    }

    fn pod_from_params(&self, params: &Options) -> Result<Option<StoredRecord>, Error> {
        let id = params.get("id").and_then(value::as_u64).unwrap_or(0);
        if id > 0 {
            return Ok(self.load_stored(id)?.filter(|r| r.record_type == POD_RECORD_TYPE));
        }

        let name = params.get("name").map(value::as_string).unwrap_or_default();
        if name.is_empty() {
            return Ok(None);
        }
        let parent_id = params.get("parent_id").and_then(value::as_u64).unwrap_or(0);
        match self.find_id(&name, POD_RECORD_TYPE, parent_id)? {
            Some(id) => self.load_stored(id),
            None => Ok(None),
        }
    }
}

fn kind_noun(record_type: &str) -> &'static str {
    match record_type {
        POD_RECORD_TYPE => "pod",
        FIELD_RECORD_TYPE => "field",
        _ => "record",
    }
}

impl ObjectStore for HostStore {
    fn fetch_by_id(&self, id: u64) -> Result<Option<RawRecord>, Error> {
        if id == 0 {
            return Ok(None);
        }
        self.load(id)
    }

    fn fetch_by_name(
        &self,
        name: &str,
        record_type: &str,
        parent_id: u64,
    ) -> Result<Option<RawRecord>, Error> {
        match self.find_id(name, record_type, parent_id)? {
            Some(id) => self.load_typed(id, record_type),
            None => Ok(None),
        }
    }

    fn fetch_children(&self, parent_id: u64, record_type: &str) -> Result<Vec<RawRecord>, Error> {
        let mut children = Vec::new();
        for entry in self.child_index.scan_prefix(id_key(parent_id)) {
            let (key, _) = entry?;
            let Some(child_id) = decode_id(&key[ID_SIZE..]) else {
                continue;
            };
            if let Some(record) = self.load_typed(child_id, record_type)? {
                children.push(record);
            }
        }
        Ok(children)
    }

    fn builtin_type(&self, kind: BuiltinKind, name: &str) -> Result<Option<BuiltinType>, Error> {
        let registry = match kind {
            BuiltinKind::PostType => self.post_types.read(),
            BuiltinKind::Taxonomy => self.taxonomies.read(),
        };
        Ok(registry.get(name).cloned())
    }

    fn get_meta(&self, key: &str, object_id: u64) -> Result<Option<Value>, Error> {
        match self.meta.get(meta_key(object_id, key))? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn set_meta(&self, key: &str, object_id: u64, value: Value) -> Result<(), Error> {
        let key = meta_key(object_id, key);
        if value.is_null() {
            self.meta.remove(key)?;
        } else {
            self.meta.insert(key, serde_json::to_vec(&value)?)?;
        }
        Ok(())
    }

    fn save_pod(&self, params: &Options) -> Result<u64, Error> {
        let params = value::normalize_keys(params.clone());
        let id = self.save_record(POD_RECORD_TYPE, &params, None, &[])?;
        // Shapes derived from the old definition are stale now.
        self.object_fields.retain(|key, _| key.3 != id);
        info!(pod_id = id, "saved pod");
        Ok(id)
    }

    fn duplicate_pod(&self, params: &Options) -> Result<u64, Error> {
        let params = value::normalize_keys(params.clone());
        let source = self
            .pod_from_params(&params)?
            .ok_or_else(|| Error::InvalidData("pod to duplicate not found".to_string()))?;

        let base = params
            .get("name")
            .map(value::as_string)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| source.name.clone());
        let new_name = match params.get("new_name").map(value::as_string) {
            Some(name) if !name.is_empty() => name,
            _ => self.free_name(&base, source.parent_id)?,
        };

        let mut copy = StoredRecord {
            id: self.next_id()?,
            name: new_name,
            ..source.clone()
        };
        Self::apply_columns(&mut copy, &strip(&params, DUPLICATE_KEYS));
        self.ensure_unique(&copy)?;
        self.put_record(&copy, None)?;

        self.write_meta(copy.id, &self.load_meta(source.id)?, &[])?;
        self.write_meta(
            copy.id,
            &params,
            &RECORD_KEYS.iter().chain(DUPLICATE_KEYS).copied().collect::<Vec<_>>(),
        )?;

        for field in self.fetch_children(source.id, FIELD_RECORD_TYPE)? {
            let field_copy = StoredRecord {
                id: self.next_id()?,
                parent_id: copy.id,
                ..field.to_stored()
            };
            self.put_record(&field_copy, None)?;
            self.write_meta(field_copy.id, &field.meta, &[])?;
        }

        info!(source_id = source.id, pod_id = copy.id, name = %copy.name, "duplicated pod");
        Ok(copy.id)
    }

    fn delete_pod(&self, params: &Options) -> Result<bool, Error> {
        let params = value::normalize_keys(params.clone());
        let Some(pod) = self.pod_from_params(&params)? else {
            debug!("delete requested for unknown pod");
            return Ok(false);
        };

        for field in self.fetch_children(pod.id, FIELD_RECORD_TYPE)? {
            self.remove_record(&field.to_stored())?;
        }
        self.remove_record(&pod)?;
        self.object_fields.retain(|key, _| key.3 != pod.id);

        info!(pod_id = pod.id, name = %pod.name, "deleted pod");
        Ok(true)
    }

    fn save_field(&self, params: &Options) -> Result<u64, Error> {
        let params = value::normalize_keys(params.clone());
        let pod_id = params.get("pod_id").and_then(value::as_u64).unwrap_or(0);

        let pod = if pod_id > 0 {
            self.load_typed(pod_id, POD_RECORD_TYPE)?
        } else {
            let pod_name = params.get("pod").map(value::as_string).unwrap_or_default();
            self.fetch_by_name(&pod_name, POD_RECORD_TYPE, 0)?
        };
        let pod = pod.ok_or_else(|| Error::InvalidData("pod not found for field".to_string()))?;

        let id = self.save_record(FIELD_RECORD_TYPE, &params, Some(pod.id), FIELD_POD_KEYS)?;
        info!(pod_id = pod.id, field_id = id, "saved field");
        Ok(id)
    }

    fn resolve_field(&self, pod_id: u64, field_id: u64) -> Result<Option<Field>, Error> {
        let Some(record) = self.load_typed(field_id, FIELD_RECORD_TYPE)? else {
            return Ok(None);
        };
        if record.parent_id != pod_id {
            return Ok(None);
        }
        let pod_name = self
            .load_stored(pod_id)?
            .map(|pod| pod.name)
            .unwrap_or_default();

        let mut options = record.meta;
        options.insert("id".into(), Value::from(record.id));
        options.insert("name".into(), Value::from(record.name));
        options.insert("label".into(), Value::from(record.title));
        options.insert("description".into(), Value::from(record.content));
        options.insert("pod".into(), Value::from(pod_name));
        options.insert("pod_id".into(), Value::from(pod_id));

        Ok(Some(Field::from_options(options)))
    }

    fn builtin_object_fields(
        &self,
        pod_type: PodType,
        definition: &PodDefinition,
    ) -> Result<FieldMap, Error> {
        let key = (
            pod_type,
            definition.name.clone(),
            definition.object.clone(),
            definition.id,
        );
        let fields = self
            .object_fields
            .entry(key)
            .or_insert_with(|| {
                debug!(pod = %definition.name, %pod_type, "synthesizing object fields");
                builtin_object_fields(pod_type, definition)
            })
            .value()
            .clone();
        Ok(fields)
    }

    fn table_info(
        &self,
        pod_type: PodType,
        object: &str,
        name: &str,
        definition: &PodDefinition,
    ) -> Result<TableInfo, Error> {
        Ok(derive_table_info(
            &self.config.table_prefix,
            pod_type,
            object,
            name,
            definition,
        ))
    }
}

fn strip(options: &Options, keys: &[&str]) -> Options {
    options
        .iter()
        .filter(|(k, _)| !keys.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn options(pairs: &[(&str, Value)]) -> Options {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn store() -> HostStore {
        HostStore::temporary().unwrap()
    }

    #[test]
    fn test_save_pod_requires_name() {
        let store = store();
        let err = store.save_pod(&Options::new()).unwrap_err();
        assert!(err.to_string().contains("pod name is required"));
    }

    #[test]
    fn test_save_and_fetch_pod() {
        let store = store();
        let id = store
            .save_pod(&options(&[
                ("name", json!("book")),
                ("label", json!("Books")),
                ("type", json!("post_type")),
                ("storage", json!("meta")),
            ]))
            .unwrap();
        assert!(id > 0);

        let record = store.fetch_by_id(id).unwrap().unwrap();
        assert_eq!(record.record_type, POD_RECORD_TYPE);
        assert_eq!(record.title, "Books");
        assert_eq!(record.meta["storage"], json!("meta"));

        let by_name = store.fetch_by_name("book", POD_RECORD_TYPE, 0).unwrap();
        assert_eq!(by_name.map(|r| r.id), Some(id));
        assert!(store.fetch_by_name("book", POD_RECORD_TYPE, 9).unwrap().is_none());

        assert_eq!(store.get_meta("type", id).unwrap(), Some(json!("post_type")));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let store = store();
        store.save_pod(&options(&[("name", json!("book"))])).unwrap();
        let err = store.save_pod(&options(&[("name", json!("book"))])).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn test_update_renames_index() {
        let store = store();
        let id = store.save_pod(&options(&[("name", json!("book"))])).unwrap();
        store
            .save_pod(&options(&[("id", json!(id)), ("name", json!("novel"))]))
            .unwrap();

        assert!(store.fetch_by_name("book", POD_RECORD_TYPE, 0).unwrap().is_none());
        assert!(store.fetch_by_name("novel", POD_RECORD_TYPE, 0).unwrap().is_some());
    }

    #[test]
    fn test_fields_and_children() {
        let store = store();
        let pod_id = store.save_pod(&options(&[("name", json!("book"))])).unwrap();
        let field_id = store
            .save_field(&options(&[
                ("pod_id", json!(pod_id)),
                ("name", json!("author")),
                ("type", json!("pick")),
                ("pick_object", json!("user")),
            ]))
            .unwrap();
        store
            .save_field(&options(&[("pod", json!("book")), ("name", json!("pages")), ("type", json!("number"))]))
            .unwrap();

        let children = store.fetch_children(pod_id, FIELD_RECORD_TYPE).unwrap();
        let names: Vec<_> = children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["author", "pages"]);

        let field = store.resolve_field(pod_id, field_id).unwrap().unwrap();
        assert_eq!(field.pod, "book");
        assert!(field.is_relationship());
        assert!(!field.options.contains_key("pod_id"));

        assert!(store.resolve_field(pod_id + 100, field_id).unwrap().is_none());
    }

    #[test]
    fn test_save_field_without_pod() {
        let store = store();
        let err = store
            .save_field(&options(&[("pod", json!("missing")), ("name", json!("x"))]))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
    }

    #[test]
    fn test_duplicate_pod_copies_fields() {
        let store = store();
        let pod_id = store
            .save_pod(&options(&[("name", json!("book")), ("storage", json!("table"))]))
            .unwrap();
        store
            .save_field(&options(&[("pod_id", json!(pod_id)), ("name", json!("isbn"))]))
            .unwrap();

        let copy_id = store
            .duplicate_pod(&options(&[("id", json!(pod_id)), ("name", json!("book"))]))
            .unwrap();
        let copy = store.fetch_by_id(copy_id).unwrap().unwrap();
        assert_eq!(copy.name, "book2");
        assert_eq!(copy.meta["storage"], json!("table"));
        assert_eq!(store.fetch_children(copy_id, FIELD_RECORD_TYPE).unwrap().len(), 1);

        let third = store
            .duplicate_pod(&options(&[("id", json!(pod_id)), ("name", json!("book"))]))
            .unwrap();
        assert_eq!(store.fetch_by_id(third).unwrap().unwrap().name, "book3");
    }

    #[test]
    fn test_delete_pod() {
        let store = store();
        let pod_id = store.save_pod(&options(&[("name", json!("book"))])).unwrap();
        let field_id = store
            .save_field(&options(&[("pod_id", json!(pod_id)), ("name", json!("isbn"))]))
            .unwrap();

        assert!(store.delete_pod(&options(&[("id", json!(pod_id))])).unwrap());
        assert!(store.fetch_by_id(pod_id).unwrap().is_none());
        assert!(store.fetch_by_id(field_id).unwrap().is_none());
        assert!(store.get_meta("type", pod_id).unwrap().is_none());
        assert!(!store.delete_pod(&options(&[("id", json!(pod_id))])).unwrap());
    }

    #[test]
    fn test_builtin_registry() {
        let store = store();
        assert!(store.builtin_type(BuiltinKind::PostType, "page").unwrap().is_some());
        assert!(store.builtin_type(BuiltinKind::PostType, "movie").unwrap().is_none());

        store.register_post_type(BuiltinType::new("movie", "Movies", "Movie"));
        let movie = store.builtin_type(BuiltinKind::PostType, "movie").unwrap().unwrap();
        assert_eq!(movie.label_singular, "Movie");
    }

    #[test]
    fn test_persistence() {
        let dir = tempfile::tempdir().unwrap();

        let id = {
            let store = HostStore::open(StoreConfig::new(dir.path())).unwrap();
            let id = store.save_pod(&options(&[("name", json!("book"))])).unwrap();
            store.flush().unwrap();
            id
        };

        let store = HostStore::open(StoreConfig::new(dir.path())).unwrap();
        let record = store.fetch_by_name("book", POD_RECORD_TYPE, 0).unwrap().unwrap();
        assert_eq!(record.id, id);
    }
}
