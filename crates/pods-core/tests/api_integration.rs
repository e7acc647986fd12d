//! Integration tests for resolution, persistence and traversal.

use pods_core::store::{BuiltinKind, BuiltinType, HostStore, RawRecord, StoreConfig};
use pods_core::{
    tenant, traverse, Error, Field, FieldMap, ObjectStore, Options, Pod, PodDefinition, PodType,
    Storage, TableInfo, TraverseParams,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};

struct TestContext {
    store: HostStore,
    _dir: tempfile::TempDir,
}

impl TestContext {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = HostStore::open(StoreConfig::new(dir.path().join("pods"))).unwrap();
        Self { store, _dir: dir }
    }

    fn pod(&self, name: &str, pairs: &[(&str, Value)]) -> u64 {
        let mut params = options(pairs);
        params.insert("name".into(), json!(name));
        self.store.save_pod(&params).unwrap()
    }

    fn field(&self, pod_id: u64, name: &str, pairs: &[(&str, Value)]) -> u64 {
        let mut params = options(pairs);
        params.insert("pod_id".into(), json!(pod_id));
        params.insert("name".into(), json!(name));
        self.store.save_field(&params).unwrap()
    }

    fn relationship(&self, pod_id: u64, name: &str, target: &str) -> u64 {
        self.field(
            pod_id,
            name,
            &[
                ("type", json!("pick")),
                ("pick_object", json!("pod")),
                ("pick_val", json!(target)),
                ("pick_format_type", json!("multi")),
            ],
        )
    }

    fn traverse(&self, pod: &str, expand: &[&str]) -> Vec<Field> {
        traverse(&self.store, &TraverseParams::new(pod, expand.iter().copied())).unwrap()
    }
}

fn options(pairs: &[(&str, Value)]) -> Options {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn setup_api_pods(ctx: &TestContext) {
    let meta_post_type = [("storage", json!("meta")), ("type", json!("post_type"))];
    let test_api = ctx.pod("test_api", &meta_post_type);
    let test_api2 = ctx.pod("test_api2", &meta_post_type);

    ctx.field(test_api, "number1", &[("type", json!("number"))]);
    ctx.relationship(test_api, "related_field", "test_api2");
    ctx.field(test_api2, "number2", &[("type", json!("number"))]);
    ctx.relationship(test_api2, "related_field2", "test_api");
}

fn target(field: &Field) -> &str {
    field.pick.as_ref().map(|p| p.target_pod()).unwrap_or_default()
}

// =========================================================================
// Traversal
// =========================================================================

#[test]
fn test_traverse_single_relationship() {
    let ctx = TestContext::new();
    setup_api_pods(&ctx);

    let path = ctx.traverse("test_api", &["related_field"]);
    assert_eq!(path.len(), 1);
    assert_eq!(path[0].name, "related_field");
    assert_eq!(path[0].pod, "test_api");
    assert_eq!(target(&path[0]), "test_api2");
}

#[test]
fn test_traverse_ignores_scalar_step() {
    let ctx = TestContext::new();
    setup_api_pods(&ctx);

    let path = ctx.traverse("test_api", &["related_field", "number1"]);
    assert_eq!(path.len(), 1);
    assert_eq!(path[0].name, "related_field");
}

#[test]
fn test_traverse_two_hops() {
    let ctx = TestContext::new();
    setup_api_pods(&ctx);

    let path = ctx.traverse("test_api", &["related_field", "related_field2"]);
    assert_eq!(path.len(), 2);
    assert_eq!(path[1].name, "related_field2");
    assert_eq!(path[1].pod, "test_api2");
    assert_eq!(target(&path[1]), "test_api");
}

#[test]
fn test_traverse_repeats_preserved() {
    let ctx = TestContext::new();
    setup_api_pods(&ctx);

    let path = ctx.traverse(
        "test_api",
        &["related_field", "related_field2", "related_field", "related_field2"],
    );
    let pods: Vec<_> = path.iter().map(|f| f.pod.as_str()).collect();
    assert_eq!(pods, vec!["test_api", "test_api2", "test_api", "test_api2"]);
    let targets: Vec<_> = path.iter().map(target).collect();
    assert_eq!(targets, vec!["test_api2", "test_api", "test_api2", "test_api"]);
}

#[test]
fn test_traverse_omits_scalar_between_hops() {
    let ctx = TestContext::new();
    let node = ctx.pod("node", &[("type", json!("pod"))]);
    ctx.relationship(node, "parent", "node");
    ctx.field(node, "weight", &[("type", json!("number"))]);

    let path = ctx.traverse("node", &["parent", "weight", "parent"]);
    assert_eq!(path.len(), 2);
    assert!(path.iter().all(|f| f.name == "parent"));
}

#[test]
fn test_traverse_into_users() {
    let ctx = TestContext::new();
    let book = ctx.pod("book", &[]);
    ctx.field(
        book,
        "reviewer",
        &[("type", json!("pick")), ("pick_object", json!("user"))],
    );

    let path = ctx.traverse("book", &["reviewer", "user_login", "primary_blog"]);
    assert_eq!(path.len(), 1);
    assert_eq!(target(&path[0]), "user");
}

#[test]
fn test_traverse_strict() {
    let ctx = TestContext::new();
    setup_api_pods(&ctx);

    let params = TraverseParams::new("test_api", ["related_field", "number1"]).strict();
    match traverse(&ctx.store, &params) {
        Err(Error::UnknownField { pod, field }) => {
            assert_eq!(pod, "test_api2");
            assert_eq!(field, "number1");
        }
        other => panic!("unexpected result: {other:?}"),
    }

    let params = TraverseParams::new("test_api", ["number1"]).strict();
    assert!(matches!(
        traverse(&ctx.store, &params),
        Err(Error::NotRelationship { .. })
    ));
}

// =========================================================================
// Resolution
// =========================================================================

#[test]
fn test_resolve_by_id_returns_id() {
    let ctx = TestContext::new();
    for name in ["a", "b", "c"] {
        let id = ctx.pod(name, &[]);
        let pod = Pod::by_id(&ctx.store, id).unwrap();
        assert_eq!(pod.definition().unwrap().id, id);
    }
}

#[test]
fn test_resolve_is_idempotent() {
    let ctx = TestContext::new();
    ctx.pod("event", &[("storage", json!("table")), ("type", json!("pod"))]);

    let key = |d: &PodDefinition| {
        (d.id, d.name.clone(), d.label.clone(), d.storage, d.pod_type)
    };
    let first = Pod::load(&ctx.store, "event").unwrap();
    let second = Pod::load(&ctx.store, "event").unwrap();
    assert_eq!(
        key(first.definition().unwrap()),
        key(second.definition().unwrap())
    );
    assert_eq!(first.definition().unwrap().storage, Storage::Table);
}

#[test]
fn test_label_defaulting() {
    let ctx = TestContext::new();
    ctx.pod("venue", &[]);
    ctx.pod("stage", &[("label", json!("Stages"))]);

    let venue = Pod::load(&ctx.store, "venue").unwrap();
    assert_eq!(venue.get("label"), Some(json!("venue")));
    assert_eq!(venue.get("label_singular"), Some(json!("venue")));

    let stage = Pod::load(&ctx.store, "stage").unwrap();
    assert_eq!(stage.get("label_singular"), Some(json!("Stages")));
}

#[test]
fn test_user_fallback() {
    let ctx = TestContext::new();
    let user = Pod::load(&ctx.store, "user").unwrap();
    let definition = user.definition().unwrap();

    assert_eq!(definition.pod_type, PodType::User);
    assert_eq!(definition.label, "Users");
    assert_eq!(definition.id, 0);
}

#[test]
fn test_registered_host_types() {
    let ctx = TestContext::new();
    ctx.store
        .register_post_type(BuiltinType::new("movie", "Movies", "Movie"));

    let movie = Pod::load(&ctx.store, "post_type_movie").unwrap();
    assert_eq!(movie.name(), "movie");
    assert_eq!(movie.get("label_singular"), Some(json!("Movie")));

    let tags = Pod::load(&ctx.store, "taxonomy_post_tag").unwrap();
    assert_eq!(tags.definition().unwrap().storage, Storage::None);

    assert!(ctx
        .store
        .builtin_type(BuiltinKind::Taxonomy, "genre")
        .unwrap()
        .is_none());
}

#[test]
fn test_record_input() {
    let ctx = TestContext::new();
    let id = ctx.pod("book", &[("show_in_menu", json!(false))]);
    let record = ctx.store.fetch_by_id(id).unwrap().unwrap();

    let pod = Pod::load(&ctx.store, record).unwrap();
    assert_eq!(pod.id(), id);
    assert_eq!(pod.get("show_in_menu"), Some(json!(false)));

    let post = RawRecord::new(0, "post", "hello-world");
    assert!(!Pod::load(&ctx.store, post).unwrap().is_valid());
}

#[test]
fn test_deprecated_keys() {
    let ctx = TestContext::new();
    let id = ctx.pod("book", &[("post_title", json!("Books"))]);
    let mut pod = Pod::by_id(&ctx.store, id).unwrap();

    assert_eq!(pod.get("ID"), Some(json!(id)));
    assert_eq!(pod.get("post_title"), Some(json!("Books")));
    assert_eq!(pod.get("post_name"), Some(json!("book")));

    pod.set("post_content", json!("All books"));
    assert_eq!(pod.get("description"), Some(json!("All books")));
}

#[test]
fn test_persistence_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pods");

    let id = {
        let store = HostStore::open(StoreConfig::new(&path)).unwrap();
        let id = store
            .save_pod(&options(&[("name", json!("book")), ("type", json!("pod"))]))
            .unwrap();
        store
            .save_field(&options(&[("pod_id", json!(id)), ("name", json!("isbn"))]))
            .unwrap();
        store.flush().unwrap();
        id
    };

    let store = HostStore::open(StoreConfig::new(&path)).unwrap();
    let mut pod = Pod::load(&store, "book").unwrap();
    assert_eq!(pod.id(), id);
    assert!(pod.definition().unwrap().is_custom());
    assert!(pod.fields().unwrap().contains_key("isbn"));
}

// =========================================================================
// Lifecycle
// =========================================================================

/// Counts persistence and table info calls on top of a [`HostStore`].
struct CountingStore {
    inner: HostStore,
    saves: AtomicUsize,
    table_infos: AtomicUsize,
}

impl CountingStore {
    fn new() -> Self {
        Self {
            inner: HostStore::temporary().unwrap(),
            saves: AtomicUsize::new(0),
            table_infos: AtomicUsize::new(0),
        }
    }
}

impl ObjectStore for CountingStore {
    fn fetch_by_id(&self, id: u64) -> Result<Option<RawRecord>, Error> {
        self.inner.fetch_by_id(id)
    }

    fn fetch_by_name(
        &self,
        name: &str,
        record_type: &str,
        parent_id: u64,
    ) -> Result<Option<RawRecord>, Error> {
        self.inner.fetch_by_name(name, record_type, parent_id)
    }

    fn fetch_children(&self, parent_id: u64, record_type: &str) -> Result<Vec<RawRecord>, Error> {
        self.inner.fetch_children(parent_id, record_type)
    }

    fn builtin_type(&self, kind: BuiltinKind, name: &str) -> Result<Option<BuiltinType>, Error> {
        self.inner.builtin_type(kind, name)
    }

    fn get_meta(&self, key: &str, object_id: u64) -> Result<Option<Value>, Error> {
        self.inner.get_meta(key, object_id)
    }

    fn set_meta(&self, key: &str, object_id: u64, value: Value) -> Result<(), Error> {
        self.inner.set_meta(key, object_id, value)
    }

    fn save_pod(&self, params: &Options) -> Result<u64, Error> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.inner.save_pod(params)
    }

    fn duplicate_pod(&self, params: &Options) -> Result<u64, Error> {
        self.inner.duplicate_pod(params)
    }

    fn delete_pod(&self, params: &Options) -> Result<bool, Error> {
        self.inner.delete_pod(params)
    }

    fn save_field(&self, params: &Options) -> Result<u64, Error> {
        self.inner.save_field(params)
    }

    fn resolve_field(&self, pod_id: u64, field_id: u64) -> Result<Option<Field>, Error> {
        self.inner.resolve_field(pod_id, field_id)
    }

    fn builtin_object_fields(
        &self,
        pod_type: PodType,
        definition: &PodDefinition,
    ) -> Result<FieldMap, Error> {
        self.inner.builtin_object_fields(pod_type, definition)
    }

    fn table_info(
        &self,
        pod_type: PodType,
        object: &str,
        name: &str,
        definition: &PodDefinition,
    ) -> Result<TableInfo, Error> {
        self.table_infos.fetch_add(1, Ordering::SeqCst);
        self.inner.table_info(pod_type, object, name, definition)
    }
}

#[test]
fn test_save_empty_makes_no_store_call() {
    let store = CountingStore::new();
    let id = store
        .save_pod(&options(&[("name", json!("book"))]))
        .unwrap();
    store.saves.store(0, Ordering::SeqCst);

    let mut pod = Pod::by_id(&store, id).unwrap();
    assert_eq!(pod.save(Options::new(), false).unwrap(), Some(id));
    assert_eq!(store.saves.load(Ordering::SeqCst), 0);

    assert_eq!(pod.save(("alias", "tome"), false).unwrap(), Some(id));
    assert_eq!(store.saves.load(Ordering::SeqCst), 1);
}

#[test]
fn test_save_on_invalid_makes_no_store_call() {
    let store = CountingStore::new();
    let mut pod = Pod::load(&store, "missing").unwrap();
    assert_eq!(pod.save(("label", "x"), true).unwrap(), None);
    assert_eq!(store.saves.load(Ordering::SeqCst), 0);
}

#[test]
fn test_table_info_recomputed_on_context_switch() {
    let store = CountingStore::new();
    let mut pod = Pod::load(&store, "page").unwrap();
    let calls = || store.table_infos.load(Ordering::SeqCst);

    let info = pod.table_info().unwrap().unwrap();
    pod.table_info().unwrap();
    assert_eq!(calls(), 1);

    tenant::switch_context();
    assert_eq!(pod.table_info().unwrap().unwrap(), info);
    assert_eq!(calls(), 2);
    pod.table_info().unwrap();
    assert_eq!(calls(), 2);

    pod.on_context_switch();
    pod.table_info().unwrap();
    assert_eq!(calls(), 3);
}

#[test]
fn test_delete_then_resolve() {
    let ctx = TestContext::new();
    let id = ctx.pod("book", &[]);
    let mut pod = Pod::load(&ctx.store, "book").unwrap();
    pod.fields().unwrap();

    assert!(pod.delete().unwrap());
    assert!(!pod.is_valid());
    assert!(pod.fields().unwrap().is_empty());
    assert!(!Pod::load(&ctx.store, "book").unwrap().is_valid());

    let recreated = ctx.pod("book", &[]);
    assert_ne!(recreated, id);
    assert_eq!(Pod::load(&ctx.store, "book").unwrap().id(), recreated);
}

#[test]
fn test_duplicate_copies_fields() {
    let ctx = TestContext::new();
    let id = ctx.pod("book", &[("type", json!("pod"))]);
    ctx.field(id, "isbn", &[]);

    let mut pod = Pod::by_id(&ctx.store, id).unwrap();
    let mut params = Options::new();
    params.insert("new_name".into(), json!("novel"));
    params.insert("label".into(), json!("Novels"));
    let copy = pod.duplicate(params, true).unwrap().unwrap();

    assert_eq!(pod.id(), copy);
    assert_eq!(pod.name(), "novel");
    assert_eq!(pod.get("label"), Some(json!("Novels")));
    let isbn = pod.field("isbn").unwrap().unwrap();
    assert_eq!(isbn.pod, "novel");

    assert!(Pod::load(&ctx.store, "book").unwrap().is_valid());
}

#[test]
fn test_duplicate_name_conflict() {
    let ctx = TestContext::new();
    let id = ctx.pod("book", &[]);
    ctx.pod("novel", &[]);

    let mut pod = Pod::by_id(&ctx.store, id).unwrap();
    let result = pod.duplicate(("new_name", "novel"), false);
    assert!(matches!(result, Err(Error::InvalidData(_))));
    assert_eq!(pod.id(), id);
}

#[test]
fn test_table_info_uses_prefix() {
    let dir = tempfile::tempdir().unwrap();
    let store =
        HostStore::open(StoreConfig::new(dir.path().join("pods")).with_table_prefix("wp_2_"))
            .unwrap();
    let id = store
        .save_pod(&options(&[("name", json!("event")), ("type", json!("pod"))]))
        .unwrap();

    let mut pod = Pod::by_id(&store, id).unwrap();
    let info = pod.table_info().unwrap().unwrap();
    assert_eq!(info.table, "wp_2_pods_event");
    assert_eq!(info.pod_table.as_deref(), Some("wp_2_pods_event"));
}
