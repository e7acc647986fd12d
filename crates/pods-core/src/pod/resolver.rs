//! Pod definition resolution.
//!
//! A name is tried against an ordered list of strategies; the first hit
//! wins. Every hit is then normalized against the definition defaults and,
//! for persisted Pods, enriched with stored meta.

use super::{ParentRef, PodDefinition, PodInput, PodType, Storage};
use crate::error::Error;
use crate::store::{BuiltinKind, ObjectStore, RawRecord, POD_RECORD_TYPE};
use crate::value::{self, Options};
use serde_json::Value;
use tracing::debug;

/// Meta keys read individually for persisted Pods.
pub const META_OVERRIDES: &[&str] = &["type", "storage", "object", "alias", "show_in_menu"];

/// Prefix accepted in front of host post type names.
pub const POST_TYPE_PREFIX: &str = "post_type_";

/// Prefix accepted in front of host taxonomy names.
pub const TAXONOMY_PREFIX: &str = "taxonomy_";

/// Prefix selecting a comment subtype.
pub const COMMENT_PREFIX: &str = "comment_";

/// A raw resolution hit before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum Candidate {
    /// A persisted Pod record.
    Persisted(RawRecord),
    /// A definition payload, given or synthesized.
    Payload(Options),
}

/// A named-lookup strategy.
pub type Strategy<S> = fn(&S, &str, u64) -> Result<Option<Candidate>, Error>;

/// Name strategies in the order they are tried.
pub fn strategies<S: ObjectStore + ?Sized>() -> [(&'static str, Strategy<S>); 5] {
    [
        ("persisted", persisted::<S>),
        ("pseudo_type", pseudo_type::<S>),
        ("post_type", post_type::<S>),
        ("taxonomy", taxonomy::<S>),
        ("comment_subtype", comment_subtype::<S>),
    ]
}

/// Resolve a definition.
///
/// `id > 0` is tried first and falls back to `input` with the id cleared.
/// Returns `Ok(None)` when nothing matches.
pub fn resolve<S: ObjectStore + ?Sized>(
    store: &S,
    input: &PodInput,
    id: u64,
    parent: ParentRef,
) -> Result<Option<PodDefinition>, Error> {
    let parent_id = parent.id();

    if id > 0 {
        match store.fetch_by_id(id)? {
            Some(record) if record.record_type == POD_RECORD_TYPE => {
                return normalize(store, Candidate::Persisted(record), parent_id).map(Some);
            }
            _ => {
                debug!(id, "no pod record for id, falling back to input");
                return resolve(store, input, 0, parent);
            }
        }
    }

    let candidate = match input {
        PodInput::Unset => None,
        PodInput::Record(record) if record.record_type == POD_RECORD_TYPE => {
            Some(Candidate::Persisted(record.clone()))
        }
        PodInput::Record(record) => {
            debug!(record_type = %record.record_type, "record is not a pod");
            None
        }
        PodInput::Definition(options) => Some(Candidate::Payload(options.clone())),
        PodInput::Name(name) if name.is_empty() => None,
        PodInput::Name(name) => by_name(store, name, parent_id)?,
    };

    match candidate {
        Some(candidate) => normalize(store, candidate, parent_id).map(Some),
        None => Ok(None),
    }
}

fn by_name<S: ObjectStore + ?Sized>(
    store: &S,
    name: &str,
    parent_id: u64,
) -> Result<Option<Candidate>, Error> {
    for (label, strategy) in strategies::<S>() {
        if let Some(candidate) = strategy(store, name, parent_id)? {
            debug!(pod = name, strategy = label, "resolved pod");
            return Ok(Some(candidate));
        }
    }
    debug!(pod = name, parent_id, "pod not found");
    Ok(None)
}

/// A persisted Pod with this name under `parent_id`.
pub fn persisted<S: ObjectStore + ?Sized>(
    store: &S,
    name: &str,
    parent_id: u64,
) -> Result<Option<Candidate>, Error> {
    Ok(store
        .fetch_by_name(name, POD_RECORD_TYPE, parent_id)?
        .map(Candidate::Persisted))
}

/// The `user`, `media` and `comment` host objects.
pub fn pseudo_type<S: ObjectStore + ?Sized>(
    _store: &S,
    name: &str,
    _parent_id: u64,
) -> Result<Option<Candidate>, Error> {
    let (label, singular, object) = match name {
        "user" => ("Users", "User", ""),
        "media" => ("Media", "Media", ""),
        "comment" => ("Pod Fields", "Pod Field", "comment"),
        _ => return Ok(None),
    };
    Ok(Some(payload(name, label, singular, object, name, None)))
}

/// A registered host post type, `post_type_` prefix optional.
pub fn post_type<S: ObjectStore + ?Sized>(
    store: &S,
    name: &str,
    _parent_id: u64,
) -> Result<Option<Candidate>, Error> {
    host_type(store, BuiltinKind::PostType, name, POST_TYPE_PREFIX, PodType::PostType, None)
}

/// A registered host taxonomy, `taxonomy_` prefix optional.
pub fn taxonomy<S: ObjectStore + ?Sized>(
    store: &S,
    name: &str,
    _parent_id: u64,
) -> Result<Option<Candidate>, Error> {
    host_type(
        store,
        BuiltinKind::Taxonomy,
        name,
        TAXONOMY_PREFIX,
        PodType::Taxonomy,
        Some(Storage::None),
    )
}

/// `comment_<subtype>`, labelled from the subtype name.
pub fn comment_subtype<S: ObjectStore + ?Sized>(
    _store: &S,
    name: &str,
    _parent_id: u64,
) -> Result<Option<Candidate>, Error> {
    let Some(subtype) = name.strip_prefix(COMMENT_PREFIX).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    let label = title_case(subtype);
    Ok(Some(payload(subtype, &label, &label, subtype, "comment", None)))
}

fn host_type<S: ObjectStore + ?Sized>(
    store: &S,
    kind: BuiltinKind,
    name: &str,
    prefix: &str,
    pod_type: PodType,
    storage: Option<Storage>,
) -> Result<Option<Candidate>, Error> {
    let mut found = store.builtin_type(kind, name)?;
    if found.is_none() {
        if let Some(stripped) = name.strip_prefix(prefix).filter(|s| !s.is_empty()) {
            found = store.builtin_type(kind, stripped)?;
        }
    }

    Ok(found.map(|host| {
        let mut candidate = payload(
            &host.name,
            &host.label,
            &host.label_singular,
            &host.name,
            pod_type.as_str(),
            storage,
        );
        if let Candidate::Payload(options) = &mut candidate {
            for (key, value) in host.labels {
                options.entry(key).or_insert(value);
            }
        }
        candidate
    }))
}

fn payload(
    name: &str,
    label: &str,
    label_singular: &str,
    object: &str,
    pod_type: &str,
    storage: Option<Storage>,
) -> Candidate {
    let mut options = Options::new();
    options.insert("name".into(), Value::from(name));
    options.insert("label".into(), Value::from(label));
    options.insert("label_singular".into(), Value::from(label_singular));
    if !object.is_empty() {
        options.insert("object".into(), Value::from(object));
    }
    options.insert("type".into(), Value::from(pod_type));
    if let Some(storage) = storage {
        options.insert("storage".into(), Value::from(storage.as_str()));
    }
    Candidate::Payload(options)
}

/// `review-note_type` → `Review Note Type`.
pub fn title_case(name: &str) -> String {
    name.split(['-', '_', ' '])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Merge a candidate over the defaults and apply persisted meta.
///
/// A persisted record's own `parent_id` replaces the lookup parent.
pub fn normalize<S: ObjectStore + ?Sized>(
    store: &S,
    candidate: Candidate,
    parent_id: u64,
) -> Result<PodDefinition, Error> {
    let mut definition = PodDefinition::new(parent_id);

    let stored_meta = match candidate {
        Candidate::Persisted(record) => {
            definition.id = record.id;
            definition.name = record.name;
            definition.label = record.title;
            definition.description = record.content;
            definition.parent_id = record.parent_id;
            record.meta
        }
        Candidate::Payload(options) => {
            for (key, value) in value::normalize_keys(options) {
                definition.set(&key, value);
            }
            Options::new()
        }
    };

    if definition.id > 0 {
        for (key, value) in stored_meta {
            if !META_OVERRIDES.contains(&key.as_str()) {
                definition.set(&key, value);
            }
        }

        for key in META_OVERRIDES {
            let Some(value) = store.get_meta(key, definition.id)? else {
                continue;
            };
            match *key {
                "type" if value::is_empty(&value) => definition.pod_type = PodType::default(),
                "storage" if value::is_empty(&value) => definition.storage = Storage::default(),
                _ => definition.set(key, value),
            }
        }
    }

    definition.apply_label_defaults();
    Ok(definition)
}
