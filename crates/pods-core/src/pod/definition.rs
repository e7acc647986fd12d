//! Pod definitions.

use crate::value::{self, Options};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// The kind of host object a Pod describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PodType {
    /// A host post type.
    #[default]
    PostType,
    /// A host taxonomy.
    Taxonomy,
    /// A custom content type with no host counterpart.
    Pod,
    /// Host users.
    User,
    /// Host media attachments.
    Media,
    /// Host comments (or a comment subtype).
    Comment,
}

impl PodType {
    /// All Pod types.
    pub const ALL: [PodType; 6] = [
        PodType::PostType,
        PodType::Taxonomy,
        PodType::Pod,
        PodType::User,
        PodType::Media,
        PodType::Comment,
    ];

    /// The string form used in options and meta.
    pub fn as_str(&self) -> &'static str {
        match self {
            PodType::PostType => "post_type",
            PodType::Taxonomy => "taxonomy",
            PodType::Pod => "pod",
            PodType::User => "user",
            PodType::Media => "media",
            PodType::Comment => "comment",
        }
    }
}

impl fmt::Display for PodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PodType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PodType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown pod type: {s}"))
    }
}

/// How a Pod's records are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Storage {
    /// Key/value meta attached to host records.
    #[default]
    Meta,
    /// A dedicated table.
    Table,
    /// No extra storage.
    None,
}

impl Storage {
    /// The string form used in options and meta.
    pub fn as_str(&self) -> &'static str {
        match self {
            Storage::Meta => "meta",
            Storage::Table => "table",
            Storage::None => "none",
        }
    }
}

impl fmt::Display for Storage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Storage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "meta" => Ok(Storage::Meta),
            "table" => Ok(Storage::Table),
            "none" => Ok(Storage::None),
            other => Err(format!("unknown storage: {other}")),
        }
    }
}

/// A normalized Pod definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PodDefinition {
    /// Persisted id, 0 when transient or synthetic.
    pub id: u64,
    /// Name, unique within `parent_id`.
    pub name: String,
    /// Plural label.
    pub label: String,
    /// Singular label.
    pub label_singular: String,
    /// Free-form description.
    pub description: String,
    /// Host object kind.
    #[serde(rename = "type")]
    pub pod_type: PodType,
    /// Storage strategy.
    pub storage: Storage,
    /// Underlying host object name.
    pub object: String,
    /// Alternate name.
    pub alias: String,
    /// Whether the Pod shows in the admin menu.
    pub show_in_menu: bool,
    /// Container Pod id, 0 for root.
    pub parent_id: u64,
    /// Everything else (host labels, persisted extra meta).
    #[serde(flatten)]
    pub extra: Options,
}

impl PodDefinition {
    /// Definition populated with defaults.
    pub fn new(parent_id: u64) -> Self {
        Self {
            id: 0,
            name: String::new(),
            label: String::new(),
            label_singular: String::new(),
            description: String::new(),
            pod_type: PodType::PostType,
            storage: Storage::Meta,
            object: String::new(),
            alias: String::new(),
            show_in_menu: true,
            parent_id,
            extra: Options::new(),
        }
    }

    /// Build a definition from an option map merged over the defaults.
    pub fn from_options(options: Options, parent_id: u64) -> Self {
        let mut definition = Self::new(parent_id);
        for (key, value) in value::normalize_keys(options) {
            definition.set(&key, value);
        }
        definition.apply_label_defaults();
        definition
    }

    /// Empty label falls back to name, empty singular label to label.
    pub fn apply_label_defaults(&mut self) {
        if self.label.is_empty() {
            self.label = self.name.clone();
        }
        if self.label_singular.is_empty() {
            self.label_singular = self.label.clone();
        }
    }

    /// Whether this is a custom content type.
    pub fn is_custom(&self) -> bool {
        self.pod_type == PodType::Pod
    }

    /// Read an option. Deprecated keys are accepted.
    pub fn get(&self, key: &str) -> Option<Value> {
        let value = match value::canonical_key(key) {
            "id" => Value::from(self.id),
            "name" => Value::from(self.name.clone()),
            "label" => Value::from(self.label.clone()),
            "label_singular" => Value::from(self.label_singular.clone()),
            "description" => Value::from(self.description.clone()),
            "type" => Value::from(self.pod_type.as_str()),
            "storage" => Value::from(self.storage.as_str()),
            "object" => Value::from(self.object.clone()),
            "alias" => Value::from(self.alias.clone()),
            "show_in_menu" => Value::from(self.show_in_menu),
            "parent_id" => Value::from(self.parent_id),
            other => return self.extra.get(other).cloned(),
        };
        Some(value)
    }

    /// Write an option. Deprecated keys are accepted.
    ///
    /// Unparseable `type` or `storage` values leave the field unchanged.
    pub fn set(&mut self, key: &str, value: Value) {
        match value::canonical_key(key) {
            "id" => self.id = value::as_u64(&value).unwrap_or(0),
            "name" => self.name = value::as_string(&value),
            "label" => self.label = value::as_string(&value),
            "label_singular" => self.label_singular = value::as_string(&value),
            "description" => self.description = value::as_string(&value),
            "type" => match value::as_string(&value).parse() {
                Ok(pod_type) => self.pod_type = pod_type,
                Err(e) => tracing::warn!(error = %e, pod = %self.name, "ignoring pod type"),
            },
            "storage" => match value::as_string(&value).parse() {
                Ok(storage) => self.storage = storage,
                Err(e) => tracing::warn!(error = %e, pod = %self.name, "ignoring pod storage"),
            },
            "object" => self.object = value::as_string(&value),
            "alias" => self.alias = value::as_string(&value),
            "show_in_menu" => self.show_in_menu = value::as_bool(&value),
            "parent_id" => self.parent_id = value::as_u64(&value).unwrap_or(0),
            other => {
                self.extra.insert(other.to_string(), value);
            }
        }
    }
}
