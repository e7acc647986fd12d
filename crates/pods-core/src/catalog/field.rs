//! Field definitions for Pods.

use crate::value::{self, Options};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Fields keyed by name.
pub type FieldMap = BTreeMap<String, Field>;

/// A field's data type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    /// Single line text.
    Text,
    /// Multi line text.
    Paragraph,
    /// Numeric value.
    Number,
    /// Calendar date.
    Date,
    /// Date and time.
    DateTime,
    /// Yes/no flag.
    Boolean,
    /// Attachment reference.
    File,
    /// Relationship to another Pod or host object.
    Pick,
    /// Any other host field type.
    Other(String),
}

impl FieldType {
    /// The string form used in options.
    pub fn as_str(&self) -> &str {
        match self {
            FieldType::Text => "text",
            FieldType::Paragraph => "paragraph",
            FieldType::Number => "number",
            FieldType::Date => "date",
            FieldType::DateTime => "datetime",
            FieldType::Boolean => "boolean",
            FieldType::File => "file",
            FieldType::Pick => "pick",
            FieldType::Other(name) => name,
        }
    }
}

impl From<&str> for FieldType {
    fn from(s: &str) -> Self {
        match s {
            "" | "text" => FieldType::Text,
            "paragraph" => FieldType::Paragraph,
            "number" => FieldType::Number,
            "date" => FieldType::Date,
            "datetime" => FieldType::DateTime,
            "boolean" => FieldType::Boolean,
            "file" => FieldType::File,
            "pick" => FieldType::Pick,
            other => FieldType::Other(other.to_string()),
        }
    }
}

impl From<String> for FieldType {
    fn from(s: String) -> Self {
        FieldType::from(s.as_str())
    }
}

impl From<FieldType> for String {
    fn from(t: FieldType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cardinality of a relationship field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PickFormat {
    /// At most one related item.
    #[default]
    Single,
    /// Any number of related items.
    Multi,
}

impl PickFormat {
    /// The string form used in options.
    pub fn as_str(&self) -> &'static str {
        match self {
            PickFormat::Single => "single",
            PickFormat::Multi => "multi",
        }
    }
}

/// Where a relationship field points.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PickTarget {
    /// Target object kind (`post_type`, `taxonomy`, `pod`, `user`, ...).
    pub pick_object: String,
    /// Target object name within that kind.
    pub pick_val: String,
    /// Single or multi valued.
    pub pick_format_type: PickFormat,
}

impl PickTarget {
    /// Create a target.
    pub fn new(
        pick_object: impl Into<String>,
        pick_val: impl Into<String>,
        pick_format_type: PickFormat,
    ) -> Self {
        Self {
            pick_object: pick_object.into(),
            pick_val: pick_val.into(),
            pick_format_type,
        }
    }

    /// Name of the Pod this relationship leads to.
    ///
    /// Kinds with a single host object (users, media, comments) may leave
    /// `pick_val` empty, in which case the kind itself names the target.
    pub fn target_pod(&self) -> &str {
        if self.pick_val.is_empty() {
            &self.pick_object
        } else {
            &self.pick_val
        }
    }
}

/// A field definition within a Pod.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Persisted id, 0 for built-in object fields.
    pub id: u64,
    /// Field name.
    pub name: String,
    /// Display label.
    pub label: String,
    /// Free-form description.
    pub description: String,
    /// Owning Pod name.
    pub pod: String,
    /// Owning Pod id.
    pub pod_id: u64,
    /// Data type.
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Relationship target, set for `pick` fields.
    #[serde(flatten)]
    pub pick: Option<PickTarget>,
    /// Remaining options.
    #[serde(default)]
    pub options: Options,
}

impl Field {
    /// Create a field owned by `pod`.
    pub fn new(name: impl Into<String>, pod: impl Into<String>, field_type: FieldType) -> Self {
        let name = name.into();
        Self {
            id: 0,
            label: name.clone(),
            name,
            description: String::new(),
            pod: pod.into(),
            pod_id: 0,
            field_type,
            pick: None,
            options: Options::new(),
        }
    }

    /// Create a relationship field.
    pub fn pick(name: impl Into<String>, pod: impl Into<String>, target: PickTarget) -> Self {
        let mut field = Self::new(name, pod, FieldType::Pick);
        field.pick = Some(target);
        field
    }

    /// Build a field from a flat option map.
    ///
    /// `pick_object`, `pick_val` and `pick_format_type` are lifted into the
    /// relationship target when the type is `pick`.
    pub fn from_options(mut options: Options) -> Self {
        let take = |options: &mut Options, key: &str| {
            options
                .remove(key)
                .map(|v| value::as_string(&v))
                .unwrap_or_default()
        };

        let id = options.remove("id").and_then(|v| value::as_u64(&v)).unwrap_or(0);
        let pod_id = options
            .remove("pod_id")
            .and_then(|v| value::as_u64(&v))
            .unwrap_or(0);
        let name = take(&mut options, "name");
        let label = take(&mut options, "label");
        let description = take(&mut options, "description");
        let pod = take(&mut options, "pod");
        let field_type = FieldType::from(take(&mut options, "type"));

        let pick = if field_type == FieldType::Pick {
            let format = match take(&mut options, "pick_format_type").as_str() {
                "multi" => PickFormat::Multi,
                _ => PickFormat::Single,
            };
            Some(PickTarget::new(
                take(&mut options, "pick_object"),
                take(&mut options, "pick_val"),
                format,
            ))
        } else {
            None
        };

        Self {
            id,
            label: if label.is_empty() { name.clone() } else { label },
            name,
            description,
            pod,
            pod_id,
            field_type,
            pick,
            options,
        }
    }

    /// Attach an extra option.
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Whether this field is a relationship.
    pub fn is_relationship(&self) -> bool {
        self.field_type == FieldType::Pick && self.pick.is_some()
    }

    /// Read one option, including the field's own keys.
    pub fn option(&self, key: &str) -> Option<Value> {
        let pick = self.pick.as_ref();
        let value = match key {
            "id" => Value::from(self.id),
            "name" => Value::from(self.name.clone()),
            "label" => Value::from(self.label.clone()),
            "description" => Value::from(self.description.clone()),
            "pod" => Value::from(self.pod.clone()),
            "pod_id" => Value::from(self.pod_id),
            "type" => Value::from(self.field_type.as_str()),
            "pick_object" => Value::from(pick?.pick_object.clone()),
            "pick_val" => Value::from(pick?.pick_val.clone()),
            "pick_format_type" => Value::from(pick?.pick_format_type.as_str()),
            other => return self.options.get(other).cloned(),
        };
        Some(value)
    }
}
