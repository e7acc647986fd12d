//! Inputs accepted when resolving or mutating a Pod.

use super::PodDefinition;
use crate::store::RawRecord;
use crate::value::{self, Options};
use serde_json::Value;

/// What to resolve a Pod from.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PodInput {
    /// Nothing given. Refreshes a valid handle.
    #[default]
    Unset,
    /// A Pod name, or a host type name with an optional prefix.
    Name(String),
    /// A raw host record.
    Record(RawRecord),
    /// An already-built definition payload.
    Definition(Options),
}

impl From<&str> for PodInput {
    fn from(name: &str) -> Self {
        PodInput::Name(name.to_string())
    }
}

impl From<String> for PodInput {
    fn from(name: String) -> Self {
        PodInput::Name(name)
    }
}

impl From<RawRecord> for PodInput {
    fn from(record: RawRecord) -> Self {
        PodInput::Record(record)
    }
}

impl From<Options> for PodInput {
    fn from(options: Options) -> Self {
        PodInput::Definition(options)
    }
}

/// Container scope for name lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParentRef {
    /// No parent given.
    #[default]
    None,
    /// A parent Pod id.
    Id(u64),
}

impl ParentRef {
    /// Parent id, 0 for root.
    pub fn id(&self) -> u64 {
        match self {
            ParentRef::None => 0,
            ParentRef::Id(id) => *id,
        }
    }

    /// Whether no parent was given.
    pub fn is_none(&self) -> bool {
        matches!(self, ParentRef::None)
    }
}

impl From<u64> for ParentRef {
    fn from(id: u64) -> Self {
        ParentRef::Id(id)
    }
}

impl From<&PodDefinition> for ParentRef {
    fn from(definition: &PodDefinition) -> Self {
        ParentRef::Id(definition.id)
    }
}

impl From<&Options> for ParentRef {
    fn from(options: &Options) -> Self {
        ParentRef::Id(options.get("id").and_then(value::as_u64).unwrap_or(0))
    }
}

impl<T: Into<ParentRef>> From<Option<T>> for ParentRef {
    fn from(parent: Option<T>) -> Self {
        parent.map(Into::into).unwrap_or_default()
    }
}

/// Options for save and duplicate: a full mapping or a single pair.
#[derive(Debug, Clone, PartialEq)]
pub enum PodOptions {
    /// Several options at once.
    Map(Options),
    /// One option.
    Pair(String, Value),
}

impl PodOptions {
    /// Normalize into a mapping with current key names.
    pub fn into_options(self) -> Options {
        let options = match self {
            PodOptions::Map(options) => options,
            PodOptions::Pair(key, value) => {
                let mut options = Options::new();
                options.insert(key, value);
                options
            }
        };
        value::normalize_keys(options)
    }
}

impl From<Options> for PodOptions {
    fn from(options: Options) -> Self {
        PodOptions::Map(options)
    }
}

impl<K: Into<String>, V: Into<Value>> From<(K, V)> for PodOptions {
    fn from((key, value): (K, V)) -> Self {
        PodOptions::Pair(key.into(), value.into())
    }
}
