//! Host records.

use crate::error::Error;
use crate::value::Options;
use rkyv::{Archive, Deserialize, Serialize};

/// A host content record as stored, without its meta.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct StoredRecord {
    /// Record id.
    pub id: u64,
    /// Host record type (e.g. the internal Pod or field type).
    pub record_type: String,
    /// Slug.
    pub name: String,
    /// Title.
    pub title: String,
    /// Body.
    pub content: String,
    /// Parent record id, 0 for none.
    pub parent_id: u64,
}

impl StoredRecord {
    /// Serialize the record to bytes using rkyv.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map(|v| v.to_vec())
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize a record from bytes using rkyv.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        rkyv::from_bytes::<Self, rkyv::rancor::Error>(bytes)
            .map_err(|e| Error::Deserialization(e.to_string()))
    }
}

/// A host record together with its meta, as handed to the resolver.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    /// Record id.
    pub id: u64,
    /// Host record type.
    pub record_type: String,
    /// Slug.
    pub name: String,
    /// Title.
    pub title: String,
    /// Body.
    pub content: String,
    /// Parent record id.
    pub parent_id: u64,
    /// Attached meta.
    pub meta: Options,
}

impl RawRecord {
    /// Create a record with no meta.
    pub fn new(id: u64, record_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id,
            record_type: record_type.into(),
            name: name.into(),
            title: String::new(),
            content: String::new(),
            parent_id: 0,
            meta: Options::new(),
        }
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Combine a stored record with its meta.
    pub fn from_stored(stored: StoredRecord, meta: Options) -> Self {
        Self {
            id: stored.id,
            record_type: stored.record_type,
            name: stored.name,
            title: stored.title,
            content: stored.content,
            parent_id: stored.parent_id,
            meta,
        }
    }

    /// Split off the stored part.
    pub fn to_stored(&self) -> StoredRecord {
        StoredRecord {
            id: self.id,
            record_type: self.record_type.clone(),
            name: self.name.clone(),
            title: self.title.clone(),
            content: self.content.clone(),
            parent_id: self.parent_id,
        }
    }
}
