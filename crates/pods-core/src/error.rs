//! Core error types.

use thiserror::Error;

/// Errors surfaced by the Pod core.
///
/// Resolution misses are not errors: lookups return `Ok(None)` and callers
/// check the value. Only storage failures, invalid store parameters, and
/// strict traversal misses are reported here.
#[derive(Debug, Error)]
pub enum Error {
    /// Storage layer error.
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Invalid data or parameters passed to the store.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// A traversal step pointed at a Pod that could not be resolved.
    #[error("pod not found: {0}")]
    PodNotFound(String),

    /// A traversal step named a field absent from both catalogs.
    #[error("unknown field {field} on pod {pod}")]
    UnknownField {
        /// Pod the field was looked up on.
        pod: String,
        /// Requested field name.
        field: String,
    },

    /// A traversal step named a field that is not a relationship.
    #[error("field {field} on pod {pod} is not a relationship")]
    NotRelationship {
        /// Pod the field was looked up on.
        pod: String,
        /// Requested field name.
        field: String,
    },
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() || err.is_syntax() || err.is_eof() {
            Error::Deserialization(err.to_string())
        } else {
            Error::Serialization(err.to_string())
        }
    }
}
