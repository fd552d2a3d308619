//! # Error Types
//!
//! Errors raised by document store implementations.

use thiserror::Error;

/// Errors that can occur while reading or writing the document tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Document not found by identifier.
    #[error("Document not found: {0}")]
    NotFound(String),

    /// No document lives at the requested path.
    #[error("No document at path {0}")]
    PathNotFound(String),

    /// A document already occupies the target path.
    #[error("Path already taken: {0}")]
    PathTaken(String),

    /// A document cannot be moved below itself.
    #[error("Cannot move {node} under {target}")]
    InvalidMove { node: String, target: String },

    /// The field path does not belong to a field-group attached to the node.
    #[error("Field {field} is not declared on document {node} (missing group {group})")]
    UnknownField {
        node: String,
        field: String,
        group: String,
    },

    /// Field path is not of the form `<group>:<field>`.
    #[error("Malformed field path: {0}")]
    MalformedFieldPath(String),

    /// The session was already committed or rolled back.
    #[error("Session {0} is closed")]
    SessionClosed(String),

    /// Backend failure (I/O, lock poisoning, remote store).
    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
