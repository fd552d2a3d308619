//! Error types for the inheritance subsystem.

use shared_types::{NodeId, StoreError};
use thiserror::Error;

/// Errors raised by propagation entry points.
///
/// The precondition variants are fatal to a single operation and never
/// retried; `Store` wraps whatever the document store reported.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InheritanceError {
    /// Fan-out was requested from a node without the `inheritable` facet.
    #[error("Document {node} ({path}) is not inheritable")]
    NotInheritable { node: NodeId, path: String },

    /// The target has no tree parent to inherit from.
    #[error("Document {0} has no parent reference")]
    NoParentReference(NodeId),

    /// The upward walk reached the root without finding an inheritable ancestor.
    #[error("No inheritable ancestor found for document {0}")]
    NoInheritableAncestor(NodeId),

    /// Document store failure.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl InheritanceError {
    /// True for errors caused by the caller's input rather than the store.
    #[must_use]
    pub fn is_precondition(&self) -> bool {
        !matches!(self, Self::Store(_))
    }
}

/// Result alias for inheritance operations.
pub type InheritanceResult<T> = Result<T, InheritanceError>;
