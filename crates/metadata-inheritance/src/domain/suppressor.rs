//! Loop Suppressor
//!
//! Single-use markers that flag "the next event for this node was caused by
//! a propagation write". The router consumes the marker and drops the event.
//!
//! ```text
//! [normal] ──register()──→ [awaiting-self-write-ack] ──consume()──→ [normal]
//! ```
//!
//! Markers are process-local. The persisted `inheritance:updateParent` flag
//! is what survives across processes.

use dashmap::DashSet;
use shared_types::NodeId;
use tracing::trace;

/// Concurrent set of nodes awaiting their self-write event.
#[derive(Debug, Default)]
pub struct LoopSuppressor {
    pending: DashSet<NodeId>,
}

impl LoopSuppressor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `node` before saving it.
    ///
    /// Returns false if a registration was already outstanding (at most one
    /// per node).
    pub fn register(&self, node: NodeId) -> bool {
        let inserted = self.pending.insert(node);
        trace!(node_id = %node, inserted, "Suppression registered");
        inserted
    }

    /// Consume the registration for `node`, returning whether one existed.
    pub fn consume(&self, node: &NodeId) -> bool {
        let consumed = self.pending.remove(node).is_some();
        if consumed {
            trace!(node_id = %node, "Suppression consumed");
        }
        consumed
    }

    #[must_use]
    pub fn is_registered(&self, node: &NodeId) -> bool {
        self.pending.contains(node)
    }
}
