//! Hierarchy Locator
//!
//! Upward: nearest `inheritable` ancestor. Downward: every `inheritor`
//! below a node, resolved by a store-side subtree query.

use crate::domain::InheritanceResult;
use crate::ports::outbound::{DescendantQuery, DocumentSession};
use shared_types::{facets, Node, NodeId, ROOT_SENTINEL_TYPE};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Upper bound on the number of parents an upward walk visits.
pub const MAX_ANCESTOR_DEPTH: usize = 512;

#[derive(Debug, Clone, Copy)]
pub struct HierarchyLocator {
    max_depth: usize,
}

impl Default for HierarchyLocator {
    fn default() -> Self {
        Self {
            max_depth: MAX_ANCESTOR_DEPTH,
        }
    }
}

impl HierarchyLocator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Walk parent links from `node`'s direct parent.
    ///
    /// Stops with `None` at a root sentinel, a root, a dangling parent
    /// reference, a cycle or the depth limit.
    pub async fn find_inheritable_ancestor(
        &self,
        session: &dyn DocumentSession,
        node: &Node,
    ) -> InheritanceResult<Option<Node>> {
        let mut visited: HashSet<NodeId> = HashSet::from([node.id]);
        let mut next = node.parent_ref;
        let mut depth = 0usize;

        while let Some(id) = next {
            depth += 1;
            if depth > self.max_depth {
                warn!(node_id = %node.id, max_depth = self.max_depth, "Ancestor walk exceeded depth limit");
                return Ok(None);
            }
            if !visited.insert(id) {
                warn!(node_id = %node.id, repeated = %id, "Cycle detected in parent links");
                return Ok(None);
            }

            let Some(current) = session.get_document(id).await? else {
                debug!(node_id = %node.id, missing = %id, "Dangling parent reference");
                return Ok(None);
            };
            if current.node_type == ROOT_SENTINEL_TYPE {
                return Ok(None);
            }
            if current.has_facet(facets::INHERITABLE) {
                return Ok(Some(current));
            }
            next = current.parent_ref;
        }
        Ok(None)
    }

    /// All inheritors under `node`, sorted by identifier.
    pub async fn find_inheritor_descendants(
        &self,
        session: &dyn DocumentSession,
        node: &Node,
        ignore_versions: bool,
    ) -> InheritanceResult<Vec<Node>> {
        let query = DescendantQuery::inheritors_under(node.path.clone(), ignore_versions);
        let mut descendants = session.query_descendants(&query).await?;
        descendants.sort_by_key(|n| n.id);
        descendants.dedup_by_key(|n| n.id);
        debug!(node_id = %node.id, found = descendants.len(), "Inheritor descendants resolved");
        Ok(descendants)
    }
}
