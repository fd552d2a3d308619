//! # Inbound Port - InheritanceApi
//!
//! Propagation entry points. Callers pass an open session; nothing here
//! commits. `propagate_from_ancestor` stages its own saves, the other two
//! return the mutated node for the caller to persist.

use crate::domain::{FanOutReport, InheritRequest, InheritanceResult, Propagated};
use crate::ports::outbound::DocumentSession;
use async_trait::async_trait;
use shared_types::Node;

/// Primary API of the inheritance subsystem.
#[async_trait]
pub trait InheritanceApi: Send + Sync {
    /// Fan out from an inheritable node into every inheritor below it.
    ///
    /// Each descendant is filled from its own nearest inheritable ancestor,
    /// marked `updateParent = false` and saved. A failing descendant is
    /// recorded in the report and does not stop the others.
    ///
    /// # Errors
    /// - `NotInheritable`: `ancestor` lacks the `inheritable` facet
    /// - `Store`: the descendant query failed
    async fn propagate_from_ancestor(
        &self,
        session: &mut dyn DocumentSession,
        ancestor: &Node,
        ignore_versions: bool,
    ) -> InheritanceResult<FanOutReport>;

    /// Fill `target` from its nearest inheritable ancestor and link it.
    ///
    /// # Errors
    /// - `NoParentReference`: `target` is a root
    /// - `NoInheritableAncestor`: the upward walk found nothing
    async fn propagate_to_node(
        &self,
        session: &mut dyn DocumentSession,
        target: Node,
        request: &InheritRequest,
    ) -> InheritanceResult<Propagated>;

    /// Copy an edited inheritor's `lastUpdatedFields` up to its ancestor.
    ///
    /// Returns the mutated ancestor.
    ///
    /// # Errors
    /// - `NoParentReference`, `NoInheritableAncestor` as above
    async fn propagate_to_ancestor(
        &self,
        session: &mut dyn DocumentSession,
        inheritor: &Node,
    ) -> InheritanceResult<Propagated>;
}
