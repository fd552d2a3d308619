//! Inheritance Service
//!
//! Implements the `InheritanceApi` port on top of the locator, the field
//! propagator and the config resolver.

use super::locator::HierarchyLocator;
use crate::adapters::config_resolver::ConfigResolver;
use crate::domain::{
    linkage, propagate, propagate_fields, ChangedFields, FanOutReport, InheritRequest,
    InheritanceError, InheritanceResult, Propagated, PropagationMode,
};
use crate::ports::inbound::InheritanceApi;
use crate::ports::outbound::{DocumentSession, SaveOptions};
use async_trait::async_trait;
use shared_types::{facets, field_group, Node};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub struct InheritanceService {
    config: Arc<ConfigResolver>,
    locator: HierarchyLocator,
}

impl InheritanceService {
    #[must_use]
    pub fn new(config: Arc<ConfigResolver>) -> Self {
        Self {
            config,
            locator: HierarchyLocator::new(),
        }
    }

    #[must_use]
    pub fn with_locator(mut self, locator: HierarchyLocator) -> Self {
        self.locator = locator;
        self
    }

    #[must_use]
    pub fn config(&self) -> &Arc<ConfigResolver> {
        &self.config
    }

    #[must_use]
    pub fn locator(&self) -> &HierarchyLocator {
        &self.locator
    }

    /// Fill one descendant and stage its save.
    ///
    /// `None` when neither fields nor linkage changed, in which case nothing
    /// is written.
    async fn fan_out_one(
        &self,
        session: &mut dyn DocumentSession,
        descendant: Node,
    ) -> InheritanceResult<Option<ChangedFields>> {
        let previous_parent = linkage::parent_id(&descendant);
        let Propagated { mut node, changed } = self
            .propagate_to_node(session, descendant, &InheritRequest::creation())
            .await?;

        if changed.is_empty() && previous_parent == linkage::parent_id(&node) {
            return Ok(None);
        }

        // The event of this save must not bounce back upward.
        linkage::set_update_parent(&mut node, false)?;
        session
            .save_document(node, SaveOptions::propagation().with_minor_bump())
            .await?;
        Ok(Some(changed))
    }
}

#[async_trait]
impl InheritanceApi for InheritanceService {
    async fn propagate_from_ancestor(
        &self,
        session: &mut dyn DocumentSession,
        ancestor: &Node,
        ignore_versions: bool,
    ) -> InheritanceResult<FanOutReport> {
        if !ancestor.has_facet(facets::INHERITABLE) {
            return Err(InheritanceError::NotInheritable {
                node: ancestor.id,
                path: ancestor.path.to_string(),
            });
        }

        let descendants = self
            .locator
            .find_inheritor_descendants(&*session, ancestor, ignore_versions)
            .await?;

        let mut report = FanOutReport::new(ancestor.id);
        for descendant in descendants {
            let id = descendant.id;
            match self.fan_out_one(session, descendant).await {
                Ok(Some(changed)) => {
                    report.updated.insert(id, changed);
                }
                Ok(None) => report.unchanged.push(id),
                Err(e) => {
                    error!(ancestor_id = %ancestor.id, node_id = %id, error = %e, "Fan-out to descendant failed");
                    report.failures.insert(id, e.to_string());
                }
            }
        }

        info!(
            ancestor_id = %ancestor.id,
            updated = report.updated.len(),
            unchanged = report.unchanged.len(),
            failed = report.failures.len(),
            "Fan-out finished"
        );
        Ok(report)
    }

    async fn propagate_to_node(
        &self,
        session: &mut dyn DocumentSession,
        target: Node,
        request: &InheritRequest,
    ) -> InheritanceResult<Propagated> {
        if target.parent_ref.is_none() {
            return Err(InheritanceError::NoParentReference(target.id));
        }
        let ancestor = self
            .locator
            .find_inheritable_ancestor(&*session, &target)
            .await?
            .ok_or(InheritanceError::NoInheritableAncestor(target.id))?;

        let config = self.config.snapshot(&*session).await;
        let mut ignored = request.ignored_fields.clone();
        ignored.extend(config.ignored_metadatas.iter().cloned());

        let mut target = target;
        let changed = match request.mode {
            PropagationMode::Creation => propagate(
                &ancestor,
                &mut target,
                &request.groups,
                &ignored,
                config.downward_policy(),
            )?,
            PropagationMode::Update => {
                if !target.has_schema(linkage::LINKAGE_GROUP) {
                    warn!(node_id = %target.id, "Target lacks the inheritance group, nothing copied");
                    return Ok(Propagated {
                        node: target,
                        changed: ChangedFields::new(),
                    });
                }
                let mut fields = linkage::last_updated_fields(&ancestor);
                if !request.groups.is_empty() {
                    fields.retain(|field| {
                        field_group(field)
                            .is_some_and(|group| request.groups.iter().any(|g| g.trim() == group))
                    });
                }
                propagate_fields(
                    &ancestor,
                    &mut target,
                    &fields,
                    &ignored,
                    config.override_policy(),
                )?
            }
        };

        linkage::link(&mut target, ancestor.id, true)?;
        debug!(
            node_id = %target.id,
            ancestor_id = %ancestor.id,
            mode = ?request.mode,
            changed = changed.len(),
            "Inherited from ancestor"
        );
        Ok(Propagated {
            node: target,
            changed,
        })
    }

    async fn propagate_to_ancestor(
        &self,
        session: &mut dyn DocumentSession,
        inheritor: &Node,
    ) -> InheritanceResult<Propagated> {
        if inheritor.parent_ref.is_none() {
            return Err(InheritanceError::NoParentReference(inheritor.id));
        }
        let mut ancestor = self
            .locator
            .find_inheritable_ancestor(&*session, inheritor)
            .await?
            .ok_or(InheritanceError::NoInheritableAncestor(inheritor.id))?;

        if let Some(stored) = linkage::parent_id(inheritor) {
            if stored != ancestor.id {
                debug!(node_id = %inheritor.id, stored = %stored, resolved = %ancestor.id, "Stale parentId, using resolved ancestor");
            }
        }

        let fields = linkage::last_updated_fields(inheritor);
        if fields.is_empty() {
            return Ok(Propagated {
                node: ancestor,
                changed: ChangedFields::new(),
            });
        }

        let config = self.config.snapshot(&*session).await;
        let changed = propagate_fields(
            inheritor,
            &mut ancestor,
            &fields,
            &config.ignored_metadatas,
            config.override_policy(),
        )?;

        info!(
            node_id = %inheritor.id,
            ancestor_id = %ancestor.id,
            changed = ?changed,
            "Propagated edit to ancestor"
        );
        Ok(Propagated {
            node: ancestor,
            changed,
        })
    }
}
