//! Event Router
//!
//! Decides what a committed document event triggers.
//!
//! ```text
//! event ─→ config invalidation ─→ kind filter ─→ suppression ─→ global switch
//!       ─→ version skip ─→ inheritable?  ──→ fan-out job
//!                          inheritor?    ──→ created/moved/duplicated: inherit job
//!                                        └─→ modified: upward (inline or job) or re-arm
//! ```

use crate::adapters::config_resolver::ConfigResolver;
use crate::domain::{linkage, InheritanceConfig, Job, JobTask, LoopSuppressor};
use crate::ports::outbound::DocumentStore;
use crate::scheduler::{JobExecutor, ScheduleOutcome, WorkScheduler};
use crate::service::worker::InheritanceWorker;
use serde::Serialize;
use shared_bus::{DocumentEvent, EventName, RepositoryEvent};
use shared_types::facets;
use std::sync::Arc;
use tracing::{debug, error, trace, warn};

/// Why an event was not considered at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum IgnoreReason {
    /// Session-level traffic.
    NotDocumentEvent,
    /// A document event this router does not handle.
    UnhandledEvent(String),
    /// Another repository's event.
    ForeignRepository(String),
}

/// What the router did with one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RouteDecision {
    Ignored(IgnoreReason),
    /// The event was caused by one of our own saves.
    Suppressed,
    /// `enableInheritance` is off.
    Disabled,
    /// The subject is a version snapshot.
    VersionSkipped,
    /// The subject is neither inheritable nor inheritor.
    NotInvolved,
    FanOut(ScheduleOutcome),
    InheritFromAncestor(ScheduleOutcome),
    UpwardScheduled(ScheduleOutcome),
    /// Upward propagation ran inline; carries the job detail.
    UpwardPropagated(String),
    /// An inheritor edit while `enableSiblingInheritance` is off.
    UpwardDisabled,
    /// The subject's `updateParent` flag was reset after a fan-out write.
    Rearmed,
    /// Inline work failed; carries the error text.
    Failed(String),
}

pub struct EventRouter {
    repository: String,
    store: Arc<dyn DocumentStore>,
    config: Arc<ConfigResolver>,
    suppressor: Arc<LoopSuppressor>,
    scheduler: Arc<WorkScheduler>,
    worker: Arc<InheritanceWorker>,
}

impl EventRouter {
    #[must_use]
    pub fn new(
        store: Arc<dyn DocumentStore>,
        config: Arc<ConfigResolver>,
        suppressor: Arc<LoopSuppressor>,
        scheduler: Arc<WorkScheduler>,
        worker: Arc<InheritanceWorker>,
    ) -> Self {
        Self {
            repository: store.repository().to_string(),
            store,
            config,
            suppressor,
            scheduler,
            worker,
        }
    }

    #[must_use]
    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// Route each event in order.
    pub async fn route_batch(&self, events: &[RepositoryEvent]) -> Vec<RouteDecision> {
        let mut decisions = Vec::with_capacity(events.len());
        for event in events {
            decisions.push(self.route(event).await);
        }
        decisions
    }

    pub async fn route(&self, event: &RepositoryEvent) -> RouteDecision {
        let RepositoryEvent::Document(event) = event else {
            return RouteDecision::Ignored(IgnoreReason::NotDocumentEvent);
        };
        if event.repository != self.repository {
            return RouteDecision::Ignored(IgnoreReason::ForeignRepository(
                event.repository.clone(),
            ));
        }

        // Any event on the config node drops the cache, removals included.
        let subject = &event.subject;
        if ConfigResolver::is_config_path(&subject.path) {
            self.config.invalidate();
        }
        if !matches!(
            event.name,
            EventName::Created | EventName::Updated | EventName::Moved | EventName::Duplicated
        ) {
            return RouteDecision::Ignored(IgnoreReason::UnhandledEvent(
                event.name.to_string(),
            ));
        }

        if self.suppressor.consume(&subject.id) {
            debug!(node_id = %subject.id, event = %event.name, "Event from own save suppressed");
            return RouteDecision::Suppressed;
        }

        let config = self.current_config().await;
        if !config.enable_inheritance {
            trace!(node_id = %subject.id, "Inheritance disabled");
            return RouteDecision::Disabled;
        }
        if subject.is_version {
            return RouteDecision::VersionSkipped;
        }

        let decision = if subject.has_facet(facets::INHERITABLE) {
            RouteDecision::FanOut(self.schedule(subject.id, JobTask::FanOut))
        } else if subject.has_facet(facets::INHERITOR) {
            self.route_inheritor(event, &config).await
        } else {
            RouteDecision::NotInvolved
        };
        debug!(node_id = %subject.id, event = %event.name, decision = ?decision, "Event routed");
        decision
    }

    async fn route_inheritor(
        &self,
        event: &DocumentEvent,
        config: &InheritanceConfig,
    ) -> RouteDecision {
        let subject = &event.subject;
        if event.name != EventName::Updated {
            return RouteDecision::InheritFromAncestor(
                self.schedule(subject.id, JobTask::InheritFromAncestor),
            );
        }
        if !config.enable_sibling_inheritance {
            return RouteDecision::UpwardDisabled;
        }

        if !linkage::update_parent(subject) {
            return match self.worker.rearm(subject.id).await {
                Ok(_) => RouteDecision::Rearmed,
                Err(e) => {
                    error!(node_id = %subject.id, error = %e, "Failed to re-arm updateParent");
                    RouteDecision::Failed(e.to_string())
                }
            };
        }

        if config.async_upward_propagation {
            return RouteDecision::UpwardScheduled(
                self.schedule(subject.id, JobTask::PropagateUpward),
            );
        }
        let job = Job::new(self.repository.clone(), subject.id, JobTask::PropagateUpward);
        match self.worker.execute(&job).await {
            Ok(detail) => RouteDecision::UpwardPropagated(detail),
            Err(e) => {
                error!(node_id = %subject.id, error = %e, "Upward propagation failed");
                RouteDecision::Failed(e.to_string())
            }
        }
    }

    fn schedule(&self, node_id: shared_types::NodeId, task: JobTask) -> ScheduleOutcome {
        self.scheduler
            .schedule(Job::new(self.repository.clone(), node_id, task))
    }

    async fn current_config(&self) -> InheritanceConfig {
        match self.store.open_session().await {
            Ok(session) => self.config.snapshot(session.as_ref()).await,
            Err(e) => {
                warn!(error = %e, "Cannot open session for config, using defaults");
                InheritanceConfig::default()
            }
        }
    }
}
