//! Inheritance Worker
//!
//! Transactional units of work run by the scheduler (or inline by the
//! router): each opens its own session, commits on success and rolls back
//! on failure.

use super::inheritance_service::InheritanceService;
use crate::domain::{
    linkage, InheritRequest, InheritanceResult, Job, JobTask, LoopSuppressor, Propagated,
};
use crate::ports::inbound::InheritanceApi;
use crate::ports::outbound::{DocumentSession, DocumentStore, SaveOptions};
use crate::scheduler::JobExecutor;
use async_trait::async_trait;
use shared_types::NodeId;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Detail reported when the subject vanished before the job ran.
pub const NOTHING_TO_PROCESS: &str = "Nothing to process";

/// What a unit of work did, and the suppression it left behind.
struct WorkOutcome {
    detail: String,
    registered: Option<NodeId>,
}

impl WorkOutcome {
    fn done(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
            registered: None,
        }
    }
}

pub struct InheritanceWorker {
    store: Arc<dyn DocumentStore>,
    service: Arc<InheritanceService>,
    suppressor: Arc<LoopSuppressor>,
}

impl InheritanceWorker {
    #[must_use]
    pub fn new(
        store: Arc<dyn DocumentStore>,
        service: Arc<InheritanceService>,
        suppressor: Arc<LoopSuppressor>,
    ) -> Self {
        Self {
            store,
            service,
            suppressor,
        }
    }

    /// Set `updateParent` back to true on an inheritor whose last write came
    /// from a fan-out, without letting that save trigger anything.
    pub async fn rearm(&self, node_id: NodeId) -> InheritanceResult<String> {
        let mut session = self.store.open_session().await?;
        let outcome = self.rearm_in(session.as_mut(), node_id).await;
        self.finish(session, outcome).await
    }

    async fn rearm_in(
        &self,
        session: &mut dyn DocumentSession,
        node_id: NodeId,
    ) -> InheritanceResult<WorkOutcome> {
        let Some(mut node) = session.get_document(node_id).await? else {
            return Ok(WorkOutcome::done(NOTHING_TO_PROCESS));
        };
        linkage::set_update_parent(&mut node, true)?;
        self.save_suppressed(session, node, SaveOptions::propagation())
            .await?;
        Ok(WorkOutcome {
            detail: "updateParent re-armed".to_string(),
            registered: Some(node_id),
        })
    }

    /// Save with the node registered in the suppressor; the registration is
    /// released again if the save fails.
    async fn save_suppressed(
        &self,
        session: &mut dyn DocumentSession,
        node: shared_types::Node,
        options: SaveOptions,
    ) -> InheritanceResult<()> {
        let id = node.id;
        self.suppressor.register(id);
        if let Err(e) = session.save_document(node, options).await {
            self.suppressor.consume(&id);
            return Err(e.into());
        }
        Ok(())
    }

    async fn run(
        &self,
        session: &mut dyn DocumentSession,
        job: &Job,
    ) -> InheritanceResult<WorkOutcome> {
        let Some(node) = session.get_document(job.key.node_id).await? else {
            info!(job_key = %job.key, "Subject no longer exists");
            return Ok(WorkOutcome::done(NOTHING_TO_PROCESS));
        };

        match job.task {
            JobTask::FanOut => {
                let config = self.service.config().snapshot(&*session).await;
                let report = self
                    .service
                    .propagate_from_ancestor(session, &node, config.ignore_versions)
                    .await?;
                Ok(WorkOutcome::done(format!(
                    "{} of {} descendants updated, {} failed",
                    report.updated.len(),
                    report.visited(),
                    report.failures.len()
                )))
            }
            JobTask::InheritFromAncestor => {
                let Propagated { node, changed } = self
                    .service
                    .propagate_to_node(session, node, &InheritRequest::creation())
                    .await?;
                let id = node.id;
                self.save_suppressed(session, node, SaveOptions::propagation())
                    .await?;
                Ok(WorkOutcome {
                    detail: format!("{} fields inherited", changed.len()),
                    registered: Some(id),
                })
            }
            JobTask::PropagateUpward => {
                let Propagated { node, changed } =
                    self.service.propagate_to_ancestor(session, &node).await?;
                if changed.is_empty() {
                    return Ok(WorkOutcome::done("no fields propagated"));
                }
                session
                    .save_document(node, SaveOptions::propagation().with_minor_bump())
                    .await?;
                Ok(WorkOutcome::done(format!(
                    "{} fields propagated upward",
                    changed.len()
                )))
            }
        }
    }

    async fn finish(
        &self,
        mut session: Box<dyn DocumentSession>,
        outcome: InheritanceResult<WorkOutcome>,
    ) -> InheritanceResult<String> {
        match outcome {
            Ok(WorkOutcome { detail, registered }) => match session.commit().await {
                Ok(written) => {
                    debug!(written, detail = %detail, "Work committed");
                    Ok(detail)
                }
                Err(e) => {
                    if let Some(id) = registered {
                        self.suppressor.consume(&id);
                    }
                    Err(e.into())
                }
            },
            Err(e) => {
                if let Err(rollback_error) = session.rollback().await {
                    warn!(error = %rollback_error, "Rollback failed");
                }
                Err(e)
            }
        }
    }
}

#[async_trait]
impl JobExecutor for InheritanceWorker {
    async fn execute(&self, job: &Job) -> InheritanceResult<String> {
        let mut session = self.store.open_session().await?;
        let outcome = self.run(session.as_mut(), job).await;
        self.finish(session, outcome).await
    }
}
