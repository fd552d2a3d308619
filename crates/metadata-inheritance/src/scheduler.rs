//! Async Work Scheduler
//!
//! Runs propagation jobs in the background with one outstanding job per
//! [`JobKey`]. A trigger for a key that is already scheduled or running is
//! dropped.
//!
//! ```text
//! schedule() ──→ [Scheduled] ──permit──→ [Running] ──→ [Completed]
//!                     ↑                       └──────→ [Failed]
//!                     └── (terminal keys may be scheduled again)
//! ```

use crate::domain::{InheritanceResult, Job, JobKey, JobTask};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, Notify, Semaphore};
use tracing::{debug, error, info};

/// Default bound on concurrently running jobs.
pub const DEFAULT_MAX_CONCURRENT_JOBS: usize = 4;

const REPORT_CHANNEL_CAPACITY: usize = 256;

/// Lifecycle of a job key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WorkState {
    Scheduled,
    Running,
    Completed,
    Failed,
}

impl WorkState {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Result of [`WorkScheduler::schedule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScheduleOutcome {
    Scheduled,
    /// A job with the same key is pending or running; this trigger was dropped.
    AlreadyScheduled,
}

/// Terminal notification for one job.
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub key: JobKey,
    pub task: JobTask,
    pub state: WorkState,
    pub detail: String,
    pub finished_at: DateTime<Utc>,
}

/// Executes a job to completion.
///
/// Implementations own their transaction: open, commit, or roll back.
#[async_trait]
pub trait JobExecutor: Send + Sync + 'static {
    /// Returns a short summary for the job report.
    async fn execute(&self, job: &Job) -> InheritanceResult<String>;
}

#[derive(Debug, Default)]
pub struct SchedulerStats {
    pub scheduled: AtomicU64,
    pub deduplicated: AtomicU64,
    pub completed: AtomicU64,
    pub failed: AtomicU64,
}

pub struct WorkScheduler {
    executor: Arc<dyn JobExecutor>,
    states: DashMap<JobKey, WorkState>,
    permits: Arc<Semaphore>,
    idle: Notify,
    reports: broadcast::Sender<JobReport>,
    stats: SchedulerStats,
}

impl WorkScheduler {
    /// `max_concurrent_jobs` is raised to at least one.
    #[must_use]
    pub fn new(executor: Arc<dyn JobExecutor>, max_concurrent_jobs: usize) -> Arc<Self> {
        let (reports, _) = broadcast::channel(REPORT_CHANNEL_CAPACITY);
        Arc::new(Self {
            executor,
            states: DashMap::new(),
            permits: Arc::new(Semaphore::new(max_concurrent_jobs.max(1))),
            idle: Notify::new(),
            reports,
            stats: SchedulerStats::default(),
        })
    }

    /// Schedule `job` unless its key is already pending or running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule(self: &Arc<Self>, job: Job) -> ScheduleOutcome {
        {
            let entry = self.states.entry(job.key.clone());
            if let Entry::Occupied(existing) = &entry {
                if !existing.get().is_terminal() {
                    self.stats.deduplicated.fetch_add(1, Ordering::Relaxed);
                    debug!(job_key = %job.key, state = ?existing.get(), "Job already scheduled, trigger dropped");
                    return ScheduleOutcome::AlreadyScheduled;
                }
            }
            entry.insert(WorkState::Scheduled);
        }

        self.stats.scheduled.fetch_add(1, Ordering::Relaxed);
        debug!(job_key = %job.key, task = ?job.task, "Job scheduled");

        let scheduler = Arc::clone(self);
        tokio::spawn(async move { scheduler.run(job).await });
        ScheduleOutcome::Scheduled
    }

    async fn run(self: Arc<Self>, job: Job) {
        let Ok(_permit) = self.permits.clone().acquire_owned().await else {
            self.finish(&job, WorkState::Failed, "scheduler closed".to_string());
            return;
        };

        self.states.insert(job.key.clone(), WorkState::Running);
        debug!(job_key = %job.key, "Job started");

        // Run on its own task so a panicking executor still reaches `finish`.
        let executor = self.executor.clone();
        let task_job = job.clone();
        let outcome = tokio::spawn(async move { executor.execute(&task_job).await }).await;

        let (state, detail) = match outcome {
            Ok(Ok(detail)) => (WorkState::Completed, detail),
            Ok(Err(e)) => {
                error!(job_key = %job.key, error = %e, "Job failed");
                (WorkState::Failed, e.to_string())
            }
            Err(join_error) => {
                error!(job_key = %job.key, error = %join_error, "Job aborted");
                (WorkState::Failed, format!("job aborted: {join_error}"))
            }
        };
        self.finish(&job, state, detail);
    }

    fn finish(&self, job: &Job, state: WorkState, detail: String) {
        self.states.insert(job.key.clone(), state);
        match state {
            WorkState::Completed => self.stats.completed.fetch_add(1, Ordering::Relaxed),
            _ => self.stats.failed.fetch_add(1, Ordering::Relaxed),
        };
        info!(job_key = %job.key, state = ?state, detail = %detail, "Job finished");

        // No subscribers is fine.
        let _ = self.reports.send(JobReport {
            key: job.key.clone(),
            task: job.task,
            state,
            detail,
            finished_at: Utc::now(),
        });
        self.idle.notify_waiters();
    }

    /// Last known state of a key.
    #[must_use]
    pub fn state(&self, key: &JobKey) -> Option<WorkState> {
        self.states.get(key).map(|state| *state)
    }

    /// Jobs scheduled or running.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.states
            .iter()
            .filter(|entry| !entry.value().is_terminal())
            .count()
    }

    /// Resolves once no job is scheduled or running.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            if self.pending_count() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Forget terminal keys; returns how many were removed.
    pub fn prune_finished(&self) -> usize {
        let before = self.states.len();
        self.states.retain(|_, state| !state.is_terminal());
        before.saturating_sub(self.states.len())
    }

    #[must_use]
    pub fn subscribe_reports(&self) -> broadcast::Receiver<JobReport> {
        self.reports.subscribe()
    }

    #[must_use]
    pub fn stats(&self) -> &SchedulerStats {
        &self.stats
    }
}
