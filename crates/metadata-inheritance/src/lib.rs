//! # Metadata Inheritance
//!
//! Keeps metadata fields consistent between `inheritable` containers and
//! the `inheritor` documents below them.
//!
//! ## Architecture
//!
//! This crate follows Hexagonal Architecture (Ports & Adapters):
//!
//! - **Domain Layer** (`domain/`): Pure rules, no I/O
//!   - `propagate` / `propagate_fields`: field copy under a policy
//!   - `linkage`: the `inheritance` field-group (parentId, updateParent,
//!     lastUpdatedFields)
//!   - `LoopSuppressor`: one-shot marks for our own saves
//!
//! - **Ports Layer** (`ports/`): Trait definitions
//!   - `InheritanceApi`: Driving port (the three propagation entry points)
//!   - `DocumentStore` / `DocumentSession`: Driven port (the tree)
//!
//! - **Service Layer** (`service/`): Orchestration
//!   - `InheritanceService`: Implements `InheritanceApi`
//!   - `InheritanceWorker`: Transactional jobs
//!
//! - **Adapters Layer** (`adapters/`): External connections
//!   - `InMemoryDocumentStore`, `ConfigResolver`, `EventListener`
//!
//! - `router`: event → job decision, `scheduler`: deduplicated async jobs
//!
//! ## Flow
//!
//! ```text
//! commit ─→ bus ─→ EventListener ─→ EventRouter ─→ WorkScheduler ─→ InheritanceWorker
//!                                        │                               │
//!                                        └──── inline upward ────────────┘
//! ```
//!
//! ## Invariants
//!
//! - Fields of the fixed ignored groups are never copied.
//! - A save made by this crate triggers at most one suppressed event.
//! - At most one job per `(repository, node, kind)` is pending or running.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::module_name_repetitions)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod router;
pub mod scheduler;
pub mod service;

// Re-exports for convenience
pub use adapters::{ConfigResolver, EventListener, InMemoryDocumentStore, InMemorySession};
pub use domain::{
    linkage, ChangedFields, FanOutReport, InheritRequest, InheritanceConfig, InheritanceError,
    InheritanceResult, Job, JobKey, JobKind, JobTask, LoopSuppressor, Propagated,
    PropagationMode, PropagationPolicy,
};
pub use ports::{
    DescendantQuery, DocumentSession, DocumentStore, InheritanceApi, SaveOptions,
    VersioningOption, WriteOrigin,
};
pub use router::{EventRouter, IgnoreReason, RouteDecision};
pub use scheduler::{
    JobExecutor, JobReport, ScheduleOutcome, SchedulerStats, WorkScheduler, WorkState,
    DEFAULT_MAX_CONCURRENT_JOBS,
};
pub use service::{HierarchyLocator, InheritanceService, InheritanceWorker, NOTHING_TO_PROCESS};
