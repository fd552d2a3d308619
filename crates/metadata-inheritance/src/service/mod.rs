//! Service Layer
//!
//! Orchestrates the domain rules against a document session and owns the
//! transactional units of work the scheduler runs.

pub mod inheritance_service;
pub mod locator;
pub mod worker;

pub use inheritance_service::InheritanceService;
pub use locator::{HierarchyLocator, MAX_ANCESTOR_DEPTH};
pub use worker::{InheritanceWorker, NOTHING_TO_PROCESS};
