//! Value objects shared by the service, router and scheduler.

use super::config::split_list;
use serde::{Deserialize, Serialize};
use shared_types::{Node, NodeId};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Field paths written by one propagation run, sorted.
pub type ChangedFields = BTreeSet<String>;

/// How `propagate_to_node` selects the fields to copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PropagationMode {
    /// Full allowed field set, honouring `overrideValues`.
    #[default]
    Creation,
    /// Only the ancestor's `lastUpdatedFields`, always overwriting.
    Update,
}

/// Parameters of an inherit-from-ancestor request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InheritRequest {
    pub mode: PropagationMode,
    /// Explicit field-groups; empty means every group of the ancestor.
    pub groups: Vec<String>,
    /// Extra field paths to skip on top of the configured ignore list.
    pub ignored_fields: Vec<String>,
}

impl InheritRequest {
    /// Creation-mode request with no restrictions.
    #[must_use]
    pub fn creation() -> Self {
        Self::default()
    }

    /// Update-mode request with no restrictions.
    #[must_use]
    pub fn update() -> Self {
        Self {
            mode: PropagationMode::Update,
            ..Self::default()
        }
    }

    /// Restrict to a comma list of groups.
    #[must_use]
    pub fn with_groups(mut self, groups: &str) -> Self {
        self.groups = split_list(groups);
        self
    }

    /// Skip a comma list of field paths.
    #[must_use]
    pub fn with_ignored_fields(mut self, fields: &str) -> Self {
        self.ignored_fields = split_list(fields);
        self
    }
}

/// A node mutated by a propagation entry point, not yet persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Propagated {
    pub node: Node,
    pub changed: ChangedFields,
}

/// Outcome of a fan-out from one inheritable node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FanOutReport {
    pub ancestor: Option<NodeId>,
    /// Descendants written, with the fields that changed.
    pub updated: BTreeMap<NodeId, ChangedFields>,
    /// Descendants that needed no write.
    pub unchanged: Vec<NodeId>,
    /// Descendants that failed, with the error text.
    pub failures: BTreeMap<NodeId, String>,
}

impl FanOutReport {
    #[must_use]
    pub fn new(ancestor: NodeId) -> Self {
        Self {
            ancestor: Some(ancestor),
            ..Self::default()
        }
    }

    /// Descendants visited.
    #[must_use]
    pub fn visited(&self) -> usize {
        self.updated.len() + self.unchanged.len() + self.failures.len()
    }

    /// Union of every changed field path.
    #[must_use]
    pub fn changed_fields(&self) -> ChangedFields {
        self.updated.values().flatten().cloned().collect()
    }

    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Kind component of a job's dedup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum JobKind {
    /// Fan-out from an inheritable node.
    ParentInheritance,
    /// Inherit into (or propagate up from) an inheritor.
    Inheritance,
}

impl JobKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ParentInheritance => "parentInheritance",
            Self::Inheritance => "inheritance",
        }
    }
}

/// Dedup key: at most one job pending or running per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobKey {
    pub repository: String,
    pub node_id: NodeId,
    pub kind: JobKind,
}

impl JobKey {
    #[must_use]
    pub fn new(repository: impl Into<String>, node_id: NodeId, kind: JobKind) -> Self {
        Self {
            repository: repository.into(),
            node_id,
            kind,
        }
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.repository, self.node_id, self.kind.as_str())
    }
}

/// Work a background job performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobTask {
    /// Push an inheritable node's fields to its inheritors.
    FanOut,
    /// Fill a created/moved/duplicated inheritor from its ancestor.
    InheritFromAncestor,
    /// Push an edited inheritor's changed fields to its ancestor.
    PropagateUpward,
}

impl JobTask {
    #[must_use]
    pub fn kind(&self) -> JobKind {
        match self {
            Self::FanOut => JobKind::ParentInheritance,
            Self::InheritFromAncestor | Self::PropagateUpward => JobKind::Inheritance,
        }
    }
}

/// A schedulable unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub key: JobKey,
    pub task: JobTask,
}

impl Job {
    #[must_use]
    pub fn new(repository: impl Into<String>, node_id: NodeId, task: JobTask) -> Self {
        Self {
            key: JobKey::new(repository, node_id, task.kind()),
            task,
        }
    }
}
