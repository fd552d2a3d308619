//! # Repository Events
//!
//! Defines all event types that flow through the shared bus.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared_types::entities::Node;
use std::fmt;

/// Lifecycle notification names.
///
/// The wire names follow the document store's conventions
/// (`documentCreated`, `documentModified`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventName {
    /// A document was created.
    Created,
    /// A document was saved.
    Updated,
    /// A document (and its subtree) changed parent.
    Moved,
    /// A document was copied.
    Duplicated,
    /// A document was soft-deleted.
    Removed,
    /// A lifecycle transition happened (other than delete).
    LifecycleTransition,
    /// A version snapshot was taken.
    CheckedIn,
    /// Any name this bus does not model.
    Other(String),
}

impl EventName {
    /// Wire name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Created => "documentCreated",
            Self::Updated => "documentModified",
            Self::Moved => "documentMoved",
            Self::Duplicated => "documentDuplicated",
            Self::Removed => "documentRemoved",
            Self::LifecycleTransition => "lifecycle_transition_event",
            Self::CheckedIn => "documentCheckedIn",
            Self::Other(name) => name,
        }
    }

    /// Parse a wire name; unknown names map to `Other`.
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name {
            "documentCreated" => Self::Created,
            "documentModified" => Self::Updated,
            "documentMoved" => Self::Moved,
            "documentDuplicated" => Self::Duplicated,
            "documentRemoved" => Self::Removed,
            "lifecycle_transition_event" => Self::LifecycleTransition,
            "documentCheckedIn" => Self::CheckedIn,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A notification about one document, published after commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentEvent {
    /// What happened.
    pub name: EventName,
    /// Repository the document lives in.
    pub repository: String,
    /// Snapshot of the document as committed.
    pub subject: Node,
    /// Commit time.
    pub timestamp: DateTime<Utc>,
}

impl DocumentEvent {
    /// Build an event stamped with the current time.
    #[must_use]
    pub fn new(name: EventName, repository: impl Into<String>, subject: Node) -> Self {
        Self {
            name,
            repository: repository.into(),
            subject,
            timestamp: Utc::now(),
        }
    }
}

/// All events that can be published to the bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RepositoryEvent {
    // =========================================================================
    // DOCUMENT CONTEXT
    // =========================================================================
    /// Lifecycle notification about a single document.
    Document(DocumentEvent),

    // =========================================================================
    // SESSION CONTEXT (no subject document)
    // =========================================================================
    /// A session committed a batch of writes.
    SessionSaved {
        /// Repository of the session.
        repository: String,
        /// Number of documents written.
        documents: usize,
    },
}

impl RepositoryEvent {
    /// Get the topic for this event (for filtering).
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::Document(_) => EventTopic::Documents,
            Self::SessionSaved { .. } => EventTopic::Sessions,
        }
    }

    /// Repository the event belongs to.
    #[must_use]
    pub fn repository(&self) -> &str {
        match self {
            Self::Document(event) => &event.repository,
            Self::SessionSaved { repository, .. } => repository,
        }
    }
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// Document lifecycle events.
    Documents,
    /// Session-level events.
    Sessions,
    /// All events (no filtering).
    All,
}

impl EventTopic {
    /// Topic name used in logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Documents => "repository.documents",
            Self::Sessions => "repository.sessions",
            Self::All => "*",
        }
    }
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
    /// Repositories to include. Empty means all repositories.
    pub repositories: Vec<String>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self {
            topics,
            repositories: Vec::new(),
        }
    }

    /// Restrict to one repository.
    #[must_use]
    pub fn in_repository(mut self, repository: impl Into<String>) -> Self {
        self.repositories.push(repository.into());
        self
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &RepositoryEvent) -> bool {
        let topic_match = self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic());

        let repository_match = self.repositories.is_empty()
            || self.repositories.iter().any(|r| r == event.repository());

        topic_match && repository_match
    }
}
