//! In-memory document store with sessions.
//!
//! Single-process reference implementation of [`DocumentStore`]. Sessions
//! stage writes locally; commit applies them under one write lock and then
//! publishes one event per staged write to the bus.

use crate::domain::linkage;
use crate::ports::outbound::{
    DescendantQuery, DocumentSession, DocumentStore, SaveOptions, VersioningOption, WriteOrigin,
};
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_bus::{DocumentEvent, EventName, EventPublisher, RepositoryEvent};
use shared_types::{
    facets, DocumentPath, LifecycleState, Node, NodeId, StoreError, StoreResult,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

type Documents = Arc<RwLock<HashMap<NodeId, Node>>>;

/// Reference document store.
#[derive(Clone)]
pub struct InMemoryDocumentStore {
    repository: String,
    documents: Documents,
    publisher: Option<Arc<dyn EventPublisher>>,
}

impl InMemoryDocumentStore {
    /// Store with no event publisher attached.
    #[must_use]
    pub fn new(repository: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            documents: Arc::new(RwLock::new(HashMap::new())),
            publisher: None,
        }
    }

    /// Publish post-commit events through `publisher`.
    #[must_use]
    pub fn with_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// Concrete session (the trait returns it boxed).
    #[must_use]
    pub fn session(&self) -> InMemorySession {
        InMemorySession {
            id: Uuid::new_v4(),
            repository: self.repository.clone(),
            documents: self.documents.clone(),
            publisher: self.publisher.clone(),
            staged: Vec::new(),
            closed: false,
        }
    }

    /// Committed state of a document.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<Node> {
        self.documents.read().get(&id).cloned()
    }

    /// Committed document at `path`.
    #[must_use]
    pub fn find_by_path(&self, path: &str) -> Option<Node> {
        let path = DocumentPath::new(path);
        self.documents
            .read()
            .values()
            .find(|node| node.path == path)
            .cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }

    /// Create a document at `node.path`, emitting `documentCreated`.
    ///
    /// The parent reference is resolved from the path. The `inheritor`
    /// facet brings the linkage field-group with it.
    pub async fn create_document(&self, node: Node) -> StoreResult<Node> {
        let mut session = self.session();
        let created = session.create(node)?;
        session.commit().await?;
        Ok(created)
    }

    /// Save a user edit, emitting `documentModified`.
    pub async fn update_document(&self, node: Node) -> StoreResult<Node> {
        let mut session = self.session();
        let saved = session.save_document(node, SaveOptions::user()).await?;
        session.commit().await?;
        Ok(saved)
    }

    /// Move a document (and its subtree) under `new_parent`, emitting
    /// `documentMoved` for the moved document only.
    pub async fn move_document(&self, id: NodeId, new_parent: NodeId) -> StoreResult<Node> {
        let mut session = self.session();
        let moved = session.relocate(id, new_parent)?;
        session.commit().await?;
        Ok(moved)
    }

    /// Copy a single document under `new_parent`, emitting
    /// `documentDuplicated` for the copy.
    pub async fn duplicate_document(&self, id: NodeId, new_parent: NodeId) -> StoreResult<Node> {
        let mut session = self.session();
        let copy = session.copy(id, new_parent)?;
        session.commit().await?;
        Ok(copy)
    }

    /// Soft-delete: lifecycle goes to `Deleted`, emitting `documentRemoved`.
    pub async fn delete_document(&self, id: NodeId) -> StoreResult<Node> {
        let mut session = self.session();
        let mut node = session
            .lookup(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        node.lifecycle = LifecycleState::Deleted;
        session.stage(node.clone(), Some(EventName::Removed));
        session.commit().await?;
        Ok(node)
    }

    /// Hard-remove a document and its subtree, emitting `documentRemoved`.
    ///
    /// Returns the number of documents removed.
    pub async fn purge_document(&self, id: NodeId) -> StoreResult<usize> {
        let (removed, subject) = {
            let mut docs = self.documents.write();
            let subject = docs
                .remove(&id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            let before = docs.len();
            docs.retain(|_, node| !node.path.is_descendant_of(&subject.path));
            (before - docs.len() + 1, subject)
        };

        info!(node_id = %id, removed, "Document purged");
        if let Some(publisher) = &self.publisher {
            publisher
                .publish(RepositoryEvent::Document(DocumentEvent::new(
                    EventName::Removed,
                    self.repository.clone(),
                    subject,
                )))
                .await;
        }
        Ok(removed)
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    fn repository(&self) -> &str {
        &self.repository
    }

    async fn open_session(&self) -> StoreResult<Box<dyn DocumentSession>> {
        Ok(Box::new(self.session()))
    }
}

struct StagedWrite {
    node: Node,
    /// `None` for silent writes (subtree path rewrites).
    event: Option<EventName>,
}

/// Session over an [`InMemoryDocumentStore`].
pub struct InMemorySession {
    id: Uuid,
    repository: String,
    documents: Documents,
    publisher: Option<Arc<dyn EventPublisher>>,
    staged: Vec<StagedWrite>,
    closed: bool,
}

impl InMemorySession {
    fn ensure_open(&self) -> StoreResult<()> {
        if self.closed {
            return Err(StoreError::SessionClosed(self.id.to_string()));
        }
        Ok(())
    }

    /// Effective view: staged write if any, else committed.
    fn lookup(&self, id: NodeId) -> Option<Node> {
        self.staged
            .iter()
            .find(|w| w.node.id == id)
            .map(|w| w.node.clone())
            .or_else(|| self.documents.read().get(&id).cloned())
    }

    fn effective_nodes(&self) -> Vec<Node> {
        let docs = self.documents.read();
        let mut nodes: HashMap<NodeId, Node> = docs
            .iter()
            .map(|(id, node)| (*id, node.clone()))
            .collect();
        drop(docs);
        for write in &self.staged {
            nodes.insert(write.node.id, write.node.clone());
        }
        nodes.into_values().collect()
    }

    /// Staged writes shadow the committed copy of the same node, so a node
    /// staged away from `path` is not found there.
    fn lookup_path(&self, path: &DocumentPath) -> Option<Node> {
        if let Some(write) = self.staged.iter().find(|w| &w.node.path == path) {
            return Some(write.node.clone());
        }
        self.documents
            .read()
            .values()
            .find(|n| &n.path == path && !self.staged.iter().any(|w| w.node.id == n.id))
            .cloned()
    }

    /// Stage a write; a later write to the same node replaces the node and
    /// keeps the more specific event.
    fn stage(&mut self, node: Node, event: Option<EventName>) {
        if let Some(existing) = self.staged.iter_mut().find(|w| w.node.id == node.id) {
            existing.node = node;
            if let Some(new_event) = event {
                if matches!(existing.event, None | Some(EventName::Updated)) {
                    existing.event = Some(new_event);
                }
            }
            return;
        }
        self.staged.push(StagedWrite { node, event });
    }

    /// Stage a new document.
    pub fn create(&mut self, mut node: Node) -> StoreResult<Node> {
        self.ensure_open()?;
        if self.lookup_path(&node.path).is_some() {
            return Err(StoreError::PathTaken(node.path.to_string()));
        }
        node.parent_ref = match node.path.parent() {
            Some(parent_path) if !parent_path.is_root() => {
                let parent = self
                    .lookup_path(&parent_path)
                    .ok_or_else(|| StoreError::PathNotFound(parent_path.to_string()))?;
                Some(parent.id)
            }
            _ => None,
        };
        if node.has_facet(facets::INHERITOR) {
            node.schemas
                .entry(linkage::LINKAGE_GROUP.to_string())
                .or_default();
        }
        debug!(node_id = %node.id, path = %node.path, "Document created");
        self.stage(node.clone(), Some(EventName::Created));
        Ok(node)
    }

    fn relocate(&mut self, id: NodeId, new_parent: NodeId) -> StoreResult<Node> {
        self.ensure_open()?;
        let node = self
            .lookup(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let parent = self
            .lookup(new_parent)
            .ok_or_else(|| StoreError::NotFound(new_parent.to_string()))?;
        if parent.id == node.id || parent.path.is_descendant_of(&node.path) {
            return Err(StoreError::InvalidMove {
                node: node.path.to_string(),
                target: parent.path.to_string(),
            });
        }

        let from = node.path.clone();
        let to = parent.path.child(node.name());
        if self.lookup_path(&to).is_some() {
            return Err(StoreError::PathTaken(to.to_string()));
        }

        for mut descendant in self
            .effective_nodes()
            .into_iter()
            .filter(|n| n.path.is_descendant_of(&from))
        {
            if let Some(path) = descendant.path.rebase(&from, &to) {
                descendant.path = path;
                self.stage(descendant, None);
            }
        }

        let mut moved = node;
        moved.path = to;
        moved.parent_ref = Some(parent.id);
        self.stage(moved.clone(), Some(EventName::Moved));
        Ok(moved)
    }

    fn copy(&mut self, id: NodeId, new_parent: NodeId) -> StoreResult<Node> {
        self.ensure_open()?;
        let original = self
            .lookup(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let parent = self
            .lookup(new_parent)
            .ok_or_else(|| StoreError::NotFound(new_parent.to_string()))?;

        let mut path = parent.path.child(original.name());
        let mut attempt = 1;
        while self.lookup_path(&path).is_some() {
            let suffix = if attempt == 1 {
                "copy".to_string()
            } else {
                format!("copy-{attempt}")
            };
            path = parent.path.child(&format!("{}-{suffix}", original.name()));
            attempt += 1;
        }

        let mut copy = original;
        copy.id = NodeId::new();
        copy.path = path;
        copy.parent_ref = Some(parent.id);
        copy.version = Default::default();
        self.stage(copy.clone(), Some(EventName::Duplicated));
        Ok(copy)
    }
}

#[async_trait]
impl DocumentSession for InMemorySession {
    fn repository(&self) -> &str {
        &self.repository
    }

    async fn get_document(&self, id: NodeId) -> StoreResult<Option<Node>> {
        self.ensure_open()?;
        Ok(self.lookup(id))
    }

    async fn get_document_by_path(&self, path: &DocumentPath) -> StoreResult<Option<Node>> {
        self.ensure_open()?;
        Ok(self.lookup_path(path))
    }

    async fn exists(&self, id: NodeId) -> StoreResult<bool> {
        self.ensure_open()?;
        Ok(self.lookup(id).is_some())
    }

    async fn query_descendants(&self, query: &DescendantQuery) -> StoreResult<Vec<Node>> {
        self.ensure_open()?;
        let mut matches: Vec<Node> = self
            .effective_nodes()
            .into_iter()
            .filter(|node| query.matches(node))
            .collect();
        matches.sort_by_key(|node| node.id);
        matches.dedup_by_key(|node| node.id);
        Ok(matches)
    }

    async fn save_document(&mut self, node: Node, options: SaveOptions) -> StoreResult<Node> {
        self.ensure_open()?;
        let previous = self
            .lookup(node.id)
            .ok_or_else(|| StoreError::NotFound(node.id.to_string()))?;

        let mut node = node;
        // Tree position only changes through move.
        node.path = previous.path.clone();
        node.parent_ref = previous.parent_ref;

        if options.origin == WriteOrigin::User && node.has_schema(linkage::LINKAGE_GROUP) {
            let changed = linkage::changed_fields(Some(&previous), &node);
            linkage::set_last_updated_fields(&mut node, &changed)?;
        }
        if options.versioning == VersioningOption::Minor && node.has_facet(facets::VERSIONABLE) {
            node.version = previous.version.bump_minor();
        }

        self.stage(node.clone(), Some(EventName::Updated));
        Ok(node)
    }

    async fn commit(&mut self) -> StoreResult<usize> {
        self.ensure_open()?;
        let staged = std::mem::take(&mut self.staged);
        if staged.is_empty() {
            return Ok(0);
        }

        {
            let mut docs = self.documents.write();
            for write in &staged {
                docs.insert(write.node.id, write.node.clone());
            }
        }
        let written = staged.len();
        debug!(session = %self.id, written, "Session committed");

        if let Some(publisher) = &self.publisher {
            for write in staged {
                if let Some(name) = write.event {
                    publisher
                        .publish(RepositoryEvent::Document(DocumentEvent::new(
                            name,
                            self.repository.clone(),
                            write.node,
                        )))
                        .await;
                }
            }
            publisher
                .publish(RepositoryEvent::SessionSaved {
                    repository: self.repository.clone(),
                    documents: written,
                })
                .await;
        }
        Ok(written)
    }

    async fn rollback(&mut self) -> StoreResult<()> {
        let discarded = self.staged.len();
        self.staged.clear();
        self.closed = true;
        debug!(session = %self.id, discarded, "Session rolled back");
        Ok(())
    }
}
