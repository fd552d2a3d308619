//! Outbound (Driven) ports: the document store.
//!
//! The inheritance core never owns documents. Every read and write goes
//! through a [`DocumentSession`] opened on a [`DocumentStore`]; events for
//! the writes are delivered by the store after commit.

use async_trait::async_trait;
use shared_types::{facets, DocumentPath, Node, NodeId, StoreResult};

/// Version bump applied on save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VersioningOption {
    #[default]
    None,
    /// Bump the minor version when the node is `Versionable`.
    Minor,
}

/// Who caused a write.
///
/// Stores recompute `inheritance:lastUpdatedFields` for user writes only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteOrigin {
    #[default]
    User,
    Propagation,
}

/// Options for [`DocumentSession::save_document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SaveOptions {
    pub versioning: VersioningOption,
    pub origin: WriteOrigin,
}

impl SaveOptions {
    #[must_use]
    pub fn user() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn propagation() -> Self {
        Self {
            versioning: VersioningOption::None,
            origin: WriteOrigin::Propagation,
        }
    }

    /// Request a minor version bump.
    #[must_use]
    pub fn with_minor_bump(mut self) -> Self {
        self.versioning = VersioningOption::Minor;
        self
    }
}

/// Subtree query: descendants of `root` carrying `facet`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescendantQuery {
    pub root: DocumentPath,
    pub facet: String,
    pub exclude_deleted: bool,
    pub exclude_hidden: bool,
    pub exclude_versions: bool,
    pub exclude_proxies: bool,
}

impl DescendantQuery {
    /// Live, visible inheritors under `root`; versions and proxies are
    /// dropped when `ignore_versions` is set.
    #[must_use]
    pub fn inheritors_under(root: DocumentPath, ignore_versions: bool) -> Self {
        Self {
            root,
            facet: facets::INHERITOR.to_string(),
            exclude_deleted: true,
            exclude_hidden: true,
            exclude_versions: ignore_versions,
            exclude_proxies: ignore_versions,
        }
    }

    /// Predicate form, for stores that evaluate the query in memory.
    #[must_use]
    pub fn matches(&self, node: &Node) -> bool {
        node.path.is_descendant_of(&self.root)
            && node.has_facet(&self.facet)
            && !(self.exclude_deleted && !node.is_active())
            && !(self.exclude_hidden && node.has_facet(facets::HIDDEN_IN_NAVIGATION))
            && !(self.exclude_versions && node.is_version)
            && !(self.exclude_proxies && node.is_proxy)
    }
}

/// A unit of work against the store.
///
/// Reads see the session's own staged writes. Nothing is visible to other
/// sessions, and no event fires, until [`commit`](Self::commit).
#[async_trait]
pub trait DocumentSession: Send + Sync {
    /// Repository this session belongs to.
    fn repository(&self) -> &str;

    async fn get_document(&self, id: NodeId) -> StoreResult<Option<Node>>;

    async fn get_document_by_path(&self, path: &DocumentPath) -> StoreResult<Option<Node>>;

    async fn exists(&self, id: NodeId) -> StoreResult<bool>;

    /// Nodes matching the query, sorted by identifier without duplicates.
    async fn query_descendants(&self, query: &DescendantQuery) -> StoreResult<Vec<Node>>;

    /// Stage a write of an existing node, returning the stored form.
    async fn save_document(&mut self, node: Node, options: SaveOptions) -> StoreResult<Node>;

    /// Apply staged writes; returns how many documents were written.
    async fn commit(&mut self) -> StoreResult<usize>;

    /// Discard staged writes and close the session.
    async fn rollback(&mut self) -> StoreResult<()>;
}

/// Factory for sessions.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    fn repository(&self) -> &str;

    async fn open_session(&self) -> StoreResult<Box<dyn DocumentSession>>;
}
