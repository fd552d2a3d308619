//! # Core Domain Entities
//!
//! Defines the document tree entities.
//!
//! ## Clusters
//!
//! - **Identity**: `NodeId`, `DocumentPath`
//! - **Metadata**: `FieldValue`, `FieldMap`, field path helpers
//! - **Document**: `Node`, `LifecycleState`, `VersionLabel`, facet names

use crate::errors::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use uuid::Uuid;

// =============================================================================
// CLUSTER A: IDENTITY
// =============================================================================

/// Stable identifier of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Generate a fresh random identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an identifier from its hyphenated string form.
    pub fn parse(value: &str) -> Option<Self> {
        Uuid::parse_str(value.trim()).ok().map(Self)
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Materialized, slash-separated location of a document in the tree.
///
/// Always absolute, never ends with a slash (except the root `/`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentPath(String);

impl DocumentPath {
    /// Normalize a raw path: leading slash added, duplicate and trailing
    /// slashes removed.
    #[must_use]
    pub fn new(raw: &str) -> Self {
        let segments: Vec<&str> = raw.split('/').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            return Self::root();
        }
        Self(format!("/{}", segments.join("/")))
    }

    /// The tree root.
    #[must_use]
    pub fn root() -> Self {
        Self("/".to_string())
    }

    /// Returns true for the tree root.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Path of a direct child named `name`.
    #[must_use]
    pub fn child(&self, name: &str) -> Self {
        if self.is_root() {
            Self::new(name)
        } else {
            Self::new(&format!("{}/{}", self.0, name))
        }
    }

    /// Parent path, `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind('/') {
            Some(0) => Some(Self::root()),
            Some(idx) => Some(Self(self.0[..idx].to_string())),
            None => None,
        }
    }

    /// Last path segment (empty for the root).
    #[must_use]
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or_default()
    }

    /// Number of segments below the root.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.split('/').filter(|s| !s.is_empty()).count()
    }

    /// Path-prefix predicate: strictly below `ancestor`.
    ///
    /// `/a/bc` is not below `/a/b`; matching is segment-aware.
    #[must_use]
    pub fn is_descendant_of(&self, ancestor: &DocumentPath) -> bool {
        if self == ancestor {
            return false;
        }
        if ancestor.is_root() {
            return true;
        }
        self.0
            .strip_prefix(ancestor.as_str())
            .is_some_and(|rest| rest.starts_with('/'))
    }

    /// Re-home this path from `from` to `to` (used when a subtree moves).
    ///
    /// Returns `None` when the path is neither `from` nor below it.
    #[must_use]
    pub fn rebase(&self, from: &DocumentPath, to: &DocumentPath) -> Option<Self> {
        if self == from {
            return Some(to.clone());
        }
        if !self.is_descendant_of(from) {
            return None;
        }
        let suffix = if from.is_root() {
            self.0.as_str()
        } else {
            &self.0[from.0.len()..]
        };
        Some(Self::new(&format!("{}{}", to.0, suffix)))
    }

    /// Borrow the raw string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentPath {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

// =============================================================================
// CLUSTER B: METADATA
// =============================================================================

/// A type-erased metadata value.
pub type FieldValue = serde_json::Value;

/// Field-path → value map of one field-group.
pub type FieldMap = BTreeMap<String, FieldValue>;

/// Group prefix of a field path (`"custom:priority"` → `"custom"`).
#[must_use]
pub fn field_group(field_path: &str) -> Option<&str> {
    field_path
        .split_once(':')
        .map(|(group, _)| group)
        .filter(|group| !group.is_empty())
}

/// String form of a value as used for emptiness checks.
///
/// Strings render without quotes, `null` renders as the empty string.
#[must_use]
pub fn render_value(value: &FieldValue) -> String {
    match value {
        FieldValue::Null => String::new(),
        FieldValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// True when a destination value counts as unset: null, empty string or empty list.
#[must_use]
pub fn is_empty_value(value: Option<&FieldValue>) -> bool {
    match value {
        None | Some(FieldValue::Null) => true,
        Some(FieldValue::Array(items)) => items.is_empty(),
        Some(other) => render_value(other).is_empty(),
    }
}

/// Capability tags (facets) with meaning for the tree.
pub mod facets {
    /// Source of propagation.
    pub const INHERITABLE: &str = "inheritable";
    /// Sink of propagation.
    pub const INHERITOR: &str = "inheritor";
    /// Accepts version bumps on save.
    pub const VERSIONABLE: &str = "Versionable";
    /// Excluded from navigation and descendant queries.
    pub const HIDDEN_IN_NAVIGATION: &str = "HiddenInNavigation";
}

/// Node type that terminates upward walks.
pub const ROOT_SENTINEL_TYPE: &str = "Domain";

// =============================================================================
// CLUSTER C: DOCUMENT
// =============================================================================

/// Lifecycle state of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LifecycleState {
    /// Live document.
    #[default]
    Active,
    /// Soft-deleted (trash).
    Deleted,
}

/// `major.minor` version label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VersionLabel {
    pub major: u32,
    pub minor: u32,
}

impl VersionLabel {
    /// Next minor version.
    #[must_use]
    pub fn bump_minor(self) -> Self {
        Self {
            major: self.major,
            minor: self.minor.saturating_add(1),
        }
    }
}

impl fmt::Display for VersionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// A document-tree entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Stable identifier.
    pub id: NodeId,
    /// Materialized path.
    pub path: DocumentPath,
    /// Tree parent (ownership lives in the store), `None` for the root.
    pub parent_ref: Option<NodeId>,
    /// Document type name.
    pub node_type: String,
    /// Attached capability tags.
    pub facets: BTreeSet<String>,
    /// Field-group name → field map.
    pub schemas: BTreeMap<String, FieldMap>,
    /// Lifecycle state.
    pub lifecycle: LifecycleState,
    /// True for an immutable version snapshot.
    pub is_version: bool,
    /// True for a proxy referencing another document.
    pub is_proxy: bool,
    /// Current version label.
    pub version: VersionLabel,
}

impl Node {
    /// Create an active, facet-less document at `path`.
    #[must_use]
    pub fn new(node_type: &str, path: DocumentPath) -> Self {
        Self {
            id: NodeId::new(),
            path,
            parent_ref: None,
            node_type: node_type.to_string(),
            facets: BTreeSet::new(),
            schemas: BTreeMap::new(),
            lifecycle: LifecycleState::Active,
            is_version: false,
            is_proxy: false,
            version: VersionLabel::default(),
        }
    }

    /// Builder: set the parent reference.
    #[must_use]
    pub fn with_parent(mut self, parent: NodeId) -> Self {
        self.parent_ref = Some(parent);
        self
    }

    /// Builder: attach a facet.
    #[must_use]
    pub fn with_facet(mut self, facet: &str) -> Self {
        self.facets.insert(facet.to_string());
        self
    }

    /// Builder: attach an empty field-group.
    #[must_use]
    pub fn with_schema(mut self, group: &str) -> Self {
        self.schemas.entry(group.to_string()).or_default();
        self
    }

    /// Builder: attach a field, creating its group if needed.
    #[must_use]
    pub fn with_field(mut self, field_path: &str, value: FieldValue) -> Self {
        if let Some(group) = field_group(field_path) {
            self.schemas
                .entry(group.to_string())
                .or_default()
                .insert(field_path.to_string(), value);
        }
        self
    }

    /// Last segment of the path.
    #[must_use]
    pub fn name(&self) -> &str {
        self.path.name()
    }

    /// True when the facet is attached.
    #[must_use]
    pub fn has_facet(&self, facet: &str) -> bool {
        self.facets.contains(facet)
    }

    /// Attach a facet, returning false if it was already present.
    pub fn add_facet(&mut self, facet: &str) -> bool {
        self.facets.insert(facet.to_string())
    }

    /// True when the field-group is attached.
    #[must_use]
    pub fn has_schema(&self, group: &str) -> bool {
        self.schemas.contains_key(group)
    }

    /// Names of all attached field-groups, sorted.
    pub fn schema_names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    /// Materialized field map of one group.
    #[must_use]
    pub fn schema(&self, group: &str) -> Option<&FieldMap> {
        self.schemas.get(group)
    }

    /// Value of a field, `None` if the group or field is absent.
    #[must_use]
    pub fn property(&self, field_path: &str) -> Option<&FieldValue> {
        let group = field_group(field_path)?;
        self.schemas.get(group)?.get(field_path)
    }

    /// Write a field; its group must already be attached.
    ///
    /// Returns the previous value.
    pub fn set_property(
        &mut self,
        field_path: &str,
        value: FieldValue,
    ) -> StoreResult<Option<FieldValue>> {
        let group = field_group(field_path)
            .ok_or_else(|| StoreError::MalformedFieldPath(field_path.to_string()))?;
        let id = self.id;
        let fields = self
            .schemas
            .get_mut(group)
            .ok_or_else(|| StoreError::UnknownField {
                node: id.to_string(),
                field: field_path.to_string(),
                group: group.to_string(),
            })?;
        Ok(fields.insert(field_path.to_string(), value))
    }

    /// True unless soft-deleted.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.lifecycle == LifecycleState::Active
    }
}
