//! Inheritance linkage fields stored on inheritor nodes.

use shared_types::{FieldValue, Node, NodeId, StoreResult};
use std::collections::BTreeSet;

/// Field-group holding the linkage fields.
pub const LINKAGE_GROUP: &str = "inheritance";
/// Identifier of the resolved inheritable ancestor.
pub const PARENT_ID: &str = "inheritance:parentId";
/// Whether a local edit re-propagates upward.
pub const UPDATE_PARENT: &str = "inheritance:updateParent";
/// Field paths changed by the latest user edit.
pub const LAST_UPDATED_FIELDS: &str = "inheritance:lastUpdatedFields";

/// Stored ancestor back-reference. May be stale.
#[must_use]
pub fn parent_id(node: &Node) -> Option<NodeId> {
    node.property(PARENT_ID)
        .and_then(FieldValue::as_str)
        .and_then(NodeId::parse)
}

/// Stored `updateParent` flag; absent or unreadable means true.
#[must_use]
pub fn update_parent(node: &Node) -> bool {
    match node.property(UPDATE_PARENT) {
        Some(FieldValue::Bool(flag)) => *flag,
        Some(FieldValue::String(s)) => !s.trim().eq_ignore_ascii_case("false"),
        _ => true,
    }
}

/// Stored `lastUpdatedFields`, in order.
#[must_use]
pub fn last_updated_fields(node: &Node) -> Vec<String> {
    match node.property(LAST_UPDATED_FIELDS) {
        Some(FieldValue::Array(items)) => items
            .iter()
            .filter_map(FieldValue::as_str)
            .map(str::to_string)
            .collect(),
        Some(FieldValue::String(s)) => super::config::split_list(s),
        _ => Vec::new(),
    }
}

fn ensure_group(node: &mut Node) {
    node.schemas.entry(LINKAGE_GROUP.to_string()).or_default();
}

/// Record the resolved ancestor and the `updateParent` flag.
///
/// Attaches the linkage group on first use.
pub fn link(node: &mut Node, ancestor: NodeId, update_parent: bool) -> StoreResult<()> {
    ensure_group(node);
    node.set_property(PARENT_ID, FieldValue::String(ancestor.to_string()))?;
    node.set_property(UPDATE_PARENT, FieldValue::Bool(update_parent))?;
    Ok(())
}

pub fn set_update_parent(node: &mut Node, update_parent: bool) -> StoreResult<()> {
    ensure_group(node);
    node.set_property(UPDATE_PARENT, FieldValue::Bool(update_parent))?;
    Ok(())
}

pub fn set_last_updated_fields(node: &mut Node, fields: &[String]) -> StoreResult<()> {
    ensure_group(node);
    let value = FieldValue::Array(fields.iter().cloned().map(FieldValue::String).collect());
    node.set_property(LAST_UPDATED_FIELDS, value)?;
    Ok(())
}

/// Field paths whose value differs between `before` and `after`.
///
/// The linkage group itself is excluded. A field present on one side only
/// counts as changed unless its value there is null.
#[must_use]
pub fn changed_fields(before: Option<&Node>, after: &Node) -> Vec<String> {
    let mut changed = BTreeSet::new();
    for (group, fields) in &after.schemas {
        if group == LINKAGE_GROUP {
            continue;
        }
        let previous = before.and_then(|node| node.schema(group));
        for (path, value) in fields {
            let old = previous.and_then(|map| map.get(path));
            let differs = match old {
                Some(old) => old != value,
                None => !value.is_null(),
            };
            if differs {
                changed.insert(path.clone());
            }
        }
    }
    if let Some(before) = before {
        for (group, fields) in &before.schemas {
            if group == LINKAGE_GROUP {
                continue;
            }
            for (path, value) in fields {
                if after.property(path).is_none() && !value.is_null() {
                    changed.insert(path.clone());
                }
            }
        }
    }
    changed.into_iter().collect()
}
