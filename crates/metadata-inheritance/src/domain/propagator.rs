//! Field Propagator
//!
//! Copies field values from a source node into a destination node under the
//! group selection, ignore list and override/null policy. Pure: the caller
//! persists the destination.

use super::value_objects::ChangedFields;
use shared_types::{field_group, is_empty_value, render_value, FieldValue, Node, StoreResult};

/// Field-groups that never propagate, whatever the configuration says.
pub const FIXED_IGNORED_GROUPS: [&str; 8] = [
    "dublincore",
    "common",
    "uid",
    "file",
    "files",
    "relation",
    "inherit",
    "inheritance",
];

/// Write policy for a propagation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PropagationPolicy {
    /// Only write into destination fields that are currently empty.
    pub fill_empty_only: bool,
    /// Allow empty source values to be written.
    pub propagate_null_values: bool,
}

/// True for groups in [`FIXED_IGNORED_GROUPS`].
#[must_use]
pub fn is_fixed_ignored_group(group: &str) -> bool {
    FIXED_IGNORED_GROUPS.contains(&group.trim())
}

/// Whether a source value may be written.
///
/// Empty values (null, blank, empty list or the literal `"null"`) only pass
/// when null propagation is enabled.
#[must_use]
pub fn allow_write(value: Option<&FieldValue>, propagate_null_values: bool) -> bool {
    let empty = is_empty_value(value) || value.is_some_and(|v| render_value(v) == "null");
    !empty || propagate_null_values
}

fn is_ignored(field_path: &str, ignored_fields: &[String]) -> bool {
    ignored_fields.iter().any(|ignored| ignored.trim() == field_path)
}

/// Copy one field, recording it when the destination value actually changed.
fn copy_field(
    field_path: &str,
    value: Option<&FieldValue>,
    destination: &mut Node,
    policy: PropagationPolicy,
    changed: &mut ChangedFields,
) -> StoreResult<()> {
    if !allow_write(value, policy.propagate_null_values) {
        return Ok(());
    }
    if policy.fill_empty_only && !is_empty_value(destination.property(field_path)) {
        return Ok(());
    }

    let value = value.cloned().unwrap_or(FieldValue::Null);
    let previous = destination.set_property(field_path, value.clone())?;
    if previous.as_ref() != Some(&value) {
        changed.insert(field_path.to_string());
    }
    Ok(())
}

/// Propagate whole field-groups from `source` into `destination`.
///
/// With an empty `allowed_groups` every group attached to `source` is a
/// candidate. Groups the destination lacks are skipped silently.
pub fn propagate(
    source: &Node,
    destination: &mut Node,
    allowed_groups: &[String],
    ignored_fields: &[String],
    policy: PropagationPolicy,
) -> StoreResult<ChangedFields> {
    let groups: Vec<String> = {
        let explicit: Vec<String> = allowed_groups
            .iter()
            .map(|g| g.trim().to_string())
            .filter(|g| !g.is_empty())
            .collect();
        if explicit.is_empty() {
            source.schema_names().map(str::to_string).collect()
        } else {
            explicit
        }
    };

    let mut changed = ChangedFields::new();
    for group in &groups {
        if is_fixed_ignored_group(group) || !destination.has_schema(group) {
            continue;
        }
        let Some(fields) = source.schema(group) else {
            continue;
        };
        for (field_path, value) in fields {
            if is_ignored(field_path, ignored_fields) {
                continue;
            }
            copy_field(field_path, Some(value), destination, policy, &mut changed)?;
        }
    }
    Ok(changed)
}

/// Propagate only the named field paths.
///
/// Fixed ignored groups, the ignore list and destination group presence are
/// honoured the same way as in [`propagate`].
pub fn propagate_fields(
    source: &Node,
    destination: &mut Node,
    field_paths: &[String],
    ignored_fields: &[String],
    policy: PropagationPolicy,
) -> StoreResult<ChangedFields> {
    let mut changed = ChangedFields::new();
    for field_path in field_paths.iter().map(|f| f.trim()) {
        let Some(group) = field_group(field_path) else {
            continue;
        };
        if is_fixed_ignored_group(group)
            || !destination.has_schema(group)
            || is_ignored(field_path, ignored_fields)
        {
            continue;
        }
        copy_field(
            field_path,
            source.property(field_path),
            destination,
            policy,
            &mut changed,
        )?;
    }
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;
    use shared_types::DocumentPath;

    fn source() -> Node {
        Node::new("Folder", DocumentPath::new("/a"))
            .with_field("custom:priority", json!("high"))
            .with_field("custom:owner", json!("alice"))
            .with_field("custom:empty", json!(""))
            .with_field("custom:nullish", json!("null"))
            .with_field("dublincore:title", json!("A"))
            .with_field("extra:code", json!(42))
    }

    fn destination() -> Node {
        Node::new("File", DocumentPath::new("/a/b"))
            .with_schema("custom")
            .with_schema("dublincore")
            .with_schema("inheritance")
    }

    #[test]
    fn test_copies_all_eligible_fields() {
        let mut dest = destination();
        let changed =
            propagate(&source(), &mut dest, &[], &[], PropagationPolicy::default()).unwrap();

        assert_eq!(
            changed.into_iter().collect::<Vec<_>>(),
            vec!["custom:owner".to_string(), "custom:priority".to_string()]
        );
        assert_eq!(dest.property("custom:priority"), Some(&json!("high")));
        // fixed group never copied, missing group skipped
        assert_eq!(dest.property("dublincore:title"), None);
        assert!(!dest.has_schema("extra"));
    }

    #[test]
    fn test_second_run_reports_no_changes() {
        let mut dest = destination();
        propagate(&source(), &mut dest, &[], &[], PropagationPolicy::default()).unwrap();
        let changed =
            propagate(&source(), &mut dest, &[], &[], PropagationPolicy::default()).unwrap();
        assert!(changed.is_empty());
    }

    #[test]
    fn test_fill_empty_only_keeps_existing_values() {
        let mut dest = destination()
            .with_field("custom:priority", json!("low"))
            .with_field("custom:owner", json!(""));
        let policy = PropagationPolicy {
            fill_empty_only: true,
            propagate_null_values: false,
        };
        let changed = propagate(&source(), &mut dest, &[], &[], policy).unwrap();

        assert_eq!(dest.property("custom:priority"), Some(&json!("low")));
        assert_eq!(dest.property("custom:owner"), Some(&json!("alice")));
        assert_eq!(changed.len(), 1);
    }

    #[test]
    fn test_null_policy() {
        let mut dest = destination().with_field("custom:empty", json!("keep"));
        propagate(&source(), &mut dest, &[], &[], PropagationPolicy::default()).unwrap();
        assert_eq!(dest.property("custom:empty"), Some(&json!("keep")));
        assert_eq!(dest.property("custom:nullish"), None);

        let policy = PropagationPolicy {
            fill_empty_only: false,
            propagate_null_values: true,
        };
        let changed = propagate(&source(), &mut dest, &[], &[], policy).unwrap();
        assert_eq!(dest.property("custom:empty"), Some(&json!("")));
        assert!(changed.contains("custom:empty"));
        assert!(changed.contains("custom:nullish"));
    }

    #[test]
    fn test_allowed_groups_and_ignore_list() {
        let mut dest = destination().with_schema("extra");
        let changed = propagate(
            &source(),
            &mut dest,
            &[" extra ".to_string()],
            &[],
            PropagationPolicy::default(),
        )
        .unwrap();
        assert_eq!(changed.len(), 1);
        assert_eq!(dest.property("custom:priority"), None);

        let mut dest = destination();
        propagate(
            &source(),
            &mut dest,
            &[],
            &[" custom:owner".to_string()],
            PropagationPolicy::default(),
        )
        .unwrap();
        assert_eq!(dest.property("custom:owner"), None);
        assert_eq!(dest.property("custom:priority"), Some(&json!("high")));
    }

    #[test]
    fn test_propagate_fields_narrowed() {
        let mut dest = destination().with_field("custom:owner", json!("bob"));
        let changed = propagate_fields(
            &source(),
            &mut dest,
            &[
                "custom:priority".to_string(),
                "dublincore:title".to_string(),
                "extra:code".to_string(),
                "malformed".to_string(),
            ],
            &[],
            PropagationPolicy::default(),
        )
        .unwrap();

        assert_eq!(changed.into_iter().collect::<Vec<_>>(), vec!["custom:priority"]);
        assert_eq!(dest.property("custom:owner"), Some(&json!("bob")));
    }

    #[test]
    fn test_propagate_fields_missing_source_field() {
        let mut dest = destination().with_field("custom:gone", json!("x"));
        let fields = vec!["custom:gone".to_string()];

        propagate_fields(&source(), &mut dest, &fields, &[], PropagationPolicy::default())
            .unwrap();
        assert_eq!(dest.property("custom:gone"), Some(&json!("x")));

        let policy = PropagationPolicy {
            fill_empty_only: false,
            propagate_null_values: true,
        };
        let changed = propagate_fields(&source(), &mut dest, &fields, &[], policy).unwrap();
        assert_eq!(dest.property("custom:gone"), Some(&json!(null)));
        assert_eq!(changed.len(), 1);
    }

    fn value_strategy() -> impl Strategy<Value = FieldValue> {
        prop_oneof![
            Just(json!(null)),
            Just(json!("")),
            Just(json!("null")),
            "[a-z]{1,6}".prop_map(|s| json!(s)),
            any::<i32>().prop_map(|n| json!(n)),
        ]
    }

    proptest! {
        #[test]
        fn prop_propagation_is_idempotent(
            src_values in proptest::collection::btree_map("[a-d]", value_strategy(), 0..5),
            dst_values in proptest::collection::btree_map("[a-d]", value_strategy(), 0..5),
            fill_empty_only in any::<bool>(),
            propagate_null_values in any::<bool>(),
        ) {
            let mut src = Node::new("Folder", DocumentPath::new("/s")).with_schema("custom");
            for (k, v) in &src_values {
                src = src.with_field(&format!("custom:{k}"), v.clone());
            }
            let mut dest = Node::new("File", DocumentPath::new("/s/d")).with_schema("custom");
            for (k, v) in &dst_values {
                dest = dest.with_field(&format!("custom:{k}"), v.clone());
            }
            let policy = PropagationPolicy { fill_empty_only, propagate_null_values };

            propagate(&src, &mut dest, &[], &[], policy).unwrap();
            let second = propagate(&src, &mut dest, &[], &[], policy).unwrap();
            prop_assert!(second.is_empty());
        }

        #[test]
        fn prop_fill_empty_only_never_overwrites(
            src_values in proptest::collection::btree_map("[a-d]", value_strategy(), 0..5),
            dst_values in proptest::collection::btree_map("[a-d]", value_strategy(), 0..5),
        ) {
            let mut src = Node::new("Folder", DocumentPath::new("/s")).with_schema("custom");
            for (k, v) in &src_values {
                src = src.with_field(&format!("custom:{k}"), v.clone());
            }
            let mut dest = Node::new("File", DocumentPath::new("/s/d")).with_schema("custom");
            for (k, v) in &dst_values {
                dest = dest.with_field(&format!("custom:{k}"), v.clone());
            }
            let before = dest.clone();
            let policy = PropagationPolicy { fill_empty_only: true, propagate_null_values: true };

            propagate(&src, &mut dest, &[], &[], policy).unwrap();
            for (k, v) in &dst_values {
                let path = format!("custom:{k}");
                if !is_empty_value(Some(v)) {
                    prop_assert_eq!(dest.property(&path), before.property(&path));
                }
            }
        }
    }
}
