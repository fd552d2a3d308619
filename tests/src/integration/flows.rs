//! # Integration Test Flows
//!
//! Each test starts a runtime, edits the tree through the store and waits
//! for the pipeline to settle before inspecting the committed state.
//!
//! ## Flows Tested:
//!
//! 1. **Creation**: a new inheritor receives its ancestor's fields
//! 2. **Upward**: an inheritor edit reaches the ancestor and its siblings
//! 3. **Loop suppression**: no save bounces back and forth
//! 4. **Policy**: null handling, override, global switch
//! 5. **Scheduling**: deduplication and vanished subjects

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use inheritance_runtime::{InheritanceRuntime, RuntimeConfig};
    use metadata_inheritance::domain::config::{keys, CONFIG_PATH};
    use metadata_inheritance::{linkage, Job, JobTask, ScheduleOutcome, WorkState, NOTHING_TO_PROCESS};
    use serde_json::{json, Value};
    use shared_types::{facets, DocumentPath, Node};

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    async fn started() -> InheritanceRuntime {
        let runtime = InheritanceRuntime::new(RuntimeConfig::default());
        runtime.start().await.expect("runtime starts");
        runtime
    }

    async fn settle(runtime: &InheritanceRuntime) {
        assert!(
            runtime.settle(Duration::from_secs(5)).await,
            "pipeline did not settle"
        );
    }

    async fn write_config(runtime: &InheritanceRuntime, entries: &[(&str, Value)]) {
        let mut node = Node::new("ExtendedConfig", DocumentPath::new(CONFIG_PATH));
        for (key, value) in entries {
            node = node.with_field(key, value.clone());
        }
        runtime.store().create_document(node).await.unwrap();
        settle(runtime).await;
    }

    async fn inheritable(runtime: &InheritanceRuntime, path: &str, fields: &[(&str, Value)]) -> Node {
        let mut node = Node::new("Folder", DocumentPath::new(path)).with_facet(facets::INHERITABLE);
        for (field, value) in fields {
            node = node.with_field(field, value.clone());
        }
        let node = runtime.store().create_document(node).await.unwrap();
        settle(runtime).await;
        node
    }

    async fn inheritor(runtime: &InheritanceRuntime, path: &str, fields: &[(&str, Value)]) -> Node {
        let mut node = Node::new("File", DocumentPath::new(path))
            .with_facet(facets::INHERITOR)
            .with_schema("custom");
        for (field, value) in fields {
            node = node.with_field(field, value.clone());
        }
        let node = runtime.store().create_document(node).await.unwrap();
        settle(runtime).await;
        runtime.store().get(node.id).expect("inheritor stored")
    }

    async fn edit(runtime: &InheritanceRuntime, node: &Node, field: &str, value: Value) -> Node {
        let mut current = runtime.store().get(node.id).expect("node stored");
        current.set_property(field, value).unwrap();
        let saved = runtime.store().update_document(current).await.unwrap();
        settle(runtime).await;
        saved
    }

    fn priority(runtime: &InheritanceRuntime, node: &Node) -> Option<Value> {
        runtime
            .store()
            .get(node.id)
            .and_then(|n| n.property("custom:priority").cloned())
    }

    // =============================================================================
    // CREATION
    // =============================================================================

    #[tokio::test]
    async fn test_created_inheritor_receives_ancestor_fields() {
        let runtime = started().await;
        let a = inheritable(
            &runtime,
            "/domain/a",
            &[("custom:priority", json!("high")), ("dublincore:title", json!("A"))],
        )
        .await;
        let m = runtime
            .store()
            .create_document(Node::new("Folder", DocumentPath::new("/domain/a/m")))
            .await
            .unwrap();
        settle(&runtime).await;

        let b = inheritor(&runtime, "/domain/a/m/b", &[]).await;

        assert_eq!(b.property("custom:priority"), Some(&json!("high")));
        assert_eq!(linkage::parent_id(&b), Some(a.id));
        assert!(linkage::update_parent(&b));
        // Fixed ignored groups never travel.
        assert!(!b.has_schema("dublincore"));
        assert_ne!(linkage::parent_id(&b), Some(m.id));
        assert!(!runtime.suppressor().is_registered(&b.id));
        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_moved_and_duplicated_inheritors_relink() {
        let runtime = started().await;
        let a = inheritable(&runtime, "/domain/a", &[("custom:priority", json!("high"))]).await;
        let x = inheritable(&runtime, "/domain/x", &[("custom:priority", json!("low"))]).await;
        let b = inheritor(&runtime, "/domain/x/b", &[]).await;
        assert_eq!(linkage::parent_id(&b), Some(x.id));

        runtime.store().move_document(b.id, a.id).await.unwrap();
        settle(&runtime).await;
        let moved = runtime.store().get(b.id).unwrap();
        assert_eq!(moved.path.as_str(), "/domain/a/b");
        assert_eq!(linkage::parent_id(&moved), Some(a.id));
        assert_eq!(moved.property("custom:priority"), Some(&json!("high")));

        let copy = runtime.store().duplicate_document(moved.id, x.id).await.unwrap();
        settle(&runtime).await;
        let copy = runtime.store().get(copy.id).unwrap();
        assert_eq!(linkage::parent_id(&copy), Some(x.id));
        assert_eq!(copy.property("custom:priority"), Some(&json!("low")));
        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_ancestor_edit_fans_out() {
        let runtime = started().await;
        let a = inheritable(&runtime, "/domain/a", &[("custom:priority", json!("high"))]).await;
        let b = inheritor(&runtime, "/domain/a/b", &[]).await;
        let c = inheritor(&runtime, "/domain/a/c", &[]).await;

        edit(&runtime, &a, "custom:priority", json!("urgent")).await;

        assert_eq!(priority(&runtime, &b), Some(json!("urgent")));
        assert_eq!(priority(&runtime, &c), Some(json!("urgent")));
        // Sibling propagation is off, so the fan-out flag stays down.
        assert!(!linkage::update_parent(&runtime.store().get(b.id).unwrap()));
        runtime.shutdown().await;
    }

    // =============================================================================
    // UPWARD AND LOOP SUPPRESSION
    // =============================================================================

    #[tokio::test]
    async fn test_inheritor_edit_reaches_ancestor_and_siblings() {
        let runtime = started().await;
        write_config(&runtime, &[(keys::ENABLE_SIBLING_INHERITANCE, json!(true))]).await;
        let a = inheritable(
            &runtime,
            "/domain/a",
            &[("custom:priority", json!("high")), ("custom:owner", json!("alice"))],
        )
        .await;
        let b = inheritor(&runtime, "/domain/a/b", &[]).await;
        let c = inheritor(&runtime, "/domain/a/c", &[]).await;

        let edited = edit(&runtime, &b, "custom:priority", json!("low")).await;
        assert_eq!(
            linkage::last_updated_fields(&edited),
            vec!["custom:priority".to_string()]
        );

        assert_eq!(priority(&runtime, &a), Some(json!("low")));
        assert_eq!(priority(&runtime, &c), Some(json!("low")));
        assert_eq!(priority(&runtime, &b), Some(json!("low")));
        let a_now = runtime.store().get(a.id).unwrap();
        assert_eq!(a_now.property("custom:owner"), Some(&json!("alice")));

        // Every sibling written by the fan-out was re-armed and nothing is
        // left waiting for an event.
        for node in [&b, &c] {
            let stored = runtime.store().get(node.id).unwrap();
            assert!(linkage::update_parent(&stored));
            assert!(!runtime.suppressor().is_registered(&node.id));
        }
        let scheduler = runtime.scheduler();
        assert_eq!(scheduler.stats().failed.load(std::sync::atomic::Ordering::Relaxed), 0);
        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_async_upward_propagation() {
        let runtime = started().await;
        write_config(
            &runtime,
            &[
                (keys::ENABLE_SIBLING_INHERITANCE, json!(true)),
                (keys::ASYNC_UPWARD_PROPAGATION, json!("true")),
            ],
        )
        .await;
        let a = inheritable(&runtime, "/domain/a", &[("custom:priority", json!("high"))]).await;
        let b = inheritor(&runtime, "/domain/a/b", &[]).await;

        edit(&runtime, &b, "custom:priority", json!("low")).await;

        assert_eq!(priority(&runtime, &a), Some(json!("low")));
        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_upward_disabled_leaves_ancestor_alone() {
        let runtime = started().await;
        let a = inheritable(&runtime, "/domain/a", &[("custom:priority", json!("high"))]).await;
        let b = inheritor(&runtime, "/domain/a/b", &[]).await;

        edit(&runtime, &b, "custom:priority", json!("low")).await;

        assert_eq!(priority(&runtime, &a), Some(json!("high")));
        assert_eq!(priority(&runtime, &b), Some(json!("low")));
        runtime.shutdown().await;
    }

    // =============================================================================
    // POLICY
    // =============================================================================

    #[tokio::test]
    async fn test_null_source_values_do_not_clear_destination() {
        let runtime = started().await;
        inheritable(
            &runtime,
            "/domain/a",
            &[("custom:priority", json!(null)), ("custom:owner", json!(""))],
        )
        .await;
        let b = inheritor(
            &runtime,
            "/domain/a/b",
            &[("custom:priority", json!("mine")), ("custom:owner", json!("bob"))],
        )
        .await;

        assert_eq!(b.property("custom:priority"), Some(&json!("mine")));
        assert_eq!(b.property("custom:owner"), Some(&json!("bob")));
        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_override_disabled_only_fills_empty_fields() {
        let runtime = started().await;
        write_config(&runtime, &[(keys::OVERRIDE_VALUES, json!(false))]).await;
        inheritable(
            &runtime,
            "/domain/a",
            &[("custom:priority", json!("high")), ("custom:owner", json!("alice"))],
        )
        .await;
        let b = inheritor(&runtime, "/domain/a/b", &[("custom:priority", json!("mine"))]).await;

        assert_eq!(b.property("custom:priority"), Some(&json!("mine")));
        assert_eq!(b.property("custom:owner"), Some(&json!("alice")));
        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_global_switch_off() {
        let runtime = started().await;
        write_config(&runtime, &[(keys::ENABLE_INHERITANCE, json!(false))]).await;
        inheritable(&runtime, "/domain/a", &[("custom:priority", json!("high"))]).await;

        let b = inheritor(&runtime, "/domain/a/b", &[]).await;

        assert_eq!(b.property("custom:priority"), None);
        assert_eq!(linkage::parent_id(&b), None);
        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_purged_config_falls_back_to_defaults() {
        let runtime = started().await;
        write_config(&runtime, &[(keys::ENABLE_INHERITANCE, json!(false))]).await;
        let config = runtime.store().find_by_path(CONFIG_PATH).expect("config stored");
        runtime.store().purge_document(config.id).await.unwrap();
        settle(&runtime).await;
        assert!(runtime.store().find_by_path(CONFIG_PATH).is_none());

        inheritable(&runtime, "/domain/a", &[("custom:priority", json!("high"))]).await;
        let b = inheritor(&runtime, "/domain/a/b", &[]).await;

        assert_eq!(b.property("custom:priority"), Some(&json!("high")));
        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_ignored_metadatas_are_not_copied() {
        let runtime = started().await;
        write_config(&runtime, &[(keys::IGNORED_METADATAS, json!("custom:owner"))]).await;
        inheritable(
            &runtime,
            "/domain/a",
            &[("custom:priority", json!("high")), ("custom:owner", json!("alice"))],
        )
        .await;

        let b = inheritor(&runtime, "/domain/a/b", &[]).await;

        assert_eq!(b.property("custom:priority"), Some(&json!("high")));
        assert_eq!(b.property("custom:owner"), None);
        runtime.shutdown().await;
    }

    // =============================================================================
    // SCHEDULING
    // =============================================================================

    #[tokio::test]
    async fn test_second_trigger_for_pending_key_is_dropped() {
        let runtime = started().await;
        let a = inheritable(&runtime, "/domain/a", &[("custom:priority", json!("high"))]).await;
        let scheduler = runtime.scheduler();
        let job = Job::new("default", a.id, JobTask::FanOut);

        assert_eq!(scheduler.schedule(job.clone()), ScheduleOutcome::Scheduled);
        assert_eq!(scheduler.schedule(job.clone()), ScheduleOutcome::AlreadyScheduled);
        settle(&runtime).await;
        assert_eq!(scheduler.state(&job.key), Some(WorkState::Completed));
        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_vanished_subject_completes_as_no_op() {
        let runtime = started().await;
        inheritable(&runtime, "/domain/a", &[("custom:priority", json!("high"))]).await;
        let b = inheritor(&runtime, "/domain/a/b", &[]).await;
        runtime.store().purge_document(b.id).await.unwrap();
        settle(&runtime).await;

        let scheduler = runtime.scheduler();
        let mut reports = scheduler.subscribe_reports();
        scheduler.schedule(Job::new("default", b.id, JobTask::InheritFromAncestor));

        let report = tokio::time::timeout(Duration::from_secs(5), reports.recv())
            .await
            .expect("report in time")
            .unwrap();
        assert_eq!(report.state, WorkState::Completed);
        assert_eq!(report.detail, NOTHING_TO_PROCESS);
        assert!(!runtime.suppressor().is_registered(&b.id));
        runtime.shutdown().await;
    }
}
