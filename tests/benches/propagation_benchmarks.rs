//! # Propagation Benchmarks
//!
//! | Target | Measures |
//! |--------|----------|
//! | `propagate` | field copy between two nodes by group count |
//! | fan-out | one ancestor into N inheritors through the service |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use metadata_inheritance::domain::propagate;
use metadata_inheritance::{
    ConfigResolver, InMemoryDocumentStore, InheritanceApi, InheritanceConfig, InheritanceService,
};
use serde_json::json;
use shared_types::{facets, DocumentPath, Node};
use std::sync::Arc;

fn wide_source(groups: usize) -> Node {
    let mut node = Node::new("Folder", DocumentPath::new("/domain/a")).with_facet(facets::INHERITABLE);
    for g in 0..groups {
        for f in 0..10 {
            node = node.with_field(&format!("group{g}:field{f}"), json!(format!("value-{g}-{f}")));
        }
    }
    node
}

fn bench_propagate(c: &mut Criterion) {
    let mut group = c.benchmark_group("propagate");

    for groups in [1, 10, 50] {
        let source = wide_source(groups);
        let policy = InheritanceConfig::default().downward_policy();
        let mut template = Node::new("File", DocumentPath::new("/domain/a/b"));
        for g in 0..groups {
            template = template.with_schema(&format!("group{g}"));
        }

        group.throughput(Throughput::Elements((groups * 10) as u64));
        group.bench_with_input(BenchmarkId::new("groups", groups), &groups, |b, _| {
            b.iter(|| {
                let mut destination = template.clone();
                black_box(
                    propagate(&source, &mut destination, &[], &[], policy).unwrap(),
                )
            })
        });
    }
    group.finish();
}

fn bench_fan_out(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let mut group = c.benchmark_group("fan_out");

    for size in [10usize, 100, 500] {
        let (store, ancestor) = runtime.block_on(async {
            let store = InMemoryDocumentStore::new("bench");
            store
                .create_document(Node::new("Domain", DocumentPath::new("/domain")))
                .await
                .unwrap();
            let ancestor = store.create_document(wide_source(5)).await.unwrap();
            for i in 0..size {
                let mut child = Node::new("File", DocumentPath::new(&format!("/domain/a/doc{i}")))
                    .with_facet(facets::INHERITOR);
                for g in 0..5 {
                    child = child.with_schema(&format!("group{g}"));
                }
                store.create_document(child).await.unwrap();
            }
            (store, ancestor)
        });
        let service = InheritanceService::new(Arc::new(ConfigResolver::new()));

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("descendants", size), &size, |b, _| {
            b.iter(|| {
                runtime.block_on(async {
                    // Uncommitted session: every iteration starts from the same tree.
                    let mut session = store.session();
                    black_box(
                        service
                            .propagate_from_ancestor(&mut session, &ancestor, true)
                            .await
                            .unwrap(),
                    )
                })
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_propagate, bench_fan_out);
criterion_main!(benches);
