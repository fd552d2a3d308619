//! Event Bus Listener
//!
//! Drains the repository event bus in batches and hands every batch to the
//! [`EventRouter`] until shutdown is signalled or the bus closes.

use crate::router::EventRouter;
use shared_bus::Subscription;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Events routed per wake-up at most.
pub const DEFAULT_BATCH_SIZE: usize = 64;

pub struct EventListener {
    router: Arc<EventRouter>,
    subscription: Subscription,
    batch_size: usize,
    processed: Arc<AtomicU64>,
}

impl EventListener {
    #[must_use]
    pub fn new(router: Arc<EventRouter>, subscription: Subscription) -> Self {
        Self {
            router,
            subscription,
            batch_size: DEFAULT_BATCH_SIZE,
            processed: Arc::new(AtomicU64::new(0)),
        }
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Shared count of events routed so far.
    #[must_use]
    pub fn processed(&self) -> Arc<AtomicU64> {
        self.processed.clone()
    }

    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(repository = self.router.repository(), "Inheritance listener started");
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    info!("Inheritance listener shutting down");
                    break;
                }
                event = self.subscription.recv() => {
                    let Some(first) = event else {
                        warn!("Event bus closed, listener stopping");
                        break;
                    };
                    let mut batch = vec![first];
                    while batch.len() < self.batch_size {
                        match self.subscription.try_recv() {
                            Ok(Some(event)) => batch.push(event),
                            _ => break,
                        }
                    }

                    let decisions = self.router.route_batch(&batch).await;
                    debug!(events = batch.len(), decisions = ?decisions, "Batch routed");
                    self.processed.fetch_add(batch.len() as u64, Ordering::SeqCst);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::config_resolver::ConfigResolver;
    use crate::adapters::memory_store::InMemoryDocumentStore;
    use crate::domain::LoopSuppressor;
    use crate::ports::outbound::DocumentStore;
    use crate::scheduler::WorkScheduler;
    use crate::service::inheritance_service::InheritanceService;
    use crate::service::worker::InheritanceWorker;
    use serde_json::json;
    use shared_bus::{EventFilter, EventPublisher, InMemoryEventBus};
    use shared_types::{facets, DocumentPath, Node};
    use std::time::Duration;

    #[tokio::test]
    async fn test_listener_routes_until_shutdown() {
        let bus = Arc::new(InMemoryEventBus::new());
        let store = InMemoryDocumentStore::new("default").with_publisher(bus.clone());
        let shared: Arc<dyn DocumentStore> = Arc::new(store.clone());
        let config = Arc::new(ConfigResolver::new());
        let suppressor = Arc::new(LoopSuppressor::new());
        let worker = Arc::new(InheritanceWorker::new(
            shared.clone(),
            Arc::new(InheritanceService::new(config.clone())),
            suppressor.clone(),
        ));
        let scheduler = WorkScheduler::new(worker.clone(), 2);
        let router = Arc::new(EventRouter::new(
            shared,
            config,
            suppressor,
            scheduler.clone(),
            worker,
        ));

        let listener = EventListener::new(router, bus.subscribe(EventFilter::all()))
            .with_batch_size(8);
        let processed = listener.processed();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(listener.run(shutdown_rx));

        store
            .create_document(Node::new("Domain", DocumentPath::new("/domain")))
            .await
            .unwrap();
        store
            .create_document(
                Node::new("Folder", DocumentPath::new("/domain/a"))
                    .with_facet(facets::INHERITABLE)
                    .with_field("custom:priority", json!("high")),
            )
            .await
            .unwrap();
        let b = store
            .create_document(
                Node::new("File", DocumentPath::new("/domain/a/b"))
                    .with_facet(facets::INHERITOR)
                    .with_schema("custom"),
            )
            .await
            .unwrap();

        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                scheduler.wait_idle().await;
                if processed.load(Ordering::SeqCst) >= bus.events_published()
                    && scheduler.pending_count() == 0
                {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("settled");

        let stored = store.get(b.id).unwrap();
        assert_eq!(stored.property("custom:priority"), Some(&json!("high")));

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("listener stopped")
            .unwrap();
    }
}
