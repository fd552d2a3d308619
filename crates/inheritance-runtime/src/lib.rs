//! # Inheritance Runtime
//!
//! Wires the document store, the event bus and the inheritance pipeline
//! into one process.
//!
//! ```text
//! InMemoryDocumentStore ──commit──→ InMemoryEventBus ──→ EventListener
//!          ↑                                                  │
//!          │                                                  ↓
//!          └──── InheritanceWorker ←── WorkScheduler ←── EventRouter
//! ```
//!
//! ## Startup Sequence
//!
//! 1. Load `RuntimeConfig` from the environment
//! 2. Initialise tracing
//! 3. Build the store, bus, scheduler and router
//! 4. Create the domain root if the tree is empty
//! 5. Spawn the listener and the housekeeping task

pub mod config;
pub mod error;
pub mod telemetry;

pub use config::{ConfigError, RuntimeConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use telemetry::init_tracing;

use metadata_inheritance::{
    ConfigResolver, DocumentStore, EventListener, EventRouter, InMemoryDocumentStore,
    InheritanceService, InheritanceWorker, LoopSuppressor, WorkScheduler,
};
use parking_lot::Mutex;
use shared_bus::{EventFilter, EventPublisher, InMemoryEventBus};
use shared_types::{DocumentPath, Node, ROOT_SENTINEL_TYPE};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Path of the domain root created on first start.
pub const DOMAIN_ROOT_PATH: &str = "/domain";

/// How often finished job keys are dropped from the scheduler table.
pub const HOUSEKEEPING_INTERVAL: Duration = Duration::from_secs(60);

pub struct InheritanceRuntime {
    config: RuntimeConfig,
    bus: Arc<InMemoryEventBus>,
    store: InMemoryDocumentStore,
    scheduler: Arc<WorkScheduler>,
    suppressor: Arc<LoopSuppressor>,
    processed: Arc<AtomicU64>,
    /// Taken by `start`.
    listener: Mutex<Option<EventListener>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl InheritanceRuntime {
    /// Build every component. The listener subscribes here, so events
    /// committed before [`InheritanceRuntime::start`] are buffered.
    #[must_use]
    pub fn new(config: RuntimeConfig) -> Self {
        info!(repository = %config.repository, "Creating inheritance runtime");

        let bus = Arc::new(InMemoryEventBus::with_capacity(config.event_capacity));
        let store = InMemoryDocumentStore::new(config.repository.clone())
            .with_publisher(bus.clone());
        let shared_store: Arc<dyn DocumentStore> = Arc::new(store.clone());

        let resolver = Arc::new(ConfigResolver::new());
        let suppressor = Arc::new(LoopSuppressor::new());
        let service = Arc::new(InheritanceService::new(resolver.clone()));
        let worker = Arc::new(InheritanceWorker::new(
            shared_store.clone(),
            service,
            suppressor.clone(),
        ));
        let scheduler = WorkScheduler::new(worker.clone(), config.max_concurrent_jobs);
        let router = Arc::new(EventRouter::new(
            shared_store,
            resolver,
            suppressor.clone(),
            scheduler.clone(),
            worker,
        ));

        let listener = EventListener::new(router, bus.subscribe(EventFilter::all()));
        let processed = listener.processed();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Self {
            config,
            bus,
            store,
            scheduler,
            suppressor,
            processed,
            listener: Mutex::new(Some(listener)),
            tasks: Mutex::new(Vec::new()),
            shutdown_tx,
            shutdown_rx,
        }
    }

    pub async fn start(&self) -> RuntimeResult<()> {
        let listener = self
            .listener
            .lock()
            .take()
            .ok_or(RuntimeError::AlreadyStarted)?;

        self.initialize_root().await?;

        let listener_task = tokio::spawn(listener.run(self.shutdown_rx.clone()));

        let scheduler = self.scheduler.clone();
        let mut shutdown = self.shutdown_rx.clone();
        let housekeeping_task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(HOUSEKEEPING_INTERVAL);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let pruned = scheduler.prune_finished();
                        if pruned > 0 {
                            debug!(pruned, "Finished job keys pruned");
                        }
                    }
                    _ = shutdown.changed() => break,
                }
            }
        });

        self.tasks.lock().extend([listener_task, housekeeping_task]);
        info!(
            repository = %self.config.repository,
            max_concurrent_jobs = self.config.max_concurrent_jobs,
            "Inheritance runtime started"
        );
        Ok(())
    }

    async fn initialize_root(&self) -> RuntimeResult<()> {
        if self.store.find_by_path(DOMAIN_ROOT_PATH).is_some() {
            return Ok(());
        }
        let root = self
            .store
            .create_document(Node::new(
                ROOT_SENTINEL_TYPE,
                DocumentPath::new(DOMAIN_ROOT_PATH),
            ))
            .await?;
        info!(node_id = %root.id, path = DOMAIN_ROOT_PATH, "Domain root created");
        Ok(())
    }

    /// Wait until every published event was routed and no job is pending.
    ///
    /// Returns false if that did not happen within `timeout`.
    pub async fn settle(&self, timeout: Duration) -> bool {
        let settled = tokio::time::timeout(timeout, async {
            loop {
                self.scheduler.wait_idle().await;
                if self.processed.load(Ordering::SeqCst) >= self.bus.events_published()
                    && self.scheduler.pending_count() == 0
                {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await;
        if settled.is_err() {
            warn!(
                processed = self.processed.load(Ordering::SeqCst),
                published = self.bus.events_published(),
                pending = self.scheduler.pending_count(),
                "Runtime did not settle in time"
            );
        }
        settled.is_ok()
    }

    /// Signal shutdown and wait for the background tasks.
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown...");
        if let Err(e) = self.shutdown_tx.send(true) {
            error!(error = %e, "Failed to send shutdown signal");
        }

        let tasks: Vec<JoinHandle<()>> = self.tasks.lock().drain(..).collect();
        for task in tasks {
            match tokio::time::timeout(Duration::from_secs(2), task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(error = %e, "Background task failed"),
                Err(_) => warn!("Background task did not stop in time"),
            }
        }
        info!("Shutdown complete");
    }

    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &InMemoryDocumentStore {
        &self.store
    }

    #[must_use]
    pub fn bus(&self) -> Arc<InMemoryEventBus> {
        self.bus.clone()
    }

    #[must_use]
    pub fn scheduler(&self) -> Arc<WorkScheduler> {
        self.scheduler.clone()
    }

    #[must_use]
    pub fn suppressor(&self) -> Arc<LoopSuppressor> {
        self.suppressor.clone()
    }

    /// Events routed by the listener so far.
    #[must_use]
    pub fn processed_events(&self) -> u64 {
        self.processed.load(Ordering::SeqCst)
    }
}
