//! Adapters Layer
//!
//! - `InMemoryDocumentStore` - reference document store publishing to the bus
//! - `ConfigResolver` - cached reader of the configuration document
//! - `EventListener` - feeds committed events to the router

pub mod bus;
pub mod config_resolver;
pub mod memory_store;

pub use bus::{EventListener, DEFAULT_BATCH_SIZE};
pub use config_resolver::ConfigResolver;
pub use memory_store::{InMemoryDocumentStore, InMemorySession};
