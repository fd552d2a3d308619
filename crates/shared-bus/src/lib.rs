//! # Shared Bus - Document Lifecycle Notifications
//!
//! The document store publishes one event per committed write; listeners
//! (the inheritance router among them) subscribe with a filter.
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │ Document     │                    │ Inheritance  │
//! │ Store        │    publish()       │ Listener     │
//! │  (commit)    │ ──────┐            │              │
//! └──────────────┘       │            └──────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │  Event Bus   │          │
//!                  │              │ ─────────┘
//!                  └──────────────┘  subscribe()
//! ```
//!
//! ## Delivery
//!
//! - Events are published **after** commit; a listener never sees a write
//!   that was rolled back.
//! - Slow subscribers lag and drop the oldest events (broadcast semantics).

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::{DocumentEvent, EventFilter, EventName, EventTopic, RepositoryEvent};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{EventSubscriber, Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
