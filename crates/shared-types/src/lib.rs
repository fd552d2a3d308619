//! # Shared Types Crate
//!
//! Document tree entities used by every crate in the workspace.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: `Node`, `NodeId`, `DocumentPath` and the
//!   field value model are defined here and nowhere else.
//! - **Type-Erased Metadata**: field values are JSON values; emptiness is
//!   decided on their string form, never on type-specific equality.
//! - **Store Agnostic**: nothing here knows how nodes are persisted.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
