//! Ports: inbound API and outbound store dependencies.

pub mod inbound;
pub mod outbound;

pub use inbound::InheritanceApi;
pub use outbound::{
    DescendantQuery, DocumentSession, DocumentStore, SaveOptions, VersioningOption, WriteOrigin,
};
