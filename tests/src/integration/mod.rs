//! End-to-end flows through a running [`inheritance_runtime::InheritanceRuntime`].

pub mod flows;
