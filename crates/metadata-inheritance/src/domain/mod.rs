//! Domain layer: pure inheritance rules, no I/O.

pub mod config;
pub mod errors;
pub mod linkage;
pub mod propagator;
pub mod suppressor;
pub mod value_objects;

pub use config::{ConfigValue, InheritanceConfig, CONFIG_GROUP, CONFIG_PATH};
pub use errors::{InheritanceError, InheritanceResult};
pub use propagator::{
    allow_write, propagate, propagate_fields, PropagationPolicy, FIXED_IGNORED_GROUPS,
};
pub use suppressor::LoopSuppressor;
pub use value_objects::{
    ChangedFields, FanOutReport, InheritRequest, Job, JobKey, JobKind, JobTask, Propagated,
    PropagationMode,
};
