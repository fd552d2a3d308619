//! Inheritance policy read from the configuration document.
//!
//! The document lives at [`CONFIG_PATH`] and holds every key in the
//! [`CONFIG_GROUP`] field-group. All keys are optional.

use serde::{Deserialize, Serialize};
use shared_types::FieldValue;

/// Path of the singleton configuration document.
pub const CONFIG_PATH: &str = "/ExtendedConfig";

/// Field-group holding the inheritance keys.
pub const CONFIG_GROUP: &str = "metadataInheritanceConfig";

/// Fully qualified configuration keys.
pub mod keys {
    pub const ENABLE_INHERITANCE: &str = "metadataInheritanceConfig:enableInheritance";
    pub const ENABLE_SIBLING_INHERITANCE: &str =
        "metadataInheritanceConfig:enableSiblingInheritance";
    pub const IGNORE_VERSIONS: &str = "metadataInheritanceConfig:ignoreVersions";
    pub const IGNORED_METADATAS: &str = "metadataInheritanceConfig:ignoredMetadatas";
    pub const OVERRIDE_VALUES: &str = "metadataInheritanceConfig:overrideValues";
    pub const PROPAGATE_NULL_VALUES: &str = "metadataInheritanceConfig:propagateNullValues";
    pub const ASYNC_UPWARD_PROPAGATION: &str =
        "metadataInheritanceConfig:asyncUpwardPropagation";
}

/// Typed snapshot of the inheritance policy with defaults applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InheritanceConfig {
    /// Master switch for every propagation.
    pub enable_inheritance: bool,
    /// Gates upward propagation from edited inheritors.
    pub enable_sibling_inheritance: bool,
    /// Skip version snapshots and proxies during fan-out.
    pub ignore_versions: bool,
    /// Field paths never propagated.
    pub ignored_metadatas: Vec<String>,
    /// Overwrite destination values (false: fill empty fields only).
    pub override_values: bool,
    /// Allow empty source values to overwrite destinations.
    pub propagate_null_values: bool,
    /// Run upward propagation as a background job.
    pub async_upward_propagation: bool,
}

impl Default for InheritanceConfig {
    fn default() -> Self {
        Self {
            enable_inheritance: true,
            enable_sibling_inheritance: false,
            ignore_versions: true,
            ignored_metadatas: Vec::new(),
            override_values: true,
            propagate_null_values: false,
            async_upward_propagation: false,
        }
    }
}

impl InheritanceConfig {
    /// Propagation policy used when filling a node from its ancestor.
    #[must_use]
    pub fn downward_policy(&self) -> crate::domain::PropagationPolicy {
        crate::domain::PropagationPolicy {
            fill_empty_only: !self.override_values,
            propagate_null_values: self.propagate_null_values,
        }
    }

    /// Propagation policy for narrowed copies, which always overwrite.
    #[must_use]
    pub fn override_policy(&self) -> crate::domain::PropagationPolicy {
        crate::domain::PropagationPolicy {
            fill_empty_only: false,
            propagate_null_values: self.propagate_null_values,
        }
    }
}

/// Conversion from a stored configuration value.
pub trait ConfigValue: Sized {
    /// Interpret the stored value, `None` when it cannot be read as `Self`.
    fn from_field(value: &FieldValue) -> Option<Self>;
}

impl ConfigValue for bool {
    fn from_field(value: &FieldValue) -> Option<Self> {
        match value {
            FieldValue::Bool(b) => Some(*b),
            FieldValue::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
}

impl ConfigValue for String {
    fn from_field(value: &FieldValue) -> Option<Self> {
        match value {
            FieldValue::Null => None,
            FieldValue::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

impl ConfigValue for Vec<String> {
    fn from_field(value: &FieldValue) -> Option<Self> {
        match value {
            FieldValue::String(s) => Some(split_list(s)),
            FieldValue::Array(items) => Some(
                items
                    .iter()
                    .filter_map(|item| item.as_str())
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(str::to_string)
                    .collect(),
            ),
            _ => None,
        }
    }
}

/// Split a comma list, trimming entries and dropping blanks.
#[must_use]
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
