//! Config Resolver
//!
//! Reads inheritance policy from the configuration document through a
//! session. The document's field map is cached until [`ConfigResolver::invalidate`].

use crate::domain::config::{keys, ConfigValue, InheritanceConfig, CONFIG_GROUP, CONFIG_PATH};
use crate::ports::outbound::DocumentSession;
use parking_lot::RwLock;
use shared_types::{DocumentPath, FieldMap};
use std::sync::Arc;
use tracing::{debug, warn};

/// Cached reader for the configuration document.
#[derive(Debug, Default)]
pub struct ConfigResolver {
    cache: RwLock<Option<Arc<FieldMap>>>,
}

impl ConfigResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True when the configuration document is the subject at `path`.
    #[must_use]
    pub fn is_config_path(path: &DocumentPath) -> bool {
        path.as_str() == CONFIG_PATH
    }

    /// Drop the cached document; the next read goes to the store.
    pub fn invalidate(&self) {
        if self.cache.write().take().is_some() {
            debug!("Inheritance config cache invalidated");
        }
    }

    #[must_use]
    pub fn is_cached(&self) -> bool {
        self.cache.read().is_some()
    }

    async fn load(&self, session: &dyn DocumentSession) -> Arc<FieldMap> {
        let cached = self.cache.read().clone();
        if let Some(fields) = cached {
            return fields;
        }

        let fields = match session
            .get_document_by_path(&DocumentPath::new(CONFIG_PATH))
            .await
        {
            Ok(Some(node)) => node.schema(CONFIG_GROUP).cloned().unwrap_or_default(),
            Ok(None) => FieldMap::new(),
            Err(e) => {
                // Not cached, so the next call retries.
                warn!(error = %e, "Failed to read inheritance config, using defaults");
                return Arc::new(FieldMap::new());
            }
        };

        let fields = Arc::new(fields);
        *self.cache.write() = Some(fields.clone());
        fields
    }

    /// Typed value of `key`, or `default` when absent or unreadable.
    pub async fn get<T: ConfigValue>(
        &self,
        session: &dyn DocumentSession,
        key: &str,
        default: T,
    ) -> T {
        let fields = self.load(session).await;
        fields
            .get(key)
            .and_then(T::from_field)
            .unwrap_or(default)
    }

    /// All keys with defaults applied.
    pub async fn snapshot(&self, session: &dyn DocumentSession) -> InheritanceConfig {
        let fields = self.load(session).await;
        let defaults = InheritanceConfig::default();
        let read_bool = |key: &str, default: bool| {
            fields.get(key).and_then(bool::from_field).unwrap_or(default)
        };

        InheritanceConfig {
            enable_inheritance: read_bool(keys::ENABLE_INHERITANCE, defaults.enable_inheritance),
            enable_sibling_inheritance: read_bool(
                keys::ENABLE_SIBLING_INHERITANCE,
                defaults.enable_sibling_inheritance,
            ),
            ignore_versions: read_bool(keys::IGNORE_VERSIONS, defaults.ignore_versions),
            ignored_metadatas: fields
                .get(keys::IGNORED_METADATAS)
                .and_then(Vec::<String>::from_field)
                .unwrap_or(defaults.ignored_metadatas),
            override_values: read_bool(keys::OVERRIDE_VALUES, defaults.override_values),
            propagate_null_values: read_bool(
                keys::PROPAGATE_NULL_VALUES,
                defaults.propagate_null_values,
            ),
            async_upward_propagation: read_bool(
                keys::ASYNC_UPWARD_PROPAGATION,
                defaults.async_upward_propagation,
            ),
        }
    }
}
