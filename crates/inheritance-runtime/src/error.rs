use shared_types::StoreError;
use thiserror::Error;

pub use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to initialise tracing: {0}")]
    Telemetry(String),

    #[error("Runtime already started")]
    AlreadyStarted,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;
