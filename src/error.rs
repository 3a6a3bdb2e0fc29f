/// Unified error handling for the router core
///
/// Orchestration outcomes are deliberately plain booleans (the caller
/// branches, never unwinds); `RouterError` covers the configuration and
/// registry surfaces where a typed error is the right shape.
use thiserror::Error;

use crate::config::ConfigError;

/// Main error type for router operations
#[derive(Debug, Error)]
pub enum RouterError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Lookup of a server name that is not in the registry
    #[error("Unknown server: {0}")]
    UnknownServer(String),

    /// Internal errors (should not happen in normal operation)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Result type alias for router operations
pub type RouterResult<T> = Result<T, RouterError>;

impl RouterError {
    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        RouterError::Internal {
            message: message.into(),
        }
    }
}
