/// Configuration surface for the router core

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::selection::SelectCriteria;

/// Policy governing whether an unusable master aborts session setup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MasterFailureMode {
    /// Session setup fails outright when no connectable master exists
    #[default]
    FailInstantly,
    /// Session continues read-only; the failure surfaces on the first write
    FailOnWrite,
    /// Session continues; writes are answered with an error
    ErrorOnWrite,
}

/// One configured backend server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerEntry {
    /// Unique server name
    pub name: String,
    /// Host address
    pub address: String,
    /// Port number
    pub port: u16,
    /// Relative capacity; scores are divided by this
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

/// Router configuration, immutable for the lifetime of a router instance
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Strategy used to rank or probabilistically choose slave candidates
    #[serde(default)]
    pub slave_selection_criteria: SelectCriteria,
    /// What an unusable master means for session setup
    #[serde(default)]
    pub master_failure_mode: MasterFailureMode,
    /// Upper bound on concurrently connected slaves per session; 0 = uncapped
    #[serde(default)]
    pub max_slave_connections: usize,
    /// Whether the master may also serve reads
    #[serde(default)]
    pub master_accept_reads: bool,
    /// Backend servers available to this router
    #[serde(default)]
    pub servers: Vec<ServerEntry>,
}

impl RouterConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

        let config: RouterConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.servers.is_empty() {
            return Err(ConfigError::ValidationError(
                "at least one server must be configured".to_string(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for server in &self.servers {
            if server.name.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "server name cannot be empty".to_string(),
                ));
            }
            if !seen.insert(server.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate server name: {}",
                    server.name
                )));
            }
            if server.address.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "server {} has an empty address",
                    server.name
                )));
            }
            if server.port == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "server {} has port 0",
                    server.name
                )));
            }
            if server.weight < 0.0 || !server.weight.is_finite() {
                return Err(ConfigError::ValidationError(format!(
                    "server {} has invalid weight {}",
                    server.name, server.weight
                )));
            }
            if server.weight == 0.0 {
                // Legal, but such a server only ever loses a minimization
                tracing::warn!("server {} has weight 0 and will never be preferred", server.name);
            }
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}
