/// Process-wide registry of shared server descriptors
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::config::ServerEntry;
use crate::core::ServerInfo;
use crate::error::{RouterError, RouterResult};

/// Registry owning the `ServerInfo` descriptors shared by every router and
/// session in the process. Descriptors never leave as plain references; they
/// are handed out as `Arc`s so their live metrics outlive any one session.
#[derive(Debug, Default)]
pub struct ServerRegistry {
    servers: RwLock<HashMap<String, Arc<ServerInfo>>>,
}

impl ServerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from configured server entries
    pub fn from_entries(entries: &[ServerEntry]) -> Self {
        let registry = Self::new();
        for entry in entries {
            registry.add(ServerInfo::new(
                entry.name.clone(),
                entry.address.clone(),
                entry.port,
                entry.weight,
            ));
        }
        registry
    }

    /// Add a server descriptor, replacing any previous one with the same name
    pub fn add(&self, server: ServerInfo) -> Arc<ServerInfo> {
        let server = Arc::new(server);
        let mut servers = self.servers.write().unwrap_or_else(|e| e.into_inner());
        servers.insert(server.name().to_string(), Arc::clone(&server));
        server
    }

    pub fn get(&self, name: &str) -> RouterResult<Arc<ServerInfo>> {
        let servers = self.servers.read().unwrap_or_else(|e| e.into_inner());
        servers
            .get(name)
            .cloned()
            .ok_or_else(|| RouterError::UnknownServer(name.to_string()))
    }

    /// All registered servers, in no particular order
    pub fn list(&self) -> Vec<Arc<ServerInfo>> {
        let servers = self.servers.read().unwrap_or_else(|e| e.into_inner());
        servers.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        let servers = self.servers.read().unwrap_or_else(|e| e.into_inner());
        servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_get() {
        let registry = ServerRegistry::new();
        registry.add(ServerInfo::new("db1", "10.0.0.1", 3306, 1.0));

        let server = registry.get("db1").unwrap();
        assert_eq!(server.address(), "10.0.0.1");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unknown_server() {
        let registry = ServerRegistry::new();
        assert!(matches!(
            registry.get("missing"),
            Err(RouterError::UnknownServer(_))
        ));
    }

    #[test]
    fn test_from_entries() {
        let entries = vec![
            ServerEntry {
                name: "db1".to_string(),
                address: "10.0.0.1".to_string(),
                port: 3306,
                weight: 1.0,
            },
            ServerEntry {
                name: "db2".to_string(),
                address: "10.0.0.2".to_string(),
                port: 3306,
                weight: 2.0,
            },
        ];

        let registry = ServerRegistry::from_entries(&entries);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("db2").unwrap().weight(), 2.0);
    }

    #[test]
    fn test_shared_metrics_survive_lookup() {
        let registry = ServerRegistry::new();
        registry.add(ServerInfo::new("db1", "10.0.0.1", 3306, 1.0));

        let first = registry.get("db1").unwrap();
        let second = registry.get("db1").unwrap();
        first.stats().connection_established();
        assert_eq!(second.stats().connections(), 1);
    }
}
