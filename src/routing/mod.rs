/// Connection orchestration: choose backends and drive connect attempts
/// until a session has its master and its slave complement
use rand::Rng;
use tracing::{debug, error, info};

use crate::config::{MasterFailureMode, RouterConfig};
use crate::core::backend::{Backend, Connector, ServerRef, SessionCommandList};
use crate::core::registry::ServerRegistry;
use crate::error::RouterResult;
use crate::selection::log_server_connections;

/// Which connections an orchestration call should establish
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionType {
    /// Master (if possible) plus slaves
    All,
    /// Slaves only; the master slot is left alone
    SlavesOnly,
}

/// Router instance: immutable configuration plus the router-scoped server
/// handles. One router serves many sessions; each session gets its own
/// backend list from `session_backends`.
#[derive(Debug)]
pub struct Router {
    config: RouterConfig,
    servers: Vec<ServerRef>,
}

impl Router {
    /// Build a router over the configured servers, resolving each entry
    /// against the shared registry.
    pub fn new(config: RouterConfig, registry: &ServerRegistry) -> RouterResult<Self> {
        config.validate()?;
        let mut servers = Vec::with_capacity(config.servers.len());
        for entry in &config.servers {
            servers.push(ServerRef::new(registry.get(&entry.name)?));
        }
        Ok(Self { config, servers })
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Fresh per-session backend list, in configuration order. Order is the
    /// tie-break for selection, so it must stay stable.
    pub fn session_backends(&self) -> Vec<Backend> {
        self.servers.iter().cloned().map(Backend::new).collect()
    }

    /// Select and connect backend servers for one session.
    ///
    /// Returns whether the session can continue. The only fatal condition is
    /// a missing or unconnectable master under `fail_instantly`; falling
    /// short of the slave target is not a failure. `expected_responses` is
    /// bumped once per slave that connects with session commands to replay,
    /// since each will emit one extra response while catching up.
    #[allow(clippy::too_many_arguments)]
    pub fn select_connect_backends<C: Connector, R: Rng>(
        &self,
        backends: &mut [Backend],
        current_master: &mut Option<usize>,
        commands: &SessionCommandList,
        expected_responses: &mut usize,
        connection_type: ConnectionType,
        connector: &mut C,
        rng: &mut R,
    ) -> bool {
        let master_idx = backends.iter().position(|b| b.is_master());
        let master_usable = master_idx.is_some_and(|idx| backends[idx].can_connect());

        if !master_usable && self.config.master_failure_mode == MasterFailureMode::FailInstantly {
            match master_idx {
                None => error!(
                    "Couldn't find suitable Master from {} candidates.",
                    backends.len()
                ),
                Some(idx) => error!(
                    "Master exists ({}), but it is being drained and cannot be used.",
                    backends[idx].server().address()
                ),
            }
            return false;
        }

        let criteria = self.config.slave_selection_criteria;

        if tracing::enabled!(tracing::Level::INFO) {
            let all: Vec<usize> = (0..backends.len()).collect();
            log_server_connections(criteria, backends, &all);
        }

        if connection_type == ConnectionType::All {
            if let Some(idx) = master_idx {
                if backends[idx].can_connect() {
                    if backends[idx].in_use() {
                        *current_master = Some(idx);
                    } else if backends[idx].connect(connector, &SessionCommandList::new()) {
                        info!("Selected Master: {}", backends[idx].name());
                        *current_master = Some(idx);
                    } else {
                        // Not fatal here: fatality was decided by the
                        // failure-mode check above.
                        debug!("Failed to connect Master: {}", backends[idx].name());
                    }
                }
            }
        }

        let (slaves_found, slaves_connected) = slave_counts(backends, master_idx);
        let max_slaves = self.config.max_slave_connections;
        debug_assert!(max_slaves == 0 || slaves_connected <= max_slaves);
        debug!(
            "Found {} slave candidates, {} already connected, target {}",
            slaves_found, slaves_connected, max_slaves
        );

        let mut candidates: Vec<usize> = backends
            .iter()
            .enumerate()
            .filter(|(idx, b)| {
                !b.in_use() && b.can_connect() && valid_for_slave(b, *idx, master_idx)
            })
            .map(|(idx, _)| idx)
            .collect();

        let mut connected = slaves_connected;
        while (max_slaves == 0 || connected < max_slaves) && !candidates.is_empty() {
            let Some(idx) = criteria.select(
                backends,
                &candidates,
                self.config.master_accept_reads,
                rng,
            ) else {
                break;
            };

            if backends[idx].connect(connector, commands) {
                info!("Selected Slave: {}", backends[idx].name());
                if !commands.is_empty() {
                    *expected_responses += 1;
                }
                connected += 1;
            } else {
                debug!("Failed to connect Slave: {}", backends[idx].name());
            }

            // Never retry a candidate within the same call, successful or not
            candidates.retain(|&c| c != idx);
        }

        true
    }
}

/// Whether this backend may be used as a slave connection
fn valid_for_slave(backend: &Backend, idx: usize, master_idx: Option<usize>) -> bool {
    (backend.is_slave() || backend.is_relay()) && Some(idx) != master_idx
}

/// Count connectable slave candidates and how many are already connected
fn slave_counts(backends: &[Backend], master_idx: Option<usize>) -> (usize, usize) {
    let mut found = 0;
    let mut connected = 0;

    for (idx, backend) in backends.iter().enumerate() {
        if backend.can_connect() && valid_for_slave(backend, idx, master_idx) {
            found += 1;
            if backend.in_use() {
                connected += 1;
            }
        }
    }

    (found, connected)
}
