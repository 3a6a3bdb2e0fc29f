/// Slave selection: scoring strategies, best-score minimization and
/// priority grouping
///
/// The four simple strategies map a backend to a comparable cost (lower is
/// better) and run through `best_score` within the best priority tier.
/// Adaptive routing is a different animal, see `adaptive`.
pub mod adaptive;

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::backend::Backend;

/// Idle servers that may serve reads
const PRIORITY_IDLE_ELIGIBLE: u8 = 1;
/// Idle masters when master_accept_reads is off; fallback only
const PRIORITY_MASTER_ONLY: u8 = 2;
/// Eligible servers still replaying session commands
const PRIORITY_BUSY_ELIGIBLE: u8 = 13;

/// The configured strategy for choosing among slave candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SelectCriteria {
    /// Fewest connections across the whole process
    LeastGlobalConnections,
    /// Fewest connections held by this router
    LeastRouterConnections,
    /// Smallest replication lag
    LeastBehindMaster,
    /// Fewest statements currently executing
    #[default]
    LeastCurrentOperations,
    /// Response-time weighted random choice
    AdaptiveRouting,
}

impl SelectCriteria {
    /// Pick one backend from `pool` (indices into `backends`), or `None` if
    /// the pool is empty. The random source is only consulted by adaptive
    /// routing and must be scoped to the calling worker.
    pub fn select<R: Rng>(
        &self,
        backends: &[Backend],
        pool: &[usize],
        masters_accept_reads: bool,
        rng: &mut R,
    ) -> Option<usize> {
        match self {
            SelectCriteria::AdaptiveRouting => adaptive::select(backends, pool, rng),
            _ => find_best_backend(backends, pool, self.score_fn(), masters_accept_reads),
        }
    }

    fn score_fn(&self) -> fn(&Backend) -> f64 {
        match self {
            SelectCriteria::LeastGlobalConnections => global_connections_score,
            SelectCriteria::LeastRouterConnections => router_connections_score,
            SelectCriteria::LeastBehindMaster => replication_lag_score,
            SelectCriteria::LeastCurrentOperations => current_operations_score,
            // Adaptive routing never scores; it draws from a roulette wheel
            SelectCriteria::AdaptiveRouting => current_operations_score,
        }
    }
}

/// Divide a raw metric by the configured weight. Weight zero (or less) makes
/// the backend infinitely expensive rather than dividing by zero.
fn weighted(backend: &Backend, raw: f64) -> f64 {
    let weight = backend.weight();
    if weight <= 0.0 {
        f64::INFINITY
    } else {
        raw / weight
    }
}

/// (global connections + 1) / weight; +1 avoids always-zero ties on an idle fleet
fn global_connections_score(backend: &Backend) -> f64 {
    weighted(backend, backend.server().stats().connections() as f64 + 1.0)
}

/// (router-local connections + 1) / weight
fn router_connections_score(backend: &Backend) -> f64 {
    weighted(backend, backend.server_ref().router_connections() as f64 + 1.0)
}

/// replication lag seconds / weight
fn replication_lag_score(backend: &Backend) -> f64 {
    weighted(backend, backend.server().stats().replication_lag() as f64)
}

/// (current operations + 1) / weight
fn current_operations_score(backend: &Backend) -> f64 {
    weighted(backend, backend.server().stats().current_ops() as f64 + 1.0)
}

/// Minimize `score` over the pool. Candidates without a live connection have
/// their score inflated by (score + 5.0) * 1.5 so already-connected servers
/// are preferred and connection churn stays low. The first candidate at the
/// minimum wins ties, so callers get deterministic results from a stable
/// pool order; even a pool where every score is infinite returns its first
/// member rather than nothing.
pub(crate) fn best_score(
    backends: &[Backend],
    pool: &[usize],
    score: fn(&Backend) -> f64,
) -> Option<usize> {
    let mut min = f64::INFINITY;
    let mut best = None;

    for &idx in pool {
        let backend = &backends[idx];
        let mut value = score(backend);

        if !backend.in_use() {
            value = (value + 5.0) * 1.5;
        }

        if best.is_none() || value < min {
            min = value;
            best = Some(idx);
        }
    }

    best
}

/// Find the best slave candidate in `pool`.
///
/// Candidates are first grouped into priority tiers; scoring then runs only
/// within the numerically smallest tier present. Priority must dominate
/// score: a momentarily idle low-priority backend must never outscore a busy
/// high-priority one. When no slave-eligible backend exists at all, the
/// master-only tier is returned as a silent fallback.
pub fn find_best_backend(
    backends: &[Backend],
    pool: &[usize],
    score: fn(&Backend) -> f64,
    masters_accept_reads: bool,
) -> Option<usize> {
    let mut tiers: BTreeMap<u8, Vec<usize>> = BTreeMap::new();

    for &idx in pool {
        let backend = &backends[idx];
        let is_busy = backend.in_use() && backend.has_session_commands();
        let acts_slave = backend.is_slave() || (backend.is_master() && masters_accept_reads);

        let priority = if acts_slave {
            if is_busy {
                PRIORITY_BUSY_ELIGIBLE
            } else {
                PRIORITY_IDLE_ELIGIBLE
            }
        } else {
            PRIORITY_MASTER_ONLY
        };

        tiers.entry(priority).or_default().push(idx);
    }

    // BTreeMap iterates keys in ascending order; the first tier is the best
    let (_, best_tier) = tiers.iter().next()?;
    best_score(backends, best_tier, score)
}

/// Diagnostic dump of the metric driving the configured criterion, one line
/// per backend. Purely informational; behavior never depends on it.
pub fn log_server_connections(criteria: SelectCriteria, backends: &[Backend], pool: &[usize]) {
    for &idx in pool {
        let backend = &backends[idx];
        let server = backend.server();
        let endpoint = format!("[{}]:{}", server.address(), server.port());

        match criteria {
            SelectCriteria::LeastGlobalConnections => info!(
                "global connections: {} in \t{} {}",
                server.stats().connections(),
                endpoint,
                server.status_string()
            ),
            SelectCriteria::LeastRouterConnections => info!(
                "router connections: {} in \t{} {}",
                backend.server_ref().router_connections(),
                endpoint,
                server.status_string()
            ),
            SelectCriteria::LeastBehindMaster => info!(
                "replication lag: {}s in \t{} {}",
                server.stats().replication_lag(),
                endpoint,
                server.status_string()
            ),
            SelectCriteria::LeastCurrentOperations => info!(
                "current operations: {} in \t{} {}",
                server.stats().current_ops(),
                endpoint,
                server.status_string()
            ),
            SelectCriteria::AdaptiveRouting => info!(
                "adaptive avg. select time: {:.6}s from \t{} {}",
                server.stats().response_time_average(),
                endpoint,
                server.status_string()
            ),
        }
    }
}
