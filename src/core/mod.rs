/// Shared server state: descriptor, status word and live load metrics
pub mod backend;
pub mod registry;

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// Server status bits, set by the monitoring layer and read by selection.
pub mod status {
    pub const RUNNING: u32 = 0x01;
    pub const MASTER: u32 = 0x02;
    pub const SLAVE: u32 = 0x04;
    pub const RELAY: u32 = 0x08;
    pub const DRAINING: u32 = 0x10;
    pub const MAINTENANCE: u32 = 0x20;
}

/// Weight applied to a response-time sample when folding it into the average
const RESPONSE_TIME_SAMPLE_WEIGHT: f64 = 0.1;

/// Live load metrics for one server, updated concurrently by every session
/// routed through it. Each accessor is independently current; readers must
/// not assume a consistent snapshot across two different metrics.
#[derive(Debug, Default)]
pub struct ServerStats {
    /// Connections currently open to this server across the whole process
    connections: AtomicU32,
    /// Statements currently executing on this server
    current_ops: AtomicU32,
    /// Seconds this server is behind its master
    replication_lag: AtomicU64,
    /// Exponentially-weighted average response time in seconds (f64 bits)
    response_time: AtomicU64,
}

impl ServerStats {
    pub fn connections(&self) -> u32 {
        self.connections.load(Ordering::Relaxed)
    }

    pub fn connection_established(&self) {
        self.connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn current_ops(&self) -> u32 {
        self.current_ops.load(Ordering::Relaxed)
    }

    pub fn operation_started(&self) {
        self.current_ops.fetch_add(1, Ordering::Relaxed);
    }

    pub fn operation_finished(&self) {
        self.current_ops.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn replication_lag(&self) -> u64 {
        self.replication_lag.load(Ordering::Relaxed)
    }

    pub fn set_replication_lag(&self, seconds: u64) {
        self.replication_lag.store(seconds, Ordering::Relaxed);
    }

    /// Average response time in seconds, 0.0 until the first sample arrives
    pub fn response_time_average(&self) -> f64 {
        f64::from_bits(self.response_time.load(Ordering::Relaxed))
    }

    /// Fold one response-time sample into the exponentially-weighted average
    pub fn sample_response_time(&self, seconds: f64) {
        let mut current = self.response_time.load(Ordering::Relaxed);
        loop {
            let average = f64::from_bits(current);
            let next = if average == 0.0 {
                seconds
            } else {
                average + RESPONSE_TIME_SAMPLE_WEIGHT * (seconds - average)
            };
            match self.response_time.compare_exchange_weak(
                current,
                next.to_bits(),
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }
    }
}

/// Process-wide descriptor of one physical database server.
///
/// Identity, address and weight are fixed at configuration time; the status
/// word and the live metrics are mutated concurrently from whichever worker
/// happens to be monitoring or using the server.
#[derive(Debug)]
pub struct ServerInfo {
    name: String,
    address: String,
    port: u16,
    /// Relative capacity divisor; zero is legal and means "never preferred"
    weight: f64,
    status: AtomicU32,
    stats: ServerStats,
}

impl ServerInfo {
    pub fn new(name: impl Into<String>, address: impl Into<String>, port: u16, weight: f64) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            port,
            weight,
            status: AtomicU32::new(0),
            stats: ServerStats::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn stats(&self) -> &ServerStats {
        &self.stats
    }

    pub fn set_status(&self, bits: u32) {
        self.status.fetch_or(bits, Ordering::Relaxed);
    }

    pub fn clear_status(&self, bits: u32) {
        self.status.fetch_and(!bits, Ordering::Relaxed);
    }

    fn has_status(&self, bits: u32) -> bool {
        self.status.load(Ordering::Relaxed) & bits != 0
    }

    pub fn is_running(&self) -> bool {
        self.has_status(status::RUNNING)
    }

    pub fn is_master(&self) -> bool {
        self.has_status(status::MASTER)
    }

    pub fn is_slave(&self) -> bool {
        self.has_status(status::SLAVE)
    }

    pub fn is_relay(&self) -> bool {
        self.has_status(status::RELAY)
    }

    pub fn is_draining(&self) -> bool {
        self.has_status(status::DRAINING)
    }

    pub fn in_maintenance(&self) -> bool {
        self.has_status(status::MAINTENANCE)
    }

    /// Whether new connections may be opened to this server
    pub fn can_connect(&self) -> bool {
        self.is_running() && !self.is_draining() && !self.in_maintenance()
    }

    /// Human-readable status, e.g. "Master, Running"
    pub fn status_string(&self) -> String {
        let word = self.status.load(Ordering::Relaxed);
        let mut parts = Vec::new();
        if word & status::MAINTENANCE != 0 {
            parts.push("Maintenance");
        }
        if word & status::MASTER != 0 {
            parts.push("Master");
        }
        if word & status::RELAY != 0 {
            parts.push("Relay Master");
        }
        if word & status::SLAVE != 0 {
            parts.push("Slave");
        }
        if word & status::DRAINING != 0 {
            parts.push("Draining");
        }
        if word & status::RUNNING != 0 {
            parts.push("Running");
        } else {
            parts.push("Down");
        }
        parts.join(", ")
    }
}
