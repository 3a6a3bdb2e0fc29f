/// Session-scoped backend views and the connect boundary
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::core::ServerInfo;

/// Router-scoped handle to a shared server.
///
/// The descriptor and its live metrics are process-wide; the connection
/// counter is scoped to one router instance, so "least router connections"
/// can be told apart from the fleet-wide count.
#[derive(Debug, Clone)]
pub struct ServerRef {
    server: Arc<ServerInfo>,
    router_connections: Arc<AtomicU32>,
}

impl ServerRef {
    pub fn new(server: Arc<ServerInfo>) -> Self {
        Self {
            server,
            router_connections: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn server(&self) -> &ServerInfo {
        &self.server
    }

    /// Connections this router currently holds to the server
    pub fn router_connections(&self) -> u32 {
        self.router_connections.load(Ordering::Relaxed)
    }

    fn router_connection_opened(&self) {
        self.router_connections.fetch_add(1, Ordering::Relaxed);
    }

    fn router_connection_closed(&self) {
        self.router_connections.fetch_sub(1, Ordering::Relaxed);
    }
}

/// One session-scoped piece of setup state (e.g. a SET statement) that every
/// backend connected later must replay to match the others.
#[derive(Debug, Clone)]
pub struct SessionCommand {
    pub sequence: u64,
    pub payload: Vec<u8>,
}

impl SessionCommand {
    pub fn new(sequence: u64, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            sequence,
            payload: payload.into(),
        }
    }
}

pub type SessionCommandList = Vec<SessionCommand>;

/// External collaborator that establishes the physical connection.
///
/// Called at most once per backend per orchestration loop iteration. The
/// return value only reports whether the (non-blocking) connect could be
/// initiated; completion is observed outside the selection engine.
pub trait Connector {
    fn connect(&mut self, server: &ServerRef) -> bool;
}

/// One session's view of a backend server.
///
/// Role and connectivity flags are delegated to the shared descriptor and
/// never mutated here; only `connect`/`close` transition the session-local
/// `in_use` state and the connection counters.
#[derive(Debug, Clone)]
pub struct Backend {
    server: ServerRef,
    in_use: bool,
    /// Session commands queued on this backend and not yet replayed
    pending_commands: usize,
}

impl Backend {
    pub fn new(server: ServerRef) -> Self {
        Self {
            server,
            in_use: false,
            pending_commands: 0,
        }
    }

    pub fn server_ref(&self) -> &ServerRef {
        &self.server
    }

    pub fn server(&self) -> &ServerInfo {
        self.server.server()
    }

    pub fn name(&self) -> &str {
        self.server().name()
    }

    pub fn weight(&self) -> f64 {
        self.server().weight()
    }

    pub fn in_use(&self) -> bool {
        self.in_use
    }

    pub fn is_master(&self) -> bool {
        self.server().is_master()
    }

    pub fn is_slave(&self) -> bool {
        self.server().is_slave()
    }

    pub fn is_relay(&self) -> bool {
        self.server().is_relay()
    }

    pub fn can_connect(&self) -> bool {
        self.server().can_connect()
    }

    pub fn has_session_commands(&self) -> bool {
        self.pending_commands > 0
    }

    pub fn session_commands_pending(&self) -> usize {
        self.pending_commands
    }

    /// Queue one more session command for replay on this backend
    pub fn add_session_command(&mut self) {
        self.pending_commands += 1;
    }

    /// Mark one queued session command as replayed
    pub fn complete_session_command(&mut self) {
        if self.pending_commands > 0 {
            self.pending_commands -= 1;
        }
    }

    /// Attempt to establish a live connection through `connector`.
    ///
    /// On success the backend becomes in-use, both the global and the
    /// router-local connection counters are bumped, and `commands` is queued
    /// for replay. On failure nothing changes.
    pub fn connect(&mut self, connector: &mut dyn Connector, commands: &SessionCommandList) -> bool {
        debug_assert!(!self.in_use);
        if !connector.connect(&self.server) {
            return false;
        }

        self.in_use = true;
        self.pending_commands = commands.len();
        self.server().stats().connection_established();
        self.server.router_connection_opened();
        true
    }

    /// Release the live connection, if any
    pub fn close(&mut self) {
        if self.in_use {
            self.in_use = false;
            self.pending_commands = 0;
            self.server().stats().connection_closed();
            self.server.router_connection_closed();
        }
    }
}
