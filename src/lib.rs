/// rwrouter - Backend selection and connection engine for read/write-splitting
/// database proxies
///
/// Given a session that needs a master and a bounded pool of slave
/// connections, this crate decides which physical servers to use and in what
/// order to attempt them: priority-tiered best-score selection for the four
/// load-based strategies, a response-time weighted roulette for adaptive
/// routing, and a failure-aware orchestration loop on top. Wire protocol,
/// query classification and the physical connect itself live in the embedding
/// proxy; they reach this crate only through the `Connector` trait and the
/// shared server metrics.
pub mod config;
pub mod core;
pub mod error;
pub mod routing;
pub mod selection;

pub use crate::config::{MasterFailureMode, RouterConfig, ServerEntry};
pub use crate::core::backend::{Backend, Connector, ServerRef, SessionCommand, SessionCommandList};
pub use crate::core::registry::ServerRegistry;
pub use crate::core::{ServerInfo, ServerStats};
pub use crate::error::{RouterError, RouterResult};
pub use crate::routing::{ConnectionType, Router};
pub use crate::selection::SelectCriteria;
