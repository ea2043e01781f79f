//! Shardproxy MySQL front end
//!
//! Executes client commands against a sharded backend session and streams
//! the results back over the MySQL text protocol.

pub mod backend;
pub mod hook;
pub mod metrics;
pub mod mysql;
pub mod telemetry;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use backend::{BackendConnection, ConnectionLease, ExecuteOutcome, QueryHeader, ResultCursor};
pub use hook::{InvocationHook, MetricsInvokeHook};
pub use mysql::{serve_connection, CommandExecutor, FrontendConfig, FrontendConnection, TurnOutcome};
pub use transport::{ChannelTransport, Transport, WritabilitySignal};
