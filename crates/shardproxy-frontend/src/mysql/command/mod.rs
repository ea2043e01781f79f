//! Command objects produced by the command factory
//!
//! - `factory` - decodes the command type byte into a `CommandPacket`
//! - `query` - `COM_QUERY`, the only variant that streams rows
//! - `admin` - `COM_PING`, `COM_QUIT`, `COM_INIT_DB`, `COM_STMT_CLOSE`
//!
//! Whether a command can produce rows is decided once, when the factory
//! builds it, by the `CommandPacket` variant.

mod admin;
pub mod factory;
mod query;

pub use admin::{ComInitDbPacket, ComPingPacket, ComQuitPacket, ComStmtClosePacket};
pub use factory::CommandPacketFactory;
pub use query::ComQueryPacket;

use super::protocol::{MySqlPacket, SequenceId};
use crate::backend::QueryHeader;
use async_trait::async_trait;
use shardproxy_common::Result;

/// Reply to a streaming query: headers to emit, then rows pulled from the command
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResponse {
    pub headers: Vec<QueryHeader>,
    /// Sequence id of the last header frame; rows continue from here
    pub sequence_id: SequenceId,
}

/// Result of `execute()`; `None` at the call site means no reply at all
#[derive(Debug, Clone, PartialEq)]
pub enum CommandResponse {
    Query(QueryResponse),
    /// Small, fully materialized reply written as-is
    Simple(Vec<MySqlPacket>),
}

#[async_trait]
pub trait CommandExecutable: Send {
    async fn execute(&mut self) -> Result<Option<CommandResponse>>;
}

/// A command whose result set is pulled one row at a time
#[async_trait]
pub trait QueryCommandPacket: CommandExecutable {
    /// Advance the backend cursor; false once the result set is exhausted
    async fn has_next_row(&mut self) -> Result<bool>;

    /// Frame for the row the last `has_next_row` advanced to, with its own sequence id
    fn next_row_frame(&mut self) -> Result<MySqlPacket>;
}

pub enum CommandPacket {
    Query(Box<dyn QueryCommandPacket>),
    Simple(Box<dyn CommandExecutable>),
}

impl std::fmt::Debug for CommandPacket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandPacket::Query(_) => f.write_str("CommandPacket::Query"),
            CommandPacket::Simple(_) => f.write_str("CommandPacket::Simple"),
        }
    }
}
