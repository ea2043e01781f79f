//! Administrative commands with a small or empty reply

use super::{CommandExecutable, CommandResponse};
use crate::backend::BackendConnection;
use crate::mysql::protocol::{MySqlPacket, SequenceId};
use async_trait::async_trait;
use shardproxy_common::Result;
use std::sync::Arc;
use tracing::debug;

/// `COM_PING`
pub struct ComPingPacket;

#[async_trait]
impl CommandExecutable for ComPingPacket {
    async fn execute(&mut self) -> Result<Option<CommandResponse>> {
        Ok(Some(CommandResponse::Simple(vec![MySqlPacket::ok(SequenceId::FIRST_REPLY)])))
    }
}

/// `COM_QUIT`. The connection loop stops reading after this turn.
pub struct ComQuitPacket;

#[async_trait]
impl CommandExecutable for ComQuitPacket {
    async fn execute(&mut self) -> Result<Option<CommandResponse>> {
        Ok(Some(CommandResponse::Simple(vec![MySqlPacket::ok(SequenceId::FIRST_REPLY)])))
    }
}

/// `COM_INIT_DB`
pub struct ComInitDbPacket {
    schema: String,
    backend: Arc<dyn BackendConnection>,
}

impl ComInitDbPacket {
    pub fn new(schema: String, backend: Arc<dyn BackendConnection>) -> Self {
        Self { schema, backend }
    }
}

#[async_trait]
impl CommandExecutable for ComInitDbPacket {
    async fn execute(&mut self) -> Result<Option<CommandResponse>> {
        debug!(schema = %self.schema, "COM_INIT_DB");
        self.backend.use_schema(&self.schema).await?;
        Ok(Some(CommandResponse::Simple(vec![MySqlPacket::ok(SequenceId::FIRST_REPLY)])))
    }
}

/// `COM_STMT_CLOSE`. The protocol defines no reply.
pub struct ComStmtClosePacket {
    statement_id: u32,
    backend: Arc<dyn BackendConnection>,
}

impl ComStmtClosePacket {
    pub fn new(statement_id: u32, backend: Arc<dyn BackendConnection>) -> Self {
        Self {
            statement_id,
            backend,
        }
    }
}

#[async_trait]
impl CommandExecutable for ComStmtClosePacket {
    async fn execute(&mut self) -> Result<Option<CommandResponse>> {
        self.backend.close_statement(self.statement_id).await?;
        Ok(None)
    }
}
