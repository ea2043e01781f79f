//! Command factory
//!
//! Turns the payload of one client frame into a command object. The payload
//! is consumed here, so the frame buffer is released as soon as the command
//! has been built.

use super::{
    ComInitDbPacket, ComPingPacket, ComQueryPacket, ComQuitPacket, ComStmtClosePacket,
    CommandPacket,
};
use crate::backend::BackendConnection;
use crate::mysql::protocol::constants::{
    command_name, COM_INIT_DB, COM_PING, COM_QUERY, COM_QUIT, COM_STMT_CLOSE,
};
use crate::mysql::protocol::{PacketPayload, SequenceId};
use shardproxy_common::{ProxyError, Result};
use std::sync::Arc;
use tracing::debug;

pub struct CommandPacketFactory;

impl CommandPacketFactory {
    /// Build the command for `payload`, which starts at the command type byte
    ///
    /// `sequence_id` is the request's own sequence byte. Replies are numbered
    /// from the turn counter, so it is only reported here.
    pub fn new_instance(
        sequence_id: SequenceId,
        mut payload: PacketPayload,
        backend: Arc<dyn BackendConnection>,
    ) -> Result<CommandPacket> {
        let command_type = payload.read_int1()?;
        debug!(
            sequence_id = %sequence_id,
            command = %command_name(command_type),
            "Decoding command"
        );
        let command = match command_type {
            COM_QUERY => {
                let sql = payload.read_string_eof()?;
                CommandPacket::Query(Box::new(ComQueryPacket::new(sql, backend)))
            }
            COM_INIT_DB => {
                let schema = payload.read_string_eof()?;
                CommandPacket::Simple(Box::new(ComInitDbPacket::new(schema, backend)))
            }
            COM_PING => CommandPacket::Simple(Box::new(ComPingPacket)),
            COM_QUIT => CommandPacket::Simple(Box::new(ComQuitPacket)),
            COM_STMT_CLOSE => {
                let statement_id = payload.read_int4()?;
                CommandPacket::Simple(Box::new(ComStmtClosePacket::new(statement_id, backend)))
            }
            other => return Err(ProxyError::UnsupportedCommand(command_name(other))),
        };
        Ok(command)
    }
}
