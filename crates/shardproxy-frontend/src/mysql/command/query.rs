//! `COM_QUERY`

use super::{CommandExecutable, CommandResponse, QueryCommandPacket, QueryResponse};
use crate::backend::{BackendConnection, ExecuteOutcome, ResultCursor, TextRow};
use crate::mysql::protocol::{MySqlPacket, SequenceId};
use async_trait::async_trait;
use shardproxy_common::{ProxyError, Result};
use std::sync::Arc;
use tracing::debug;

/// Text protocol query. Result sets are streamed; updates reply with one OK packet.
pub struct ComQueryPacket {
    sql: String,
    backend: Arc<dyn BackendConnection>,
    cursor: Option<Box<dyn ResultCursor>>,
    current_row: Option<TextRow>,
    row_sequence_id: SequenceId,
}

impl ComQueryPacket {
    pub fn new(sql: String, backend: Arc<dyn BackendConnection>) -> Self {
        Self {
            sql,
            backend,
            cursor: None,
            current_row: None,
            row_sequence_id: SequenceId::ZERO,
        }
    }
}

#[async_trait]
impl CommandExecutable for ComQueryPacket {
    async fn execute(&mut self) -> Result<Option<CommandResponse>> {
        debug!(sql = %self.sql, "COM_QUERY");
        match self.backend.execute(&self.sql).await? {
            ExecuteOutcome::ResultSet { headers, cursor } => {
                // Field count, one frame per column, then EOF
                let sequence_id = SequenceId::ZERO.offset(headers.len() + 2);
                self.cursor = Some(cursor);
                self.row_sequence_id = sequence_id;
                Ok(Some(CommandResponse::Query(QueryResponse {
                    headers,
                    sequence_id,
                })))
            }
            ExecuteOutcome::Update {
                affected_rows,
                last_insert_id,
            } => Ok(Some(CommandResponse::Simple(vec![MySqlPacket::ok_with_update(
                SequenceId::FIRST_REPLY,
                affected_rows,
                last_insert_id,
            )]))),
        }
    }
}

#[async_trait]
impl QueryCommandPacket for ComQueryPacket {
    async fn has_next_row(&mut self) -> Result<bool> {
        let cursor = match self.cursor.as_mut() {
            Some(cursor) => cursor,
            None => return Ok(false),
        };
        self.current_row = cursor.next_row().await?;
        if self.current_row.is_none() {
            // Exhausted: give the backend cursor back early
            self.cursor = None;
        }
        Ok(self.current_row.is_some())
    }

    fn next_row_frame(&mut self) -> Result<MySqlPacket> {
        let values = self
            .current_row
            .take()
            .ok_or_else(|| {
                ProxyError::Internal("next_row_frame called without a current row".into())
            })?;
        Ok(MySqlPacket::TextResultSetRow {
            sequence_id: self.row_sequence_id.advance(),
            values,
        })
    }
}
