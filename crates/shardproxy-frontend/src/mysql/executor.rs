//! Command execution envelope
//!
//! One `CommandExecutor` runs one client frame to completion:
//!
//! 1. report the turn start to the invocation hook
//! 2. borrow the backend connection and wait out any pending release
//! 3. decode the frame into a command and execute it
//! 4. write the reply: headers then streamed rows, or a simple packet batch
//! 5. on any failure (panics included) write exactly one error frame
//! 6. flush, release the connection, report the turn finish
//!
//! Nothing escapes `run`; the caller only learns the outcome.

use super::backpressure::RowStreamer;
use super::command::{CommandPacket, CommandPacketFactory, CommandResponse, QueryCommandPacket};
use super::config::FrontendConfig;
use super::errors::error_packet;
use super::protocol::{MySqlPacket, PacketPayload, SequenceId};
use crate::backend::{BackendConnection, ConnectionLease, QueryHeader};
use crate::hook::InvocationHook;
use crate::metrics;
use crate::transport::Transport;
use bytes::Bytes;
use futures::FutureExt;
use shardproxy_common::{ProxyError, Result};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, warn};

/// How a command turn ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Complete reply written (or none was due)
    Ok,
    /// Recoverable failure, reported with its own error code
    Error,
    /// Anything else, reported as an unknown exception
    Unexpected,
}

impl TurnOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnOutcome::Ok => "ok",
            TurnOutcome::Error => "error",
            TurnOutcome::Unexpected => "unexpected",
        }
    }
}

/// Executes one command turn against a client transport
pub struct CommandExecutor<'a> {
    transport: &'a mut dyn Transport,
    backend: Arc<dyn BackendConnection>,
    hook: Box<dyn InvocationHook>,
    streamer: RowStreamer,
    current_sequence_id: SequenceId,
    rows_sent: usize,
}

impl<'a> CommandExecutor<'a> {
    pub fn new(
        transport: &'a mut dyn Transport,
        backend: Arc<dyn BackendConnection>,
        hook: Box<dyn InvocationHook>,
        streamer: RowStreamer,
    ) -> Self {
        Self {
            transport,
            backend,
            hook,
            streamer,
            current_sequence_id: SequenceId::ZERO,
            rows_sent: 0,
        }
    }

    /// Executor with the streaming settings from `config`
    pub fn with_config(
        transport: &'a mut dyn Transport,
        backend: Arc<dyn BackendConnection>,
        hook: Box<dyn InvocationHook>,
        config: &FrontendConfig,
    ) -> Self {
        let streamer = RowStreamer::new(config.flush_threshold, config.recheck_interval());
        Self::new(transport, backend, hook, streamer)
    }

    /// Run one turn for `frame` (sequence byte followed by the command payload)
    pub async fn run(mut self, frame: Bytes) -> TurnOutcome {
        let started = Instant::now();
        self.hook.start();

        let result = match AssertUnwindSafe(self.execute_turn(frame)).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => Err(ProxyError::internal(panic_message(panic.as_ref()))),
        };

        let (outcome, connection_size) = match result {
            Ok(connection_size) => (TurnOutcome::Ok, connection_size),
            Err(err) => (self.write_error(&err), 0),
        };

        if let Err(e) = self.transport.flush() {
            debug!("Flush after command turn failed: {}", e);
        }

        debug!(
            outcome = outcome.as_str(),
            rows = self.rows_sent,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Command turn complete"
        );
        metrics::record_command_completed(outcome.as_str(), started.elapsed().as_secs_f64());
        self.hook.finish(connection_size);
        outcome
    }

    /// Everything between hook start and the final flush. Returns the backend
    /// pool size on success; the lease releases the connection on every exit.
    async fn execute_turn(&mut self, frame: Bytes) -> Result<usize> {
        let lease = ConnectionLease::new(self.backend.clone());
        lease.connection().await_release_if_pending().await;

        let mut payload = PacketPayload::new(frame);
        let sequence_id = SequenceId::new(payload.read_int1()?);
        let command =
            CommandPacketFactory::new_instance(sequence_id, payload, lease.connection().clone())?;
        debug!(command = ?command, "Executing command");

        self.dispatch(command).await?;
        Ok(lease.connection().pool_size())
    }

    async fn dispatch(&mut self, command: CommandPacket) -> Result<()> {
        match command {
            CommandPacket::Query(mut query) => match query.execute().await? {
                None => Ok(()),
                Some(CommandResponse::Query(response)) => {
                    self.write_query_headers(&response.headers)?;
                    self.write_rows(query.as_mut(), response.sequence_id).await
                }
                Some(CommandResponse::Simple(packets)) => self.write_packets(packets),
            },
            CommandPacket::Simple(mut command) => match command.execute().await? {
                None => Ok(()),
                Some(CommandResponse::Query(_)) => Err(ProxyError::internal(
                    "query response from a command that cannot produce rows",
                )),
                Some(CommandResponse::Simple(packets)) => self.write_packets(packets),
            },
        }
    }

    /// Field count, one column definition per header, then the header EOF
    fn write_query_headers(&mut self, headers: &[QueryHeader]) -> Result<()> {
        let field_count =
            MySqlPacket::field_count(self.current_sequence_id.advance(), headers.len());
        self.transport.write(field_count)?;
        for header in headers {
            self.transport.write(MySqlPacket::ColumnDefinition41 {
                sequence_id: self.current_sequence_id.advance(),
                header: header.clone(),
            })?;
        }
        self.transport
            .write(MySqlPacket::eof(self.current_sequence_id.advance()))?;
        Ok(())
    }

    async fn write_rows(
        &mut self,
        query: &mut dyn QueryCommandPacket,
        baseline: SequenceId,
    ) -> Result<()> {
        let stats = self
            .streamer
            .stream_rows(
                &mut *self.transport,
                query,
                baseline,
                &mut self.current_sequence_id,
            )
            .await?;
        self.rows_sent = stats.rows_sent;
        metrics::record_streaming(stats.rows_sent, stats.backpressure_waits, stats.disconnected);
        debug!(
            rows = stats.rows_sent,
            flushes = stats.flush_count,
            waits = stats.backpressure_waits,
            disconnected = stats.disconnected,
            "Result set streamed"
        );
        Ok(())
    }

    fn write_packets(&mut self, packets: Vec<MySqlPacket>) -> Result<()> {
        for packet in packets {
            self.transport.write(packet)?;
        }
        Ok(())
    }

    fn write_error(&mut self, err: &ProxyError) -> TurnOutcome {
        let outcome = if err.is_recoverable() {
            warn!(
                code = err.code(),
                sequence_id = %self.current_sequence_id,
                "Command failed: {}",
                err
            );
            TurnOutcome::Error
        } else {
            error!(
                code = err.code(),
                sequence_id = %self.current_sequence_id,
                "Unexpected command failure: {}",
                err
            );
            TurnOutcome::Unexpected
        };
        if let Err(e) = self.transport.write(error_packet(err, self.current_sequence_id)) {
            debug!("Could not write error packet: {}", e);
        }
        outcome
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}
