//! Backpressure-aware row streaming for the MySQL text protocol
//!
//! Rows are pulled from the command one at a time, so memory use is bounded
//! by a single row regardless of result size. Before each row is written the
//! client transport must be writable; while it is not, whatever is buffered
//! is flushed and the loop sleeps on the transport's writability signal,
//! re-checking after every wake-up. Rows are flushed in batches of
//! `flush_threshold` to amortize flush cost while bounding latency.
//!
//! A client that goes away is not an error: the loop stops writing and
//! returns quietly.

use super::command::QueryCommandPacket;
use super::protocol::{MySqlPacket, SequenceId};
use crate::transport::Transport;
use shardproxy_common::Result;
use std::time::Duration;
use tracing::debug;

/// Statistics from one streamed result set
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StreamingStats {
    pub rows_sent: usize,
    /// Flushes issued by the loop itself (threshold and backpressure)
    pub flush_count: usize,
    /// Times the loop slept on the writability signal
    pub backpressure_waits: usize,
    /// The client was gone before or during streaming
    pub disconnected: bool,
}

/// Drains a query command into the client transport
#[derive(Debug, Clone)]
pub struct RowStreamer {
    flush_threshold: usize,
    recheck_interval: Duration,
}

impl RowStreamer {
    /// `flush_threshold` must be positive; the configuration loader guarantees it
    pub fn new(flush_threshold: usize, recheck_interval: Duration) -> Self {
        debug_assert!(flush_threshold > 0, "flush threshold must be positive");
        Self {
            flush_threshold,
            recheck_interval,
        }
    }

    /// Write every remaining row of `command`, then the terminating EOF.
    ///
    /// `current_sequence_id` is seeded from `baseline` and tracks the last id
    /// written, so a failure mid-stream can be numbered after the last row.
    pub async fn stream_rows(
        &self,
        transport: &mut dyn Transport,
        command: &mut dyn QueryCommandPacket,
        baseline: SequenceId,
        current_sequence_id: &mut SequenceId,
    ) -> Result<StreamingStats> {
        let mut stats = StreamingStats::default();
        if !transport.is_active() {
            debug!("Client gone before streaming rows, skipping result set");
            stats.disconnected = true;
            return Ok(stats);
        }

        *current_sequence_id = baseline;
        let mut pending_rows = 0usize;
        while command.has_next_row().await? {
            self.wait_until_writable(transport, &mut pending_rows, &mut stats)
                .await?;
            if !transport.is_active() {
                debug!(rows = stats.rows_sent, "Client disconnected during streaming");
                stats.disconnected = true;
                return Ok(stats);
            }

            let row = command.next_row_frame()?;
            *current_sequence_id = row.sequence_id();
            transport.write(row)?;
            pending_rows += 1;
            stats.rows_sent += 1;

            if pending_rows >= self.flush_threshold {
                transport.flush()?;
                stats.flush_count += 1;
                pending_rows = 0;
            }
        }

        transport.write(MySqlPacket::eof(current_sequence_id.advance()))?;
        Ok(stats)
    }

    /// Level-triggered wait: flush, sleep on the signal, re-check, repeat.
    /// Returns once the transport is writable or no longer active.
    async fn wait_until_writable(
        &self,
        transport: &mut dyn Transport,
        pending_rows: &mut usize,
        stats: &mut StreamingStats,
    ) -> Result<()> {
        if transport.is_writable() || !transport.is_active() {
            return Ok(());
        }
        let signal = transport.writability();
        while !transport.is_writable() && transport.is_active() {
            transport.flush()?;
            stats.flush_count += 1;
            *pending_rows = 0;
            stats.backpressure_waits += 1;
            // A timeout is not a failure, just another reason to look again
            signal.wait(self.recheck_interval).await;
        }
        Ok(())
    }
}
