//! Invocation instrumentation around one command turn

use crate::metrics::{ACTIVE_COMMANDS, BACKEND_CONNECTIONS};
use std::time::Instant;
use tracing::trace;

/// Observer called at the very start and the very end of a command turn
pub trait InvocationHook: Send {
    fn start(&mut self);

    /// `connection_count` is the backend pool size the turn ended with, or 0
    /// when the turn failed before reaching the backend
    fn finish(&mut self, connection_count: usize);
}

/// Reports turn activity to the Prometheus registry
#[derive(Debug, Default)]
pub struct MetricsInvokeHook {
    started_at: Option<Instant>,
}

impl MetricsInvokeHook {
    pub fn new() -> Self {
        Self::default()
    }
}

impl InvocationHook for MetricsInvokeHook {
    fn start(&mut self) {
        self.started_at = Some(Instant::now());
        ACTIVE_COMMANDS.inc();
    }

    fn finish(&mut self, connection_count: usize) {
        // finish without start is tolerated so the gauge never goes negative
        if let Some(started_at) = self.started_at.take() {
            ACTIVE_COMMANDS.dec();
            trace!(
                elapsed_us = started_at.elapsed().as_micros() as u64,
                connection_count,
                "Command turn finished"
            );
        }
        BACKEND_CONNECTIONS.set(connection_count as i64);
    }
}
