//! Prometheus metrics for the MySQL front end
//!
//! Exports metrics for:
//! - Command turns by outcome and duration
//! - Backend connections held per turn
//! - Row streaming and backpressure

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, register_int_counter, register_int_gauge,
    CounterVec, Encoder, HistogramVec, IntCounter, IntGauge, TextEncoder,
};

// ═══════════════════════════════════════════════════════════════════════════
// COMMAND METRICS
// ═══════════════════════════════════════════════════════════════════════════

/// Command turns by outcome (ok, error, unexpected)
pub static COMMANDS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "shardproxy_frontend_commands_total",
        "Total command turns executed by outcome",
        &["outcome"]
    )
    .unwrap()
});

/// Command turn duration, envelope start to finish
pub static COMMAND_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "shardproxy_frontend_command_duration_seconds",
        "Command turn duration in seconds",
        &["outcome"],
        vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    )
    .unwrap()
});

/// Command turns currently between hook start and finish
pub static ACTIVE_COMMANDS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "shardproxy_frontend_active_commands",
        "Command turns currently executing"
    )
    .unwrap()
});

/// Physical backend connections held by the last finished turn
pub static BACKEND_CONNECTIONS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "shardproxy_frontend_backend_connections",
        "Backend connections held by the most recent command turn"
    )
    .unwrap()
});

// ═══════════════════════════════════════════════════════════════════════════
// STREAMING METRICS
// ═══════════════════════════════════════════════════════════════════════════

/// Result rows written to clients
pub static ROWS_STREAMED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "shardproxy_frontend_rows_streamed_total",
        "Total result rows written to clients"
    )
    .unwrap()
});

/// Times the row loop slept because the client could not keep up
pub static BACKPRESSURE_WAITS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "shardproxy_frontend_backpressure_waits_total",
        "Total row loop waits on client transport writability"
    )
    .unwrap()
});

/// Result sets abandoned because the client disconnected
pub static CLIENT_DISCONNECTS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "shardproxy_frontend_client_disconnects_total",
        "Result sets abandoned because the client went away"
    )
    .unwrap()
});

// ═══════════════════════════════════════════════════════════════════════════
// HELPER FUNCTIONS
// ═══════════════════════════════════════════════════════════════════════════

/// Initialize all metrics (call at startup)
pub fn init_metrics() {
    // Touch all lazy statics to register them
    let _ = &*COMMANDS_TOTAL;
    let _ = &*COMMAND_DURATION_SECONDS;
    let _ = &*ACTIVE_COMMANDS;
    let _ = &*BACKEND_CONNECTIONS;
    let _ = &*ROWS_STREAMED_TOTAL;
    let _ = &*BACKPRESSURE_WAITS_TOTAL;
    let _ = &*CLIENT_DISCONNECTS_TOTAL;
}

/// Encode all metrics as Prometheus text format
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Record a finished command turn
pub fn record_command_completed(outcome: &str, duration_secs: f64) {
    COMMANDS_TOTAL.with_label_values(&[outcome]).inc();
    COMMAND_DURATION_SECONDS
        .with_label_values(&[outcome])
        .observe(duration_secs);
}

/// Record one streamed result set
pub fn record_streaming(rows: usize, backpressure_waits: usize, disconnected: bool) {
    ROWS_STREAMED_TOTAL.inc_by(rows as u64);
    BACKPRESSURE_WAITS_TOTAL.inc_by(backpressure_waits as u64);
    if disconnected {
        CLIENT_DISCONNECTS_TOTAL.inc();
    }
}
