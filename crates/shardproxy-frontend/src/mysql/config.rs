//! MySQL front end configuration
//!
//! The flush threshold comes from the validated proxy properties; the rest can
//! be overridden via environment variables for flexible deployment.

use crate::transport::WriteBufferWatermarks;
use shardproxy_common::config::{env_parse_or_default, DEFAULT_FRONTEND_FLUSH_THRESHOLD};
use shardproxy_common::ProxyProperties;
use std::time::Duration;
use tracing::info;

/// MySQL front end configuration
#[derive(Debug, Clone)]
pub struct FrontendConfig {
    /// Rows written before the row loop forces a flush. Always positive.
    pub flush_threshold: usize,
    /// Longest the row loop sleeps on the writability signal before re-checking
    pub backpressure_recheck_ms: u64,
    /// Outbound bytes above which the client transport stops being writable
    pub write_buffer_high_watermark: usize,
    /// Outbound bytes below which the client transport is writable again
    pub write_buffer_low_watermark: usize,
    /// Largest inbound frame payload accepted from a client
    pub max_frame_size: usize,
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            flush_threshold: DEFAULT_FRONTEND_FLUSH_THRESHOLD,
            backpressure_recheck_ms: env_parse_or_default(
                "SHARDPROXY_BACKPRESSURE_RECHECK_MS",
                100,
            ),
            write_buffer_high_watermark: env_parse_or_default(
                "SHARDPROXY_WRITE_BUFFER_HIGH_WATERMARK",
                64 * 1024,
            ),
            write_buffer_low_watermark: env_parse_or_default(
                "SHARDPROXY_WRITE_BUFFER_LOW_WATERMARK",
                32 * 1024,
            ),
            max_frame_size: env_parse_or_default("SHARDPROXY_MAX_FRAME_SIZE", 16 * 1024 * 1024),
        }
    }
}

impl FrontendConfig {
    pub fn from_properties(properties: &ProxyProperties) -> Self {
        Self {
            flush_threshold: properties.frontend_flush_threshold,
            ..Default::default()
        }
    }

    pub fn with_flush_threshold(mut self, flush_threshold: usize) -> Self {
        self.flush_threshold = flush_threshold;
        self
    }

    pub fn recheck_interval(&self) -> Duration {
        Duration::from_millis(self.backpressure_recheck_ms.max(1))
    }

    pub fn watermarks(&self) -> WriteBufferWatermarks {
        WriteBufferWatermarks {
            high: self.write_buffer_high_watermark,
            low: self.write_buffer_low_watermark.min(self.write_buffer_high_watermark),
        }
    }

    /// Log configuration on startup
    pub fn log_config(&self) {
        info!(
            "MySQL front end config: flush_threshold={}, recheck={}ms, buffer={}KB/{}KB, max_frame={}KB",
            self.flush_threshold,
            self.backpressure_recheck_ms,
            self.write_buffer_high_watermark / 1024,
            self.write_buffer_low_watermark / 1024,
            self.max_frame_size / 1024
        );
    }
}
