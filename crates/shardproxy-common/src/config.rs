//! Configuration utilities for shardproxy services

use crate::error::{ProxyError, Result};
use serde::Deserialize;
use tracing::debug;

/// Environment prefix for proxy properties (`SHARDPROXY__FRONTEND_FLUSH_THRESHOLD`, ...)
pub const ENV_PREFIX: &str = "SHARDPROXY";

/// Default number of rows written before the front end forces a flush
pub const DEFAULT_FRONTEND_FLUSH_THRESHOLD: usize = 128;

/// Process-wide proxy properties
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProxyProperties {
    /// Rows buffered on the client connection before a forced flush
    pub frontend_flush_threshold: usize,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for ProxyProperties {
    fn default() -> Self {
        Self {
            frontend_flush_threshold: DEFAULT_FRONTEND_FLUSH_THRESHOLD,
            log_level: "info".into(),
        }
    }
}

impl ProxyProperties {
    /// Load properties from `SHARDPROXY__*` environment variables and validate them
    pub fn from_env() -> Result<Self> {
        let properties: ProxyProperties =
            load_from_env(ENV_PREFIX).map_err(|e| ProxyError::Config(e.to_string()))?;
        properties.validate()?;
        debug!(
            flush_threshold = properties.frontend_flush_threshold,
            "Loaded proxy properties"
        );
        Ok(properties)
    }

    /// Reject values the front end cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.frontend_flush_threshold == 0 {
            return Err(ProxyError::Config(
                "frontend_flush_threshold must be a positive integer".into(),
            ));
        }
        Ok(())
    }
}

/// Load configuration from environment variables
pub fn load_from_env<T: for<'de> Deserialize<'de>>(
    prefix: &str,
) -> std::result::Result<T, config::ConfigError> {
    config::Config::builder()
        .add_source(
            config::Environment::with_prefix(prefix)
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()
}

/// Get environment variable as parsed type with default
pub fn env_parse_or_default<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
