//! shardproxy Common Library
//!
//! Shared error taxonomy and configuration for all shardproxy services.

pub mod config;
pub mod error;

// Re-export commonly used types
pub use config::ProxyProperties;
pub use error::{ProxyError, Result, SqlError};
