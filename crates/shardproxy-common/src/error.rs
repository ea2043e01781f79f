//! Error types for shardproxy services

use std::fmt;

/// Result type alias using ProxyError
pub type Result<T> = std::result::Result<T, ProxyError>;

/// Error code reported for commands the front end does not implement
pub const UNSUPPORTED_COMMAND_CODE: u16 = 10001;

/// Error code reported for failures that are not classified
pub const UNKNOWN_EXCEPTION_CODE: u16 = 10002;

/// MySQL `ER_MALFORMED_PACKET`
pub const MALFORMED_PACKET_CODE: u16 = 1835;

/// A failure reported by a backend in the shape the client protocol understands:
/// vendor error code, five character SQL state and message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlError {
    pub error_code: u16,
    pub sql_state: String,
    pub message: String,
}

impl SqlError {
    pub fn new(error_code: u16, sql_state: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code,
            sql_state: sql_state.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for SqlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.error_code, self.sql_state, self.message)
    }
}

impl std::error::Error for SqlError {}

/// Main error type for shardproxy services
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// Inbound frame could not be decoded
    #[error("Malformed packet: {0}")]
    MalformedPacket(String),

    /// Command type byte is not implemented by this front end
    #[error("Unsupported command: [{0}]")]
    UnsupportedCommand(String),

    /// Backend rejected the statement
    #[error("Execution failed: {0}")]
    Execution(SqlError),

    /// Backend failed while producing the next row of a result set
    #[error("Row materialization failed: {0}")]
    RowMaterialization(SqlError),

    /// Client transport failure
    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal invariant violation
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ProxyError {
    /// Create an internal error from any error type
    pub fn internal<E: fmt::Display>(err: E) -> Self {
        ProxyError::Internal(err.to_string())
    }

    /// Get the error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            ProxyError::MalformedPacket(_) => "MALFORMED_PACKET",
            ProxyError::UnsupportedCommand(_) => "UNSUPPORTED_COMMAND",
            ProxyError::Execution(_) => "EXECUTION_FAILED",
            ProxyError::RowMaterialization(_) => "ROW_MATERIALIZATION_FAILED",
            ProxyError::Transport(_) => "TRANSPORT_ERROR",
            ProxyError::Config(_) => "CONFIG_ERROR",
            ProxyError::Internal(_) => "INTERNAL",
        }
    }

    /// Whether the client should see this failure with its own error code.
    ///
    /// Everything else is reported as an unknown exception.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ProxyError::MalformedPacket(_)
                | ProxyError::UnsupportedCommand(_)
                | ProxyError::Execution(_)
                | ProxyError::RowMaterialization(_)
        )
    }

    /// Structured client error for recoverable failures
    pub fn sql_error(&self) -> Option<SqlError> {
        match self {
            ProxyError::MalformedPacket(detail) => Some(SqlError::new(
                MALFORMED_PACKET_CODE,
                "HY000",
                format!("Malformed communication packet: {}", detail),
            )),
            ProxyError::UnsupportedCommand(command) => Some(SqlError::new(
                UNSUPPORTED_COMMAND_CODE,
                "C10001",
                format!("Unsupported command: [{}]", command),
            )),
            ProxyError::Execution(err) | ProxyError::RowMaterialization(err) => Some(err.clone()),
            _ => None,
        }
    }
}
