//! Error frames for failed command turns
//!
//! A recoverable failure keeps its own error code and continues the turn's
//! numbering. Anything else becomes an unknown-exception frame at a fixed
//! sequence id, whatever has been written so far.

use super::protocol::{MySqlPacket, SequenceId};
use shardproxy_common::error::UNKNOWN_EXCEPTION_CODE;
use shardproxy_common::{ProxyError, SqlError};

/// Sequence id of the unknown-exception frame
pub const UNEXPECTED_ERROR_SEQUENCE_ID: SequenceId = SequenceId::new(1);

/// SQL state of the unknown-exception frame
pub const UNKNOWN_EXCEPTION_SQL_STATE: &str = "C10002";

/// Error frame for `err`, given the last sequence id consumed in this turn
pub fn error_packet(err: &ProxyError, current_sequence_id: SequenceId) -> MySqlPacket {
    match err.sql_error() {
        Some(sql_error) => MySqlPacket::err(current_sequence_id.next(), &sql_error),
        None => MySqlPacket::err(
            UNEXPECTED_ERROR_SEQUENCE_ID,
            &unknown_exception(&err.to_string()),
        ),
    }
}

/// Generic client error wrapping a raw failure description
pub fn unknown_exception(description: &str) -> SqlError {
    SqlError::new(
        UNKNOWN_EXCEPTION_CODE,
        UNKNOWN_EXCEPTION_SQL_STATE,
        format!("Unknown exception: [{}]", description),
    )
}
