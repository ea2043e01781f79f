//! MySQL client/server protocol constants
//!
//! Command type bytes, column types and status flags used by the front end.

// ===== Command types =====

pub const COM_SLEEP: u8 = 0x00;
pub const COM_QUIT: u8 = 0x01;
pub const COM_INIT_DB: u8 = 0x02;
pub const COM_QUERY: u8 = 0x03;
pub const COM_FIELD_LIST: u8 = 0x04;
pub const COM_STATISTICS: u8 = 0x09;
pub const COM_PING: u8 = 0x0e;
pub const COM_STMT_PREPARE: u8 = 0x16;
pub const COM_STMT_EXECUTE: u8 = 0x17;
pub const COM_STMT_CLOSE: u8 = 0x19;
pub const COM_STMT_RESET: u8 = 0x1a;

/// Human readable name of a command type byte, used in error messages and logs
pub fn command_name(command_type: u8) -> String {
    match command_type {
        COM_SLEEP => "COM_SLEEP".to_string(),
        COM_QUIT => "COM_QUIT".to_string(),
        COM_INIT_DB => "COM_INIT_DB".to_string(),
        COM_QUERY => "COM_QUERY".to_string(),
        COM_FIELD_LIST => "COM_FIELD_LIST".to_string(),
        COM_STATISTICS => "COM_STATISTICS".to_string(),
        COM_PING => "COM_PING".to_string(),
        COM_STMT_PREPARE => "COM_STMT_PREPARE".to_string(),
        COM_STMT_EXECUTE => "COM_STMT_EXECUTE".to_string(),
        COM_STMT_CLOSE => "COM_STMT_CLOSE".to_string(),
        COM_STMT_RESET => "COM_STMT_RESET".to_string(),
        other => format!("0x{:02x}", other),
    }
}

// ===== Packet headers =====

pub const OK_HEADER: u8 = 0x00;
pub const EOF_HEADER: u8 = 0xfe;
pub const ERR_HEADER: u8 = 0xff;
/// NULL column value in a text result row
pub const NULL_VALUE: u8 = 0xfb;

/// Bytes of the frame header: 3 byte payload length + 1 byte sequence id
pub const FRAME_HEADER_LENGTH: usize = 4;

/// Largest payload a single frame may carry
pub const MAX_PAYLOAD_LENGTH: usize = 0xff_ff_ff;

// ===== Status flags =====

pub const SERVER_STATUS_IN_TRANS: u16 = 0x0001;
pub const SERVER_STATUS_AUTOCOMMIT: u16 = 0x0002;

// ===== Column types =====

pub const MYSQL_TYPE_DECIMAL: u8 = 0x00;
pub const MYSQL_TYPE_TINY: u8 = 0x01;
pub const MYSQL_TYPE_SHORT: u8 = 0x02;
pub const MYSQL_TYPE_LONG: u8 = 0x03;
pub const MYSQL_TYPE_FLOAT: u8 = 0x04;
pub const MYSQL_TYPE_DOUBLE: u8 = 0x05;
pub const MYSQL_TYPE_NULL: u8 = 0x06;
pub const MYSQL_TYPE_TIMESTAMP: u8 = 0x07;
pub const MYSQL_TYPE_LONGLONG: u8 = 0x08;
pub const MYSQL_TYPE_DATE: u8 = 0x0a;
pub const MYSQL_TYPE_TIME: u8 = 0x0b;
pub const MYSQL_TYPE_DATETIME: u8 = 0x0c;
pub const MYSQL_TYPE_NEWDECIMAL: u8 = 0xf6;
pub const MYSQL_TYPE_BLOB: u8 = 0xfc;
pub const MYSQL_TYPE_VAR_STRING: u8 = 0xfd;
pub const MYSQL_TYPE_STRING: u8 = 0xfe;

/// `utf8_general_ci`
pub const DEFAULT_CHARSET: u16 = 33;
