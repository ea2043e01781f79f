//! MySQL packets written by the front end
//!
//! Every packet carries the sequence id it was assigned when it was built.
//! Encoding produces the full frame: 3 byte little-endian payload length,
//! 1 byte sequence id, then the payload.

use super::constants::{
    DEFAULT_CHARSET, EOF_HEADER, ERR_HEADER, FRAME_HEADER_LENGTH, NULL_VALUE, OK_HEADER,
};
use crate::backend::QueryHeader;
use bytes::{BufMut, BytesMut};
use shardproxy_common::SqlError;
use std::fmt;

/// Per-turn frame counter; the wire field is one byte and wraps at 256
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SequenceId(u8);

impl SequenceId {
    pub const ZERO: SequenceId = SequenceId(0);
    /// Id of the first frame a turn writes; every reply numbers on from here
    pub const FIRST_REPLY: SequenceId = SequenceId(1);

    pub const fn new(value: u8) -> Self {
        SequenceId(value)
    }

    pub const fn value(self) -> u8 {
        self.0
    }

    /// The id following this one
    pub fn next(self) -> Self {
        SequenceId(self.0.wrapping_add(1))
    }

    /// Consume the next id, leaving the counter on it
    pub fn advance(&mut self) -> Self {
        *self = self.next();
        *self
    }

    /// `self + n`, wrapping
    pub fn offset(self, n: usize) -> Self {
        SequenceId(self.0.wrapping_add((n % 256) as u8))
    }
}

impl fmt::Display for SequenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Any frame the front end sends to a client
#[derive(Debug, Clone, PartialEq)]
pub enum MySqlPacket {
    FieldCount {
        sequence_id: SequenceId,
        count: u64,
    },
    ColumnDefinition41 {
        sequence_id: SequenceId,
        header: QueryHeader,
    },
    Eof {
        sequence_id: SequenceId,
        warnings: u16,
        status_flags: u16,
    },
    Ok {
        sequence_id: SequenceId,
        affected_rows: u64,
        last_insert_id: u64,
        status_flags: u16,
        warnings: u16,
        info: String,
    },
    Err {
        sequence_id: SequenceId,
        error_code: u16,
        sql_state: String,
        message: String,
    },
    TextResultSetRow {
        sequence_id: SequenceId,
        values: Vec<Option<String>>,
    },
}

impl MySqlPacket {
    pub fn field_count(sequence_id: SequenceId, count: usize) -> Self {
        MySqlPacket::FieldCount {
            sequence_id,
            count: count as u64,
        }
    }

    pub fn eof(sequence_id: SequenceId) -> Self {
        MySqlPacket::Eof {
            sequence_id,
            warnings: 0,
            status_flags: super::constants::SERVER_STATUS_AUTOCOMMIT,
        }
    }

    pub fn ok(sequence_id: SequenceId) -> Self {
        Self::ok_with_update(sequence_id, 0, 0)
    }

    pub fn ok_with_update(
        sequence_id: SequenceId,
        affected_rows: u64,
        last_insert_id: u64,
    ) -> Self {
        MySqlPacket::Ok {
            sequence_id,
            affected_rows,
            last_insert_id,
            status_flags: super::constants::SERVER_STATUS_AUTOCOMMIT,
            warnings: 0,
            info: String::new(),
        }
    }

    pub fn err(sequence_id: SequenceId, error: &SqlError) -> Self {
        MySqlPacket::Err {
            sequence_id,
            error_code: error.error_code,
            sql_state: error.sql_state.clone(),
            message: error.message.clone(),
        }
    }

    pub fn sequence_id(&self) -> SequenceId {
        match self {
            MySqlPacket::FieldCount { sequence_id, .. }
            | MySqlPacket::ColumnDefinition41 { sequence_id, .. }
            | MySqlPacket::Eof { sequence_id, .. }
            | MySqlPacket::Ok { sequence_id, .. }
            | MySqlPacket::Err { sequence_id, .. }
            | MySqlPacket::TextResultSetRow { sequence_id, .. } => *sequence_id,
        }
    }

    /// Append the complete frame to `buf`
    pub fn encode(&self, buf: &mut BytesMut) {
        let start = buf.len();
        // Length is patched once the payload is known
        buf.put_slice(&[0, 0, 0]);
        buf.put_u8(self.sequence_id().value());
        self.encode_payload(buf);

        let length = buf.len() - start - FRAME_HEADER_LENGTH;
        let length_bytes = (length as u32).to_le_bytes();
        buf[start..start + 3].copy_from_slice(&length_bytes[..3]);
    }

    /// Encoded frame length in bytes
    pub fn encoded_len(&self) -> usize {
        let mut buf = BytesMut::new();
        self.encode(&mut buf);
        buf.len()
    }

    fn encode_payload(&self, buf: &mut BytesMut) {
        match self {
            MySqlPacket::FieldCount { count, .. } => write_lenenc_int(buf, *count),
            MySqlPacket::ColumnDefinition41 { header, .. } => {
                write_lenenc_string(buf, "def");
                write_lenenc_string(buf, &header.schema);
                write_lenenc_string(buf, &header.table);
                write_lenenc_string(buf, &header.table);
                write_lenenc_string(buf, &header.column_label);
                write_lenenc_string(buf, &header.column_name);
                // Length of the fixed fields
                buf.put_u8(0x0c);
                buf.put_u16_le(DEFAULT_CHARSET);
                buf.put_u32_le(header.column_length);
                buf.put_u8(header.column_type);
                buf.put_u16_le(header.flags);
                buf.put_u8(header.decimals);
                // Filler
                buf.put_u16_le(0);
            }
            MySqlPacket::Eof {
                warnings,
                status_flags,
                ..
            } => {
                buf.put_u8(EOF_HEADER);
                buf.put_u16_le(*warnings);
                buf.put_u16_le(*status_flags);
            }
            MySqlPacket::Ok {
                affected_rows,
                last_insert_id,
                status_flags,
                warnings,
                info,
                ..
            } => {
                buf.put_u8(OK_HEADER);
                write_lenenc_int(buf, *affected_rows);
                write_lenenc_int(buf, *last_insert_id);
                buf.put_u16_le(*status_flags);
                buf.put_u16_le(*warnings);
                buf.put_slice(info.as_bytes());
            }
            MySqlPacket::Err {
                error_code,
                sql_state,
                message,
                ..
            } => {
                buf.put_u8(ERR_HEADER);
                buf.put_u16_le(*error_code);
                buf.put_u8(b'#');
                // SQL state is exactly five bytes on the wire
                let mut state = [b'H', b'Y', b'0', b'0', b'0'];
                for (slot, byte) in state.iter_mut().zip(sql_state.bytes()) {
                    *slot = byte;
                }
                buf.put_slice(&state);
                buf.put_slice(message.as_bytes());
            }
            MySqlPacket::TextResultSetRow { values, .. } => {
                for value in values {
                    match value {
                        Some(v) => write_lenenc_string(buf, v),
                        None => buf.put_u8(NULL_VALUE),
                    }
                }
            }
        }
    }
}

pub fn write_lenenc_int(buf: &mut BytesMut, value: u64) {
    if value < 251 {
        buf.put_u8(value as u8);
    } else if value < 1 << 16 {
        buf.put_u8(0xfc);
        buf.put_u16_le(value as u16);
    } else if value < 1 << 24 {
        buf.put_u8(0xfd);
        buf.put_slice(&(value as u32).to_le_bytes()[..3]);
    } else {
        buf.put_u8(0xfe);
        buf.put_u64_le(value);
    }
}

pub fn write_lenenc_string(buf: &mut BytesMut, s: &str) {
    write_lenenc_int(buf, s.len() as u64);
    buf.put_slice(s.as_bytes());
}
