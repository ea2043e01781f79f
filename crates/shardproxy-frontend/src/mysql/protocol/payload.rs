//! Inbound packet payload reader
//!
//! Owns the bytes of one client frame for as long as the command is being
//! decoded. Dropping the payload releases the frame buffer.

use bytes::{Buf, Bytes};
use shardproxy_common::{ProxyError, Result};

/// Little-endian reader over one MySQL frame
#[derive(Debug)]
pub struct PacketPayload {
    buf: Bytes,
}

impl PacketPayload {
    pub fn new(buf: impl Into<Bytes>) -> Self {
        Self { buf: buf.into() }
    }

    fn ensure(&self, needed: usize, what: &str) -> Result<()> {
        if self.buf.remaining() < needed {
            return Err(ProxyError::MalformedPacket(format!(
                "expected {} byte(s) for {}, {} available",
                needed,
                what,
                self.buf.remaining()
            )));
        }
        Ok(())
    }

    pub fn read_int1(&mut self) -> Result<u8> {
        self.ensure(1, "int<1>")?;
        Ok(self.buf.get_u8())
    }

    pub fn read_int4(&mut self) -> Result<u32> {
        self.ensure(4, "int<4>")?;
        Ok(self.buf.get_u32_le())
    }

    /// Rest of the packet as a string
    pub fn read_string_eof(&mut self) -> Result<String> {
        let bytes = self.buf.split_to(self.buf.remaining());
        decode_utf8(bytes)
    }
}

fn decode_utf8(bytes: Bytes) -> Result<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|e| ProxyError::MalformedPacket(format!("invalid utf-8 string: {}", e)))
}
