//! MySQL wire protocol definitions
//!
//! Contains constants, the inbound payload reader and the outbound packet builders.

pub mod constants;
pub mod packets;
pub mod payload;

pub use packets::{MySqlPacket, SequenceId};
pub use payload::PacketPayload;
