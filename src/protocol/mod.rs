//! Length-prefixed binary wire protocol.
//!
//! Every message is a fixed 16-byte header (see [`header`]) followed by zero or
//! more payload bytes whose shape depends on the message type (see [`message`]).
//! [`codec`] implements the blocking read/write loops that move whole packets
//! across a [`std::io::Read`]/[`std::io::Write`] pair.
//!
//! Grounded on `protocol.c`/`protocol.h` from the original implementation: the
//! header layout, the type codes, and the short-read/short-write retry loops are
//! carried over faithfully; only the language changes.

mod codec;
mod header;
mod message;

pub use codec::{recv_packet, send_packet};
pub use header::{PacketHeader, PacketType};
pub use message::{CancelInfo, EscrowInfo, FundsInfo, NotifyInfo, OrderInfo, StatusInfo};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("connection closed before any data was received")]
    Eof,
    #[error("connection closed mid-packet (truncated read)")]
    Truncated,
    #[error("unknown packet type byte {0:#04x}")]
    UnknownType(u8),
    #[error("payload size {actual} does not match expected {expected} bytes for this type")]
    BadPayloadSize { expected: u16, actual: u16 },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
