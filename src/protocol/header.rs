//! The fixed 16-byte packet header.

use std::time::{SystemTime, UNIX_EPOCH};

use super::ProtocolError;

/// Message type codes, matching the table in the wire protocol section of the
/// specification this server implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketType {
    NoPkt = 0x00,
    Login = 0x01,
    Status = 0x02,
    Deposit = 0x03,
    Withdraw = 0x04,
    Escrow = 0x05,
    Release = 0x06,
    Buy = 0x07,
    Sell = 0x08,
    Cancel = 0x09,
    Ack = 0x0A,
    Nack = 0x0B,
    Bought = 0x0C,
    Sold = 0x0D,
    Posted = 0x0E,
    Canceled = 0x0F,
    Traded = 0x10,
}

impl PacketType {
    pub fn from_u8(byte: u8) -> Result<PacketType, ProtocolError> {
        use PacketType::*;
        Ok(match byte {
            0x00 => NoPkt,
            0x01 => Login,
            0x02 => Status,
            0x03 => Deposit,
            0x04 => Withdraw,
            0x05 => Escrow,
            0x06 => Release,
            0x07 => Buy,
            0x08 => Sell,
            0x09 => Cancel,
            0x0A => Ack,
            0x0B => Nack,
            0x0C => Bought,
            0x0D => Sold,
            0x0E => Posted,
            0x0F => Canceled,
            0x10 => Traded,
            other => return Err(ProtocolError::UnknownType(other)),
        })
    }
}

/// The 16-byte fixed header preceding every packet's payload.
#[derive(Debug, Clone, Copy)]
pub struct PacketHeader {
    pub ty: PacketType,
    pub payload_size: u16,
    pub timestamp_sec: u32,
    pub timestamp_nsec: u32,
}

pub const HEADER_LEN: usize = 16;

impl PacketHeader {
    /// Build a header for `ty`/`payload_size`, stamped with the current wall clock.
    pub fn new(ty: PacketType, payload_size: u16) -> PacketHeader {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        PacketHeader {
            ty,
            payload_size,
            timestamp_sec: now.as_secs() as u32,
            timestamp_nsec: now.subsec_nanos(),
        }
    }

    pub fn to_bytes(self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        buf[0] = self.ty as u8;
        buf[1] = 0; // reserved
        buf[2..4].copy_from_slice(&self.payload_size.to_be_bytes());
        buf[4..8].copy_from_slice(&self.timestamp_sec.to_be_bytes());
        buf[8..12].copy_from_slice(&self.timestamp_nsec.to_be_bytes());
        // bytes 12..16 reserved, left zero
        buf
    }

    pub fn from_bytes(buf: &[u8; HEADER_LEN]) -> Result<PacketHeader, ProtocolError> {
        let ty = PacketType::from_u8(buf[0])?;
        let payload_size = u16::from_be_bytes([buf[2], buf[3]]);
        let timestamp_sec = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]);
        let timestamp_nsec = u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]);
        Ok(PacketHeader {
            ty,
            payload_size,
            timestamp_sec,
            timestamp_nsec,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_bytes() {
        let hdr = PacketHeader {
            ty: PacketType::Buy,
            payload_size: 8,
            timestamp_sec: 12345,
            timestamp_nsec: 6789,
        };
        let bytes = hdr.to_bytes();
        let back = PacketHeader::from_bytes(&bytes).unwrap();
        assert_eq!(back.ty, PacketType::Buy);
        assert_eq!(back.payload_size, 8);
        assert_eq!(back.timestamp_sec, 12345);
        assert_eq!(back.timestamp_nsec, 6789);
    }

    #[test]
    fn rejects_unknown_type() {
        let mut buf = [0u8; HEADER_LEN];
        buf[0] = 0xFF;
        assert!(matches!(
            PacketHeader::from_bytes(&buf),
            Err(ProtocolError::UnknownType(0xFF))
        ));
    }
}
