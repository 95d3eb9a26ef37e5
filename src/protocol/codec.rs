//! Packet-level read/write over any `Read + Write` stream.
//!
//! Translated from `full_read`/`full_write` in the original `protocol.c`: loop on
//! short reads/writes, and distinguish "closed before any byte of this read" (EOF)
//! from "closed partway through" (truncated) exactly as the original does, since a
//! server reading requests needs to tell a clean disconnect apart from a broken one.

use std::io::{Read, Write};

use super::header::{HEADER_LEN, PacketHeader};
use super::ProtocolError;

/// Read exactly `buf.len()` bytes, looping over short reads.
///
/// Returns `Ok(n)` with `n < buf.len()` only when the stream hit EOF partway
/// through; `n == 0` means EOF occurred before any byte was read.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize, std::io::Error> {
    let mut total = 0;
    while total < buf.len() {
        match reader.read(&mut buf[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(total)
}

fn write_full<W: Write>(writer: &mut W, buf: &[u8]) -> Result<(), std::io::Error> {
    let mut total = 0;
    while total < buf.len() {
        match writer.write(&buf[total..]) {
            Ok(0) => {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::WriteZero,
                    "connection closed mid-write",
                ));
            }
            Ok(n) => total += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Send a full packet: header, then payload if non-empty.
pub fn send_packet<W: Write>(
    writer: &mut W,
    header: PacketHeader,
    payload: &[u8],
) -> Result<(), ProtocolError> {
    write_full(writer, &header.to_bytes())?;
    if !payload.is_empty() {
        write_full(writer, payload)?;
    }
    Ok(())
}

/// Receive a full packet, blocking until the header (and payload, if any) arrive.
pub fn recv_packet<R: Read>(reader: &mut R) -> Result<(PacketHeader, Vec<u8>), ProtocolError> {
    let mut header_buf = [0u8; HEADER_LEN];
    let n = read_full(reader, &mut header_buf)?;
    if n == 0 {
        return Err(ProtocolError::Eof);
    }
    if n != HEADER_LEN {
        return Err(ProtocolError::Truncated);
    }

    let header = PacketHeader::from_bytes(&header_buf)?;

    if header.payload_size == 0 {
        return Ok((header, Vec::new()));
    }

    let mut payload = vec![0u8; header.payload_size as usize];
    let n = read_full(reader, &mut payload)?;
    if n != payload.len() {
        return Err(ProtocolError::Truncated);
    }

    Ok((header, payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::header::PacketType;

    #[test]
    fn round_trips_over_a_cursor() {
        let header = PacketHeader::new(PacketType::Buy, 4);
        let payload = 42u32.to_be_bytes();

        let mut buf = Vec::new();
        send_packet(&mut buf, header, &payload).unwrap();

        let mut cursor = std::io::Cursor::new(buf);
        let (recv_header, recv_payload) = recv_packet(&mut cursor).unwrap();
        assert_eq!(recv_header.ty, PacketType::Buy);
        assert_eq!(recv_payload, payload);
    }

    #[test]
    fn empty_stream_is_clean_eof() {
        let mut cursor = std::io::Cursor::new(Vec::<u8>::new());
        assert!(matches!(recv_packet(&mut cursor), Err(ProtocolError::Eof)));
    }

    #[test]
    fn partial_header_is_truncated() {
        let mut cursor = std::io::Cursor::new(vec![0u8; 5]);
        assert!(matches!(
            recv_packet(&mut cursor),
            Err(ProtocolError::Truncated)
        ));
    }

    #[test]
    fn partial_payload_is_truncated() {
        let header = PacketHeader::new(PacketType::Status, 10);
        let mut buf = header.to_bytes().to_vec();
        buf.extend_from_slice(&[0u8; 3]); // only 3 of 10 payload bytes
        let mut cursor = std::io::Cursor::new(buf);
        assert!(matches!(
            recv_packet(&mut cursor),
            Err(ProtocolError::Truncated)
        ));
    }

    #[test]
    fn no_payload_round_trips() {
        let header = PacketHeader::new(PacketType::Status, 0);
        let mut buf = Vec::new();
        send_packet(&mut buf, header, &[]).unwrap();
        let mut cursor = std::io::Cursor::new(buf);
        let (recv_header, recv_payload) = recv_packet(&mut cursor).unwrap();
        assert_eq!(recv_header.ty, PacketType::Status);
        assert!(recv_payload.is_empty());
    }
}
