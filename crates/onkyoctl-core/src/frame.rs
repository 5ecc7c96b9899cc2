//! eISCP frame encoding/decoding
//!
//! Wire format (all integers big-endian):
//! ```text
//! Offset  Size  Field
//!  0       4    Magic "ISCP"
//!  4       4    Header length, u32 = 16
//!  8       4    Payload length, u32 = N
//! 12       1    Version = 0x01
//! 13       3    Reserved = 0x00 0x00 0x00
//! 16       N    Payload: "!1" + COMMAND + terminator
//! ```
//!
//! Outbound frames terminate the payload with `\r\n`. Inbound payloads may
//! terminate with `\r\n`, `\r`, `\n` or nothing, and may carry an
//! end-of-record byte (`0x1A`) next to the terminator.

use bytes::{BufMut, Bytes, BytesMut};

use crate::command::IscpCommand;
use crate::error::{Error, Result};
use crate::{EISCP_VERSION, HEADER_SIZE};

/// Frame magic bytes.
pub const MAGIC: [u8; 4] = *b"ISCP";

const ISCP_START: u8 = b'!';
const UNIT_TYPE_RECEIVER: u8 = b'1';
const CR: u8 = b'\r';
const LF: u8 = b'\n';
const EOF: u8 = 0x1A;

/// Minimum decodable payload: `!1` plus a three-character command.
const MIN_PAYLOAD: usize = 5;

/// Encode a command into a complete eISCP frame.
pub fn encode(command: &IscpCommand) -> Bytes {
    let payload_len = 2 + command.as_str().len() + 2;
    let mut buf = BytesMut::with_capacity(HEADER_SIZE + payload_len);

    buf.put_slice(&MAGIC);
    buf.put_u32(HEADER_SIZE as u32);
    buf.put_u32(payload_len as u32);
    buf.put_u8(EISCP_VERSION);
    buf.put_slice(&[0x00, 0x00, 0x00]);

    buf.put_u8(ISCP_START);
    buf.put_u8(UNIT_TYPE_RECEIVER);
    buf.put_slice(command.as_str().as_bytes());
    buf.put_slice(b"\r\n");

    buf.freeze()
}

/// Decode a frame header, returning `(header_size, payload_size)`.
///
/// Requires at least the 12 fixed bytes (magic + two lengths). The version
/// byte is not validated.
pub fn decode_header(data: &[u8]) -> Result<(usize, usize)> {
    if data.len() < 12 {
        return Err(Error::ShortHeader {
            needed: 12,
            have: data.len(),
        });
    }

    if data[..4] != MAGIC {
        let mut found = [0u8; 4];
        found.copy_from_slice(&data[..4]);
        return Err(Error::BadMagic(found));
    }

    let header_size = u32::from_be_bytes([data[4], data[5], data[6], data[7]]) as usize;
    let payload_size = u32::from_be_bytes([data[8], data[9], data[10], data[11]]) as usize;

    if data.len() < header_size {
        return Err(Error::ShortBuffer {
            needed: header_size,
            have: data.len(),
        });
    }

    Ok((header_size, payload_size))
}

/// Decode an ISCP payload into the contained command.
///
/// Expects `!1<COMMAND>` with any of the four terminator variants, and
/// tolerates an end-of-record byte before or after the terminator.
pub fn decode_payload(data: &[u8]) -> Result<IscpCommand> {
    if data.len() < MIN_PAYLOAD {
        return Err(Error::BadPayload("payload too short"));
    }
    if data[0] != ISCP_START {
        return Err(Error::BadPayload("missing start character '!'"));
    }
    if data[1] != UNIT_TYPE_RECEIVER {
        return Err(Error::BadPayload("missing receiver type '1'"));
    }

    let mut end = data.len();
    if end > 2 && data[end - 1] == EOF {
        end -= 1;
    }
    if end > 2 && data[end - 1] == CR {
        end -= 1;
    } else if end > 2 && data[end - 1] == LF {
        end -= 1;
        if end > 2 && data[end - 1] == CR {
            end -= 1;
        }
    }
    if end > 2 && data[end - 1] == EOF {
        end -= 1;
    }

    if end == 2 {
        return Err(Error::BadPayload("empty command"));
    }

    let command = std::str::from_utf8(&data[2..end])
        .map_err(|_| Error::BadPayload("command is not ASCII"))?;
    if !command.is_ascii() {
        return Err(Error::BadPayload("command is not ASCII"));
    }
    Ok(IscpCommand::new(command))
}

/// Decode a complete eISCP message (header and payload) from a buffer.
pub fn decode(data: &[u8]) -> Result<IscpCommand> {
    let (header_size, payload_size) = decode_header(data)?;
    let total = header_size + payload_size;
    if data.len() < total {
        return Err(Error::ShortBuffer {
            needed: total,
            have: data.len(),
        });
    }
    decode_payload(&data[header_size..total])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_power_on() {
        let encoded = encode(&IscpCommand::from("PWR01"));
        let expected: &[u8] = &[
            0x49, 0x53, 0x43, 0x50, // ISCP
            0x00, 0x00, 0x00, 0x10, // header length 16
            0x00, 0x00, 0x00, 0x09, // payload length 9
            0x01, 0x00, 0x00, 0x00, // version + reserved
            0x21, 0x31, 0x50, 0x57, 0x52, 0x30, 0x31, 0x0D, 0x0A, // !1PWR01\r\n
        ];
        assert_eq!(&encoded[..], expected);
    }

    #[test]
    fn encode_decode_roundtrip() {
        let command = IscpCommand::from("XXX");
        let encoded = encode(&command);
        assert_eq!(decode(&encoded).unwrap(), command);
    }

    #[test]
    fn decode_tolerates_eof_after_terminator() {
        let data: &[u8] = &[
            0x49, 0x53, 0x43, 0x50, 0x00, 0x00, 0x00, 0x10, 0x00, 0x00, 0x00, 0x05, 0x01, 0x00,
            0x00, 0x00, 0x21, 0x31, 0x58, 0x58, 0x58, 0x0A, 0x1A,
        ];
        assert_eq!(decode(data).unwrap(), IscpCommand::from("XXX"));
    }

    #[test]
    fn decode_header_rejects_bad_magic() {
        let data = [0u8; 16];
        assert!(matches!(
            decode_header(&data),
            Err(Error::BadMagic(_))
        ));
    }

    #[test]
    fn decode_header_rejects_short_input() {
        assert!(matches!(
            decode_header(b"ISCP"),
            Err(Error::ShortHeader { .. })
        ));
    }
}
