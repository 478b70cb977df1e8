//! Frame header decoding and frame encoding (RFC 6455 Section 5.2).
//!
//! Decoding is split into the same steps the connection state machine takes,
//! so each step only ever looks at bytes that are already buffered:
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-------+-+-------------+-------------------------------+
//! |F|R|R|R| opcode|M| Payload len |    Extended payload length    |
//! |I|S|S|S|  (4)  |A|     (7)     |             (16/64)           |
//! |N|V|V|V|       |S|             |   (if payload len==126/127)   |
//! | |1|2|3|       |K|             |                               |
//! +-+-+-+-+-------+-+-------------+-------------------------------+
//! |                 Masking key (client frames only)              |
//! +---------------------------------------------------------------+
//! |                     Payload data                              |
//! +---------------------------------------------------------------+
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};
use crate::protocol::OpCode;
use crate::protocol::mask::{MASK_KEY_LEN, apply_mask};

/// Size of the fixed part of every frame header.
pub const HEADER_START_LEN: usize = 2;

/// Largest length that fits the 7-bit length field directly.
pub const MAX_DIRECT_LEN: usize = 125;

const FIN_BIT: u8 = 0x80;
const MASK_BIT: u8 = 0x80;
const LEN_BITS: u8 = 0x7F;
const LEN_16: u8 = 126;
const LEN_64: u8 = 127;

/// How the 7-bit length field continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadLength {
    /// The 7-bit value is the payload length.
    Direct(u8),
    /// A 16-bit big-endian length follows.
    Extended16,
    /// A 64-bit big-endian length follows.
    Extended64,
}

impl PayloadLength {
    /// Width in bytes of the extended length field, if any.
    #[must_use]
    pub const fn extended_width(self) -> Option<usize> {
        match self {
            PayloadLength::Direct(_) => None,
            PayloadLength::Extended16 => Some(2),
            PayloadLength::Extended64 => Some(8),
        }
    }
}

/// The first two bytes of a frame, decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderStart {
    /// Final-fragment flag.
    pub fin: bool,
    /// Raw 4-bit opcode.
    pub opcode: u8,
    /// Whether a masking key precedes the payload.
    pub masked: bool,
    /// Payload length, or which extended field carries it.
    pub length: PayloadLength,
}

impl HeaderStart {
    /// Decode the two fixed header bytes.
    #[must_use]
    pub const fn decode(bytes: [u8; HEADER_START_LEN]) -> Self {
        let length = match bytes[1] & LEN_BITS {
            LEN_16 => PayloadLength::Extended16,
            LEN_64 => PayloadLength::Extended64,
            n => PayloadLength::Direct(n),
        };
        Self {
            fin: bytes[0] & FIN_BIT != 0,
            opcode: bytes[0] & 0x0F,
            masked: bytes[1] & MASK_BIT != 0,
            length,
        }
    }

    /// The opcode, if it is not reserved.
    #[must_use]
    pub const fn opcode(&self) -> Option<OpCode> {
        OpCode::from_u8(self.opcode)
    }
}

/// Decode a big-endian extended length field of 2 or 8 bytes.
///
/// # Errors
///
/// Returns [`Error::ProtocolViolation`] for any other width.
pub fn decode_extended_length(field: &[u8]) -> Result<u64> {
    match *field {
        [a, b] => Ok(u64::from(u16::from_be_bytes([a, b]))),
        [a, b, c, d, e, f, g, h] => Ok(u64::from_be_bytes([a, b, c, d, e, f, g, h])),
        _ => Err(Error::ProtocolViolation(format!(
            "extended length field of {} bytes",
            field.len()
        ))),
    }
}

/// Recover a payload from a masked body: a 4-byte key followed by the
/// masked payload bytes.
///
/// # Errors
///
/// Returns [`Error::ProtocolViolation`] if `body` is shorter than the key.
pub fn unmask_body(body: &[u8]) -> Result<Bytes> {
    let (key, masked) = body
        .split_first_chunk::<MASK_KEY_LEN>()
        .ok_or_else(|| Error::ProtocolViolation("body shorter than masking key".into()))?;
    let mut payload = masked.to_vec();
    apply_mask(&mut payload, *key);
    Ok(Bytes::from(payload))
}

/// Bytes needed on the wire for a frame carrying `payload_len` bytes.
#[must_use]
pub const fn wire_size(payload_len: usize, masked: bool) -> usize {
    let extended = if payload_len <= MAX_DIRECT_LEN {
        0
    } else if payload_len <= u16::MAX as usize {
        2
    } else {
        8
    };
    let mask = if masked { MASK_KEY_LEN } else { 0 };
    HEADER_START_LEN + extended + mask + payload_len
}

/// Encode a single unfragmented, unmasked text frame (server to client).
///
/// Only the direct and 16-bit length encodings are produced.
///
/// # Errors
///
/// Returns [`Error::FrameTooLarge`] if `payload` exceeds `max_frame_size` or
/// cannot be described with a 16-bit length; nothing is written in that case.
pub fn encode_text(payload: &[u8], max_frame_size: usize, buf: &mut BytesMut) -> Result<()> {
    let max = max_frame_size.min(u16::MAX as usize);
    if payload.len() > max {
        return Err(Error::FrameTooLarge {
            size: payload.len() as u64,
            max,
        });
    }

    buf.reserve(wire_size(payload.len(), false));
    buf.put_u8(FIN_BIT | OpCode::Text.as_u8());
    if payload.len() <= MAX_DIRECT_LEN {
        buf.put_u8(payload.len() as u8);
    } else {
        buf.put_u8(LEN_16);
        buf.put_u16(payload.len() as u16);
    }
    buf.put_slice(payload);
    Ok(())
}

/// Encode a single masked frame, as a client would send it.
///
/// All three length encodings are produced, so this can describe frames the
/// server will refuse.
pub fn encode_masked(opcode: OpCode, payload: &[u8], mask: [u8; MASK_KEY_LEN], buf: &mut BytesMut) {
    buf.reserve(wire_size(payload.len(), true));
    buf.put_u8(FIN_BIT | opcode.as_u8());
    if payload.len() <= MAX_DIRECT_LEN {
        buf.put_u8(MASK_BIT | payload.len() as u8);
    } else if payload.len() <= u16::MAX as usize {
        buf.put_u8(MASK_BIT | LEN_16);
        buf.put_u16(payload.len() as u16);
    } else {
        buf.put_u8(MASK_BIT | LEN_64);
        buf.put_u64(payload.len() as u64);
    }
    buf.put_slice(&mask);
    let start = buf.len();
    buf.put_slice(payload);
    apply_mask(&mut buf[start..], mask);
}
