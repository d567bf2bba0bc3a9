//! WebSocket frame layout.
//!
//! ```text
//!  byte 0: FIN | opcode (low 7 bits as read; FIN is always set on write)
//!  byte 1: MASK | 7-bit length (126 => 2-byte big-endian extension follows,
//!                               127 => 8-byte extension, unsupported)
//!  [2 bytes extended length] [4 bytes masking key] payload
//! ```
//!
//! Fragmented messages are never produced and never reassembled.

use crate::error::{NetworkError, Result};

/// Final-fragment bit of the first header byte.
pub const FIN_BIT: u8 = 0x80;
/// Mask bit of the second header byte.
pub const MASK_BIT: u8 = 0x80;
/// Largest payload the 2-byte length extension can carry.
pub const MAX_PAYLOAD_LEN: usize = 0xFFFF;

/// Length marker announcing a 2-byte extended length.
const LEN_EXTENDED_16: u8 = 126;
/// Length marker announcing an 8-byte extended length.
const LEN_EXTENDED_64: u8 = 127;

/// Frame type identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// Continuation of a fragmented message.
    Continuation,
    /// UTF-8 text data.
    Text,
    /// Binary data.
    Binary,
    /// Connection close.
    Close,
    /// Keep-alive request; answered with a pong carrying the same payload.
    Ping,
    /// Keep-alive answer.
    Pong,
    /// Any value the protocol reserves.
    Reserved(u8),
}

impl Opcode {
    /// Parse from the low 7 bits of the first header byte.
    pub fn from_u8(value: u8) -> Self {
        match value {
            0x0 => Self::Continuation,
            0x1 => Self::Text,
            0x2 => Self::Binary,
            0x8 => Self::Close,
            0x9 => Self::Ping,
            0xA => Self::Pong,
            other => Self::Reserved(other),
        }
    }

    /// Numeric wire value.
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Continuation => 0x0,
            Self::Text => 0x1,
            Self::Binary => 0x2,
            Self::Close => 0x8,
            Self::Ping => 0x9,
            Self::Pong => 0xA,
            Self::Reserved(value) => value,
        }
    }
}

/// A decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame type.
    pub opcode: Opcode,
    /// Unmasked payload bytes.
    pub payload: Vec<u8>,
}

impl Frame {
    /// Create a frame.
    pub fn new(opcode: Opcode, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            opcode,
            payload: payload.into(),
        }
    }

    /// Create a text frame.
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(Opcode::Text, text.into().into_bytes())
    }
}

/// How the payload length is carried after the 2-byte header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadLength {
    /// Length fits in the 7-bit field.
    Direct(usize),
    /// Length follows as a 2-byte big-endian integer.
    Extended16,
}

/// The fixed 2-byte frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Frame type.
    pub opcode: Opcode,
    /// Whether a 4-byte masking key follows the length.
    pub masked: bool,
    /// Payload length or the marker for the extension that carries it.
    pub length: PayloadLength,
}

impl FrameHeader {
    /// Parse the fixed header.
    ///
    /// A 64-bit length marker is a [`NetworkError::Protocol`] error.
    pub fn parse(bytes: [u8; 2]) -> Result<Self> {
        let opcode = Opcode::from_u8(bytes[0] & 0x7F);
        let masked = bytes[1] & MASK_BIT != 0;
        let length = match bytes[1] & 0x7F {
            LEN_EXTENDED_64 => {
                return Err(NetworkError::Protocol(
                    "64-bit frame lengths are not supported".to_string(),
                ));
            }
            LEN_EXTENDED_16 => PayloadLength::Extended16,
            len => PayloadLength::Direct(usize::from(len)),
        };

        Ok(Self {
            opcode,
            masked,
            length,
        })
    }
}

/// Encode a single final frame.
///
/// With `mask` set, the mask bit and key are written and the payload is
/// XORed with the key. Payloads longer than [`MAX_PAYLOAD_LEN`] are rejected.
pub fn encode_frame(opcode: Opcode, payload: &[u8], mask: Option<[u8; 4]>) -> Result<Vec<u8>> {
    let len = payload.len();
    if len > MAX_PAYLOAD_LEN {
        return Err(NetworkError::Protocol(format!(
            "payload of {len} bytes exceeds the {MAX_PAYLOAD_LEN}-byte frame limit"
        )));
    }

    let mask_bit = if mask.is_some() { MASK_BIT } else { 0 };
    let mut out = Vec::with_capacity(2 + 2 + 4 + len);
    out.push(FIN_BIT | opcode.as_u8());

    if len < usize::from(LEN_EXTENDED_16) {
        // `len` < 126 here, so it fits in the 7-bit field.
        out.push(mask_bit | len as u8);
    } else {
        out.push(mask_bit | LEN_EXTENDED_16);
        out.extend_from_slice(&(len as u16).to_be_bytes());
    }

    match mask {
        Some(key) => {
            out.extend_from_slice(&key);
            let start = out.len();
            out.extend_from_slice(payload);
            apply_mask(&mut out[start..], key);
        }
        None => out.extend_from_slice(payload),
    }

    Ok(out)
}

/// XOR `data` in place with the repeating 4-byte `key`.
///
/// Applying the same key twice restores the original bytes.
pub fn apply_mask(data: &mut [u8], key: [u8; 4]) {
    for (i, byte) in data.iter_mut().enumerate() {
        *byte ^= key[i % 4];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_round_trips_known_values() {
        for value in [0x0, 0x1, 0x2, 0x8, 0x9, 0xA] {
            assert_eq!(Opcode::from_u8(value).as_u8(), value);
        }
        assert_eq!(Opcode::from_u8(0x3), Opcode::Reserved(0x3));
    }

    #[test]
    fn test_short_unmasked_frame_layout() {
        let bytes = encode_frame(Opcode::Text, b"hi", None).unwrap();
        assert_eq!(bytes, vec![0x81, 0x02, b'h', b'i']);
    }

    #[test]
    fn test_length_125_uses_direct_length() {
        let payload = vec![7u8; 125];
        let bytes = encode_frame(Opcode::Binary, &payload, None).unwrap();
        assert_eq!(bytes[1], 125);
        assert_eq!(bytes.len(), 2 + 125);
    }

    #[test]
    fn test_length_126_uses_two_byte_extension() {
        let payload = vec![7u8; 126];
        let bytes = encode_frame(Opcode::Binary, &payload, None).unwrap();
        assert_eq!(bytes[1], 126);
        assert_eq!(&bytes[2..4], &[0x00, 0x7E]);
        assert_eq!(bytes.len(), 4 + 126);
    }

    #[test]
    fn test_length_65535_is_largest_encodable() {
        let payload = vec![0u8; 65535];
        let bytes = encode_frame(Opcode::Binary, &payload, None).unwrap();
        assert_eq!(&bytes[2..4], &[0xFF, 0xFF]);
    }

    #[test]
    fn test_length_65536_is_a_protocol_error() {
        let payload = vec![0u8; 65536];
        let err = encode_frame(Opcode::Binary, &payload, None).unwrap_err();
        assert!(matches!(err, NetworkError::Protocol(_)));
    }

    #[test]
    fn test_masked_frame_sets_bit_and_xors_payload() {
        let key = [0x01, 0x02, 0x03, 0x04];
        let bytes = encode_frame(Opcode::Text, b"abcd", Some(key)).unwrap();
        assert_eq!(bytes[0], 0x81);
        assert_eq!(bytes[1], MASK_BIT | 4);
        assert_eq!(&bytes[2..6], &key);
        assert_eq!(&bytes[6..], &[b'a' ^ 1, b'b' ^ 2, b'c' ^ 3, b'd' ^ 4]);
    }

    #[test]
    fn test_zero_mask_key_leaves_payload_unchanged() {
        let bytes = encode_frame(Opcode::Pong, b"keepalive", Some([0; 4])).unwrap();
        assert_eq!(&bytes[6..], b"keepalive");
    }

    #[test]
    fn test_header_parse_ignores_fin_bit() {
        let header = FrameHeader::parse([0x89, 0x05]).unwrap();
        assert_eq!(header.opcode, Opcode::Ping);
        assert!(!header.masked);
        assert_eq!(header.length, PayloadLength::Direct(5));

        let header = FrameHeader::parse([0x01, 0x05]).unwrap();
        assert_eq!(header.opcode, Opcode::Text);
    }

    #[test]
    fn test_header_parse_extended_and_masked() {
        let header = FrameHeader::parse([0x82, MASK_BIT | 126]).unwrap();
        assert_eq!(header.opcode, Opcode::Binary);
        assert!(header.masked);
        assert_eq!(header.length, PayloadLength::Extended16);
    }

    #[test]
    fn test_header_parse_rejects_64_bit_length() {
        let err = FrameHeader::parse([0x82, 127]).unwrap_err();
        assert!(matches!(err, NetworkError::Protocol(_)));
    }

    #[test]
    fn test_apply_mask_is_an_involution() {
        let key = [0xDE, 0xAD, 0xBE, 0xEF];
        let mut data = b"hello, socket".to_vec();
        apply_mask(&mut data, key);
        assert_ne!(data, b"hello, socket");
        apply_mask(&mut data, key);
        assert_eq!(data, b"hello, socket");
    }
}
