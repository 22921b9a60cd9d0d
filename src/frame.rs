//! The wire envelope: sync, direction|address, status (reply only), length,
//! body, CRC-16.
//!
//! The decode interface is modeled on the reference codec library's
//! `Decode`/`DecodeError` pair: decoding never consumes input on anything
//! but success, and the caller is expected to retry with more bytes when it
//! sees [`DecodeError::Incomplete`]. Unlike that reference (whose
//! `DecodeError` also carries a `LiteralFound` variant for mid-stream
//! continuation requests, a concept this protocol's fixed-length envelope
//! has no analog for), this crate's decoder only ever returns `Incomplete`
//! or `Invalid`.

use crate::crc::frame_crc16;
use crate::message::{Message, MessageParser};

const SYNC: [u8; 2] = [0x1A, 0xCE];
const COMMAND_NIBBLE: u8 = 0xA0;
const REPLY_NIBBLE: u8 = 0xB0;
pub const MAX_BODY_LENGTH: usize = 127;

/// Why [`decode`] could not produce a frame yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Not enough bytes have arrived yet; retry once more bytes are
    /// available. Never means the bytes seen so far are wrong.
    Incomplete,
    /// The bytes seen so far can never become a valid frame (bad sync,
    /// address mismatch, oversize length, bad CRC, or a body with a
    /// remainder after the message parser runs).
    Invalid(String),
}

/// A decoded reply frame: its message and status byte.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedFrame {
    pub message: Message,
    pub status: u8,
}

/// Encode `message` as a command frame addressed to `address` (0-15).
pub fn encode_command(message: &Message, address: u8) -> crate::error::Result<Vec<u8>> {
    encode(message, address, Direction::Command, None)
}

/// Encode `message` as a reply frame from `address` (0-15) carrying
/// `status`.
pub fn encode_reply(
    message: &Message,
    address: u8,
    status: u8,
) -> crate::error::Result<Vec<u8>> {
    encode(message, address, Direction::Reply, Some(status))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Command,
    Reply,
}

fn encode(
    message: &Message,
    address: u8,
    direction: Direction,
    status: Option<u8>,
) -> crate::error::Result<Vec<u8>> {
    if address > 15 {
        return Err(crate::error::Error::ProtocolMisuse(format!(
            "address {address} is out of range [0, 15]"
        )));
    }
    let body = message.render_binary();
    if body.len() > MAX_BODY_LENGTH {
        return Err(crate::error::Error::ProtocolMisuse(format!(
            "message body of {} bytes exceeds the {} byte limit",
            body.len(),
            MAX_BODY_LENGTH
        )));
    }

    let mut packet = Vec::with_capacity(SYNC.len() + 1 + 2 + body.len() + 2);
    packet.extend_from_slice(&SYNC);
    let dir_addr = match direction {
        Direction::Command => COMMAND_NIBBLE | address,
        Direction::Reply => REPLY_NIBBLE | address,
    };
    let crc_region_start = packet.len();
    packet.push(dir_addr);
    if let Some(status) = status {
        packet.push(status);
    }
    packet.push(body.len() as u8);
    packet.extend_from_slice(&body);

    let crc = frame_crc16(&packet[crc_region_start..]);
    packet.extend_from_slice(&crc.to_le_bytes());
    Ok(packet)
}

/// Try to decode one reply frame addressed to `address` from the start of
/// `input`. Never consumes `input`; the caller advances its own buffer by
/// the number of bytes this frame occupied once it knows the frame is
/// complete (callers can recover that length from the successful result by
/// re-encoding, or — more simply — track it themselves as transport.rs
/// does by trying to decode after every newly read byte).
pub fn decode(
    input: &[u8],
    address: u8,
    message_parser: &MessageParser,
) -> Result<DecodedFrame, DecodeError> {
    if input.len() < 2 {
        return Err(DecodeError::Incomplete);
    }
    if input[0..2] != SYNC {
        return Err(DecodeError::Invalid("bad sync sequence".to_string()));
    }
    if input.len() < 3 {
        return Err(DecodeError::Incomplete);
    }
    let dir_addr = input[2];
    if dir_addr & 0xF0 != REPLY_NIBBLE {
        return Err(DecodeError::Invalid(
            "expected a reply direction nibble".to_string(),
        ));
    }
    let frame_address = dir_addr & 0x0F;
    if frame_address != address {
        return Err(DecodeError::Invalid(format!(
            "frame address {frame_address} does not match session address {address}"
        )));
    }

    if input.len() < 4 {
        return Err(DecodeError::Incomplete);
    }
    let status = input[3];

    if input.len() < 5 {
        return Err(DecodeError::Incomplete);
    }
    let length = input[4] as usize;
    if length > MAX_BODY_LENGTH {
        return Err(DecodeError::Invalid(format!(
            "body length {length} exceeds the {MAX_BODY_LENGTH} byte limit"
        )));
    }

    let total_length = 7 + length;
    if input.len() < total_length {
        return Err(DecodeError::Incomplete);
    }

    let body = &input[5..5 + length];
    let crc_region = &input[2..5 + length];
    let expected_crc = frame_crc16(crc_region);
    let actual_crc = u16::from_le_bytes([input[5 + length], input[6 + length]]);
    if actual_crc != expected_crc {
        return Err(DecodeError::Invalid("CRC mismatch".to_string()));
    }

    let message = message_parser
        .decode_binary(body)
        .map_err(|e| DecodeError::Invalid(e.to_string()))?;

    Ok(DecodedFrame { message, status })
}

/// The number of bytes a successfully decoded frame occupied, if `input`
/// contains a complete, well-formed reply frame header (sync through
/// length). Used by the transport to know how much of its buffer to
/// discard once a frame decodes successfully.
pub fn frame_length(input: &[u8]) -> Option<usize> {
    if input.len() < 5 || input[0..2] != SYNC {
        return None;
    }
    let length = input[4] as usize;
    Some(7 + length)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::IdentifierTable;
    use crate::parser::Parser;
    use crate::registry::CommandRegistry;
    use crate::value::IntWidth;
    use std::sync::Arc;

    fn ping_only_parser() -> MessageParser {
        MessageParser::from_registry(&CommandRegistry::new()).unwrap()
    }

    #[test]
    fn ping_encodes_to_an_empty_body_frame() {
        let parser = ping_only_parser();
        let message = parser.decode_text("ping").unwrap();
        let encoded = encode_command(&message, 5).unwrap();
        assert_eq!(&encoded[0..2], &SYNC);
        assert_eq!(encoded[2], 0xA0 | 5);
        assert_eq!(encoded[3], 0); // length byte (no status on commands)
        assert_eq!(encoded.len(), 6); // sync(2) + dir(1) + len(1) + body(0) + crc(2)
    }

    #[test]
    fn decode_is_monotone_over_truncated_prefixes() {
        let parser = ping_only_parser();
        let message = parser.decode_text("ping").unwrap();
        let full = encode_reply(&message, 5, 0).unwrap();

        for k in 0..full.len() {
            let result = decode(&full[..k], 5, &parser);
            assert_eq!(result, Err(DecodeError::Incomplete), "prefix length {k}");
        }
        let decoded = decode(&full, 5, &parser).expect("full frame should decode");
        assert_eq!(decoded.status, 0);
        assert_eq!(decoded.message.render_text(), "ping");
    }

    #[test]
    fn decode_rejects_flipped_crc_byte_and_does_not_salvage_on_more_bytes() {
        let parser = ping_only_parser();
        let message = parser.decode_text("ping").unwrap();
        let mut full = encode_reply(&message, 5, 0).unwrap();
        let last = full.len() - 1;
        full[last] ^= 0xFF;

        assert!(matches!(decode(&full, 5, &parser), Err(DecodeError::Invalid(_))));
        let mut extended = full.clone();
        extended.push(0x00);
        assert!(matches!(
            decode(&extended, 5, &parser),
            Err(DecodeError::Invalid(_))
        ));
    }

    #[test]
    fn decode_rejects_address_mismatch() {
        let parser = ping_only_parser();
        let message = parser.decode_text("ping").unwrap();
        let full = encode_reply(&message, 5, 0).unwrap();
        assert!(matches!(
            decode(&full, 6, &parser),
            Err(DecodeError::Invalid(_))
        ));
    }

    #[test]
    fn igniter_command_round_trips_through_a_frame() {
        let mut registry = CommandRegistry::new();
        let float_parser = Parser::float32(None, ' ');
        registry
            .register(0x10, "igniter", 0.002, Some(float_parser.clone()), Some(float_parser))
            .unwrap();
        let parser = MessageParser::from_registry(&registry).unwrap();

        let message = parser.decode_text("igniter 1.5").unwrap();
        let encoded = encode_command(&message, 5).unwrap();
        // sync(2) dir(1) len(1) body(5: code+f32) crc(2) = 11
        assert_eq!(encoded.len(), 11);
        assert_eq!(encoded[4], 5);

        // The device replies in kind; decode it back as a reply.
        let reply_encoded = encode_reply(&message, 5, 0).unwrap();
        let decoded = decode(&reply_encoded, 5, &parser).unwrap();
        assert_eq!(decoded.message.payload().unwrap().as_f32(), Some(1.5));
    }

    #[test]
    fn echo_command_carries_a_byte_list_payload() {
        let mut registry = CommandRegistry::new();
        let byte_list = Parser::list(Parser::integer(IntWidth::W8, false, ' '), None, " ");
        registry
            .register(0x04, "echo", 0.020, Some(byte_list.clone()), Some(byte_list))
            .unwrap();
        let parser = MessageParser::from_registry(&registry).unwrap();

        let message = parser
            .decode_text("echo 1 2 3 4 5 6 7 8 9 10")
            .unwrap();
        let body = message.render_binary();
        assert_eq!(
            body,
            vec![0x04, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10]
        );
        assert_eq!(message.render_text(), "echo 1 2 3 4 5 6 7 8 9 10");
    }

    #[test]
    fn frame_length_reports_the_full_packet_size() {
        let parser = ping_only_parser();
        let message = parser.decode_text("ping").unwrap();
        let full = encode_reply(&message, 5, 0).unwrap();
        assert_eq!(frame_length(&full), Some(full.len()));
    }

    #[test]
    fn frame_is_well_formed_only_up_to_the_127_byte_body_limit() {
        // A body past the 127-byte limit must be rejected at encode time.
        let oversized = Message {
            value: crate::value::Value::List {
                items: vec![
                    crate::value::Value::Byte {
                        code: 1,
                        label: Some("x".to_string()),
                    },
                    crate::value::Value::String(vec![b'a'; 130]),
                ],
                separator: " ",
            },
            deadline_seconds: 0.002,
        };
        assert!(encode_command(&oversized, 0).is_err());
    }
}
