//! DTC Wire Codec
//!
//! Frames and unframes DTC messages: a 4-byte little-endian header
//! `[u16 total_length][u16 type_id]` followed by a protobuf payload,
//! `total_length` counting the header itself. The initial encoding
//! negotiation is the one exception: its payload is a raw fixed-size record,
//! 16 bytes on the wire including the header.

use crate::dtc::messages::{EncodingEnum, MessageType, WireMessage};
use crate::error::BridgeError;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// Frame header: u16 length + u16 type, both little-endian
pub const HEADER_SIZE: usize = 4;

/// DTC protocol version spoken by this server
pub const CURRENT_VERSION: u32 = 7;

/// Type id of the encoding negotiation request
pub const ENCODING_REQUEST: u16 = 6;
/// Type id of the encoding negotiation response
pub const ENCODING_RESPONSE: u16 = 7;

/// Total wire size of an encoding handshake message
pub const ENCODING_FRAME_SIZE: usize = 16;

const PROTOCOL_TYPE: [u8; 4] = *b"DTC\0";

/// One decoded wire frame: raw type id plus the payload slice.
///
/// The type id stays raw so an unknown id can be logged and dropped without
/// failing the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub type_id: u16,
    pub payload: Bytes,
}

impl Frame {
    pub fn message_type(&self) -> Option<MessageType> {
        MessageType::from_wire(self.type_id)
    }
}

/// Streaming DTC frame codec for use with `FramedRead`/`FramedWrite`.
///
/// The decoder holds no state of its own: partial input stays in the
/// `BytesMut` and decoding resumes when more bytes arrive. Multiple
/// concatenated frames in one chunk decode in sequence without copying
/// payloads (each frame is split off the shared buffer).
#[derive(Debug, Default, Clone)]
pub struct DtcCodec;

impl Decoder for DtcCodec {
    type Item = Frame;
    type Error = BridgeError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, BridgeError> {
        if src.len() < 2 {
            // Length field not yet readable: need an unknown amount more
            return Ok(None);
        }
        let total = u16::from_le_bytes([src[0], src[1]]) as usize;
        if total < HEADER_SIZE {
            return Err(BridgeError::Codec(format!(
                "frame length {} shorter than header",
                total
            )));
        }
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }
        let mut frame = src.split_to(total).freeze();
        frame.advance(2);
        let type_id = frame.get_u16_le();
        Ok(Some(Frame {
            type_id,
            payload: frame,
        }))
    }
}

impl Encoder<Frame> for DtcCodec {
    type Error = BridgeError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<(), BridgeError> {
        let total = frame.payload.len() + HEADER_SIZE;
        if total > u16::MAX as usize {
            return Err(BridgeError::Codec(format!(
                "payload of {} bytes exceeds frame limit",
                frame.payload.len()
            )));
        }
        dst.reserve(total);
        dst.put_u16_le(total as u16);
        dst.put_u16_le(frame.type_id);
        dst.extend_from_slice(&frame.payload);
        Ok(())
    }
}

/// Builds a [`Frame`] from a typed message, for `Framed` sinks.
pub fn message_frame<M: WireMessage>(msg: &M) -> Frame {
    Frame {
        type_id: M::MESSAGE_TYPE as u16,
        payload: Bytes::from(msg.encode_to_vec()),
    }
}

/// Serializes a message and prepends its header, producing the complete wire
/// bytes as one buffer so the writer issues a single write per message.
pub fn frame_message<M: WireMessage>(msg: &M) -> Bytes {
    let total = msg.encoded_len() + HEADER_SIZE;
    debug_assert!(total <= u16::MAX as usize);
    let mut buf = BytesMut::with_capacity(total);
    buf.put_u16_le(total as u16);
    buf.put_u16_le(M::MESSAGE_TYPE as u16);
    msg.encode(&mut buf).expect("BytesMut grows on demand");
    buf.freeze()
}

/// Encoding negotiation request, raw (non-protobuf) payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodingRequest {
    pub protocol_version: i32,
    pub encoding: i32,
}

impl EncodingRequest {
    /// Parses the 12-byte raw payload of an encoding request frame.
    pub fn from_payload(payload: &[u8]) -> Result<EncodingRequest, BridgeError> {
        if payload.len() != ENCODING_FRAME_SIZE - HEADER_SIZE {
            return Err(BridgeError::Codec(format!(
                "encoding request payload of {} bytes, expected {}",
                payload.len(),
                ENCODING_FRAME_SIZE - HEADER_SIZE
            )));
        }
        let mut buf = payload;
        let protocol_version = buf.get_i32_le();
        let encoding = buf.get_i32_le();
        // Trailing protocol-type marker is informational; log-worthy only
        if buf[..4] != PROTOCOL_TYPE {
            tracing::debug!("encoding request with non-DTC protocol type marker");
        }
        Ok(EncodingRequest {
            protocol_version,
            encoding,
        })
    }
}

/// Encoding negotiation response, raw (non-protobuf) payload.
///
/// The server's answer never varies: protocol version 7, protobuf encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodingResponse {
    pub protocol_version: i32,
    pub encoding: i32,
}

impl EncodingResponse {
    pub fn protobuf() -> EncodingResponse {
        EncodingResponse {
            protocol_version: CURRENT_VERSION as i32,
            encoding: EncodingEnum::ProtocolBuffers as i32,
        }
    }

    /// The 12-byte raw payload, for callers framing through an encoder.
    pub fn to_payload(self) -> Bytes {
        let mut buf = BytesMut::with_capacity(ENCODING_FRAME_SIZE - HEADER_SIZE);
        buf.put_i32_le(self.protocol_version);
        buf.put_i32_le(self.encoding);
        buf.put_slice(&PROTOCOL_TYPE);
        buf.freeze()
    }

    /// Emits the complete 16-byte wire frame.
    pub fn to_frame(self) -> Bytes {
        let mut buf = BytesMut::with_capacity(ENCODING_FRAME_SIZE);
        buf.put_u16_le(ENCODING_FRAME_SIZE as u16);
        buf.put_u16_le(ENCODING_RESPONSE);
        buf.extend_from_slice(&self.to_payload());
        buf.freeze()
    }
}
