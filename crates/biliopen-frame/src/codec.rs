use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, FrameField, Result};
use crate::operation::Operation;

/// Frame header: packet length (4) + header length (2) + version (2) +
/// operation (4) + sequence ID (4) = 16 bytes.
pub const HEADER_SIZE: usize = 16;

/// Largest body the protocol accepts.
pub const MAX_BODY_SIZE: usize = 2048;

/// Largest packet the protocol accepts (header + body).
pub const MAX_PACKET_SIZE: usize = MAX_BODY_SIZE + HEADER_SIZE;

const PACKET_LEN_OFFSET: usize = 0;
const HEADER_LEN_OFFSET: usize = 4;
const VERSION_OFFSET: usize = 6;
const OPERATION_OFFSET: usize = 8;
const SEQUENCE_OFFSET: usize = 12;

/// One unit of the streaming protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Protocol version.
    pub version: u16,
    /// What this frame means.
    pub operation: Operation,
    /// Client-assigned sequence ID.
    pub sequence: u32,
    /// Opaque body.
    pub body: Bytes,
}

impl Frame {
    /// Create a version-0 frame.
    pub fn new(operation: Operation, sequence: u32, body: impl Into<Bytes>) -> Self {
        Self {
            version: 0,
            operation,
            sequence,
            body: body.into(),
        }
    }

    /// The total wire size of this frame (header + body).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.body.len()
    }

    /// Encode into a freshly allocated buffer.
    pub fn to_bytes(&self) -> Bytes {
        let mut dst = BytesMut::with_capacity(self.wire_size());
        encode_frame(self, &mut dst);
        dst.freeze()
    }
}

/// Encode a frame into the wire format.
///
/// Wire format (all integers big-endian):
/// ```text
/// ┌────────────┬────────────┬─────────┬───────────┬──────────┬──────────┐
/// │ Packet len │ Header len │ Version │ Operation │ Sequence │ Body     │
/// │ (4B)       │ (2B) = 16  │ (2B)    │ (4B)      │ (4B)     │ (var)    │
/// └────────────┴────────────┴─────────┴───────────┴──────────┴──────────┘
/// ```
///
/// The frame is trusted as constructed; size limits are only enforced on
/// decode.
pub fn encode_frame(frame: &Frame, dst: &mut BytesMut) {
    let packet_len = frame.wire_size();
    dst.reserve(packet_len);
    dst.put_u32(packet_len as u32);
    dst.put_u16(HEADER_SIZE as u16);
    dst.put_u16(frame.version);
    dst.put_u32(frame.operation.code());
    dst.put_u32(frame.sequence);
    dst.put_slice(&frame.body);
}

/// Decode one frame from a complete message.
///
/// Validation order: packet length within `0..=MAX_PACKET_SIZE`, buffer at
/// least packet length long, header length equal to [`HEADER_SIZE`], body
/// non-empty. Bytes past the declared packet length are ignored. The body
/// shares the source allocation.
pub fn decode_frame(src: &Bytes) -> Result<Frame> {
    if src.len() < HEADER_SIZE {
        return Err(FrameError::Truncated { len: src.len() });
    }

    let packet_len = read_i32(src, PACKET_LEN_OFFSET);
    let header_len = read_u16(src, HEADER_LEN_OFFSET);
    let version = read_u16(src, VERSION_OFFSET);
    let operation = Operation::from(read_u32(src, OPERATION_OFFSET));
    let sequence = read_u32(src, SEQUENCE_OFFSET);

    if packet_len < 0 || packet_len as usize > MAX_PACKET_SIZE {
        return Err(FrameError::Malformed {
            field: FrameField::PacketLength,
            value: i64::from(packet_len),
        });
    }
    let packet_len = packet_len as usize;

    if src.len() < packet_len {
        return Err(FrameError::Incomplete {
            len: src.len(),
            packet_len,
        });
    }

    if usize::from(header_len) != HEADER_SIZE {
        return Err(FrameError::Malformed {
            field: FrameField::HeaderLength,
            value: i64::from(header_len),
        });
    }

    let body_len = packet_len as i64 - i64::from(header_len);
    if body_len <= 0 {
        return Err(FrameError::Malformed {
            field: FrameField::BodyLength,
            value: body_len,
        });
    }

    Ok(Frame {
        version,
        operation,
        sequence,
        body: src.slice(HEADER_SIZE..packet_len),
    })
}

fn read_u16(src: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([src[offset], src[offset + 1]])
}

fn read_u32(src: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        src[offset],
        src[offset + 1],
        src[offset + 2],
        src[offset + 3],
    ])
}

fn read_i32(src: &[u8], offset: usize) -> i32 {
    read_u32(src, offset) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_header(packet_len: u32, header_len: u16, op: u32, seq: u32) -> BytesMut {
        let mut buf = BytesMut::new();
        buf.put_u32(packet_len);
        buf.put_u16(header_len);
        buf.put_u16(1);
        buf.put_u32(op);
        buf.put_u32(seq);
        buf
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let frame = Frame {
            version: 1,
            operation: Operation::MessageAck,
            sequence: 42,
            body: Bytes::from_static(b"{\"cmd\":\"x\"}"),
        };

        let wire = frame.to_bytes();
        assert_eq!(wire.len(), HEADER_SIZE + frame.body.len());

        let decoded = decode_frame(&wire).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn test_encode_layout_is_big_endian() {
        let frame = Frame::new(Operation::Auth, 3, Bytes::from_static(b"ab"));
        let wire = frame.to_bytes();

        assert_eq!(
            wire.as_ref(),
            &[
                0, 0, 0, 18, // packet length
                0, 16, // header length
                0, 0, // version
                0, 0, 0, 7, // operation
                0, 0, 0, 3, // sequence
                b'a', b'b',
            ]
        );
    }

    #[test]
    fn test_roundtrip_max_body() {
        let frame = Frame::new(Operation::MessageAck, 7, vec![0xAB; MAX_BODY_SIZE]);
        let decoded = decode_frame(&frame.to_bytes()).unwrap();
        assert_eq!(decoded.body.len(), MAX_BODY_SIZE);
        assert_eq!(decoded.sequence, 7);
    }

    #[test]
    fn test_decode_truncated_header() {
        let buf = Bytes::from_static(&[0, 0, 0, 20, 0, 16]);
        let result = decode_frame(&buf);
        assert_eq!(result, Err(FrameError::Truncated { len: 6 }));
    }

    #[test]
    fn test_decode_packet_too_large() {
        let mut buf = raw_header((MAX_PACKET_SIZE + 1) as u32, 16, 5, 0);
        buf.put_slice(&vec![0u8; MAX_PACKET_SIZE + 1 - HEADER_SIZE]);

        let result = decode_frame(&buf.freeze());
        assert!(matches!(
            result,
            Err(FrameError::Malformed {
                field: FrameField::PacketLength,
                ..
            })
        ));
    }

    #[test]
    fn test_decode_negative_packet_length() {
        let buf = raw_header(0xFFFF_FFF0, 16, 5, 0);
        let result = decode_frame(&buf.freeze());
        assert_eq!(
            result,
            Err(FrameError::Malformed {
                field: FrameField::PacketLength,
                value: -16,
            })
        );
    }

    #[test]
    fn test_decode_buffer_shorter_than_packet() {
        let mut buf = raw_header(30, 16, 5, 0);
        buf.put_slice(b"short");

        let result = decode_frame(&buf.freeze());
        assert_eq!(
            result,
            Err(FrameError::Incomplete {
                len: 21,
                packet_len: 30
            })
        );
    }

    #[test]
    fn test_decode_wrong_header_length() {
        let mut buf = raw_header(20, 12, 5, 0);
        buf.put_slice(b"body");

        let result = decode_frame(&buf.freeze());
        assert_eq!(
            result,
            Err(FrameError::Malformed {
                field: FrameField::HeaderLength,
                value: 12,
            })
        );
    }

    #[test]
    fn test_decode_empty_body_rejected() {
        let buf = raw_header(16, 16, 3, 0);
        let result = decode_frame(&buf.freeze());
        assert_eq!(
            result,
            Err(FrameError::Malformed {
                field: FrameField::BodyLength,
                value: 0,
            })
        );
    }

    #[test]
    fn test_decode_ignores_trailing_bytes() {
        let mut buf = BytesMut::new();
        encode_frame(
            &Frame::new(Operation::HeartbeatAck, 0, Bytes::from_static(b"\x00\x00\x00\x01")),
            &mut buf,
        );
        buf.put_slice(b"trailing");

        let frame = decode_frame(&buf.freeze()).unwrap();
        assert_eq!(frame.operation, Operation::HeartbeatAck);
        assert_eq!(frame.body.as_ref(), b"\x00\x00\x00\x01");
    }

    #[test]
    fn test_decode_unknown_operation() {
        let mut buf = raw_header(17, 16, 99, 5);
        buf.put_u8(b'x');

        let frame = decode_frame(&buf.freeze()).unwrap();
        assert_eq!(frame.operation, Operation::Other(99));
        assert_eq!(frame.version, 1);
        assert_eq!(frame.sequence, 5);
    }

    #[test]
    fn test_frame_wire_size() {
        let frame = Frame::new(Operation::Heartbeat, 0, Bytes::from_static(b"test"));
        assert_eq!(frame.wire_size(), HEADER_SIZE + 4);
    }
}
