//! Binary frame codec for the open-live streaming protocol.
//!
//! Every WebSocket binary message carries exactly one frame:
//! - A 4-byte big-endian packet length (header + body)
//! - A 2-byte big-endian header length, always 16
//! - A 2-byte big-endian protocol version
//! - A 4-byte big-endian operation code
//! - A 4-byte big-endian sequence ID
//!
//! followed by the opaque body. Decoding validates the header before any
//! body bytes are handed out.

pub mod codec;
pub mod error;
pub mod operation;

pub use codec::{
    decode_frame, encode_frame, Frame, HEADER_SIZE, MAX_BODY_SIZE, MAX_PACKET_SIZE,
};
pub use error::{FrameError, FrameField, Result};
pub use operation::Operation;
