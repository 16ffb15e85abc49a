use std::fmt;

/// Header field that failed validation while decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameField {
    PacketLength,
    HeaderLength,
    BodyLength,
}

impl fmt::Display for FrameField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FrameField::PacketLength => "packet length",
            FrameField::HeaderLength => "header length",
            FrameField::BodyLength => "body length",
        })
    }
}

/// Errors that can occur during frame decoding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// The buffer is too short to hold a frame header.
    #[error("truncated frame ({len} bytes, header needs 16)")]
    Truncated { len: usize },

    /// A header field carries a value the protocol does not allow.
    #[error("malformed frame: invalid {field} {value}")]
    Malformed { field: FrameField, value: i64 },

    /// The buffer holds fewer bytes than the declared packet length.
    #[error("malformed frame: buffer length {len} is smaller than packet length {packet_len}")]
    Incomplete { len: usize, packet_len: usize },
}

pub type Result<T> = std::result::Result<T, FrameError>;
