use crate::message::MAX_DATA_LEN;

/// A message that cannot be decoded or violates the pixel size invariant.
///
/// Every variant is a per-message failure: the frame is dropped, the
/// stream continues.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MessageError {
    /// The payload has no bytes at all, not even a tag.
    #[error("empty message")]
    Empty,

    /// The payload ends inside the fixed header of its variant.
    #[error("truncated {kind} header ({len} bytes, need {need})")]
    TruncatedHeader {
        kind: &'static str,
        len: usize,
        need: usize,
    },

    /// The declared data length disagrees with the bytes actually present.
    #[error("declared data length {declared} but {actual} bytes present")]
    LengthMismatch { declared: usize, actual: usize },

    /// Height or width is zero, or their product overflows.
    #[error("invalid dimensions {height}x{width}")]
    InvalidDimensions { height: u32, width: u32 },

    /// The pixel buffer would not fit the 32-bit length field on the wire.
    #[error("image {height}x{width}x3 is {len} bytes, over the {max} byte limit", max = MAX_DATA_LEN)]
    TooLarge { height: u32, width: u32, len: usize },

    /// The pixel buffer is not exactly `height * width * 3` bytes.
    #[error("pixel buffer is {actual} bytes, expected {expected} for {height}x{width}x3")]
    SizeMismatch {
        height: u32,
        width: u32,
        expected: usize,
        actual: usize,
    },
}

pub type Result<T> = std::result::Result<T, MessageError>;
