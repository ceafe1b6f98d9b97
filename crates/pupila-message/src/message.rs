use bytes::BytesMut;

use crate::error::{MessageError, Result};
use crate::view::{PixelBuffer, PixelView};

/// Interleaved 8-bit channels per pixel.
pub const CHANNELS: usize = 3;

/// Largest pixel buffer an RGB image may carry; the wire length is a `u32`.
pub const MAX_DATA_LEN: usize = u32::MAX as usize;

/// The closed set of message kinds this worker understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageKind {
    /// A raw, row-major RGB image.
    RgbImage = 1,
}

impl MessageKind {
    /// Wire tag for this kind.
    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// Map a wire tag back to a known kind.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(MessageKind::RgbImage),
            _ => None,
        }
    }

    /// Human-readable kind name for logs.
    pub fn name(self) -> &'static str {
        match self {
            MessageKind::RgbImage => "rgb-image",
        }
    }
}

/// A decoded pipeline message.
///
/// Tags outside [`MessageKind`] still decode, into [`FrameMessage::Unsupported`],
/// so a stray message never crashes the decoder; deciding what to do with
/// it is the caller's business.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameMessage {
    RgbImage(RgbImageMsg),
    Unsupported { tag: u8, body: BytesMut },
}

impl FrameMessage {
    /// The wire tag of this message.
    pub fn tag(&self) -> u8 {
        match self {
            FrameMessage::RgbImage(_) => MessageKind::RgbImage.tag(),
            FrameMessage::Unsupported { tag, .. } => *tag,
        }
    }

    /// The known kind, or `None` for an unsupported tag.
    pub fn kind(&self) -> Option<MessageKind> {
        MessageKind::from_tag(self.tag())
    }
}

/// An RGB image: `height * width` pixels, 3 bytes each, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbImageMsg {
    height: u32,
    width: u32,
    data: BytesMut,
}

impl RgbImageMsg {
    /// Build an image message, checking the size invariant.
    pub fn new(height: u32, width: u32, data: impl Into<BytesMut>) -> Result<Self> {
        let data = data.into();
        check_len(height, width, data.len())?;
        Ok(Self {
            height,
            width,
            data,
        })
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    /// Raw pixel bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Raw pixel bytes, mutable.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Set the height without touching the buffer.
    ///
    /// Nothing re-checks the size invariant until the message is decoded
    /// again or a view is taken.
    pub fn set_height(&mut self, height: u32) {
        self.height = height;
    }

    /// Set the width without touching the buffer. See [`Self::set_height`].
    pub fn set_width(&mut self, width: u32) {
        self.width = width;
    }

    /// Replace the pixel buffer. Dimensions are left as they are.
    pub fn update_data(&mut self, data: impl Into<BytesMut>) {
        self.data = data.into();
    }

    /// Replace the pixel buffer and adopt the replacement's dimensions.
    pub fn replace_pixels(&mut self, pixels: PixelBuffer) {
        self.height = pixels.height();
        self.width = pixels.width();
        self.update_data(pixels.as_bytes());
    }

    /// Check that the buffer is exactly `height * width * 3` bytes.
    pub fn validate(&self) -> Result<()> {
        check_len(self.height, self.width, self.data.len())
    }

    /// Borrow the pixel buffer as a `(height, width, 3)` view.
    ///
    /// Writes through the view land directly in this message's buffer.
    pub fn pixel_view(&mut self) -> Result<PixelView<'_>> {
        PixelView::new(&mut self.data, self.height, self.width)
    }

    /// Consume the message and return its pixel buffer.
    pub fn into_data(self) -> BytesMut {
        self.data
    }
}

/// Byte length of a `height x width` RGB buffer.
pub(crate) fn expected_len(height: u32, width: u32) -> Result<usize> {
    if height == 0 || width == 0 {
        return Err(MessageError::InvalidDimensions { height, width });
    }
    let len = (height as usize)
        .checked_mul(width as usize)
        .and_then(|pixels| pixels.checked_mul(CHANNELS))
        .ok_or(MessageError::InvalidDimensions { height, width })?;
    if len > MAX_DATA_LEN {
        return Err(MessageError::TooLarge { height, width, len });
    }
    Ok(len)
}

pub(crate) fn check_len(height: u32, width: u32, actual: usize) -> Result<()> {
    let expected = expected_len(height, width)?;
    if expected != actual {
        return Err(MessageError::SizeMismatch {
            height,
            width,
            expected,
            actual,
        });
    }
    Ok(())
}
