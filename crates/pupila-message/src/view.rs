use ndarray::{Array3, ArrayView3, ArrayViewMut3};

use crate::error::{MessageError, Result};
use crate::message::{check_len, CHANNELS};

/// A borrowed `(height, width, 3)` view over a message's pixel buffer.
///
/// The view aliases the buffer: every write is a write to the message. It
/// cannot outlive the message borrow it was created from, so it can never
/// survive the re-encode at the end of a relay iteration.
#[derive(Debug)]
pub struct PixelView<'a> {
    pixels: ArrayViewMut3<'a, u8>,
}

impl<'a> PixelView<'a> {
    /// Wrap `data` as a `(height, width, 3)` view, checking the size invariant first.
    pub fn new(data: &'a mut [u8], height: u32, width: u32) -> Result<Self> {
        check_len(height, width, data.len())?;
        let shape = (height as usize, width as usize, CHANNELS);
        let actual = data.len();
        let pixels =
            ArrayViewMut3::from_shape(shape, data).map_err(|_| MessageError::SizeMismatch {
                height,
                width,
                expected: shape.0 * shape.1 * CHANNELS,
                actual,
            })?;
        Ok(Self { pixels })
    }

    pub fn height(&self) -> usize {
        self.pixels.shape()[0]
    }

    pub fn width(&self) -> usize {
        self.pixels.shape()[1]
    }

    /// `(height, width, channels)`.
    pub fn shape(&self) -> (usize, usize, usize) {
        self.pixels.dim()
    }

    pub fn as_array(&self) -> ArrayView3<'_, u8> {
        self.pixels.view()
    }

    pub fn as_array_mut(&mut self) -> ArrayViewMut3<'_, u8> {
        self.pixels.view_mut()
    }

    /// Contiguous bytes behind the view, if the layout is standard.
    ///
    /// Views built by [`PixelView::new`] are always row-major and contiguous.
    pub fn as_slice_mut(&mut self) -> Option<&mut [u8]> {
        self.pixels.as_slice_mut()
    }

    /// The RGB triple at `(row, col)`.
    pub fn pixel(&self, row: usize, col: usize) -> Option<[u8; 3]> {
        if row >= self.height() || col >= self.width() {
            return None;
        }
        Some([
            self.pixels[[row, col, 0]],
            self.pixels[[row, col, 1]],
            self.pixels[[row, col, 2]],
        ])
    }

    /// Overwrite the pixel at `(row, col)`. Returns false if out of bounds.
    pub fn set_pixel(&mut self, row: usize, col: usize, rgb: [u8; 3]) -> bool {
        if row >= self.height() || col >= self.width() {
            return false;
        }
        for (channel, value) in rgb.into_iter().enumerate() {
            self.pixels[[row, col, channel]] = value;
        }
        true
    }

    /// Copy the viewed pixels into an owned buffer.
    pub fn to_buffer(&self) -> PixelBuffer {
        let (height, width, _) = self.shape();
        PixelBuffer {
            height: height as u32,
            width: width as u32,
            data: self.pixels.iter().copied().collect(),
        }
    }
}

/// An owned RGB frame, used when a processing unit returns a new image
/// instead of editing the received one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    height: u32,
    width: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Build a buffer, checking the size invariant.
    pub fn new(height: u32, width: u32, data: Vec<u8>) -> Result<Self> {
        check_len(height, width, data.len())?;
        Ok(Self {
            height,
            width,
            data,
        })
    }

    /// Take ownership of a `(height, width, 3)` array in logical (row-major) order.
    pub fn from_array(array: Array3<u8>) -> Result<Self> {
        let (height, width, channels) = array.dim();
        let to_u32 = |value: usize| u32::try_from(value).unwrap_or(u32::MAX);
        if channels != CHANNELS {
            return Err(MessageError::SizeMismatch {
                height: to_u32(height),
                width: to_u32(width),
                expected: height * width * CHANNELS,
                actual: array.len(),
            });
        }
        let (height, width) = match (u32::try_from(height), u32::try_from(width)) {
            (Ok(h), Ok(w)) => (h, w),
            _ => {
                return Err(MessageError::InvalidDimensions {
                    height: to_u32(height),
                    width: to_u32(width),
                })
            }
        };
        Self::new(height, width, array.iter().copied().collect())
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use ndarray::s;

    use super::*;
    use crate::message::RgbImageMsg;

    #[test]
    fn view_has_image_shape() {
        let mut data = vec![0u8; 4 * 5 * 3];
        let view = PixelView::new(&mut data, 4, 5).unwrap();
        assert_eq!(view.shape(), (4, 5, 3));
        assert_eq!((view.height(), view.width()), (4, 5));
    }

    #[test]
    fn view_rejects_short_buffer() {
        let mut data = vec![0u8; 10];
        let err = PixelView::new(&mut data, 2, 2).unwrap_err();
        assert!(matches!(err, MessageError::SizeMismatch { actual: 10, .. }));
    }

    #[test]
    fn writes_through_view_alias_message_buffer() {
        let mut msg = RgbImageMsg::new(2, 2, &[0u8; 12][..]).unwrap();
        {
            let mut view = msg.pixel_view().unwrap();
            view.set_pixel(1, 0, [10, 20, 30]);
            view.as_array_mut()
                .slice_mut(s![0, .., 0])
                .fill(255);
        }
        assert_eq!(
            msg.data(),
            &[255, 0, 0, 255, 0, 0, 10, 20, 30, 0, 0, 0][..]
        );
    }

    #[test]
    fn pixel_layout_is_row_major() {
        let mut data: Vec<u8> = (0..18).collect();
        let view = PixelView::new(&mut data, 2, 3).unwrap();
        assert_eq!(view.pixel(0, 0), Some([0, 1, 2]));
        assert_eq!(view.pixel(0, 2), Some([6, 7, 8]));
        assert_eq!(view.pixel(1, 0), Some([9, 10, 11]));
        assert_eq!(view.pixel(2, 0), None);
    }

    #[test]
    fn set_pixel_out_of_bounds_is_refused() {
        let mut data = vec![0u8; 3];
        let mut view = PixelView::new(&mut data, 1, 1).unwrap();
        assert!(!view.set_pixel(0, 1, [1, 1, 1]));
        assert_eq!(data, vec![0, 0, 0]);
    }

    #[test]
    fn slice_access_is_contiguous() {
        let mut data = vec![1u8; 6];
        let mut view = PixelView::new(&mut data, 1, 2).unwrap();
        let bytes = view.as_slice_mut().expect("standard layout");
        bytes[5] = 9;
        assert_eq!(data[5], 9);
    }

    #[test]
    fn to_buffer_copies_pixels() {
        let mut data: Vec<u8> = (0..6).collect();
        let view = PixelView::new(&mut data, 1, 2).unwrap();
        let owned = view.to_buffer();
        assert_eq!((owned.height(), owned.width()), (1, 2));
        assert_eq!(owned.as_bytes(), &[0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn buffer_from_array_follows_logical_order() {
        let array = Array3::from_shape_fn((2, 1, 3), |(row, _, channel)| (row * 3 + channel) as u8);
        let buffer = PixelBuffer::from_array(array).unwrap();
        assert_eq!((buffer.height(), buffer.width()), (2, 1));
        assert_eq!(buffer.into_vec(), vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn buffer_from_array_rejects_wrong_channel_count() {
        let array = Array3::<u8>::zeros((2, 2, 4));
        assert!(PixelBuffer::from_array(array).is_err());
    }

    #[test]
    fn buffer_new_checks_size() {
        assert!(PixelBuffer::new(2, 2, vec![0; 12]).is_ok());
        assert!(PixelBuffer::new(2, 2, vec![0; 13]).is_err());
    }
}
