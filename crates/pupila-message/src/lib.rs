//! Frame messages exchanged between pupila pipeline stages.
//!
//! A message is decoded from the bytes of one received frame, its pixel
//! buffer is exposed as a borrowed [`PixelView`] for in-place edits, and the
//! message is re-encoded for the next stage.
//!
//! ```
//! use pupila_message::{deserialize, serialize, FrameMessage, RgbImageMsg};
//!
//! let msg = FrameMessage::RgbImage(RgbImageMsg::new(1, 2, &[0u8; 6][..]).unwrap());
//! let mut decoded = deserialize(serialize(&msg).as_ref().into()).unwrap();
//!
//! if let FrameMessage::RgbImage(image) = &mut decoded {
//!     let mut view = image.pixel_view().unwrap();
//!     view.set_pixel(0, 1, [0, 0, 255]);
//! }
//! assert_ne!(decoded, msg);
//! ```

pub mod codec;
pub mod error;
pub mod message;
pub mod view;

pub use codec::{deserialize, encode, serialize, RGB_HEADER_SIZE};
pub use error::{MessageError, Result};
pub use message::{FrameMessage, MessageKind, RgbImageMsg, CHANNELS, MAX_DATA_LEN};
pub use view::{PixelBuffer, PixelView};
