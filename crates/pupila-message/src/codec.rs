use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{MessageError, Result};
use crate::message::{FrameMessage, MessageKind, RgbImageMsg};

/// RGB image header after the tag: height (4) + width (4) + data length (4).
pub const RGB_HEADER_SIZE: usize = 12;

/// Decode one received payload.
///
/// Wire format:
/// ```text
/// ┌─────────┬─────────────┬────────────┬───────────────┬──────────────────┐
/// │ Tag (1) │ Height (4B) │ Width (4B) │ Data len (4B) │ Data             │
/// │ 0x01    │ u32 LE      │ u32 LE     │ u32 LE        │ h * w * 3 bytes  │
/// └─────────┴─────────────┴────────────┴───────────────┴──────────────────┘
/// ```
/// Any other tag is followed by an opaque body and decodes to
/// [`FrameMessage::Unsupported`].
///
/// Takes ownership of `raw`; the decoded pixel data is the tail of that
/// same allocation, not a copy.
pub fn deserialize(mut raw: BytesMut) -> Result<FrameMessage> {
    if raw.is_empty() {
        return Err(MessageError::Empty);
    }

    let tag = raw.get_u8();
    match MessageKind::from_tag(tag) {
        Some(MessageKind::RgbImage) => decode_rgb_image(raw).map(FrameMessage::RgbImage),
        None => Ok(FrameMessage::Unsupported { tag, body: raw }),
    }
}

fn decode_rgb_image(mut raw: BytesMut) -> Result<RgbImageMsg> {
    if raw.len() < RGB_HEADER_SIZE {
        return Err(MessageError::TruncatedHeader {
            kind: MessageKind::RgbImage.name(),
            len: raw.len(),
            need: RGB_HEADER_SIZE,
        });
    }

    let height = raw.get_u32_le();
    let width = raw.get_u32_le();
    let declared = raw.get_u32_le() as usize;

    if declared != raw.len() {
        return Err(MessageError::LengthMismatch {
            declared,
            actual: raw.len(),
        });
    }

    RgbImageMsg::new(height, width, raw)
}

/// Append the wire form of `msg` to `dst`.
///
/// Dimensions are written as stored; a message whose height or width was
/// changed without a matching buffer encodes fine and fails on decode.
/// Buffers built through [`RgbImageMsg::new`] or a [`PixelBuffer`] never
/// exceed [`MAX_DATA_LEN`]. One forced past it with `update_data` gets a
/// saturated length field and fails on decode the same way.
///
/// [`PixelBuffer`]: crate::PixelBuffer
/// [`MAX_DATA_LEN`]: crate::MAX_DATA_LEN
pub fn encode(msg: &FrameMessage, dst: &mut BytesMut) {
    match msg {
        FrameMessage::RgbImage(image) => {
            let data = image.data();
            dst.reserve(1 + RGB_HEADER_SIZE + data.len());
            dst.put_u8(MessageKind::RgbImage.tag());
            dst.put_u32_le(image.height());
            dst.put_u32_le(image.width());
            dst.put_u32_le(u32::try_from(data.len()).unwrap_or(u32::MAX));
            dst.put_slice(data);
        }
        FrameMessage::Unsupported { tag, body } => {
            dst.reserve(1 + body.len());
            dst.put_u8(*tag);
            dst.put_slice(body);
        }
    }
}

/// Encode `msg` into a fresh buffer.
pub fn serialize(msg: &FrameMessage) -> Bytes {
    let mut dst = BytesMut::new();
    encode(msg, &mut dst);
    dst.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgb(height: u32, width: u32, fill: impl Fn(usize) -> u8) -> FrameMessage {
        let data: Vec<u8> = (0..(height * width * 3) as usize).map(fill).collect();
        FrameMessage::RgbImage(RgbImageMsg::new(height, width, data.as_slice()).unwrap())
    }

    fn wire(tag: u8, height: u32, width: u32, declared: u32, data: &[u8]) -> BytesMut {
        let mut buf = BytesMut::new();
        buf.put_u8(tag);
        buf.put_u32_le(height);
        buf.put_u32_le(width);
        buf.put_u32_le(declared);
        buf.put_slice(data);
        buf
    }

    #[test]
    fn rgb_image_roundtrip_field_for_field() {
        let msg = rgb(256, 384, |i| (i % 251) as u8);
        let encoded = serialize(&msg);
        assert_eq!(encoded.len(), 1 + RGB_HEADER_SIZE + 256 * 384 * 3);

        let decoded = deserialize(BytesMut::from(encoded.as_ref())).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn reencode_is_byte_for_byte() {
        let original = wire(1, 2, 1, 6, &[1, 2, 3, 4, 5, 6]);
        let decoded = deserialize(original.clone()).unwrap();
        assert_eq!(serialize(&decoded).as_ref(), original.as_ref());
    }

    #[test]
    fn unknown_tag_decodes_as_unsupported() {
        let mut raw = BytesMut::from(&[7u8, 0xde, 0xad][..]);
        let decoded = deserialize(raw.clone()).unwrap();

        assert_eq!(
            decoded,
            FrameMessage::Unsupported {
                tag: 7,
                body: BytesMut::from(&[0xde, 0xad][..]),
            }
        );
        assert_eq!(serialize(&decoded).as_ref(), raw.split().as_ref());
    }

    #[test]
    fn empty_payload_is_malformed() {
        assert_eq!(
            deserialize(BytesMut::new()).unwrap_err(),
            MessageError::Empty
        );
    }

    #[test]
    fn truncated_header_is_malformed() {
        let raw = BytesMut::from(&[1u8, 0, 0, 0][..]);
        assert!(matches!(
            deserialize(raw).unwrap_err(),
            MessageError::TruncatedHeader { len: 3, .. }
        ));
    }

    #[test]
    fn short_data_is_malformed() {
        // declared and present agree, but 2x2 needs 12 bytes
        let raw = wire(1, 2, 2, 11, &[0; 11]);
        assert!(matches!(
            deserialize(raw).unwrap_err(),
            MessageError::SizeMismatch {
                expected: 12,
                actual: 11,
                ..
            }
        ));
    }

    #[test]
    fn declared_length_must_match_payload() {
        let raw = wire(1, 2, 2, 12, &[0; 6]);
        assert_eq!(
            deserialize(raw).unwrap_err(),
            MessageError::LengthMismatch {
                declared: 12,
                actual: 6
            }
        );
    }

    #[test]
    fn zero_dimension_is_malformed() {
        let raw = wire(1, 0, 4, 0, &[]);
        assert!(matches!(
            deserialize(raw).unwrap_err(),
            MessageError::InvalidDimensions { .. }
        ));
    }

    #[test]
    fn dimensions_past_the_wire_length_are_malformed() {
        let raw = wire(1, 65_536, 65_536, 0, &[]);
        assert!(matches!(
            deserialize(raw).unwrap_err(),
            MessageError::TooLarge { .. }
        ));
    }

    #[test]
    fn resized_without_data_encodes_but_fails_decode() {
        let mut msg = rgb(2, 2, |_| 0);
        if let FrameMessage::RgbImage(image) = &mut msg {
            image.set_height(4);
        }
        let encoded = serialize(&msg);
        assert!(matches!(
            deserialize(BytesMut::from(encoded.as_ref())).unwrap_err(),
            MessageError::SizeMismatch { .. }
        ));
    }

    #[test]
    fn decoded_view_edits_reach_reencoded_bytes() {
        let mut msg = deserialize(wire(1, 1, 2, 6, &[0; 6])).unwrap();
        if let FrameMessage::RgbImage(image) = &mut msg {
            let mut view = image.pixel_view().unwrap();
            view.set_pixel(0, 1, [4, 5, 6]);
        }
        let encoded = serialize(&msg);
        assert_eq!(&encoded[1 + RGB_HEADER_SIZE..], &[0, 0, 0, 4, 5, 6]);
    }
}
