//! Length-prefixed message framing for pupila sockets.
//!
//! Stream transports carry bytes; pipeline stages exchange whole messages.
//! Every message is framed with:
//! - A 2-byte magic number ("PF") for stream synchronization
//! - A 4-byte little-endian payload length
//!
//! Received payloads are handed out as owned, mutable buffers so the
//! message layer can decode and edit them without another copy.

pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

pub use codec::{decode_frame, encode_frame, Frame, FrameConfig, DEFAULT_MAX_PAYLOAD, HEADER_SIZE};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use writer::FrameWriter;
