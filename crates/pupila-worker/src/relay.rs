use bytes::BytesMut;
use pupila_message::{deserialize, encode, FrameMessage};
use serde::Serialize;
use tracing::{debug, error, trace, warn};

use crate::error::{Result, SocketError};
use crate::socket::{PullSocket, PushSocket};
use crate::unit::{FrameOutput, ProcessingUnit};

/// Whether the caller should keep iterating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopSignal {
    /// Nothing happened or one frame went through; poll again.
    Continue,
    /// An unsupported message arrived; the pipeline is misconfigured.
    Stop,
}

/// Counters kept across relay iterations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RelayStats {
    /// Non-empty payloads pulled from upstream.
    pub received: u64,
    /// Frames handed to the output socket.
    pub forwarded: u64,
    /// Malformed messages dropped.
    pub dropped: u64,
    /// Iterations that found no message.
    pub idle: u64,
    /// Tag of the message that stopped the loop, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unsupported_tag: Option<u8>,
}

/// One pull socket, one push socket and the processing unit between them.
///
/// The relay owns both sockets for its whole life. [`Relay::drain`] closes
/// input, then output, once; dropping an undrained relay does the same.
pub struct Relay<I: PullSocket, O: PushSocket> {
    unit: Box<dyn ProcessingUnit>,
    input: I,
    output: O,
    encoded: BytesMut,
    stats: RelayStats,
    drained: bool,
}

impl<I: PullSocket, O: PushSocket> Relay<I, O> {
    pub fn new(unit: Box<dyn ProcessingUnit>, input: I, output: O) -> Self {
        Self {
            unit,
            input,
            output,
            encoded: BytesMut::new(),
            stats: RelayStats::default(),
            drained: false,
        }
    }

    /// Run one relay iteration.
    ///
    /// Malformed messages are logged and dropped here. Errors returned are
    /// unexpected faults: socket failures and processing unit failures.
    pub fn fetch_and_process(&mut self) -> Result<LoopSignal> {
        let raw = match self.input.recv()? {
            Some(raw) if !raw.is_empty() => raw,
            _ => {
                self.stats.idle += 1;
                trace!("no message");
                return Ok(LoopSignal::Continue);
            }
        };
        self.stats.received += 1;

        match self.relay(raw) {
            Ok(signal) => Ok(signal),
            Err(err) if err.is_recoverable() => {
                self.stats.dropped += 1;
                warn!(error = %err, "dropping message");
                Ok(LoopSignal::Continue)
            }
            Err(err) => Err(err),
        }
    }

    fn relay(&mut self, raw: BytesMut) -> Result<LoopSignal> {
        let mut image = match deserialize(raw)? {
            FrameMessage::RgbImage(image) => image,
            FrameMessage::Unsupported { tag, body } => {
                self.stats.unsupported_tag = Some(tag);
                error!(tag, len = body.len(), "unsupported message type");
                return Ok(LoopSignal::Stop);
            }
        };

        let origin = image.data().as_ptr();
        let replacement = match self.unit.process(image.pixel_view()?)? {
            // Edits already live in the message buffer.
            FrameOutput::View(view) if view.as_array().as_ptr() == origin => None,
            FrameOutput::View(view) => Some(view.to_buffer()),
            FrameOutput::Owned(buffer) => Some(buffer),
        };
        if let Some(pixels) = replacement {
            debug!(
                height = pixels.height(),
                width = pixels.width(),
                "unit replaced frame"
            );
            image.replace_pixels(pixels);
        }

        self.encoded.clear();
        encode(&FrameMessage::RgbImage(image), &mut self.encoded);
        self.output.send(&self.encoded)?;
        self.stats.forwarded += 1;
        Ok(LoopSignal::Continue)
    }

    /// Release both sockets, input first. Later calls do nothing.
    ///
    /// Both closes are attempted even if the first fails; the first error
    /// is returned.
    pub fn drain(&mut self) -> std::result::Result<(), SocketError> {
        if self.drained {
            return Ok(());
        }
        self.drained = true;
        let input = self.input.close();
        let output = self.output.close();
        debug!("relay drained");
        input.and(output)
    }

    pub fn is_drained(&self) -> bool {
        self.drained
    }

    pub fn stats(&self) -> &RelayStats {
        &self.stats
    }

    pub fn unit_name(&self) -> &str {
        self.unit.name()
    }
}

impl<I: PullSocket, O: PushSocket> Drop for Relay<I, O> {
    fn drop(&mut self) {
        if let Err(err) = self.drain() {
            warn!(error = %err, "failed to release sockets");
        }
    }
}
