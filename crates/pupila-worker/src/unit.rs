use pupila_message::{PixelBuffer, PixelView};

use crate::error::UnitError;

/// Registry key of the built-in pass-through unit.
pub const IDENTITY_UNIT: &str = "builtin:identity";

/// What a processing unit hands back for one frame.
#[derive(Debug)]
pub enum FrameOutput<'a> {
    /// Serialize the received buffer. If this is the view the unit was
    /// given, its edits are already in the message.
    View(PixelView<'a>),
    /// Replace the frame with a new image, possibly of another size.
    Owned(PixelBuffer),
}

/// A user processing unit as seen by the relay loop.
///
/// One instance lives for the whole worker run and is never called
/// concurrently, so it may keep unsynchronized state.
pub trait ProcessingUnit {
    /// Name for logs and reports.
    fn name(&self) -> &str;

    /// Process one frame.
    fn process<'a>(&mut self, frame: PixelView<'a>) -> Result<FrameOutput<'a>, UnitError>;
}

impl<U: ProcessingUnit + ?Sized> ProcessingUnit for Box<U> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn process<'a>(&mut self, frame: PixelView<'a>) -> Result<FrameOutput<'a>, UnitError> {
        (**self).process(frame)
    }
}

/// Forwards every frame untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityUnit;

impl ProcessingUnit for IdentityUnit {
    fn name(&self) -> &str {
        IDENTITY_UNIT
    }

    fn process<'a>(&mut self, frame: PixelView<'a>) -> Result<FrameOutput<'a>, UnitError> {
        Ok(FrameOutput::View(frame))
    }
}
