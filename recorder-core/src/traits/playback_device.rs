use crate::models::error::CaptureError;
use crate::traits::capture_device::HandleState;

/// Exclusive hardware playback handle in streaming mode.
pub trait PlaybackDevice: Send {
    /// Reports `Uninitialized` once the handle has been released underneath us.
    fn state(&self) -> HandleState;

    fn play(&mut self) -> Result<(), CaptureError>;

    /// Queue `data` for output, blocking until at least part of it was accepted.
    /// Returns the number of bytes consumed.
    fn write(&mut self, data: &[u8]) -> Result<usize, CaptureError>;

    fn stop(&mut self) -> Result<(), CaptureError>;

    fn release(self: Box<Self>);
}
