use crate::models::error::CaptureError;

/// Allocation state of a hardware handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    Uninitialized,
    Initialized,
}

/// Whether a capture handle is currently delivering audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingState {
    Stopped,
    Recording,
}

/// Exclusive hardware capture handle.
///
/// Only the capture loop's own thread reads from or releases a handle once
/// recording has been engaged.
pub trait CaptureDevice: Send {
    fn state(&self) -> HandleState;

    fn recording_state(&self) -> RecordingState;

    fn start_recording(&mut self) -> Result<(), CaptureError>;

    fn stop_recording(&mut self) -> Result<(), CaptureError>;

    /// Blocking read of up to `buffer.len()` bytes. Returns the number of
    /// bytes filled, which may be zero.
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize, CaptureError>;

    /// Free the hardware resource.
    fn release(self: Box<Self>);
}
