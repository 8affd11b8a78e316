use crate::models::audio_format::AudioFormat;
use crate::models::error::CaptureError;
use crate::traits::capture_device::CaptureDevice;
use crate::traits::playback_device::PlaybackDevice;

/// Interface to a platform audio subsystem.
///
/// Implemented by:
/// - `WasapiBackend` (Windows)
/// - `MockBackend` (tests)
pub trait AudioBackend: Send + Sync {
    /// Minimum buffer size in bytes for `format`, or `None` when the platform
    /// rejects the format or fails to answer.
    fn min_buffer_size(&self, format: &AudioFormat) -> Option<usize>;

    /// Whether microphone capture is currently permitted. Never prompts.
    fn has_record_permission(&self) -> bool;

    /// Allocate a capture handle. The handle is not recording yet.
    fn open_capture(
        &self,
        format: &AudioFormat,
        buffer_bytes: usize,
    ) -> Result<Box<dyn CaptureDevice>, CaptureError>;

    /// Allocate a streaming playback handle. The handle is not playing yet.
    fn open_playback(
        &self,
        format: &AudioFormat,
        buffer_bytes: usize,
    ) -> Result<Box<dyn PlaybackDevice>, CaptureError>;

    /// Raise the calling thread to real-time audio priority, if the platform can.
    fn promote_audio_thread(&self) -> Result<(), CaptureError> {
        Err(CaptureError::Unknown("thread promotion not supported".into()))
    }
}
