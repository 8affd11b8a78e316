use thiserror::Error;

/// Errors that can occur during capture and playback.
///
/// Precondition failures (`UnsupportedConfiguration`, `PermissionDenied`,
/// `HandleBusy`, `HandleUninitialized`, `StartRejected`) are returned
/// synchronously from `Recorder::start`. Failures inside a running capture
/// loop (`ReadFailure`, `CallbackFailure`) only ever reach the caller through
/// `CaptureListener::on_error`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("unsupported audio configuration: {0}")]
    UnsupportedConfiguration(String),

    #[error("recording permission not granted")]
    PermissionDenied,

    #[error("audio device is already recording")]
    HandleBusy,

    #[error("audio device is not initialized")]
    HandleUninitialized,

    #[error("listener declined to start recording")]
    StartRejected,

    #[error("read failed: {0}")]
    ReadFailure(String),

    #[error("listener failed: {0}")]
    CallbackFailure(String),

    #[error("playback device was released")]
    PlaybackHandleReleased,

    #[error("device not available")]
    DeviceNotAvailable,

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("unknown error: {0}")]
    Unknown(String),
}

impl CaptureError {
    /// Wraps a device-level failure raised while reading from the capture handle.
    pub(crate) fn into_read_failure(self) -> Self {
        match self {
            Self::ReadFailure(_) => self,
            other => Self::ReadFailure(other.to_string()),
        }
    }

    /// Wraps a failure raised by a listener callback.
    pub(crate) fn into_callback_failure(self) -> Self {
        match self {
            Self::CallbackFailure(_) => self,
            other => Self::CallbackFailure(other.to_string()),
        }
    }
}

impl From<std::io::Error> for CaptureError {
    fn from(e: std::io::Error) -> Self {
        Self::StorageError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_failure_wraps_once() {
        let err = CaptureError::DeviceNotAvailable.into_read_failure();
        assert_eq!(err, CaptureError::ReadFailure("device not available".into()));

        let again = err.clone().into_read_failure();
        assert_eq!(again, err);
    }

    #[test]
    fn callback_failure_keeps_message() {
        let err = CaptureError::StorageError("disk full".into()).into_callback_failure();
        assert_eq!(err.to_string(), "listener failed: storage error: disk full");
    }

    #[test]
    fn io_error_maps_to_storage() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.pcm");
        let err: CaptureError = io.into();
        assert!(matches!(err, CaptureError::StorageError(ref m) if m.contains("missing.pcm")));
    }
}
