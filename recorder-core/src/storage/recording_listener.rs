use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::error::CaptureError;
use crate::models::recording_result::RecordingResult;
use crate::storage::pcm_writer::PcmFileWriter;
use crate::traits::listener::CaptureListener;

/// `CaptureListener` that records a session to a raw PCM file.
///
/// The file is opened in `on_start`; if that fails the session is declined.
/// It is finalized on either terminal callback, so a failed session still
/// leaves a playable partial recording behind.
pub struct RecordingListener {
    writer: Mutex<PcmFileWriter>,
    outcome: Mutex<Option<Result<RecordingResult, CaptureError>>>,
}

impl RecordingListener {
    pub fn new(writer: PcmFileWriter) -> Arc<Self> {
        Arc::new(Self {
            writer: Mutex::new(writer),
            outcome: Mutex::new(None),
        })
    }

    /// The finalized recording once the session has ended; `Err` holds the
    /// capture failure (or a storage failure while finalizing).
    pub fn take_outcome(&self) -> Option<Result<RecordingResult, CaptureError>> {
        self.outcome.lock().take()
    }

    fn finish(&self, cause: Option<&CaptureError>) {
        let closed = {
            let mut writer = self.writer.lock();
            if !writer.is_open() {
                return;
            }
            writer.close()
        };
        if let Err(ref e) = closed {
            log::error!("Failed to finalize recording: {}", e);
        }
        let outcome = match cause {
            Some(e) => Err(e.clone()),
            None => closed,
        };
        *self.outcome.lock() = Some(outcome);
    }
}

impl CaptureListener for RecordingListener {
    fn on_start(&self) -> bool {
        let mut writer = self.writer.lock();
        match writer.open() {
            Ok(()) => {
                log::info!("Recording to {}", writer.file_path().display());
                true
            }
            Err(e) => {
                log::error!("Cannot record to {}: {}", writer.file_path().display(), e);
                false
            }
        }
    }

    fn on_data_read(&self, data: &[u8]) -> Result<(), CaptureError> {
        self.writer.lock().write(data)
    }

    fn on_stop(&self) {
        self.finish(None);
    }

    fn on_error(&self, error: &CaptureError) {
        self.finish(Some(error));
    }
}
