use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use crate::models::error::CaptureError;
use crate::models::state::CaptureState;
use crate::session::registry::{ActiveSession, SessionId, SessionRegistry};
use crate::traits::capture_device::{CaptureDevice, RecordingState};
use crate::traits::listener::CaptureListener;

/// Per-call capture options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureOptions {
    /// Requested read size in bytes. `None` or anything below the platform
    /// minimum means "use the minimum".
    pub frame_size: Option<usize>,
}

impl CaptureOptions {
    pub fn with_frame_size(frame_size: usize) -> Self {
        Self {
            frame_size: Some(frame_size),
        }
    }
}

/// Releases a capture handle, and frees its registry slot, exactly once.
///
/// Runs on drop, so every exit path of `Recorder::start` and of the read loop
/// (normal stop, read error, listener error, panic) ends with the handle
/// released.
pub(crate) struct CaptureCleanup {
    device: Option<Box<dyn CaptureDevice>>,
    slot: Option<(Arc<SessionRegistry>, SessionId)>,
}

impl CaptureCleanup {
    pub(crate) fn new(device: Box<dyn CaptureDevice>) -> Self {
        Self {
            device: Some(device),
            slot: None,
        }
    }

    /// Tie the registry slot for `id` to this cleanup.
    pub(crate) fn own_slot(&mut self, registry: Arc<SessionRegistry>, id: SessionId) {
        self.slot = Some((registry, id));
    }

    pub(crate) fn device(&mut self) -> Result<&mut (dyn CaptureDevice + 'static), CaptureError> {
        self.device
            .as_deref_mut()
            .ok_or(CaptureError::HandleUninitialized)
    }

    pub(crate) fn release(&mut self) {
        if let Some(mut device) = self.device.take() {
            if device.recording_state() == RecordingState::Recording {
                if let Err(e) = device.stop_recording() {
                    log::warn!("Failed to stop capture device before release: {}", e);
                }
            }
            device.release();
        }
        if let Some((registry, id)) = self.slot.take() {
            registry.clear_if(id);
        }
    }
}

impl Drop for CaptureCleanup {
    fn drop(&mut self) {
        self.release();
    }
}

/// One running capture: the read loop and the state it reports through.
pub(crate) struct CaptureSession {
    session: ActiveSession,
    listener: Arc<dyn CaptureListener>,
    buffer_bytes: usize,
}

impl CaptureSession {
    pub(crate) fn new(
        session: ActiveSession,
        listener: Arc<dyn CaptureListener>,
        buffer_bytes: usize,
    ) -> Self {
        Self {
            session,
            listener,
            buffer_bytes,
        }
    }

    /// Spawn the read loop on its own thread. `cleanup` must already own a
    /// device that is recording.
    pub(crate) fn spawn(self, cleanup: CaptureCleanup) -> Result<(), CaptureError> {
        let name = format!("pcm-capture-{}", self.session.id());
        thread::Builder::new()
            .name(name)
            .spawn(move || self.run(cleanup))
            .map(|_| ())
            .map_err(|e| CaptureError::Unknown(format!("failed to spawn capture thread: {}", e)))
    }

    fn run(self, mut cleanup: CaptureCleanup) {
        let id = self.session.id();
        log::info!(
            "Capture session {} reading {} bytes per call",
            id,
            self.buffer_bytes
        );

        let outcome = self.read_loop(&mut cleanup);
        self.session.set_state(match &outcome {
            Ok(()) => CaptureState::Stopped,
            Err(e) => CaptureState::Errored(e.clone()),
        });

        // Release before the terminal callback so a listener that observes
        // on_stop/on_error can start the next session immediately.
        cleanup.release();

        match outcome {
            Ok(()) => {
                log::info!("Capture session {} stopped", id);
                self.listener.on_stop();
            }
            Err(e) => {
                log::error!("Capture session {} failed: {}", id, e);
                self.listener.on_error(&e);
            }
        }
    }

    fn read_loop(&self, cleanup: &mut CaptureCleanup) -> Result<(), CaptureError> {
        let mut buffer = vec![0u8; self.buffer_bytes];
        let device = cleanup.device()?;

        while self.session.is_recording() && device.recording_state() == RecordingState::Recording
        {
            let read = device
                .read(&mut buffer)
                .map_err(CaptureError::into_read_failure)?
                .min(buffer.len());
            log::trace!("Capture session {}: read {} bytes", self.session.id(), read);

            if read > 0 {
                self.deliver(&buffer[..read])?;
            }
        }
        Ok(())
    }

    fn deliver(&self, data: &[u8]) -> Result<(), CaptureError> {
        let listener = &self.listener;
        match panic::catch_unwind(AssertUnwindSafe(|| listener.on_data_read(data))) {
            Ok(result) => result.map_err(CaptureError::into_callback_failure),
            Err(_) => Err(CaptureError::CallbackFailure(
                "listener panicked in on_data_read".into(),
            )),
        }
    }
}
