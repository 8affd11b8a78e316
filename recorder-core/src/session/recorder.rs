use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::models::config::RecorderConfig;
use crate::models::error::CaptureError;
use crate::models::parameters::AudioParameters;
use crate::models::state::CaptureState;
use crate::session::capture::{CaptureCleanup, CaptureOptions, CaptureSession};
use crate::session::playback::{PlaybackHandle, PlaybackSession, PlaybackSource};
use crate::session::registry::{ActiveSession, SessionId, SessionRegistry};
use crate::storage::metadata;
use crate::traits::backend::AudioBackend;
use crate::traits::capture_device::{HandleState, RecordingState};
use crate::traits::listener::CaptureListener;
use crate::traits::notifier::{LogNotifier, Notifier};

/// Capture/playback session manager.
///
/// Owns the backend and the fixed `AudioParameters`, which are resolved once
/// in `new`. Capture sessions go through a `SessionRegistry` so at most one
/// runs at a time; by default that is the process-wide registry.
///
/// ```text
/// start() ─ preflight (params, permission, handle) ─ on_start() ─┐
///                                                                ▼
///            [pcm-capture-N thread] read → on_data_read → ... → release → on_stop / on_error
/// ```
pub struct Recorder<B: AudioBackend + 'static> {
    backend: Arc<B>,
    config: RecorderConfig,
    parameters: Result<AudioParameters, CaptureError>,
    registry: Arc<SessionRegistry>,
    notifier: Arc<dyn Notifier>,
    /// The last session this recorder started, kept after it leaves the registry.
    last_session: Mutex<Option<ActiveSession>>,
}

impl<B: AudioBackend + 'static> Recorder<B> {
    pub fn new(backend: B, config: RecorderConfig) -> Self {
        let backend = Arc::new(backend);
        let parameters = config
            .validate()
            .and_then(|_| AudioParameters::resolve(backend.as_ref(), config.format));
        if let Err(ref e) = parameters {
            log::error!("Audio parameters unavailable, capture disabled: {}", e);
        }
        Self {
            backend,
            config,
            parameters,
            registry: SessionRegistry::global(),
            notifier: Arc::new(LogNotifier),
            last_session: Mutex::new(None),
        }
    }

    /// Use a private registry instead of the process-wide one.
    pub fn with_registry(mut self, registry: Arc<SessionRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    pub fn parameters(&self) -> Result<&AudioParameters, CaptureError> {
        self.parameters.as_ref().map_err(Clone::clone)
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Start a capture session.
    ///
    /// Returns once recording is engaged and the read loop is running. Every
    /// `Err` is a precondition failure: no loop was launched, no callback
    /// other than `on_error(PermissionDenied)` fired, and any handle that was
    /// allocated has already been released.
    pub fn start(
        &self,
        options: CaptureOptions,
        listener: Arc<dyn CaptureListener>,
    ) -> Result<SessionId, CaptureError> {
        let params = match &self.parameters {
            Ok(p) => *p,
            Err(e) => {
                self.notifier.notify("Unable to determine the minimum capture buffer size");
                return Err(e.clone());
            }
        };

        let hint = options.frame_size.or(self.config.frame_size_hint);
        let buffer_bytes = params.effective_buffer_bytes(hint);

        if !self.backend.has_record_permission() {
            let err = CaptureError::PermissionDenied;
            listener.on_error(&err);
            return Err(err);
        }

        let device = self
            .backend
            .open_capture(&params.format, buffer_bytes)
            .inspect_err(|e| self.notifier.notify(&format!("Unable to open the microphone: {}", e)))?;
        let mut cleanup = CaptureCleanup::new(device);

        {
            let device = cleanup.device()?;
            if device.state() == HandleState::Uninitialized {
                self.notifier.notify("The microphone is not initialized");
                return Err(CaptureError::HandleUninitialized);
            }
            if device.recording_state() == RecordingState::Recording {
                self.notifier.notify("The microphone is already recording");
                return Err(CaptureError::HandleBusy);
            }
        }

        let session = ActiveSession::new();
        if let Err(e) = self.registry.install(session.clone()) {
            self.notifier.notify("The microphone is already recording");
            return Err(e);
        }
        cleanup.own_slot(Arc::clone(&self.registry), session.id());

        if !listener.on_start() {
            log::info!("Capture session {} declined by listener", session.id());
            return Err(CaptureError::StartRejected);
        }

        cleanup.device()?.start_recording()?;
        session.mark_recording();

        let id = session.id();
        CaptureSession::new(session.clone(), listener, buffer_bytes).spawn(cleanup)?;
        *self.last_session.lock() = Some(session);
        log::info!("Capture session {} started", id);
        Ok(id)
    }

    /// Ask the active capture session to stop. No-op when nothing is recording.
    ///
    /// Returns before the handle is released; wait for the terminal callback
    /// (or use `stop_and_wait`) when the microphone must be free again.
    pub fn stop(&self) {
        if let Some(id) = self.registry.stop_active() {
            log::info!("Stop requested for capture session {}", id);
        }
    }

    /// `stop`, then wait up to `timeout` for the session to release its handle.
    pub fn stop_and_wait(&self, timeout: Duration) -> bool {
        self.stop();
        self.registry.wait_until_clear(timeout)
    }

    /// State of the active capture session.
    ///
    /// Once the slot is empty this is the final state of the last session
    /// this recorder started (`Stopped` or `Errored`), or `Idle` if it never
    /// started one.
    pub fn state(&self) -> CaptureState {
        self.registry
            .active()
            .or_else(|| self.last_session.lock().clone())
            .map_or(CaptureState::Idle, |session| session.state())
    }

    pub fn is_recording(&self) -> bool {
        self.state().is_recording()
    }

    /// Stream a raw PCM source to the output device on its own thread.
    pub fn play(&self, source: PlaybackSource) -> Result<PlaybackHandle, CaptureError> {
        let params = self.parameters()?;
        PlaybackSession::new(
            Arc::clone(&self.backend),
            *params,
            self.config.elevate_playback_priority,
        )
        .spawn(source)
    }

    /// Play a recording from disk.
    ///
    /// When the recording has a metadata sidecar, its format must match the
    /// recorder's; headerless PCM cannot be decoded any other way.
    pub fn play_file(&self, path: impl AsRef<Path>) -> Result<PlaybackHandle, CaptureError> {
        let path = path.as_ref();
        let params = self.parameters()?;
        if let Some(meta) = metadata::read_metadata_if_present(path)? {
            if meta.format != params.format {
                return Err(CaptureError::UnsupportedConfiguration(format!(
                    "{} was recorded as {:?}, recorder plays {:?}",
                    path.display(),
                    meta.format,
                    params.format
                )));
            }
        }
        self.play(PlaybackSource::File(path.to_path_buf()))
    }
}

impl<B: AudioBackend + 'static> Drop for Recorder<B> {
    fn drop(&mut self) {
        self.stop();
    }
}
