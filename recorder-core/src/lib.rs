//! # pcm-recorder-core
//!
//! Platform-agnostic microphone capture and raw PCM playback.
//!
//! Owns the hardware handles, runs the blocking read/write loops on
//! dedicated threads, and reports to the caller through a listener. Platform
//! backends (Windows WASAPI, the in-memory mock) implement `AudioBackend`
//! and plug into the generic `Recorder`.
//!
//! ## Architecture
//!
//! ```text
//! pcm-recorder-core (this crate)
//! ├── traits/   ← AudioBackend, CaptureDevice, PlaybackDevice, CaptureListener, Notifier
//! ├── models/   ← AudioFormat, AudioParameters, RecorderConfig, CaptureState, CaptureError, CaptureEvent
//! ├── session/  ← Recorder, SessionRegistry, capture read loop, playback loop
//! ├── storage/  ← PcmFileWriter, RecordingListener, metadata sidecar
//! └── mock      ← MockBackend for tests
//! ```
//!
//! ## Usage
//! ```ignore
//! use pcm_recorder_core::{CaptureOptions, PcmFileWriter, Recorder, RecorderConfig, RecordingListener};
//!
//! let recorder = Recorder::new(backend, RecorderConfig::default());
//! let writer = PcmFileWriter::create_in(&recorder.config().output_directory, recorder.config().format);
//! let listener = RecordingListener::new(writer);
//! recorder.start(CaptureOptions::default(), listener.clone())?;
//! // ...
//! recorder.stop_and_wait(std::time::Duration::from_secs(1));
//! ```

pub mod mock;
pub mod models;
pub mod session;
pub mod storage;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::audio_format::{AudioFormat, ChannelLayout, SampleEncoding};
pub use models::config::RecorderConfig;
pub use models::error::CaptureError;
pub use models::event::CaptureEvent;
pub use models::parameters::AudioParameters;
pub use models::recording_result::{RecordingMetadata, RecordingResult};
pub use models::state::CaptureState;
pub use session::capture::CaptureOptions;
pub use session::playback::{PlaybackHandle, PlaybackReport, PlaybackSource};
pub use session::recorder::Recorder;
pub use session::registry::{ActiveSession, SessionId, SessionRegistry};
pub use storage::pcm_writer::PcmFileWriter;
pub use storage::recording_listener::RecordingListener;
pub use traits::backend::AudioBackend;
pub use traits::capture_device::{CaptureDevice, HandleState, RecordingState};
pub use traits::listener::{CaptureListener, EventCallback, EventListener};
pub use traits::notifier::{LogNotifier, Notifier};
pub use traits::playback_device::PlaybackDevice;
