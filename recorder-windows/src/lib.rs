//! # pcm-recorder-windows
//!
//! Windows WASAPI backend for pcm-recorder.
//!
//! Provides:
//! - `WasapiBackend`: `AudioBackend` over the default endpoints
//! - `WasapiCaptureDevice`: shared-mode microphone capture handle
//! - `WasapiRenderDevice`: shared-mode streaming playback handle
//! - `DeviceEnumerator`: default endpoint lookup via the MMDevice API
//! - `permissions`: Windows microphone privacy check
//!
//! ## Platform Requirements
//! - Windows 10 1803+ for the microphone privacy toggle
//! - Visual Studio Build Tools 2022 + Windows SDK for linking
//!
//! ## Usage
//! ```ignore
//! use pcm_recorder_core::{CaptureOptions, PcmFileWriter, Recorder, RecorderConfig, RecordingListener};
//! use pcm_recorder_windows::WasapiBackend;
//!
//! let recorder = Recorder::new(WasapiBackend::new(), RecorderConfig::default());
//! let config = recorder.config();
//! let listener = RecordingListener::new(PcmFileWriter::create_in(&config.output_directory, config.format));
//! recorder.start(CaptureOptions::default(), listener.clone())?;
//! recorder.stop_and_wait(std::time::Duration::from_secs(1));
//! ```

#[cfg(target_os = "windows")]
mod client;
#[cfg(target_os = "windows")]
pub mod com;
#[cfg(target_os = "windows")]
pub mod device_enumerator;
#[cfg(target_os = "windows")]
pub mod permissions;
#[cfg(target_os = "windows")]
pub mod wasapi_backend;
#[cfg(target_os = "windows")]
pub mod wasapi_capture;
#[cfg(target_os = "windows")]
pub mod wasapi_render;

#[cfg(target_os = "windows")]
pub use com::WasapiError;
#[cfg(target_os = "windows")]
pub use device_enumerator::{DeviceEnumerator, Direction};
#[cfg(target_os = "windows")]
pub use wasapi_backend::WasapiBackend;
#[cfg(target_os = "windows")]
pub use wasapi_capture::WasapiCaptureDevice;
#[cfg(target_os = "windows")]
pub use wasapi_render::WasapiRenderDevice;
