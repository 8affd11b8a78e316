//! WASAPI microphone capture handle.
//!
//! Opens the default capture endpoint in shared mode and exposes it as a
//! blocking byte reader for the session read loop.

use std::collections::VecDeque;
use std::thread;
use std::time::Duration;

use windows::Win32::Media::Audio::*;

use pcm_recorder_core::{AudioFormat, CaptureDevice, CaptureError, HandleState, RecordingState};

use crate::client;
use crate::com::{self, CallContext, WasapiError};
use crate::device_enumerator::Direction;

/// How long `read` waits for the engine before polling again.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// WASAPI microphone capture handle.
pub struct WasapiCaptureDevice {
    client: Option<IAudioClient>,
    capture: Option<IAudioCaptureClient>,
    device_name: String,
    frame_bytes: usize,
    recording: bool,
    pending: VecDeque<u8>,
}

// SAFETY: the interfaces belong to the multithreaded apartment; every thread
// touching them joins the MTA first (`com::ensure_mta`), and the capture loop
// is the only user once recording starts.
unsafe impl Send for WasapiCaptureDevice {}

impl WasapiCaptureDevice {
    pub fn open(format: &AudioFormat, buffer_bytes: usize) -> Result<Self, WasapiError> {
        let opened = client::open_client(Direction::Capture, format, buffer_bytes)?;
        let capture: IAudioCaptureClient =
            unsafe { opened.client.GetService() }.call("IAudioClient::GetService")?;

        Ok(Self {
            client: Some(opened.client),
            capture: Some(capture),
            device_name: opened.device_name,
            frame_bytes: format.frame_bytes(),
            recording: false,
            pending: VecDeque::with_capacity(buffer_bytes * 2),
        })
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Move every packet the engine has ready into `pending`.
    fn drain_packets(&mut self) -> Result<(), WasapiError> {
        let capture = self
            .capture
            .as_ref()
            .ok_or(WasapiError::NoEndpoint("capture"))?;

        unsafe {
            let mut packet_length = capture
                .GetNextPacketSize()
                .call("IAudioCaptureClient::GetNextPacketSize")?;

            while packet_length > 0 {
                let mut buffer_ptr: *mut u8 = std::ptr::null_mut();
                let mut num_frames: u32 = 0;
                let mut flags: u32 = 0;

                capture
                    .GetBuffer(&mut buffer_ptr, &mut num_frames, &mut flags, None, None)
                    .call("IAudioCaptureClient::GetBuffer")?;

                let bytes = num_frames as usize * self.frame_bytes;
                if bytes > 0 {
                    if flags & (AUDCLNT_BUFFERFLAGS_SILENT.0 as u32) != 0 || buffer_ptr.is_null() {
                        self.pending.extend(std::iter::repeat(0u8).take(bytes));
                    } else {
                        self.pending
                            .extend(std::slice::from_raw_parts(buffer_ptr, bytes).iter().copied());
                    }
                }

                capture
                    .ReleaseBuffer(num_frames)
                    .call("IAudioCaptureClient::ReleaseBuffer")?;

                packet_length = capture
                    .GetNextPacketSize()
                    .call("IAudioCaptureClient::GetNextPacketSize")?;
            }
        }
        Ok(())
    }
}

impl CaptureDevice for WasapiCaptureDevice {
    fn state(&self) -> HandleState {
        if self.client.is_some() && self.capture.is_some() {
            HandleState::Initialized
        } else {
            HandleState::Uninitialized
        }
    }

    fn recording_state(&self) -> RecordingState {
        if self.recording {
            RecordingState::Recording
        } else {
            RecordingState::Stopped
        }
    }

    fn start_recording(&mut self) -> Result<(), CaptureError> {
        let client = self.client.as_ref().ok_or(CaptureError::HandleUninitialized)?;
        unsafe { client.Start() }.call("IAudioClient::Start")?;
        self.recording = true;
        log::info!("Recording from {}", self.device_name);
        Ok(())
    }

    fn stop_recording(&mut self) -> Result<(), CaptureError> {
        if !self.recording {
            return Ok(());
        }
        self.recording = false;
        if let Some(client) = self.client.as_ref() {
            unsafe { client.Stop() }.call("IAudioClient::Stop")?;
        }
        Ok(())
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<usize, CaptureError> {
        com::ensure_mta()?;

        if self.pending.len() < buffer.len() && self.recording {
            thread::sleep(POLL_INTERVAL);
            self.drain_packets()?;
        }

        let n = self.pending.len().min(buffer.len());
        for (dst, src) in buffer[..n].iter_mut().zip(self.pending.drain(..n)) {
            *dst = src;
        }
        Ok(n)
    }

    fn release(mut self: Box<Self>) {
        if let Err(e) = self.stop_recording() {
            log::warn!("Failed to stop {} on release: {}", self.device_name, e);
        }
        self.capture = None;
        self.client = None;
        self.pending.clear();
        log::debug!("Released capture device {}", self.device_name);
    }
}
