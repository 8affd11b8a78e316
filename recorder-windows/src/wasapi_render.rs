//! WASAPI shared-mode render handle for PCM playback.

use std::thread;
use std::time::{Duration, Instant};

use windows::Win32::Media::Audio::*;

use pcm_recorder_core::{AudioFormat, CaptureError, HandleState, PlaybackDevice};

use crate::client;
use crate::com::{self, CallContext, WasapiError};
use crate::device_enumerator::Direction;

const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Upper bound on waiting for queued frames to play out on `stop`.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// WASAPI render handle on the default output endpoint.
pub struct WasapiRenderDevice {
    client: Option<IAudioClient>,
    render: Option<IAudioRenderClient>,
    device_name: String,
    frame_bytes: usize,
    buffer_frames: u32,
    playing: bool,
    /// Bytes of a frame split across two writes.
    partial: Vec<u8>,
}

// SAFETY: same apartment rules as the capture handle; the playback thread
// joins the MTA before the first write.
unsafe impl Send for WasapiRenderDevice {}

impl WasapiRenderDevice {
    pub fn open(format: &AudioFormat, buffer_bytes: usize) -> Result<Self, WasapiError> {
        let opened = client::open_client(Direction::Render, format, buffer_bytes)?;
        let buffer_frames =
            unsafe { opened.client.GetBufferSize() }.call("IAudioClient::GetBufferSize")?;
        let render: IAudioRenderClient =
            unsafe { opened.client.GetService() }.call("IAudioClient::GetService")?;

        Ok(Self {
            client: Some(opened.client),
            render: Some(render),
            device_name: opened.device_name,
            frame_bytes: format.frame_bytes(),
            buffer_frames,
            playing: false,
            partial: Vec::new(),
        })
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    fn client(&self) -> Result<&IAudioClient, CaptureError> {
        self.client.as_ref().ok_or(CaptureError::PlaybackHandleReleased)
    }

    /// Copy whole frames from `data` into the endpoint buffer. Returns bytes taken.
    fn submit(&self, data: &[u8]) -> Result<usize, WasapiError> {
        let render = self.render.as_ref().ok_or(WasapiError::NoEndpoint("render"))?;
        let frames_wanted = (data.len() / self.frame_bytes) as u32;
        if frames_wanted == 0 {
            return Ok(0);
        }

        let free = loop {
            let free = self.buffer_frames.saturating_sub(self.padding()?);
            if free > 0 {
                break free;
            }
            thread::sleep(POLL_INTERVAL);
        };

        let frames = frames_wanted.min(free);
        let bytes = frames as usize * self.frame_bytes;
        unsafe {
            let dst = render.GetBuffer(frames).call("IAudioRenderClient::GetBuffer")?;
            std::ptr::copy_nonoverlapping(data.as_ptr(), dst, bytes);
            render
                .ReleaseBuffer(frames, 0)
                .call("IAudioRenderClient::ReleaseBuffer")?;
        }
        Ok(bytes)
    }

    fn padding(&self) -> Result<u32, WasapiError> {
        match self.client.as_ref() {
            Some(client) => {
                unsafe { client.GetCurrentPadding() }.call("IAudioClient::GetCurrentPadding")
            }
            None => Ok(0),
        }
    }
}

impl PlaybackDevice for WasapiRenderDevice {
    fn state(&self) -> HandleState {
        if self.client.is_some() && self.render.is_some() {
            HandleState::Initialized
        } else {
            HandleState::Uninitialized
        }
    }

    fn play(&mut self) -> Result<(), CaptureError> {
        com::ensure_mta()?;
        let client = self.client()?;
        unsafe { client.Start() }.call("IAudioClient::Start")?;
        self.playing = true;
        log::debug!("Playing to {}", self.device_name);
        Ok(())
    }

    /// Accepts whole frames up to the free space in the endpoint buffer,
    /// waiting for room when it is full. A trailing partial frame is held
    /// back and completed by the next write.
    fn write(&mut self, data: &[u8]) -> Result<usize, CaptureError> {
        com::ensure_mta()?;
        if self.render.is_none() {
            return Err(CaptureError::PlaybackHandleReleased);
        }

        if !self.partial.is_empty() || data.len() < self.frame_bytes {
            let take = (self.frame_bytes - self.partial.len()).min(data.len());
            self.partial.extend_from_slice(&data[..take]);
            if self.partial.len() == self.frame_bytes {
                let frame = std::mem::take(&mut self.partial);
                self.submit(&frame)?;
            }
            return Ok(take);
        }

        Ok(self.submit(data)?)
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        if !self.playing {
            return Ok(());
        }
        self.playing = false;
        self.partial.clear();

        let deadline = Instant::now() + DRAIN_TIMEOUT;
        while self.padding()? > 0 && Instant::now() < deadline {
            thread::sleep(POLL_INTERVAL);
        }

        let client = self.client()?;
        unsafe { client.Stop() }.call("IAudioClient::Stop")?;
        Ok(())
    }

    fn release(mut self: Box<Self>) {
        if let Err(e) = self.stop() {
            log::warn!("Failed to stop {} on release: {}", self.device_name, e);
        }
        self.render = None;
        self.client = None;
        log::debug!("Released playback device {}", self.device_name);
    }
}
