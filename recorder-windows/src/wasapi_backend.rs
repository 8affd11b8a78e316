//! `AudioBackend` implementation on top of WASAPI.

use std::collections::HashMap;

use parking_lot::Mutex;
use windows::core::w;
use windows::Win32::Media::Audio::*;
use windows::Win32::System::Com::*;
use windows::Win32::System::Threading::AvSetMmThreadCharacteristicsW;

use pcm_recorder_core::{
    AudioBackend, AudioFormat, CaptureDevice, CaptureError, PlaybackDevice,
};

use crate::com::{CallContext, WasapiError};
use crate::device_enumerator::{DeviceEnumerator, Direction};
use crate::permissions;
use crate::wasapi_capture::WasapiCaptureDevice;
use crate::wasapi_render::WasapiRenderDevice;

/// Windows audio backend.
///
/// Minimum buffer sizes are derived from the default capture endpoint's
/// device period and cached per format.
#[derive(Default)]
pub struct WasapiBackend {
    min_buffers: Mutex<HashMap<AudioFormat, Option<usize>>>,
}

impl WasapiBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any microphone is plugged in and active.
    pub fn has_capture_device(&self) -> bool {
        DeviceEnumerator::new()
            .map(|e| e.has_capture_device())
            .unwrap_or(false)
    }

    fn query_min_buffer(format: &AudioFormat) -> Result<usize, WasapiError> {
        let enumerator = DeviceEnumerator::new()?;
        let device = enumerator.default_endpoint(Direction::Capture)?;
        let client: IAudioClient =
            unsafe { device.Activate(CLSCTX_ALL, None) }.call("IMMDevice::Activate")?;

        let mut default_period: i64 = 0;
        unsafe { client.GetDevicePeriod(Some(&mut default_period), None) }
            .call("IAudioClient::GetDevicePeriod")?;

        // Two device periods, as whole frames.
        let frames = (default_period as u64 * 2 * format.sample_rate_hz as u64).div_ceil(10_000_000);
        let bytes = frames as usize * format.frame_bytes();
        if bytes == 0 {
            return Err(WasapiError::UnsupportedFormat(format!(
                "device period {} gives no frames at {} Hz",
                default_period, format.sample_rate_hz
            )));
        }
        Ok(bytes)
    }
}

impl AudioBackend for WasapiBackend {
    fn min_buffer_size(&self, format: &AudioFormat) -> Option<usize> {
        let mut cache = self.min_buffers.lock();
        *cache.entry(*format).or_insert_with(|| match Self::query_min_buffer(format) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                log::warn!("No minimum buffer size for {:?}: {}", format, e);
                None
            }
        })
    }

    fn has_record_permission(&self) -> bool {
        permissions::check_microphone_permission()
    }

    fn open_capture(
        &self,
        format: &AudioFormat,
        buffer_bytes: usize,
    ) -> Result<Box<dyn CaptureDevice>, CaptureError> {
        let device = WasapiCaptureDevice::open(format, buffer_bytes)?;
        Ok(Box::new(device))
    }

    fn open_playback(
        &self,
        format: &AudioFormat,
        buffer_bytes: usize,
    ) -> Result<Box<dyn PlaybackDevice>, CaptureError> {
        let device = WasapiRenderDevice::open(format, buffer_bytes)?;
        Ok(Box::new(device))
    }

    fn promote_audio_thread(&self) -> Result<(), CaptureError> {
        let mut task_index: u32 = 0;
        // The MMCSS registration lives until the thread exits.
        unsafe { AvSetMmThreadCharacteristicsW(w!("Pro Audio"), &mut task_index) }
            .call("AvSetMmThreadCharacteristicsW")?;
        Ok(())
    }
}
