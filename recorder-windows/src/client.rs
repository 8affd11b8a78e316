//! Shared-mode `IAudioClient` setup for both directions.

use windows::Win32::Media::Audio::*;
use windows::Win32::System::Com::*;

use pcm_recorder_core::{AudioFormat, SampleEncoding};

use crate::com::{CallContext, WasapiError};
use crate::device_enumerator::{DeviceEnumerator, Direction};

const WAVE_FORMAT_PCM_TAG: u16 = 1;
const WAVE_FORMAT_IEEE_FLOAT_TAG: u16 = 3;

/// Shortest shared-mode buffer we ask the engine for, in 100 ns units (100 ms).
const MIN_BUFFER_DURATION: i64 = 1_000_000;

/// An initialized (not started) audio client on a default endpoint.
pub(crate) struct OpenedClient {
    pub client: IAudioClient,
    pub device_name: String,
}

pub(crate) fn wave_format(format: &AudioFormat) -> WAVEFORMATEX {
    let block_align = format.frame_bytes() as u16;
    WAVEFORMATEX {
        wFormatTag: match format.sample_encoding {
            SampleEncoding::PcmFloat => WAVE_FORMAT_IEEE_FLOAT_TAG,
            SampleEncoding::Pcm8 | SampleEncoding::Pcm16 => WAVE_FORMAT_PCM_TAG,
        },
        nChannels: format.channels(),
        nSamplesPerSec: format.sample_rate_hz,
        nAvgBytesPerSec: format.byte_rate() as u32,
        nBlockAlign: block_align,
        wBitsPerSample: format.sample_encoding.bits_per_sample(),
        cbSize: 0,
    }
}

/// Buffer duration covering `buffer_bytes` of `format`, in 100 ns units.
pub(crate) fn buffer_duration(format: &AudioFormat, buffer_bytes: usize) -> i64 {
    let rate = format.byte_rate().max(1);
    let hns = (buffer_bytes as u64).saturating_mul(10_000_000) / rate;
    (hns as i64).max(MIN_BUFFER_DURATION)
}

/// Activate and initialize a shared-mode client on the default endpoint.
///
/// The engine converts to and from its mix format, so any PCM format we
/// describe is accepted.
pub(crate) fn open_client(
    direction: Direction,
    format: &AudioFormat,
    buffer_bytes: usize,
) -> Result<OpenedClient, WasapiError> {
    let enumerator = DeviceEnumerator::new()?;
    let device = enumerator.default_endpoint(direction)?;
    let device_name =
        DeviceEnumerator::friendly_name(&device).unwrap_or_else(|| format!("default {:?} endpoint", direction));

    let client: IAudioClient =
        unsafe { device.Activate(CLSCTX_ALL, None) }.call("IMMDevice::Activate")?;

    let wfx = wave_format(format);
    unsafe {
        client.Initialize(
            AUDCLNT_SHAREMODE_SHARED,
            AUDCLNT_STREAMFLAGS_AUTOCONVERTPCM | AUDCLNT_STREAMFLAGS_SRC_DEFAULT_QUALITY,
            buffer_duration(format, buffer_bytes),
            0,
            &wfx,
            None,
        )
    }
    .call("IAudioClient::Initialize")?;

    log::debug!(
        "Opened {:?} client on {} ({} Hz, {} ch, {} bit)",
        direction,
        device_name,
        wfx.nSamplesPerSec,
        wfx.nChannels,
        wfx.wBitsPerSample
    );

    Ok(OpenedClient { client, device_name })
}
