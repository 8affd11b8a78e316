use std::path::PathBuf;

use serde::Deserialize;

use super::audio_format::AudioFormat;
use super::error::CaptureError;

/// Configuration for a `Recorder`.
///
/// Every field has a default, so a host can deserialize a partial JSON
/// object and get the stock 44.1 kHz stereo 16-bit setup for the rest.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Fixed format for both capture and playback (default: 44100 Hz, stereo, PCM 16).
    pub format: AudioFormat,

    /// Preferred capture read size in bytes when `CaptureOptions` gives none.
    /// Never lowers the read size below the platform minimum.
    pub frame_size_hint: Option<usize>,

    /// Directory where `PcmFileWriter::create_in` places new recordings.
    pub output_directory: PathBuf,

    /// Ask the backend for real-time priority on playback threads (default: true).
    pub elevate_playback_priority: bool,
}

impl RecorderConfig {
    pub fn validate(&self) -> Result<(), CaptureError> {
        let rate = self.format.sample_rate_hz;
        if !(4_000..=192_000).contains(&rate) {
            return Err(CaptureError::UnsupportedConfiguration(format!(
                "unsupported sample rate: {} Hz",
                rate
            )));
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self, CaptureError> {
        let config: Self = serde_json::from_str(json).map_err(|e| {
            CaptureError::UnsupportedConfiguration(format!("invalid recorder config: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            format: AudioFormat::CD_QUALITY,
            frame_size_hint: None,
            output_directory: PathBuf::from("."),
            elevate_playback_priority: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::audio_format::{ChannelLayout, SampleEncoding};

    #[test]
    fn default_is_valid() {
        let config = RecorderConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.format.sample_rate_hz, 44_100);
        assert_eq!(config.format.channel_layout, ChannelLayout::Stereo);
        assert_eq!(config.format.sample_encoding, SampleEncoding::Pcm16);
        assert!(config.elevate_playback_priority);
    }

    #[test]
    fn rejects_zero_sample_rate() {
        let mut config = RecorderConfig::default();
        config.format.sample_rate_hz = 0;
        assert!(matches!(
            config.validate(),
            Err(CaptureError::UnsupportedConfiguration(_))
        ));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = RecorderConfig::from_json(r#"{ "frame_size_hint": 8192 }"#).unwrap();
        assert_eq!(config.frame_size_hint, Some(8192));
        assert_eq!(config.format, AudioFormat::CD_QUALITY);
        assert_eq!(config.output_directory, PathBuf::from("."));
    }

    #[test]
    fn json_with_bad_rate_fails_validation() {
        let json = r#"{ "format": { "sample_rate_hz": 1000000, "channel_layout": "mono", "sample_encoding": "pcm16" } }"#;
        assert!(RecorderConfig::from_json(json).is_err());
    }
}
