use serde::{Deserialize, Serialize};

/// Channel layout of interleaved PCM frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelLayout {
    Mono,
    Stereo,
}

impl ChannelLayout {
    pub fn channel_count(&self) -> u16 {
        match self {
            Self::Mono => 1,
            Self::Stereo => 2,
        }
    }
}

/// Sample encoding of raw PCM data (always little-endian).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleEncoding {
    Pcm8,
    Pcm16,
    PcmFloat,
}

impl SampleEncoding {
    pub fn bytes_per_sample(&self) -> usize {
        match self {
            Self::Pcm8 => 1,
            Self::Pcm16 => 2,
            Self::PcmFloat => 4,
        }
    }

    pub fn bits_per_sample(&self) -> u16 {
        self.bytes_per_sample() as u16 * 8
    }
}

/// The (sample rate, channel layout, encoding) triple that describes a raw
/// PCM byte stream.
///
/// Recorded files carry no header, so a stream can only be decoded with
/// the same `AudioFormat` it was captured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AudioFormat {
    pub sample_rate_hz: u32,
    pub channel_layout: ChannelLayout,
    pub sample_encoding: SampleEncoding,
}

impl AudioFormat {
    /// 44.1 kHz, stereo, 16-bit linear PCM.
    pub const CD_QUALITY: AudioFormat = AudioFormat {
        sample_rate_hz: 44_100,
        channel_layout: ChannelLayout::Stereo,
        sample_encoding: SampleEncoding::Pcm16,
    };

    pub fn channels(&self) -> u16 {
        self.channel_layout.channel_count()
    }

    /// Bytes per interleaved frame (one sample for every channel).
    pub fn frame_bytes(&self) -> usize {
        self.channels() as usize * self.sample_encoding.bytes_per_sample()
    }

    pub fn byte_rate(&self) -> u64 {
        self.sample_rate_hz as u64 * self.frame_bytes() as u64
    }

    /// Playing time of `bytes` bytes of this format.
    pub fn duration_secs(&self, bytes: u64) -> f64 {
        let rate = self.byte_rate();
        if rate == 0 {
            return 0.0;
        }
        bytes as f64 / rate as f64
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self::CD_QUALITY
    }
}
