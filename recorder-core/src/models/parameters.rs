use crate::models::audio_format::AudioFormat;
use crate::models::error::CaptureError;
use crate::traits::backend::AudioBackend;

/// Fixed capture/playback geometry plus the platform's minimum buffer size
/// for it.
///
/// Resolved once, before any session starts. A platform that cannot report a
/// minimum buffer for the format makes the whole configuration unusable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioParameters {
    pub format: AudioFormat,
    min_buffer_bytes: usize,
}

impl AudioParameters {
    /// Query the backend for the minimum buffer size of `format`.
    pub fn resolve<B: AudioBackend + ?Sized>(
        backend: &B,
        format: AudioFormat,
    ) -> Result<Self, CaptureError> {
        match backend.min_buffer_size(&format) {
            Some(bytes) if bytes > 0 => {
                log::debug!(
                    "Minimum buffer for {} Hz / {:?} / {:?}: {} bytes",
                    format.sample_rate_hz,
                    format.channel_layout,
                    format.sample_encoding,
                    bytes
                );
                Ok(Self {
                    format,
                    min_buffer_bytes: bytes,
                })
            }
            _ => Err(CaptureError::UnsupportedConfiguration(format!(
                "no minimum buffer size for {} Hz {:?} {:?}",
                format.sample_rate_hz, format.channel_layout, format.sample_encoding
            ))),
        }
    }

    pub fn min_buffer_bytes(&self) -> usize {
        self.min_buffer_bytes
    }

    /// `max(hint, min_buffer_bytes)`; a missing or zero hint means "use the minimum".
    pub fn effective_buffer_bytes(&self, hint: Option<usize>) -> usize {
        hint.unwrap_or(0).max(self.min_buffer_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockBackend;

    #[test]
    fn resolves_platform_minimum() {
        let backend = MockBackend::new().with_min_buffer(Some(3528));
        let params = AudioParameters::resolve(&backend, AudioFormat::CD_QUALITY).unwrap();
        assert_eq!(params.min_buffer_bytes(), 3528);
        assert_eq!(params.format, AudioFormat::CD_QUALITY);
    }

    #[test]
    fn platform_error_is_unsupported() {
        let backend = MockBackend::new().with_min_buffer(None);
        let err = AudioParameters::resolve(&backend, AudioFormat::CD_QUALITY).unwrap_err();
        assert!(matches!(err, CaptureError::UnsupportedConfiguration(_)));
    }

    #[test]
    fn zero_minimum_is_unsupported() {
        let backend = MockBackend::new().with_min_buffer(Some(0));
        assert!(AudioParameters::resolve(&backend, AudioFormat::CD_QUALITY).is_err());
    }

    #[test]
    fn effective_buffer_never_below_minimum() {
        let backend = MockBackend::new().with_min_buffer(Some(4096));
        let params = AudioParameters::resolve(&backend, AudioFormat::CD_QUALITY).unwrap();

        assert_eq!(params.effective_buffer_bytes(None), 4096);
        assert_eq!(params.effective_buffer_bytes(Some(0)), 4096);
        assert_eq!(params.effective_buffer_bytes(Some(1024)), 4096);
        assert_eq!(params.effective_buffer_bytes(Some(8192)), 8192);
    }
}
