use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::audio_format::AudioFormat;

/// Result returned when a raw PCM recording is finalized.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingResult {
    pub file_path: PathBuf,
    pub bytes_written: u64,
    pub duration_secs: f64,
    pub metadata: RecordingMetadata,
    pub checksum: String,
}

/// Sidecar metadata for a headerless recording.
///
/// The PCM file itself has no header, so this is the only record of the
/// format needed to play it back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    pub id: String,
    pub file_path: String,
    pub format: AudioFormat,
    pub bytes: u64,
    pub duration_secs: f64,
    pub checksum: String,
    pub created_at: String,
}

impl RecordingMetadata {
    pub fn new(file_path: &str, format: AudioFormat, bytes: u64, checksum: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            file_path: file_path.to_string(),
            format,
            bytes,
            duration_secs: format.duration_secs(bytes),
            checksum: checksum.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}
