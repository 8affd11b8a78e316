use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::models::error::CaptureError;
use crate::models::recording_result::RecordingMetadata;

/// Path of the JSON sidecar for a recording: `take.pcm` → `take.metadata.json`.
pub fn metadata_path(recording_path: &Path) -> PathBuf {
    recording_path.with_extension("metadata.json")
}

/// Write recording metadata as a JSON sidecar file.
pub fn write_metadata(metadata: &RecordingMetadata, recording_path: &Path) -> Result<(), CaptureError> {
    let json = serde_json::to_string_pretty(metadata)
        .map_err(|e| CaptureError::StorageError(format!("failed to serialize metadata: {}", e)))?;
    fs::write(metadata_path(recording_path), json)
        .map_err(|e| CaptureError::StorageError(format!("failed to write metadata: {}", e)))?;
    Ok(())
}

/// Read recording metadata from its JSON sidecar file.
pub fn read_metadata(recording_path: &Path) -> Result<RecordingMetadata, CaptureError> {
    read_metadata_if_present(recording_path)?
        .ok_or_else(|| CaptureError::StorageError("metadata sidecar not found".into()))
}

/// Like `read_metadata`, but a missing sidecar is `Ok(None)`.
pub fn read_metadata_if_present(recording_path: &Path) -> Result<Option<RecordingMetadata>, CaptureError> {
    let json = match fs::read_to_string(metadata_path(recording_path)) {
        Ok(json) => json,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(CaptureError::StorageError(format!("failed to read metadata: {}", e)))
        }
    };
    let metadata = serde_json::from_str(&json)
        .map_err(|e| CaptureError::StorageError(format!("failed to parse metadata: {}", e)))?;
    Ok(Some(metadata))
}
