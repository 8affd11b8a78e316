use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::models::audio_format::AudioFormat;
use crate::models::error::CaptureError;
use crate::models::recording_result::{RecordingMetadata, RecordingResult};
use crate::storage::metadata;

/// Streaming writer for headerless raw PCM recordings.
///
/// ## File Format
///
/// ```text
/// [interleaved little-endian samples...]
/// ```
///
/// No header and no framing: the format lives in the `.metadata.json`
/// sidecar written by `close`. A SHA-256 of the data is computed while
/// writing.
pub struct PcmFileWriter {
    file_path: PathBuf,
    format: AudioFormat,
    file: Option<BufWriter<File>>,
    hasher: Sha256,
    total_bytes_written: u64,
}

impl PcmFileWriter {
    pub fn new(file_path: PathBuf, format: AudioFormat) -> Self {
        Self {
            file_path,
            format,
            file: None,
            hasher: Sha256::new(),
            total_bytes_written: 0,
        }
    }

    /// Writer for a fresh `recording_<uuid>.pcm` inside `directory`.
    pub fn create_in(directory: &Path, format: AudioFormat) -> Self {
        let file_name = format!("recording_{}.pcm", uuid::Uuid::new_v4());
        Self::new(directory.join(file_name), format)
    }

    pub fn open(&mut self) -> Result<(), CaptureError> {
        if self.file.is_some() {
            return Ok(());
        }

        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| CaptureError::StorageError(format!("failed to create directory: {}", e)))?;
        }

        let file = File::create(&self.file_path)
            .map_err(|e| CaptureError::StorageError(format!("failed to create file: {}", e)))?;
        self.file = Some(BufWriter::new(file));
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    pub fn write(&mut self, data: &[u8]) -> Result<(), CaptureError> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| CaptureError::StorageError("file is not open for writing".into()))?;
        file.write_all(data)
            .map_err(|e| CaptureError::StorageError(format!("write failed: {}", e)))?;
        self.hasher.update(data);
        self.total_bytes_written += data.len() as u64;
        Ok(())
    }

    /// Flush, close, write the metadata sidecar, and describe the recording.
    pub fn close(&mut self) -> Result<RecordingResult, CaptureError> {
        let mut file = self
            .file
            .take()
            .ok_or_else(|| CaptureError::StorageError("file is not open".into()))?;
        file.flush()
            .map_err(|e| CaptureError::StorageError(format!("flush failed: {}", e)))?;
        drop(file);

        let checksum = hex_encode(&std::mem::take(&mut self.hasher).finalize());
        let meta = RecordingMetadata::new(
            &self.file_path.to_string_lossy(),
            self.format,
            self.total_bytes_written,
            &checksum,
        );
        metadata::write_metadata(&meta, &self.file_path)?;

        Ok(RecordingResult {
            file_path: self.file_path.clone(),
            bytes_written: self.total_bytes_written,
            duration_secs: meta.duration_secs,
            metadata: meta,
            checksum,
        })
    }

    pub fn bytes_written(&self) -> u64 {
        self.total_bytes_written
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
