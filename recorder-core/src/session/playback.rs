use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crate::models::error::CaptureError;
use crate::models::parameters::AudioParameters;
use crate::traits::backend::AudioBackend;
use crate::traits::capture_device::HandleState;
use crate::traits::playback_device::PlaybackDevice;

/// A finite, sequential stream of raw PCM bytes.
pub enum PlaybackSource {
    /// A headerless PCM file, opened on the playback thread.
    File(PathBuf),
    /// Any other byte stream.
    Reader(Box<dyn Read + Send>),
}

impl PlaybackSource {
    fn open(self) -> Result<Box<dyn Read + Send>, CaptureError> {
        match self {
            Self::File(path) => {
                let file = File::open(&path).map_err(|e| {
                    CaptureError::StorageError(format!("failed to open {}: {}", path.display(), e))
                })?;
                Ok(Box::new(file))
            }
            Self::Reader(reader) => Ok(reader),
        }
    }
}

impl From<PathBuf> for PlaybackSource {
    fn from(path: PathBuf) -> Self {
        Self::File(path)
    }
}

/// Totals for a finished playback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackReport {
    pub bytes_written: u64,
    pub chunks_written: u64,
    pub cancelled: bool,
}

/// Handle to a playback thread.
///
/// Dropping the handle detaches the thread; playback then runs to the end of
/// the source and any failure is only logged.
pub struct PlaybackHandle {
    cancel: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<Result<PlaybackReport, CaptureError>>>,
}

impl PlaybackHandle {
    /// Ask the playback thread to stop after its current chunk.
    pub fn stop(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, |t| t.is_finished())
    }

    /// Wait for playback to end and return its outcome.
    pub fn wait(mut self) -> Result<PlaybackReport, CaptureError> {
        match self.thread.take() {
            Some(thread) => thread
                .join()
                .unwrap_or_else(|_| Err(CaptureError::Unknown("playback thread panicked".into()))),
            None => Err(CaptureError::Unknown("playback already joined".into())),
        }
    }
}

/// Stops and releases a playback handle exactly once, on every exit path.
struct PlaybackCleanup {
    device: Option<Box<dyn PlaybackDevice>>,
}

impl PlaybackCleanup {
    fn device(&mut self) -> Result<&mut (dyn PlaybackDevice + 'static), CaptureError> {
        self.device
            .as_deref_mut()
            .ok_or(CaptureError::PlaybackHandleReleased)
    }
}

impl Drop for PlaybackCleanup {
    fn drop(&mut self) {
        if let Some(mut device) = self.device.take() {
            if let Err(e) = device.stop() {
                log::warn!("Failed to stop playback device: {}", e);
            }
            device.release();
        }
    }
}

/// Streams one source to a playback handle on a dedicated thread.
pub(crate) struct PlaybackSession<B: AudioBackend + 'static> {
    backend: Arc<B>,
    params: AudioParameters,
    elevate_priority: bool,
}

impl<B: AudioBackend + 'static> PlaybackSession<B> {
    pub(crate) fn new(backend: Arc<B>, params: AudioParameters, elevate_priority: bool) -> Self {
        Self {
            backend,
            params,
            elevate_priority,
        }
    }

    pub(crate) fn spawn(self, source: PlaybackSource) -> Result<PlaybackHandle, CaptureError> {
        let cancel = Arc::new(AtomicBool::new(false));
        let thread_cancel = Arc::clone(&cancel);

        let thread = thread::Builder::new()
            .name("pcm-playback".into())
            .spawn(move || {
                let result = self.run(source, &thread_cancel);
                match &result {
                    Ok(report) => log::info!(
                        "Playback finished: {} bytes in {} chunks{}",
                        report.bytes_written,
                        report.chunks_written,
                        if report.cancelled { " (cancelled)" } else { "" }
                    ),
                    Err(e) => log::error!("Playback failed: {}", e),
                }
                result
            })
            .map_err(|e| CaptureError::Unknown(format!("failed to spawn playback thread: {}", e)))?;

        Ok(PlaybackHandle {
            cancel,
            thread: Some(thread),
        })
    }

    fn run(&self, source: PlaybackSource, cancel: &AtomicBool) -> Result<PlaybackReport, CaptureError> {
        if self.elevate_priority {
            if let Err(e) = self.backend.promote_audio_thread() {
                log::debug!("Playback thread keeps normal priority: {}", e);
            }
        }

        let buffer_bytes = self.params.min_buffer_bytes();
        let mut cleanup = PlaybackCleanup {
            device: Some(self.backend.open_playback(&self.params.format, buffer_bytes)?),
        };
        let mut reader = BufReader::new(source.open()?);
        let mut buffer = vec![0u8; buffer_bytes];
        let mut report = PlaybackReport::default();
        let mut playing = false;

        loop {
            if cancel.load(Ordering::SeqCst) {
                report.cancelled = true;
                break;
            }

            let read = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if matches!(e.kind(), ErrorKind::Interrupted | ErrorKind::WouldBlock) => {
                    continue
                }
                Err(e) => return Err(CaptureError::ReadFailure(e.to_string())),
            };

            let device = cleanup.device()?;
            if device.state() == HandleState::Uninitialized {
                return Err(CaptureError::PlaybackHandleReleased);
            }
            if !playing {
                device.play()?;
                playing = true;
            }
            write_all(device, &buffer[..read])?;

            report.bytes_written += read as u64;
            report.chunks_written += 1;
        }

        Ok(report)
    }
}

fn write_all(device: &mut dyn PlaybackDevice, mut data: &[u8]) -> Result<(), CaptureError> {
    while !data.is_empty() {
        let written = device.write(data)?;
        if written == 0 {
            if device.state() == HandleState::Uninitialized {
                return Err(CaptureError::PlaybackHandleReleased);
            }
            return Err(CaptureError::Unknown("playback device accepted no data".into()));
        }
        data = &data[written.min(data.len())..];
    }
    Ok(())
}
