//! Scripted in-memory backend.
//!
//! Stands in for real hardware in tests: capture devices produce a counting
//! byte pattern at a fixed pace, playback devices record what they are given,
//! and every allocation, start, stop and release is counted in `MockStats`.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::models::audio_format::AudioFormat;
use crate::models::error::CaptureError;
use crate::traits::backend::AudioBackend;
use crate::traits::capture_device::{CaptureDevice, HandleState, RecordingState};
use crate::traits::playback_device::PlaybackDevice;

/// Typical minimum for 44.1 kHz stereo 16-bit capture.
pub const DEFAULT_MIN_BUFFER: usize = 3584;

/// Counters for everything the mock hardware was asked to do.
#[derive(Debug, Default)]
pub struct MockStats {
    captures_opened: AtomicUsize,
    capture_starts: AtomicUsize,
    capture_stops: AtomicUsize,
    capture_releases: AtomicUsize,
    reads: AtomicUsize,
    playbacks_opened: AtomicUsize,
    play_calls: AtomicUsize,
    playback_stops: AtomicUsize,
    playback_releases: AtomicUsize,
    thread_promotions: AtomicUsize,
    played: Mutex<Vec<u8>>,
}

impl MockStats {
    pub fn captures_opened(&self) -> usize {
        self.captures_opened.load(Ordering::SeqCst)
    }

    pub fn capture_starts(&self) -> usize {
        self.capture_starts.load(Ordering::SeqCst)
    }

    pub fn capture_stops(&self) -> usize {
        self.capture_stops.load(Ordering::SeqCst)
    }

    pub fn capture_releases(&self) -> usize {
        self.capture_releases.load(Ordering::SeqCst)
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn playbacks_opened(&self) -> usize {
        self.playbacks_opened.load(Ordering::SeqCst)
    }

    pub fn play_calls(&self) -> usize {
        self.play_calls.load(Ordering::SeqCst)
    }

    pub fn playback_stops(&self) -> usize {
        self.playback_stops.load(Ordering::SeqCst)
    }

    pub fn playback_releases(&self) -> usize {
        self.playback_releases.load(Ordering::SeqCst)
    }

    pub fn thread_promotions(&self) -> usize {
        self.thread_promotions.load(Ordering::SeqCst)
    }

    pub fn bytes_played(&self) -> usize {
        self.played.lock().len()
    }

    pub fn played(&self) -> Vec<u8> {
        self.played.lock().clone()
    }

    /// Capture handles allocated but not yet released.
    pub fn live_captures(&self) -> usize {
        self.captures_opened() - self.capture_releases()
    }
}

#[derive(Debug, Clone)]
struct MockScript {
    min_buffer: Option<usize>,
    permission: bool,
    read_size: Option<usize>,
    read_delay: Duration,
    fail_read_after: Option<usize>,
    uninitialized_capture: bool,
    playback_released: bool,
    write_limit: Option<usize>,
}

impl Default for MockScript {
    fn default() -> Self {
        Self {
            min_buffer: Some(DEFAULT_MIN_BUFFER),
            permission: true,
            read_size: None,
            read_delay: Duration::from_millis(1),
            fail_read_after: None,
            uninitialized_capture: false,
            playback_released: false,
            write_limit: None,
        }
    }
}

/// In-memory `AudioBackend`.
#[derive(Default)]
pub struct MockBackend {
    script: MockScript,
    stats: Arc<MockStats>,
    /// The single microphone: raised while any handle is recording.
    hardware_recording: Arc<AtomicBool>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// What the platform reports as minimum buffer; `None` is the error sentinel.
    pub fn with_min_buffer(mut self, min_buffer: Option<usize>) -> Self {
        self.script.min_buffer = min_buffer;
        self
    }

    pub fn deny_permission(mut self) -> Self {
        self.script.permission = false;
        self
    }

    /// Bytes returned per read, capped by the caller's buffer. Default: fill the buffer.
    pub fn with_read_size(mut self, bytes: usize) -> Self {
        self.script.read_size = Some(bytes);
        self
    }

    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.script.read_delay = delay;
        self
    }

    /// Let `reads` reads succeed, then fail every read after.
    pub fn fail_read_after(mut self, reads: usize) -> Self {
        self.script.fail_read_after = Some(reads);
        self
    }

    /// Capture handles come back uninitialized.
    pub fn with_uninitialized_capture(mut self) -> Self {
        self.script.uninitialized_capture = true;
        self
    }

    /// Playback handles report themselves released.
    pub fn with_playback_released(mut self) -> Self {
        self.script.playback_released = true;
        self
    }

    /// Playback handles accept at most `bytes` per write.
    pub fn with_write_limit(mut self, bytes: usize) -> Self {
        self.script.write_limit = Some(bytes);
        self
    }

    pub fn stats(&self) -> Arc<MockStats> {
        Arc::clone(&self.stats)
    }

    pub fn is_hardware_recording(&self) -> bool {
        self.hardware_recording.load(Ordering::SeqCst)
    }
}

impl AudioBackend for MockBackend {
    fn min_buffer_size(&self, _format: &AudioFormat) -> Option<usize> {
        self.script.min_buffer
    }

    fn has_record_permission(&self) -> bool {
        self.script.permission
    }

    fn open_capture(
        &self,
        _format: &AudioFormat,
        _buffer_bytes: usize,
    ) -> Result<Box<dyn CaptureDevice>, CaptureError> {
        self.stats.captures_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockCaptureDevice {
            script: self.script.clone(),
            stats: Arc::clone(&self.stats),
            hardware_recording: Arc::clone(&self.hardware_recording),
            recording: false,
            reads: 0,
        }))
    }

    fn open_playback(
        &self,
        _format: &AudioFormat,
        _buffer_bytes: usize,
    ) -> Result<Box<dyn PlaybackDevice>, CaptureError> {
        self.stats.playbacks_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockPlaybackDevice {
            script: self.script.clone(),
            stats: Arc::clone(&self.stats),
        }))
    }

    fn promote_audio_thread(&self) -> Result<(), CaptureError> {
        self.stats.thread_promotions.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct MockCaptureDevice {
    script: MockScript,
    stats: Arc<MockStats>,
    hardware_recording: Arc<AtomicBool>,
    recording: bool,
    reads: usize,
}

impl CaptureDevice for MockCaptureDevice {
    fn state(&self) -> HandleState {
        if self.script.uninitialized_capture {
            HandleState::Uninitialized
        } else {
            HandleState::Initialized
        }
    }

    fn recording_state(&self) -> RecordingState {
        // A fresh handle on a busy microphone reports the hardware as recording.
        if self.recording || self.hardware_recording.load(Ordering::SeqCst) {
            RecordingState::Recording
        } else {
            RecordingState::Stopped
        }
    }

    fn start_recording(&mut self) -> Result<(), CaptureError> {
        if self.hardware_recording.swap(true, Ordering::SeqCst) {
            return Err(CaptureError::HandleBusy);
        }
        self.recording = true;
        self.stats.capture_starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop_recording(&mut self) -> Result<(), CaptureError> {
        if self.recording {
            self.recording = false;
            self.hardware_recording.store(false, Ordering::SeqCst);
            self.stats.capture_stops.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<usize, CaptureError> {
        thread::sleep(self.script.read_delay);
        if let Some(limit) = self.script.fail_read_after {
            if self.reads >= limit {
                return Err(CaptureError::ReadFailure("mock device failure".into()));
            }
        }
        self.reads += 1;
        self.stats.reads.fetch_add(1, Ordering::SeqCst);

        let size = self.script.read_size.unwrap_or(buffer.len()).min(buffer.len());
        let fill = self.reads as u8;
        buffer[..size].iter_mut().for_each(|b| *b = fill);
        Ok(size)
    }

    fn release(mut self: Box<Self>) {
        let _ = self.stop_recording();
        self.stats.capture_releases.fetch_add(1, Ordering::SeqCst);
    }
}

struct MockPlaybackDevice {
    script: MockScript,
    stats: Arc<MockStats>,
}

impl PlaybackDevice for MockPlaybackDevice {
    fn state(&self) -> HandleState {
        if self.script.playback_released {
            HandleState::Uninitialized
        } else {
            HandleState::Initialized
        }
    }

    fn play(&mut self) -> Result<(), CaptureError> {
        self.stats.play_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, CaptureError> {
        let accepted = self.script.write_limit.unwrap_or(data.len()).min(data.len());
        self.stats.played.lock().extend_from_slice(&data[..accepted]);
        Ok(accepted)
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        self.stats.playback_stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn release(self: Box<Self>) {
        self.stats.playback_releases.fetch_add(1, Ordering::SeqCst);
    }
}
