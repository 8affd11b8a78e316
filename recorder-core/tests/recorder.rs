use std::fs;
use std::io::Cursor;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use pcm_recorder_core::mock::{MockBackend, DEFAULT_MIN_BUFFER};
use pcm_recorder_core::storage::metadata;
use pcm_recorder_core::{
    AudioFormat, CaptureError, CaptureEvent, CaptureListener, CaptureOptions, CaptureState,
    ChannelLayout, EventListener, Notifier, PcmFileWriter, PlaybackSource, Recorder,
    RecorderConfig, RecordingListener, RecordingMetadata, SessionId, SessionRegistry,
};

const WAIT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Start,
    Data(usize),
    Stop,
    Error(CaptureError),
}

/// Listener that records every callback in order.
#[derive(Default)]
struct Probe {
    calls: Mutex<Vec<Call>>,
    changed: Condvar,
    decline_start: bool,
    fail_on_read: Option<usize>,
    panic_on_read: Option<usize>,
}

impl Probe {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn push(&self, call: Call) {
        self.calls.lock().push(call);
        self.changed.notify_all();
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    fn data_sizes(&self) -> Vec<usize> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Data(n) => Some(n),
                _ => None,
            })
            .collect()
    }

    fn wait_until(&self, done: impl Fn(&[Call]) -> bool) -> bool {
        let deadline = Instant::now() + WAIT;
        let mut calls = self.calls.lock();
        while !done(&calls) {
            if self.changed.wait_until(&mut calls, deadline).timed_out() {
                return done(&calls);
            }
        }
        true
    }

    fn wait_for_data(&self, count: usize) -> bool {
        self.wait_until(|calls| calls.iter().filter(|c| matches!(c, Call::Data(_))).count() >= count)
    }

    fn wait_terminal(&self) -> bool {
        self.wait_until(|calls| {
            calls
                .iter()
                .any(|c| matches!(c, Call::Stop | Call::Error(_)))
        })
    }
}

impl CaptureListener for Probe {
    fn on_start(&self) -> bool {
        self.push(Call::Start);
        !self.decline_start
    }

    fn on_data_read(&self, data: &[u8]) -> Result<(), CaptureError> {
        let nth = self.data_sizes().len() + 1;
        if self.panic_on_read == Some(nth) {
            panic!("consumer blew up");
        }
        self.push(Call::Data(data.len()));
        if self.fail_on_read == Some(nth) {
            return Err(CaptureError::StorageError("consumer rejected buffer".into()));
        }
        Ok(())
    }

    fn on_stop(&self) {
        self.push(Call::Stop);
    }

    fn on_error(&self, error: &CaptureError) {
        self.push(Call::Error(error.clone()));
    }
}

#[derive(Default)]
struct Notices(Mutex<Vec<String>>);

impl Notifier for Notices {
    fn notify(&self, message: &str) {
        self.0.lock().push(message.to_string());
    }
}

/// Asks the registry to stop from inside `on_start`, before recording begins.
struct StopsDuringStart {
    registry: Arc<SessionRegistry>,
    probe: Arc<Probe>,
    stopped: Mutex<Option<SessionId>>,
}

impl CaptureListener for StopsDuringStart {
    fn on_start(&self) -> bool {
        *self.stopped.lock() = self.registry.stop_active();
        self.probe.on_start()
    }

    fn on_data_read(&self, data: &[u8]) -> Result<(), CaptureError> {
        self.probe.on_data_read(data)
    }

    fn on_stop(&self) {
        self.probe.on_stop();
    }

    fn on_error(&self, error: &CaptureError) {
        self.probe.on_error(error);
    }
}

/// Starts the next session on the same recorder from inside `on_stop`.
struct RestartsOnStop {
    recorder: Arc<Recorder<MockBackend>>,
    probe: Arc<Probe>,
    next: Arc<Probe>,
    restarted: Mutex<Option<Result<SessionId, CaptureError>>>,
}

impl CaptureListener for RestartsOnStop {
    fn on_start(&self) -> bool {
        self.probe.on_start()
    }

    fn on_data_read(&self, data: &[u8]) -> Result<(), CaptureError> {
        self.probe.on_data_read(data)
    }

    fn on_stop(&self) {
        let result = self.recorder.start(CaptureOptions::default(), self.next.clone());
        *self.restarted.lock() = Some(result);
        self.probe.on_stop();
    }

    fn on_error(&self, error: &CaptureError) {
        self.probe.on_error(error);
    }
}

fn recorder(backend: MockBackend) -> Recorder<MockBackend> {
    Recorder::new(backend, RecorderConfig::default()).with_registry(Arc::new(SessionRegistry::new()))
}

/// Exactly one terminal callback, last, after `Start` and only data in between.
fn assert_well_ordered(calls: &[Call]) {
    assert_eq!(calls.first(), Some(&Call::Start));
    let terminals = calls
        .iter()
        .filter(|c| matches!(c, Call::Stop | Call::Error(_)))
        .count();
    assert_eq!(terminals, 1, "calls: {:?}", calls);
    assert!(matches!(calls.last(), Some(Call::Stop | Call::Error(_))));
    assert!(calls[1..calls.len() - 1]
        .iter()
        .all(|c| matches!(c, Call::Data(_))));
}

#[test]
fn unsupported_platform_refuses_start() {
    let notices = Arc::new(Notices::default());
    let rec = recorder(MockBackend::new().with_min_buffer(None)).with_notifier(notices.clone());
    let probe = Probe::new();

    let err = rec.start(CaptureOptions::default(), probe.clone()).unwrap_err();

    assert!(matches!(err, CaptureError::UnsupportedConfiguration(_)));
    assert!(rec.parameters().is_err());
    assert_eq!(rec.backend().stats().captures_opened(), 0);
    assert!(probe.calls().is_empty());
    assert_eq!(notices.0.lock().len(), 1);
}

#[test]
fn permission_denied_reports_error_without_allocating() {
    let rec = recorder(MockBackend::new().deny_permission());
    let probe = Probe::new();

    let err = rec.start(CaptureOptions::default(), probe.clone()).unwrap_err();

    assert_eq!(err, CaptureError::PermissionDenied);
    assert_eq!(probe.calls(), vec![Call::Error(CaptureError::PermissionDenied)]);
    assert_eq!(rec.backend().stats().captures_opened(), 0);
    assert_eq!(rec.backend().stats().live_captures(), 0);
    assert!(rec.state().is_idle());
}

#[test]
fn stop_ends_session_with_ordered_callbacks() {
    let rec = recorder(MockBackend::new());
    let probe = Probe::new();

    rec.start(CaptureOptions::default(), probe.clone()).unwrap();
    assert!(probe.wait_for_data(3));
    assert_eq!(rec.state(), CaptureState::Recording);

    rec.stop();
    assert!(probe.wait_terminal());

    let calls = probe.calls();
    assert_well_ordered(&calls);
    assert_eq!(calls.last(), Some(&Call::Stop));

    let stats = rec.backend().stats();
    assert_eq!(stats.capture_releases(), 1);
    assert_eq!(stats.live_captures(), 0);
    assert!(!rec.registry().is_occupied());
    assert_eq!(rec.state(), CaptureState::Stopped);
}

#[test]
fn stop_without_session_is_noop() {
    let rec = recorder(MockBackend::new());
    rec.stop();
    rec.stop();
    assert!(rec.state().is_idle());
    assert!(rec.stop_and_wait(Duration::from_millis(10)));
    assert_eq!(rec.backend().stats().captures_opened(), 0);
}

#[test]
fn read_error_ends_session_once() {
    let rec = recorder(MockBackend::new().fail_read_after(2));
    let probe = Probe::new();

    rec.start(CaptureOptions::default(), probe.clone()).unwrap();
    assert!(probe.wait_terminal());

    let calls = probe.calls();
    assert_well_ordered(&calls);
    assert_eq!(probe.data_sizes().len(), 2);
    assert!(matches!(calls.last(), Some(Call::Error(CaptureError::ReadFailure(_)))));
    assert_eq!(rec.backend().stats().capture_releases(), 1);
    assert!(rec.registry().wait_until_clear(WAIT));
    assert!(matches!(rec.state(), CaptureState::Errored(CaptureError::ReadFailure(_))));
}

#[test]
fn listener_error_ends_session_once() {
    let rec = recorder(MockBackend::new());
    let probe = Arc::new(Probe {
        fail_on_read: Some(3),
        ..Default::default()
    });

    rec.start(CaptureOptions::default(), probe.clone()).unwrap();
    assert!(probe.wait_terminal());

    let calls = probe.calls();
    assert_well_ordered(&calls);
    assert_eq!(probe.data_sizes().len(), 3);
    assert!(matches!(
        calls.last(),
        Some(Call::Error(CaptureError::CallbackFailure(msg))) if msg.contains("consumer rejected buffer")
    ));
    assert_eq!(rec.backend().stats().capture_releases(), 1);
}

#[test]
fn panicking_listener_is_a_callback_failure() {
    let rec = recorder(MockBackend::new());
    let probe = Arc::new(Probe {
        panic_on_read: Some(2),
        ..Default::default()
    });

    rec.start(CaptureOptions::default(), probe.clone()).unwrap();
    assert!(probe.wait_terminal());

    assert_well_ordered(&probe.calls());
    assert!(matches!(
        probe.calls().last(),
        Some(Call::Error(CaptureError::CallbackFailure(_)))
    ));
    assert_eq!(rec.backend().stats().capture_releases(), 1);
}

#[test]
fn zero_frame_size_reads_platform_minimum() {
    let rec = recorder(MockBackend::new());
    let probe = Probe::new();

    rec.start(CaptureOptions::with_frame_size(0), probe.clone()).unwrap();
    assert!(probe.wait_for_data(1));
    rec.stop();
    assert!(probe.wait_terminal());

    let first = probe.data_sizes()[0];
    assert!(first > 0);
    assert!(first <= DEFAULT_MIN_BUFFER);
    assert_eq!(first, DEFAULT_MIN_BUFFER);
}

#[test]
fn short_reads_are_delivered_as_read() {
    let rec = recorder(MockBackend::new().with_read_size(100));
    let probe = Probe::new();

    rec.start(CaptureOptions::with_frame_size(8192), probe.clone()).unwrap();
    assert!(probe.wait_for_data(2));
    rec.stop();
    assert!(probe.wait_terminal());

    assert!(probe.data_sizes().iter().all(|&n| n == 100));
}

#[test]
fn frame_size_hint_above_minimum_is_used() {
    let config = RecorderConfig {
        frame_size_hint: Some(8192),
        ..Default::default()
    };
    let rec = Recorder::new(MockBackend::new(), config).with_registry(Arc::new(SessionRegistry::new()));
    let probe = Probe::new();

    rec.start(CaptureOptions::default(), probe.clone()).unwrap();
    assert!(probe.wait_for_data(1));
    rec.stop();
    assert!(probe.wait_terminal());

    assert_eq!(probe.data_sizes()[0], 8192);
}

#[test]
fn second_start_is_rejected_and_first_continues() {
    let notices = Arc::new(Notices::default());
    let rec = recorder(MockBackend::new()).with_notifier(notices.clone());
    let first = Probe::new();
    let second = Probe::new();

    let id = rec.start(CaptureOptions::default(), first.clone()).unwrap();
    assert!(first.wait_for_data(2));

    let err = rec.start(CaptureOptions::default(), second.clone()).unwrap_err();
    assert_eq!(err, CaptureError::HandleBusy);
    assert!(second.calls().is_empty());
    assert_eq!(notices.0.lock().len(), 1);

    // The rejected handle is released; the first session keeps reading.
    let stats = rec.backend().stats();
    assert_eq!(stats.captures_opened(), 2);
    assert_eq!(stats.capture_releases(), 1);
    assert_eq!(rec.registry().active_id(), Some(id));

    let seen = first.data_sizes().len();
    assert!(first.wait_for_data(seen + 3));
    assert!(!first
        .calls()
        .iter()
        .any(|c| matches!(c, Call::Stop | Call::Error(_))));

    rec.stop();
    assert!(first.wait_terminal());
    assert_eq!(stats.capture_releases(), 2);
}

#[test]
fn declined_start_releases_handle() {
    let rec = recorder(MockBackend::new());
    let probe = Arc::new(Probe {
        decline_start: true,
        ..Default::default()
    });

    let err = rec.start(CaptureOptions::default(), probe.clone()).unwrap_err();

    assert_eq!(err, CaptureError::StartRejected);
    assert_eq!(probe.calls(), vec![Call::Start]);
    let stats = rec.backend().stats();
    assert_eq!(stats.captures_opened(), 1);
    assert_eq!(stats.capture_starts(), 0);
    assert_eq!(stats.capture_releases(), 1);
    assert!(!rec.registry().is_occupied());

    // Nothing fires later either.
    std::thread::sleep(Duration::from_millis(20));
    assert_eq!(probe.calls(), vec![Call::Start]);
}

#[test]
fn uninitialized_handle_is_rejected() {
    let notices = Arc::new(Notices::default());
    let rec = recorder(MockBackend::new().with_uninitialized_capture()).with_notifier(notices.clone());
    let probe = Probe::new();

    let err = rec.start(CaptureOptions::default(), probe.clone()).unwrap_err();

    assert_eq!(err, CaptureError::HandleUninitialized);
    assert!(probe.calls().is_empty());
    assert_eq!(rec.backend().stats().capture_releases(), 1);
    assert_eq!(notices.0.lock().len(), 1);
}

#[test]
fn new_session_can_start_after_terminal_callback() {
    let rec = recorder(MockBackend::new());
    let first = Probe::new();

    rec.start(CaptureOptions::default(), first.clone()).unwrap();
    assert!(first.wait_for_data(1));
    rec.stop();
    assert!(first.wait_terminal());

    // Release happens before on_stop, so the slot is already free.
    let second = Probe::new();
    rec.start(CaptureOptions::default(), second.clone()).unwrap();
    assert!(second.wait_for_data(1));
    assert!(rec.stop_and_wait(WAIT));
    assert!(second.wait_terminal());
    assert_eq!(rec.backend().stats().capture_releases(), 2);
}

#[test]
fn new_session_can_start_from_terminal_callback() {
    let rec = Arc::new(recorder(MockBackend::new()));
    let first = Probe::new();
    let next = Probe::new();
    let listener = Arc::new(RestartsOnStop {
        recorder: Arc::clone(&rec),
        probe: first.clone(),
        next: next.clone(),
        restarted: Mutex::new(None),
    });

    let first_id = rec.start(CaptureOptions::default(), listener.clone()).unwrap();
    assert!(first.wait_for_data(1));
    rec.stop();
    assert!(first.wait_terminal());

    let next_id = match listener.restarted.lock().take() {
        Some(Ok(id)) => id,
        other => panic!("restart from on_stop failed: {:?}", other),
    };
    assert_ne!(next_id, first_id);
    assert!(next.wait_for_data(1));
    assert_eq!(rec.registry().active_id(), Some(next_id));

    assert!(rec.stop_and_wait(WAIT));
    assert!(next.wait_terminal());
    assert_well_ordered(&first.calls());
    assert_well_ordered(&next.calls());
    assert_eq!(rec.backend().stats().capture_releases(), 2);
}

#[test]
fn stop_during_start_ends_session() {
    let rec = recorder(MockBackend::new());
    let probe = Probe::new();
    let listener = Arc::new(StopsDuringStart {
        registry: Arc::clone(rec.registry()),
        probe: probe.clone(),
        stopped: Mutex::new(None),
    });

    let id = rec.start(CaptureOptions::default(), listener.clone()).unwrap();
    assert_eq!(*listener.stopped.lock(), Some(id));
    assert!(probe.wait_terminal());
    assert!(rec.registry().wait_until_clear(WAIT));

    // Give a lost stop time to show up as stray reads.
    std::thread::sleep(Duration::from_millis(20));
    assert_eq!(probe.calls(), vec![Call::Start, Call::Stop]);
    assert_eq!(rec.state(), CaptureState::Stopped);
    assert_eq!(rec.backend().stats().capture_releases(), 1);
    assert!(!rec.backend().is_hardware_recording());
}

#[test]
fn dropping_recorder_stops_capture() {
    let registry = Arc::new(SessionRegistry::new());
    let backend = MockBackend::new();
    let stats = backend.stats();
    let rec = Recorder::new(backend, RecorderConfig::default()).with_registry(Arc::clone(&registry));
    let probe = Probe::new();

    rec.start(CaptureOptions::default(), probe.clone()).unwrap();
    assert!(probe.wait_for_data(1));
    drop(rec);

    assert!(probe.wait_terminal());
    assert_eq!(probe.calls().last(), Some(&Call::Stop));
    assert!(registry.wait_until_clear(WAIT));
    assert_eq!(stats.capture_releases(), 1);
}

#[test]
fn event_listener_reports_failure_once() {
    let rec = recorder(MockBackend::new().with_read_size(16).fail_read_after(1));
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let listener = EventListener::new(Arc::new(move |e| sink.lock().push(e)));

    rec.start(CaptureOptions::default(), listener).unwrap();
    assert!(rec.registry().wait_until_clear(WAIT));

    let deadline = Instant::now() + WAIT;
    while events.lock().len() < 2 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(1));
    }
    let events = events.lock();
    assert_eq!(events.len(), 2);
    assert!(matches!(&events[0], CaptureEvent::Data { size: 16, data } if data.len() == 16));
    assert!(matches!(&events[1], CaptureEvent::Error { error } if error.starts_with("read failed")));
}

#[test]
fn empty_source_plays_nothing() {
    let rec = recorder(MockBackend::new());

    let report = rec
        .play(PlaybackSource::Reader(Box::new(Cursor::new(Vec::new()))))
        .unwrap()
        .wait()
        .unwrap();

    assert_eq!(report.bytes_written, 0);
    let stats = rec.backend().stats();
    assert_eq!(stats.bytes_played(), 0);
    assert_eq!(stats.play_calls(), 0);
    assert_eq!(stats.playback_releases(), 1);
}

#[test]
fn partial_writes_are_completed() {
    let rec = recorder(MockBackend::new().with_write_limit(100));
    let data: Vec<u8> = (0..=255).cycle().take(5000).collect();

    let report = rec
        .play(PlaybackSource::Reader(Box::new(Cursor::new(data.clone()))))
        .unwrap()
        .wait()
        .unwrap();

    assert_eq!(report.bytes_written, 5000);
    assert_eq!(rec.backend().stats().played(), data);
}

#[test]
fn playback_can_be_cancelled() {
    let rec = recorder(MockBackend::new().with_min_buffer(Some(4)));
    let endless = std::io::repeat(1u8);

    let handle = rec.play(PlaybackSource::Reader(Box::new(endless))).unwrap();
    handle.stop();
    let report = handle.wait().unwrap();

    assert!(report.cancelled);
    assert_eq!(rec.backend().stats().playback_releases(), 1);
}

#[test]
fn recorded_file_plays_back() {
    let dir = tempfile::tempdir().unwrap();
    let rec = recorder(MockBackend::new().with_read_size(1000));
    let listener = RecordingListener::new(PcmFileWriter::create_in(dir.path(), rec.config().format));

    rec.start(CaptureOptions::default(), listener.clone()).unwrap();
    std::thread::sleep(Duration::from_millis(20));
    assert!(rec.stop_and_wait(WAIT));

    let deadline = Instant::now() + WAIT;
    let result = loop {
        if let Some(outcome) = listener.take_outcome() {
            break outcome.unwrap();
        }
        assert!(Instant::now() < deadline, "recording never finalized");
        std::thread::sleep(Duration::from_millis(1));
    };
    assert!(result.bytes_written > 0);
    assert_eq!(result.bytes_written % 1000, 0);

    let report = rec.play_file(&result.file_path).unwrap().wait().unwrap();
    assert_eq!(report.bytes_written, result.bytes_written);
    assert_eq!(rec.backend().stats().played(), fs::read(&result.file_path).unwrap());
}

#[test]
fn play_file_rejects_mismatched_format() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mono.pcm");
    fs::write(&path, [0u8; 64]).unwrap();
    let mono = AudioFormat {
        channel_layout: ChannelLayout::Mono,
        ..AudioFormat::CD_QUALITY
    };
    metadata::write_metadata(&RecordingMetadata::new("mono.pcm", mono, 64, "00"), &path).unwrap();

    let rec = recorder(MockBackend::new());
    let err = rec.play_file(&path).err().unwrap();

    assert!(matches!(err, CaptureError::UnsupportedConfiguration(_)));
    assert_eq!(rec.backend().stats().playbacks_opened(), 0);
}

#[test]
fn headerless_file_without_sidecar_plays() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("raw.pcm");
    fs::write(&path, [3u8; 10_000]).unwrap();

    let rec = recorder(MockBackend::new());
    let report = rec.play_file(&path).unwrap().wait().unwrap();

    assert_eq!(report.bytes_written, 10_000);
    assert!(report.chunks_written >= 3);
}
