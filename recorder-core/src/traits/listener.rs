use crate::models::error::CaptureError;
use crate::models::event::CaptureEvent;
use std::sync::Arc;

/// Callbacks for one capture session.
///
/// Order per session: `on_start`, then zero or more `on_data_read`, then
/// exactly one of `on_stop` / `on_error`. Everything after `on_start` runs on
/// the capture thread, one call at a time; a slow `on_data_read` throttles
/// the read loop.
pub trait CaptureListener: Send + Sync {
    /// Called synchronously from `Recorder::start`. Returning `false` aborts
    /// the session before recording is engaged.
    fn on_start(&self) -> bool {
        true
    }

    /// Called for every non-empty read. An `Err` ends the session.
    fn on_data_read(&self, data: &[u8]) -> Result<(), CaptureError>;

    /// Called when the session ended because recording was stopped.
    fn on_stop(&self) {}

    /// Called when the session ended because of a failure, or when
    /// `Recorder::start` finds recording permission missing.
    fn on_error(&self, error: &CaptureError);
}

/// Callback receiving bridge-facing capture events.
pub type EventCallback = Arc<dyn Fn(CaptureEvent) + Send + Sync + 'static>;

/// Adapts an `EventCallback` into a `CaptureListener`.
pub struct EventListener {
    callback: EventCallback,
}

impl EventListener {
    pub fn new(callback: EventCallback) -> Arc<Self> {
        Arc::new(Self { callback })
    }
}

impl CaptureListener for EventListener {
    fn on_data_read(&self, data: &[u8]) -> Result<(), CaptureError> {
        (self.callback)(CaptureEvent::Data {
            data: data.to_vec(),
            size: data.len(),
        });
        Ok(())
    }

    fn on_error(&self, error: &CaptureError) {
        (self.callback)(CaptureEvent::Error {
            error: error.to_string(),
        });
    }
}
