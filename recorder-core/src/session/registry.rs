use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::models::error::CaptureError;
use crate::models::state::CaptureState;

/// Identifier of one capture session, unique for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shared view of a running capture session.
///
/// Cloned into the registry and the capture thread. Holds only the stop flags
/// and state, never the hardware handle itself.
///
/// A stop request is sticky: once made, `mark_recording` cannot raise the
/// session back to recording, so a stop issued while `start` is still
/// running ends the session as soon as its read loop begins.
#[derive(Clone)]
pub struct ActiveSession {
    id: SessionId,
    recording: Arc<AtomicBool>,
    stop_requested: Arc<AtomicBool>,
    state: Arc<Mutex<CaptureState>>,
}

impl ActiveSession {
    pub(crate) fn new() -> Self {
        Self {
            id: SessionId::next(),
            recording: Arc::new(AtomicBool::new(false)),
            stop_requested: Arc::new(AtomicBool::new(false)),
            state: Arc::new(Mutex::new(CaptureState::Idle)),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> CaptureState {
        self.state.lock().clone()
    }

    /// Whether the session is recording and no stop has been requested.
    pub fn is_recording(&self) -> bool {
        self.recording.load(Ordering::SeqCst) && !self.is_stop_requested()
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    /// Raise the recording flag, unless a stop already arrived.
    pub(crate) fn mark_recording(&self) {
        let mut state = self.state.lock();
        if !self.is_stop_requested() {
            self.recording.store(true, Ordering::SeqCst);
            *state = CaptureState::Recording;
        }
    }

    /// Request a stop. The read loop notices on its next iteration, or exits
    /// immediately if it has not started yet.
    pub(crate) fn request_stop(&self) {
        let mut state = self.state.lock();
        self.stop_requested.store(true, Ordering::SeqCst);
        self.recording.store(false, Ordering::SeqCst);
        if matches!(*state, CaptureState::Idle | CaptureState::Recording) {
            *state = CaptureState::Stopping;
        }
    }

    pub(crate) fn set_state(&self, state: CaptureState) {
        *self.state.lock() = state;
    }
}

/// Process-wide slot holding at most one active capture session.
///
/// `install` only succeeds on an empty slot, and `clear_if` only clears the
/// slot when it still holds the caller's session, so cleanup of a stale
/// session can never wipe out a newer one.
#[derive(Default)]
pub struct SessionRegistry {
    slot: Mutex<Option<ActiveSession>>,
    cleared: Condvar,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry shared by every `Recorder` that does not bring its own.
    pub fn global() -> Arc<SessionRegistry> {
        static GLOBAL: OnceLock<Arc<SessionRegistry>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(SessionRegistry::new())))
    }

    pub(crate) fn install(&self, session: ActiveSession) -> Result<(), CaptureError> {
        let mut slot = self.slot.lock();
        if let Some(current) = slot.as_ref() {
            log::debug!(
                "Rejecting session {}: session {} still owns the capture slot",
                session.id,
                current.id
            );
            return Err(CaptureError::HandleBusy);
        }
        *slot = Some(session);
        Ok(())
    }

    /// Clear the slot if it still belongs to `id`. Returns whether it did.
    pub(crate) fn clear_if(&self, id: SessionId) -> bool {
        let mut slot = self.slot.lock();
        match slot.as_ref() {
            Some(current) if current.id == id => {
                *slot = None;
                self.cleared.notify_all();
                true
            }
            _ => false,
        }
    }

    /// Ask the active session, if any, to stop. Returns its id.
    pub fn stop_active(&self) -> Option<SessionId> {
        let slot = self.slot.lock();
        slot.as_ref().map(|session| {
            session.request_stop();
            session.id
        })
    }

    pub fn active(&self) -> Option<ActiveSession> {
        self.slot.lock().clone()
    }

    pub fn active_id(&self) -> Option<SessionId> {
        self.slot.lock().as_ref().map(|s| s.id)
    }

    pub fn is_occupied(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Block until the slot is empty or `timeout` elapses. Returns whether it emptied.
    pub fn wait_until_clear(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut slot = self.slot.lock();
        while slot.is_some() {
            if self.cleared.wait_until(&mut slot, deadline).timed_out() {
                return slot.is_none();
            }
        }
        true
    }
}
