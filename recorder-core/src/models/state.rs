use super::error::CaptureError;

/// Capture session state machine.
///
/// State transitions:
/// ```text
/// idle → recording → stopping → stopped ─┐
///            │                           ├→ (cleanup) → idle
///            └───────────────→ errored ──┘
/// ```
/// Precondition failures in `Recorder::start` never leave `Idle`.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureState {
    Idle,
    Recording,
    Stopping,
    Stopped,
    Errored(CaptureError),
}

impl CaptureState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::Errored(_))
    }

    pub fn error(&self) -> Option<&CaptureError> {
        match self {
            Self::Errored(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(CaptureState::Stopped.is_terminal());
        assert!(CaptureState::Errored(CaptureError::HandleBusy).is_terminal());
        assert!(!CaptureState::Stopping.is_terminal());
        assert!(!CaptureState::Recording.is_terminal());
    }

    #[test]
    fn errored_exposes_cause() {
        let state = CaptureState::Errored(CaptureError::ReadFailure("eof".into()));
        assert_eq!(state.error(), Some(&CaptureError::ReadFailure("eof".into())));
        assert_eq!(CaptureState::Idle.error(), None);
    }
}
