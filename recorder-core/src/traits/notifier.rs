/// Sink for user-visible notices (the host typically shows a toast).
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// Default notifier: writes the notice to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) {
        log::warn!("{}", message);
    }
}
