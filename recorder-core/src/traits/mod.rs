pub mod backend;
pub mod capture_device;
pub mod listener;
pub mod notifier;
pub mod playback_device;
