pub mod audio_format;
pub mod config;
pub mod error;
pub mod event;
pub mod parameters;
pub mod recording_result;
pub mod state;
