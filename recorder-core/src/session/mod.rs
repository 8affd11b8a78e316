pub mod capture;
pub mod playback;
pub mod recorder;
pub mod registry;
