pub mod metadata;
pub mod pcm_writer;
pub mod recording_listener;
