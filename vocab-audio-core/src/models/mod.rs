pub mod audio_models;
pub mod config;
pub mod error;
pub mod package_models;
pub mod recording_result;
pub mod state;
