//! Photobooth Library
//!
//! This library contains the composition root for the kiosk session core:
//! filesystem and ffmpeg-backed collaborators, argument parsing and the
//! replay driver. The binary is in main.rs.

pub mod args;
pub mod backends;
pub mod ffmpeg;
pub mod replay;

// Re-export commonly used types
pub use args::Args;
pub use backends::{FileCaptureProcessor, JournalEntry, JsonlSessionStore};
pub use ffmpeg::{Ffmpeg, FfmpegEncoder, FfmpegFilterBackend};
pub use replay::{
    build_controller, collect_photos, operator_message, replay, ReplayPlan, ReplayReport,
};
