//! Contracts for the external collaborators the session core drives.
//!
//! The core never touches camera hardware, pixels, encoders or storage
//! directly; everything goes through these traits so the composition root
//! decides the concrete backends.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{AnimationFormat, EventRef, ImageTag, PhotoFilter, Result, SessionId};

/// Raw capture handed over by the camera layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCapture {
    /// File the camera driver downloaded the image to
    pub source: PathBuf,
    /// When the shutter fired
    pub captured_at: DateTime<Utc>,
}

impl RawCapture {
    /// Capture taken now.
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            captured_at: Utc::now(),
        }
    }
}

/// Turns a raw capture into a stored photo.
#[async_trait]
pub trait CaptureProcessor: Send + Sync {
    /// Post-process a capture and return the final photo path.
    ///
    /// An empty path is treated the same as an error.
    async fn process_capture(&self, capture: &RawCapture, event: &EventRef) -> Result<PathBuf>;
}

/// Cosmetic retouch applied to a photo in place.
#[async_trait]
pub trait BeautyProcessor: Send + Sync {
    /// Retouch `path` in place with the given strength (0-100).
    async fn apply_beauty(&self, path: &Path, intensity: u8) -> Result<()>;
}

/// Session persistence.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Register a new session and return its id.
    async fn create_session(&self, event_id: &str, template_id: &str) -> Result<SessionId>;

    /// Record an accepted photo.
    async fn save_photo(&self, session_id: &SessionId, path: &Path, index: u32) -> Result<()>;

    /// Record a finished looping animation.
    async fn save_animation(
        &self,
        session_id: &SessionId,
        path: &Path,
        format: AnimationFormat,
    ) -> Result<()>;

    /// Record a composed image.
    async fn save_composed_image(
        &self,
        session_id: &SessionId,
        path: &Path,
        tag: ImageTag,
    ) -> Result<()>;
}

/// Per-file photo filter.
#[async_trait]
pub trait FilterBackend: Send + Sync {
    /// Filter `input` into `output` and return the written path.
    async fn apply_filter(&self, input: &Path, output: &Path, filter: PhotoFilter)
        -> Result<PathBuf>;
}

/// GIF encoding limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GifOptions {
    /// Maximum width in pixels
    pub max_width: u32,
    /// Maximum height in pixels
    pub max_height: u32,
    /// Quality (1-100)
    pub quality: u8,
}

/// Looping animation encoders.
#[async_trait]
pub trait AnimationEncoder: Send + Sync {
    /// Encode a looping video. An empty path means the encoder produced nothing.
    async fn generate_looping_video(
        &self,
        photos: &[PathBuf],
        output: &Path,
        frame_delay_ms: u64,
    ) -> Result<PathBuf>;

    /// Encode a looping GIF.
    async fn generate_looping_gif(
        &self,
        photos: &[PathBuf],
        output: &Path,
        frame_delay_ms: u64,
        options: GifOptions,
    ) -> Result<PathBuf>;
}
