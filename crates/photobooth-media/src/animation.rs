//! Looping animation generation.
//!
//! One animation per session, produced off the coordinating task. The
//! preferred encoder writes a looping MP4; when it produces nothing the job
//! falls back to an animated GIF. Failure of both is logged and swallowed: the
//! session simply has no animation.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use photobooth_core::{
    AnimationEncoder, AnimationFormat, AnimationReady, AnimationSettings, Error, GifOptions,
    SessionId, SessionStore,
};

use crate::naming::{animation_stem, unique_output_path};

/// Inputs for one animation job, captured when the job is scheduled.
#[derive(Debug, Clone)]
pub struct AnimationJob {
    /// Session the animation belongs to
    pub session_id: SessionId,
    /// Frames in order
    pub photos: Vec<PathBuf>,
    /// Directory to write the animation into
    pub output_dir: PathBuf,
    /// Delay between frames in milliseconds
    pub frame_delay_ms: u64,
    /// GIF fallback limits
    pub gif: GifOptions,
}

impl AnimationJob {
    /// Build a job from the animation settings.
    pub fn from_settings(
        session_id: SessionId,
        photos: Vec<PathBuf>,
        output_dir: PathBuf,
        settings: &AnimationSettings,
    ) -> Self {
        Self {
            session_id,
            photos,
            output_dir,
            frame_delay_ms: settings.frame_delay_ms,
            gif: GifOptions {
                max_width: settings.gif_max_width,
                max_height: settings.gif_max_height,
                quality: settings.gif_quality,
            },
        }
    }
}

/// Produces the looping animation for a session.
pub struct AnimationGenerator {
    encoder: Arc<dyn AnimationEncoder>,
    store: Arc<dyn SessionStore>,
    timeout: Duration,
}

impl AnimationGenerator {
    /// Create a generator; `timeout` bounds a whole job including the fallback.
    pub fn new(
        encoder: Arc<dyn AnimationEncoder>,
        store: Arc<dyn SessionStore>,
        timeout: Duration,
    ) -> Self {
        Self {
            encoder,
            store,
            timeout,
        }
    }

    /// Run a job to completion.
    ///
    /// Returns the finished animation, or `None` if no encoder produced a file
    /// within the time budget. Never fails.
    pub async fn generate(&self, job: &AnimationJob) -> Option<AnimationReady> {
        info!(
            "Generating animation: session={}, frames={}",
            job.session_id,
            job.photos.len()
        );

        let path = match tokio::time::timeout(self.timeout, self.encode(job)).await {
            Ok(Some(path)) => path,
            Ok(None) => {
                warn!(
                    "No animation produced for session {}: both encoders failed",
                    job.session_id
                );
                return None;
            }
            Err(_) => {
                let err = Error::AnimationTimeout(self.timeout.as_secs());
                warn!("Animation job for session {} abandoned: {}", job.session_id, err);
                return None;
            }
        };

        let format = AnimationFormat::from_path(&path);
        if let Err(e) = self
            .store
            .save_animation(&job.session_id, &path, format)
            .await
        {
            warn!(
                "Failed to persist {} animation for session {}: {}",
                format, job.session_id, e
            );
        }

        info!(
            "Animation ready: session={}, format={}, path={}",
            job.session_id,
            format,
            path.display()
        );
        Some(AnimationReady {
            session_id: job.session_id.clone(),
            animation_path: path,
            format,
        })
    }

    /// Run a job on the tokio runtime and deliver its result over `results`.
    ///
    /// Nothing is sent when the job produced no animation.
    pub fn spawn(
        self: &Arc<Self>,
        job: AnimationJob,
        results: mpsc::UnboundedSender<AnimationReady>,
    ) -> JoinHandle<()> {
        let generator = Arc::clone(self);
        tokio::spawn(async move {
            if let Some(ready) = generator.generate(&job).await {
                if results.send(ready).is_err() {
                    debug!(
                        "Animation result for session {} dropped: receiver gone",
                        job.session_id
                    );
                }
            }
        })
    }

    async fn encode(&self, job: &AnimationJob) -> Option<PathBuf> {
        if let Err(e) = tokio::fs::create_dir_all(&job.output_dir).await {
            warn!(
                "Cannot create animation directory {}: {}",
                job.output_dir.display(),
                e
            );
            return None;
        }

        let stem = animation_stem(Utc::now(), &job.session_id);

        let video_path = unique_output_path(&job.output_dir, &stem, "mp4").await;
        match self
            .encoder
            .generate_looping_video(&job.photos, &video_path, job.frame_delay_ms)
            .await
        {
            Ok(path) => {
                if produced(&path).await {
                    return Some(path);
                }
                debug!("Video encoder produced no file, falling back to GIF");
            }
            Err(e) => warn!("Video encoder failed, falling back to GIF: {}", e),
        }

        let gif_path = unique_output_path(&job.output_dir, &stem, "gif").await;
        match self
            .encoder
            .generate_looping_gif(&job.photos, &gif_path, job.frame_delay_ms, job.gif)
            .await
        {
            Ok(path) => {
                if produced(&path).await {
                    return Some(path);
                }
                warn!("GIF encoder produced no file");
                None
            }
            Err(e) => {
                warn!("GIF encoder failed: {}", e);
                None
            }
        }
    }
}

/// An encoder succeeded only if it named a file that now exists.
async fn produced(path: &Path) -> bool {
    !path.as_os_str().is_empty() && tokio::fs::try_exists(path).await.unwrap_or(false)
}
