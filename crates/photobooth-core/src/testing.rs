//! In-memory collaborators for exercising the session core without hardware.
//!
//! Every double records the calls it receives so tests can assert on them.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::{
    AnimationEncoder, AnimationFormat, BeautyProcessor, CaptureProcessor, Error, EventRef,
    FilterBackend, GifOptions, ImageTag, PhotoFilter, RawCapture, Result, SessionId, SessionStore,
};

/// Capture processor that accepts the raw file as the final photo.
#[derive(Debug, Default)]
pub struct MockCaptureProcessor {
    fail_remaining: AtomicUsize,
    calls: AtomicUsize,
}

impl MockCaptureProcessor {
    /// Processor that succeeds on every call.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` captures.
    pub fn fail_next(&self, count: usize) {
        self.fail_remaining.store(count, Ordering::SeqCst);
    }

    /// Number of captures received.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CaptureProcessor for MockCaptureProcessor {
    async fn process_capture(&self, capture: &RawCapture, _event: &EventRef) -> Result<PathBuf> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let should_fail = self
            .fail_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(Error::CaptureFailed("camera download failed".to_string()));
        }
        Ok(capture.source.clone())
    }
}

/// Beauty processor that only records the photos it was given.
#[derive(Debug, Default)]
pub struct MockBeautyProcessor {
    retouched: Mutex<Vec<(PathBuf, u8)>>,
    fail: bool,
}

impl MockBeautyProcessor {
    /// Processor that always succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Processor that always fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Photos retouched so far with their intensity.
    pub fn retouched(&self) -> Vec<(PathBuf, u8)> {
        self.retouched.lock().unwrap().clone()
    }
}

#[async_trait]
impl BeautyProcessor for MockBeautyProcessor {
    async fn apply_beauty(&self, path: &Path, intensity: u8) -> Result<()> {
        self.retouched
            .lock()
            .unwrap()
            .push((path.to_path_buf(), intensity));
        if self.fail {
            return Err(Error::Other("retouch model unavailable".to_string()));
        }
        Ok(())
    }
}

/// A write received by [`RecordingStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreRecord {
    /// `create_session`
    Session {
        /// Id handed out
        session_id: SessionId,
        /// Event id
        event_id: String,
        /// Template id
        template_id: String,
    },
    /// `save_photo`
    Photo {
        /// Session id
        session_id: SessionId,
        /// Photo path
        path: PathBuf,
        /// Photo index
        index: u32,
    },
    /// `save_animation`
    Animation {
        /// Session id
        session_id: SessionId,
        /// Animation path
        path: PathBuf,
        /// Format tag
        format: AnimationFormat,
    },
    /// `save_composed_image`
    Composed {
        /// Session id
        session_id: SessionId,
        /// Image path
        path: PathBuf,
        /// Format tag
        tag: ImageTag,
    },
}

/// Session store that keeps every write in memory.
#[derive(Debug, Default)]
pub struct RecordingStore {
    records: Mutex<Vec<StoreRecord>>,
    next_id: AtomicUsize,
    fail: bool,
}

impl RecordingStore {
    /// Store that accepts every write.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose every call fails, as if the database were unreachable.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// All successful writes in order.
    pub fn records(&self) -> Vec<StoreRecord> {
        self.records.lock().unwrap().clone()
    }

    /// Animation records only.
    pub fn animations(&self) -> Vec<(SessionId, PathBuf, AnimationFormat)> {
        self.records()
            .into_iter()
            .filter_map(|record| match record {
                StoreRecord::Animation {
                    session_id,
                    path,
                    format,
                } => Some((session_id, path, format)),
                _ => None,
            })
            .collect()
    }

    /// Composed image records only.
    pub fn composed_images(&self) -> Vec<(PathBuf, ImageTag)> {
        self.records()
            .into_iter()
            .filter_map(|record| match record {
                StoreRecord::Composed { path, tag, .. } => Some((path, tag)),
                _ => None,
            })
            .collect()
    }

    fn push(&self, record: StoreRecord) -> Result<()> {
        if self.fail {
            return Err(Error::Persistence("database is locked".to_string()));
        }
        self.records.lock().unwrap().push(record);
        Ok(())
    }
}

#[async_trait]
impl SessionStore for RecordingStore {
    async fn create_session(&self, event_id: &str, template_id: &str) -> Result<SessionId> {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let session_id = SessionId::new(format!("session-{n}"));
        self.push(StoreRecord::Session {
            session_id: session_id.clone(),
            event_id: event_id.to_string(),
            template_id: template_id.to_string(),
        })?;
        Ok(session_id)
    }

    async fn save_photo(&self, session_id: &SessionId, path: &Path, index: u32) -> Result<()> {
        self.push(StoreRecord::Photo {
            session_id: session_id.clone(),
            path: path.to_path_buf(),
            index,
        })
    }

    async fn save_animation(
        &self,
        session_id: &SessionId,
        path: &Path,
        format: AnimationFormat,
    ) -> Result<()> {
        self.push(StoreRecord::Animation {
            session_id: session_id.clone(),
            path: path.to_path_buf(),
            format,
        })
    }

    async fn save_composed_image(
        &self,
        session_id: &SessionId,
        path: &Path,
        tag: ImageTag,
    ) -> Result<()> {
        self.push(StoreRecord::Composed {
            session_id: session_id.clone(),
            path: path.to_path_buf(),
            tag,
        })
    }
}

/// Filter backend that copies the input file to the output path.
#[derive(Debug, Default)]
pub struct CopyFilterBackend {
    calls: Mutex<Vec<(PathBuf, PhotoFilter)>>,
}

impl CopyFilterBackend {
    /// New backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inputs received so far.
    pub fn calls(&self) -> Vec<(PathBuf, PhotoFilter)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FilterBackend for CopyFilterBackend {
    async fn apply_filter(
        &self,
        input: &Path,
        output: &Path,
        filter: PhotoFilter,
    ) -> Result<PathBuf> {
        self.calls.lock().unwrap().push((input.to_path_buf(), filter));
        std::fs::copy(input, output)?;
        Ok(output.to_path_buf())
    }
}

/// Outcome scripted for one encoder of [`MockEncoder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderBehavior {
    /// Write a small file at the requested path and return it
    Succeed,
    /// Return an empty path
    ReturnEmpty,
    /// Return the requested path without writing anything
    ReturnMissing,
    /// Return an error
    Fail,
    /// Never finish
    Stall,
}

/// Animation encoder with scripted video and GIF outcomes.
#[derive(Debug)]
pub struct MockEncoder {
    video: EncoderBehavior,
    gif: EncoderBehavior,
    video_calls: AtomicUsize,
    gif_calls: AtomicUsize,
}

impl MockEncoder {
    /// Encoder with the given video and GIF behavior.
    pub fn new(video: EncoderBehavior, gif: EncoderBehavior) -> Self {
        Self {
            video,
            gif,
            video_calls: AtomicUsize::new(0),
            gif_calls: AtomicUsize::new(0),
        }
    }

    /// Video encoder attempts.
    pub fn video_calls(&self) -> usize {
        self.video_calls.load(Ordering::SeqCst)
    }

    /// GIF encoder attempts.
    pub fn gif_calls(&self) -> usize {
        self.gif_calls.load(Ordering::SeqCst)
    }

    fn run(behavior: EncoderBehavior, output: &Path) -> Result<PathBuf> {
        match behavior {
            EncoderBehavior::Succeed => {
                std::fs::write(output, b"animation")?;
                Ok(output.to_path_buf())
            }
            EncoderBehavior::ReturnEmpty => Ok(PathBuf::new()),
            EncoderBehavior::ReturnMissing => Ok(output.to_path_buf()),
            EncoderBehavior::Fail | EncoderBehavior::Stall => {
                Err(Error::Encoder("encoder crashed".to_string()))
            }
        }
    }
}

#[async_trait]
impl AnimationEncoder for MockEncoder {
    async fn generate_looping_video(
        &self,
        _photos: &[PathBuf],
        output: &Path,
        _frame_delay_ms: u64,
    ) -> Result<PathBuf> {
        self.video_calls.fetch_add(1, Ordering::SeqCst);
        if self.video == EncoderBehavior::Stall {
            std::future::pending::<()>().await;
        }
        Self::run(self.video, output)
    }

    async fn generate_looping_gif(
        &self,
        _photos: &[PathBuf],
        output: &Path,
        _frame_delay_ms: u64,
        _options: GifOptions,
    ) -> Result<PathBuf> {
        self.gif_calls.fetch_add(1, Ordering::SeqCst);
        if self.gif == EncoderBehavior::Stall {
            std::future::pending::<()>().await;
        }
        Self::run(self.gif, output)
    }
}
