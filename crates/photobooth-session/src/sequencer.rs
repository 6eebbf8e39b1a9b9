//! Capture sequencing.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};

use photobooth_core::{
    BeautyProcessor, BeautySettings, CaptureProcessor, Error, RawCapture, Result, SessionId,
    SessionState, SessionStore,
};

/// Outcome of one accepted capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoProgress {
    /// Session the photo belongs to
    pub session_id: SessionId,
    /// Final photo path
    pub photo_path: PathBuf,
    /// One-based index of the photo
    pub index: u32,
    /// Photos the session requires
    pub total: u32,
    /// Whether this was the last required photo
    pub is_complete: bool,
}

/// Accepts captures one at a time and advances the photo index.
pub struct CaptureSequencer {
    capture: Arc<dyn CaptureProcessor>,
    beauty: Option<Arc<dyn BeautyProcessor>>,
    beauty_settings: BeautySettings,
    store: Arc<dyn SessionStore>,
}

impl CaptureSequencer {
    /// Create a sequencer. `beauty` is only used when enabled in `beauty_settings`.
    pub fn new(
        capture: Arc<dyn CaptureProcessor>,
        beauty: Option<Arc<dyn BeautyProcessor>>,
        beauty_settings: BeautySettings,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            capture,
            beauty,
            beauty_settings,
            store,
        }
    }

    /// Process one capture into `state`.
    ///
    /// On error `state` is left untouched: the photo is not counted.
    pub async fn process(
        &self,
        state: &mut SessionState,
        capture: &RawCapture,
    ) -> Result<PhotoProgress> {
        let (session_id, event) = match (&state.session_id, &state.event) {
            (Some(id), Some(event)) if state.is_active => (id.clone(), event.clone()),
            _ => return Err(Error::NoActiveSession),
        };

        if state.current_index >= state.total_required {
            return Err(Error::AllPhotosCaptured {
                total: state.total_required,
            });
        }

        debug!(
            "Processing capture {}/{} from {}",
            state.current_index + 1,
            state.total_required,
            capture.source.display()
        );

        let photo_path = match self.capture.process_capture(capture, &event).await {
            Ok(path) if !path.as_os_str().is_empty() => path,
            Ok(_) => {
                return Err(Error::CaptureFailed(
                    "capture processor returned no file".to_string(),
                ))
            }
            Err(Error::CaptureFailed(message)) => return Err(Error::CaptureFailed(message)),
            Err(e) => return Err(Error::CaptureFailed(e.to_string())),
        };

        self.retouch(&photo_path).await;

        state.captured_photo_paths.push(photo_path.clone());
        state.current_index += 1;
        let index = state.current_index;

        if let Err(e) = self.store.save_photo(&session_id, &photo_path, index).await {
            warn!("Failed to persist photo {} of session {}: {}", index, session_id, e);
        }

        let is_complete = state.is_complete();
        info!(
            "Photo {}/{} processed: session={}, path={}",
            index,
            state.total_required,
            session_id,
            photo_path.display()
        );

        Ok(PhotoProgress {
            session_id,
            photo_path,
            index,
            total: state.total_required,
            is_complete,
        })
    }

    async fn retouch(&self, path: &std::path::Path) {
        if !self.beauty_settings.enabled {
            return;
        }
        let Some(beauty) = &self.beauty else {
            return;
        };
        if let Err(e) = beauty
            .apply_beauty(path, self.beauty_settings.intensity)
            .await
        {
            warn!("Beauty pass failed for {}, keeping original: {}", path.display(), e);
        }
    }
}
