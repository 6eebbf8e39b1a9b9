//! Tracking of the composed display image and its print counterpart.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use photobooth_core::{ComposedImages, Error, ImageTag, Result, SessionState, SessionStore};

/// Records the composed image shown on screen and the one sent to the printer.
///
/// A strip composition is often duplicated onto a full sheet purely so a
/// full-sheet printer can take it; that duplicate is persisted separately so
/// reprints do not depend on the display artifact.
pub struct DualPathImageTracker {
    store: Arc<dyn SessionStore>,
}

impl DualPathImageTracker {
    /// Create a tracker persisting through `store`.
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Store the composed images; the print image defaults to the display image.
    ///
    /// Persistence failures are logged; the in-memory paths are set regardless.
    pub async fn set(
        &self,
        state: &mut SessionState,
        display_path: PathBuf,
        print_path: Option<PathBuf>,
    ) -> Result<()> {
        let session_id = match &state.session_id {
            Some(id) if state.is_active => id.clone(),
            _ => return Err(Error::NoActiveSession),
        };
        let print_path = print_path.unwrap_or_else(|| display_path.clone());

        let display_tag = ImageTag::for_display(state.is_strip_format);
        if let Err(e) = self
            .store
            .save_composed_image(&session_id, &display_path, display_tag)
            .await
        {
            warn!(
                "Failed to persist {} image for session {}: {}",
                display_tag, session_id, e
            );
        }

        if print_path != display_path {
            if let Err(e) = self
                .store
                .save_composed_image(&session_id, &print_path, ImageTag::PrintDuplicate)
                .await
            {
                warn!(
                    "Failed to persist print duplicate for session {}: {}",
                    session_id, e
                );
            }
        }

        info!(
            "Composed image set: session={}, display={}, print={}",
            session_id,
            display_path.display(),
            print_path.display()
        );
        state.composed = ComposedImages {
            display_path: Some(display_path),
            print_path: Some(print_path),
        };
        Ok(())
    }

    /// Image to print: the print image if set, else the display image.
    pub fn print_path(state: &SessionState) -> Option<&Path> {
        state.composed.print_path()
    }
}
