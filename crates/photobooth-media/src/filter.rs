//! Photo filter pass over the captured photos.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};

use photobooth_core::{FilterBackend, PhotoFilter};

use crate::naming::filtered_path;

/// Replaces captured photos with filtered copies.
///
/// Pixel work is delegated to the [`FilterBackend`]. A photo that is missing or
/// fails to filter keeps its original path, so the count and order of the
/// photos never change.
pub struct FilterApplicator {
    backend: Arc<dyn FilterBackend>,
    enabled: bool,
}

impl FilterApplicator {
    /// Create an applicator; `enabled` is the global filter switch.
    pub fn new(backend: Arc<dyn FilterBackend>, enabled: bool) -> Self {
        Self { backend, enabled }
    }

    /// Whether a pass with `filter` would touch any file.
    pub fn is_active_for(&self, filter: PhotoFilter) -> bool {
        self.enabled && filter != PhotoFilter::None
    }

    /// Filter every photo and return the resulting list.
    pub async fn apply(&self, paths: &[PathBuf], filter: PhotoFilter) -> Vec<PathBuf> {
        if !self.is_active_for(filter) {
            return paths.to_vec();
        }

        info!("Applying {} filter to {} photos", filter, paths.len());

        let mut filtered = Vec::with_capacity(paths.len());
        for input in paths {
            filtered.push(self.apply_one(input.clone(), filter).await);
        }
        filtered
    }

    async fn apply_one(&self, input: PathBuf, filter: PhotoFilter) -> PathBuf {
        if !tokio::fs::try_exists(&input).await.unwrap_or(false) {
            warn!("Photo {} is missing, keeping it unfiltered", input.display());
            return input;
        }

        let output = filtered_path(&input, filter);
        match self.backend.apply_filter(&input, &output, filter).await {
            Ok(path) if !path.as_os_str().is_empty() => {
                debug!("Filtered {} -> {}", input.display(), path.display());
                path
            }
            Ok(_) => {
                warn!("Filter produced no file for {}", input.display());
                input
            }
            Err(e) => {
                warn!("Filter failed for {}: {}", input.display(), e);
                input
            }
        }
    }
}
