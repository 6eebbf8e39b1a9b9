//! Output file naming.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use photobooth_core::{PhotoFilter, SessionId};

/// Length of the random suffix appended on a name collision.
const DISAMBIGUATOR_LEN: usize = 6;

/// Base filename for a session animation: timestamp plus short session id.
pub fn animation_stem(now: DateTime<Utc>, session_id: &SessionId) -> String {
    format!(
        "animation_{}_{}",
        now.format("%Y%m%d_%H%M%S"),
        session_id.short()
    )
}

/// `dir/stem.ext`, or `dir/stem_xxxxxx.ext` if that file already exists.
pub async fn unique_output_path(dir: &Path, stem: &str, extension: &str) -> PathBuf {
    let candidate = dir.join(format!("{stem}.{extension}"));
    if !exists(&candidate).await {
        return candidate;
    }

    loop {
        let suffix: String = Uuid::new_v4()
            .simple()
            .to_string()
            .chars()
            .take(DISAMBIGUATOR_LEN)
            .collect();
        let candidate = dir.join(format!("{stem}_{suffix}.{extension}"));
        if !exists(&candidate).await {
            return candidate;
        }
    }
}

/// Output path for a filtered copy of `input`, next to the original.
///
/// `/photos/shot_1.jpg` with sepia becomes `/photos/shot_1_sepia.jpg`.
pub fn filtered_path(input: &Path, filter: PhotoFilter) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "photo".to_string());
    let file_name = match input.extension() {
        Some(ext) => format!("{stem}_{filter}.{}", ext.to_string_lossy()),
        None => format!("{stem}_{filter}"),
    };
    input.with_file_name(file_name)
}

async fn exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}
