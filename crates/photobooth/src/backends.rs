//! Filesystem-backed collaborators.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use photobooth_core::{
    AnimationFormat, CaptureProcessor, Error, EventRef, ImageTag, RawCapture, Result, SessionId,
    SessionStore,
};

/// Copies each raw capture into a per-event photo directory.
pub struct FileCaptureProcessor {
    root: PathBuf,
}

impl FileCaptureProcessor {
    /// Store photos under `root/<event id>/`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl CaptureProcessor for FileCaptureProcessor {
    async fn process_capture(&self, capture: &RawCapture, event: &EventRef) -> Result<PathBuf> {
        if !tokio::fs::try_exists(&capture.source).await? {
            return Err(Error::CaptureFailed(format!(
                "capture file not found: {}",
                capture.source.display()
            )));
        }

        let dir = self.root.join(&event.id);
        tokio::fs::create_dir_all(&dir).await?;

        let name = capture
            .source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "capture.jpg".to_string());
        let target = dir.join(format!(
            "{}_{}",
            capture.captured_at.format("%Y%m%d_%H%M%S%3f"),
            name
        ));

        tokio::fs::copy(&capture.source, &target).await?;
        debug!("Stored capture {} -> {}", capture.source.display(), target.display());
        Ok(target)
    }
}

/// One line of the session journal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JournalEntry {
    /// A session was registered
    SessionCreated {
        /// New session id
        session_id: SessionId,
        /// Event the session belongs to
        event_id: String,
        /// Template the session uses
        template_id: String,
        /// Registration time
        at: DateTime<Utc>,
    },
    /// A photo was accepted
    Photo {
        /// Owning session
        session_id: SessionId,
        /// Photo file
        path: PathBuf,
        /// One-based index
        index: u32,
        /// Record time
        at: DateTime<Utc>,
    },
    /// A looping animation was produced
    Animation {
        /// Owning session
        session_id: SessionId,
        /// Animation file
        path: PathBuf,
        /// Encoded format
        format: AnimationFormat,
        /// Record time
        at: DateTime<Utc>,
    },
    /// A composed image was produced
    Composed {
        /// Owning session
        session_id: SessionId,
        /// Image file
        path: PathBuf,
        /// Image role
        tag: ImageTag,
        /// Record time
        at: DateTime<Utc>,
    },
}

/// Append-only JSON Lines session store.
pub struct JsonlSessionStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonlSessionStore {
    /// Journal at `path`; parent directories are created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Journal file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read back every entry written so far.
    pub async fn entries(&self) -> Result<Vec<JournalEntry>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(Error::from))
            .collect()
    }

    async fn append(&self, entry: &JournalEntry) -> Result<()> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let _guard = self.lock.lock().await;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| Error::Persistence(format!("{}: {}", self.path.display(), e)))?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for JsonlSessionStore {
    async fn create_session(&self, event_id: &str, template_id: &str) -> Result<SessionId> {
        let session_id = SessionId::generate();
        self.append(&JournalEntry::SessionCreated {
            session_id: session_id.clone(),
            event_id: event_id.to_string(),
            template_id: template_id.to_string(),
            at: Utc::now(),
        })
        .await?;
        Ok(session_id)
    }

    async fn save_photo(&self, session_id: &SessionId, path: &Path, index: u32) -> Result<()> {
        self.append(&JournalEntry::Photo {
            session_id: session_id.clone(),
            path: path.to_path_buf(),
            index,
            at: Utc::now(),
        })
        .await
    }

    async fn save_animation(
        &self,
        session_id: &SessionId,
        path: &Path,
        format: AnimationFormat,
    ) -> Result<()> {
        self.append(&JournalEntry::Animation {
            session_id: session_id.clone(),
            path: path.to_path_buf(),
            format,
            at: Utc::now(),
        })
        .await
    }

    async fn save_composed_image(
        &self,
        session_id: &SessionId,
        path: &Path,
        tag: ImageTag,
    ) -> Result<()> {
        self.append(&JournalEntry::Composed {
            session_id: session_id.clone(),
            path: path.to_path_buf(),
            tag,
            at: Utc::now(),
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_capture_copied_into_event_dir() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("IMG_0001.jpg");
        std::fs::write(&raw, b"jpeg").unwrap();
        let processor = FileCaptureProcessor::new(dir.path().join("photos"));

        let stored = processor
            .process_capture(&RawCapture::new(&raw), &EventRef::new("evt-1", "Gala"))
            .await
            .unwrap();

        assert!(stored.starts_with(dir.path().join("photos").join("evt-1")));
        assert!(stored.to_string_lossy().ends_with("_IMG_0001.jpg"));
        assert_eq!(std::fs::read(&stored).unwrap(), b"jpeg");
    }

    #[tokio::test]
    async fn test_missing_capture_is_capture_failure() {
        let dir = tempfile::tempdir().unwrap();
        let processor = FileCaptureProcessor::new(dir.path());

        let result = processor
            .process_capture(
                &RawCapture::new(dir.path().join("gone.jpg")),
                &EventRef::new("evt-1", "Gala"),
            )
            .await;
        assert!(matches!(result, Err(Error::CaptureFailed(_))));
    }

    #[tokio::test]
    async fn test_journal_appends_entries_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlSessionStore::new(dir.path().join("db").join("sessions.jsonl"));

        let id = store.create_session("evt-1", "tpl-1").await.unwrap();
        store
            .save_photo(&id, Path::new("/p/1.jpg"), 1)
            .await
            .unwrap();
        store
            .save_animation(&id, Path::new("/p/anim.gif"), AnimationFormat::Gif)
            .await
            .unwrap();
        store
            .save_composed_image(&id, Path::new("/p/strip.jpg"), ImageTag::Strip)
            .await
            .unwrap();

        let entries = store.entries().await.unwrap();
        assert_eq!(entries.len(), 4);
        assert!(matches!(
            &entries[0],
            JournalEntry::SessionCreated { session_id, event_id, .. }
                if session_id == &id && event_id == "evt-1"
        ));
        assert!(matches!(&entries[1], JournalEntry::Photo { index: 1, .. }));
        assert!(matches!(
            &entries[2],
            JournalEntry::Animation { format: AnimationFormat::Gif, .. }
        ));
        assert!(matches!(
            &entries[3],
            JournalEntry::Composed { tag: ImageTag::Strip, .. }
        ));
    }

    #[tokio::test]
    async fn test_entries_of_missing_journal_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlSessionStore::new(dir.path().join("none.jsonl"));
        assert!(store.entries().await.unwrap().is_empty());
    }
}
