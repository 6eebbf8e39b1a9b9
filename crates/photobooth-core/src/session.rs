//! Session types for capture session tracking.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Opaque identifier for a capture session.
///
/// Assigned by the persistence collaborator; [`SessionId::generate`] exists for
/// stores that have no identifier scheme of their own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Wrap an identifier produced elsewhere.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Create a new random session ID.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short, filename-safe form of the identifier (at most 8 characters).
    pub fn short(&self) -> String {
        self.0
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .take(8)
            .collect()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Event (party, wedding, ...) the session belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRef {
    /// Event identifier
    pub id: String,
    /// Display name
    pub name: String,
}

impl EventRef {
    /// Create a new event reference.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Print template the captured photos will be composed into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateRef {
    /// Template identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Canvas width (any unit, only the ratio matters)
    pub width: f64,
    /// Canvas height
    pub height: f64,
}

impl TemplateRef {
    /// Create a new template reference.
    pub fn new(id: impl Into<String>, name: impl Into<String>, width: f64, height: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            width,
            height,
        }
    }

    /// Width / height ratio, `None` for a degenerate canvas.
    pub fn aspect_ratio(&self) -> Option<f64> {
        if self.width > 0.0 && self.height > 0.0 {
            Some(self.width / self.height)
        } else {
            None
        }
    }

    /// Whether the template falls within `tolerance` of the strip ratio.
    pub fn is_strip_format(&self, strip_ratio: f64, tolerance: f64) -> bool {
        self.aspect_ratio()
            .map(|ratio| (ratio - strip_ratio).abs() <= tolerance)
            .unwrap_or(false)
    }
}

/// Photo filter selected by the customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhotoFilter {
    /// No filter
    #[default]
    None,
    /// Black and white
    BlackAndWhite,
    /// Sepia tone
    Sepia,
    /// Faded vintage look
    Vintage,
    /// Warm color balance
    Warm,
    /// Cool color balance
    Cool,
    /// Boosted saturation
    Vivid,
}

impl PhotoFilter {
    /// Short name used in output filenames.
    pub fn as_str(&self) -> &'static str {
        match self {
            PhotoFilter::None => "none",
            PhotoFilter::BlackAndWhite => "bw",
            PhotoFilter::Sepia => "sepia",
            PhotoFilter::Vintage => "vintage",
            PhotoFilter::Warm => "warm",
            PhotoFilter::Cool => "cool",
            PhotoFilter::Vivid => "vivid",
        }
    }
}

impl fmt::Display for PhotoFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PhotoFilter {
    type Err = Error;

    /// Accepts the short filename form as well as the serialized name.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "" => Ok(PhotoFilter::None),
            "bw" | "black_and_white" => Ok(PhotoFilter::BlackAndWhite),
            "sepia" => Ok(PhotoFilter::Sepia),
            "vintage" => Ok(PhotoFilter::Vintage),
            "warm" => Ok(PhotoFilter::Warm),
            "cool" => Ok(PhotoFilter::Cool),
            "vivid" => Ok(PhotoFilter::Vivid),
            other => Err(Error::InvalidInput(format!("unknown filter '{}'", other))),
        }
    }
}

/// Composed output images: the on-screen image and the one sent to the printer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposedImages {
    /// Image shown on screen
    pub display_path: Option<PathBuf>,
    /// Image sent to the printer, when it differs from the display image
    pub print_path: Option<PathBuf>,
}

impl ComposedImages {
    /// Path to print: the print image if set, else the display image.
    pub fn print_path(&self) -> Option<&Path> {
        self.print_path
            .as_deref()
            .or(self.display_path.as_deref())
    }

    /// Whether printing goes through a separate duplicate image.
    pub fn has_print_duplicate(&self) -> bool {
        match (&self.display_path, &self.print_path) {
            (Some(display), Some(print)) => display != print,
            _ => false,
        }
    }
}

/// Mutable record of the in-progress session.
///
/// `Default` is the idle state: no id, zero counters, no paths, inactive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    /// Session identifier, `None` while idle
    pub session_id: Option<SessionId>,
    /// Event supplied at start
    pub event: Option<EventRef>,
    /// Template supplied at start
    pub template: Option<TemplateRef>,
    /// Derived once at start from the template's aspect ratio
    pub is_strip_format: bool,
    /// Captured photo paths in capture order
    pub captured_photo_paths: Vec<PathBuf>,
    /// Number of photos captured so far
    pub current_index: u32,
    /// Number of photos the session requires
    pub total_required: u32,
    /// Filter applied by the post-session pipeline
    pub selected_filter: PhotoFilter,
    /// Composed display and print images
    pub composed: ComposedImages,
    /// Finished looping animation
    pub animation_path: Option<PathBuf>,
    /// Gate for capture processing and completion
    pub is_active: bool,
    /// Post-session pipeline already ran for this session
    pub pipeline_triggered: bool,
    /// When the session started
    pub started_at: Option<DateTime<Utc>>,
    /// When the session was completed
    pub completed_at: Option<DateTime<Utc>>,
}

impl SessionState {
    /// Whether every required photo has been captured.
    pub fn is_complete(&self) -> bool {
        self.total_required > 0 && self.current_index >= self.total_required
    }

    /// Whether `id` names the session currently held in this state.
    pub fn is_current(&self, id: &SessionId) -> bool {
        self.session_id.as_ref() == Some(id)
    }

    /// Reset every field to its idle value.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Owned copy for subscribers; `None` while no session exists.
    pub fn snapshot(&self) -> Option<SessionSnapshot> {
        let session_id = self.session_id.clone()?;
        Some(SessionSnapshot {
            session_id,
            event: self.event.clone(),
            template: self.template.clone(),
            is_strip_format: self.is_strip_format,
            captured_photo_paths: self.captured_photo_paths.clone(),
            photos_captured: self.current_index,
            total_photos: self.total_required,
            selected_filter: self.selected_filter,
            composed_display_path: self.composed.display_path.clone(),
            composed_print_path: self.composed.print_path().map(Path::to_path_buf),
            animation_path: self.animation_path.clone(),
            started_at: self.started_at,
            completed_at: self.completed_at,
        })
    }
}

/// Immutable copy of a session taken at completion.
///
/// Owns all of its data, so clearing the live session never changes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Session identifier
    pub session_id: SessionId,
    /// Event the session belongs to
    pub event: Option<EventRef>,
    /// Template in use
    pub template: Option<TemplateRef>,
    /// Whether the template is strip-format
    pub is_strip_format: bool,
    /// Captured photo paths
    pub captured_photo_paths: Vec<PathBuf>,
    /// Photos captured
    pub photos_captured: u32,
    /// Photos required
    pub total_photos: u32,
    /// Selected filter
    pub selected_filter: PhotoFilter,
    /// Composed display image
    pub composed_display_path: Option<PathBuf>,
    /// Composed print image (defaults to the display image)
    pub composed_print_path: Option<PathBuf>,
    /// Looping animation, if generation had finished
    pub animation_path: Option<PathBuf>,
    /// Start time
    pub started_at: Option<DateTime<Utc>>,
    /// Completion time
    pub completed_at: Option<DateTime<Utc>>,
}
