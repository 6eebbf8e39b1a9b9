//! Format tags attached to persisted session artifacts.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Container format of a looping animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AnimationFormat {
    /// Looping MP4 video (preferred)
    Mp4,
    /// Animated GIF (fallback)
    Gif,
}

impl AnimationFormat {
    /// Tag derived from the file extension actually produced.
    ///
    /// `.mp4` (any case) maps to [`AnimationFormat::Mp4`]; everything else is a GIF.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("mp4") => AnimationFormat::Mp4,
            _ => AnimationFormat::Gif,
        }
    }

    /// Persistence tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            AnimationFormat::Mp4 => "MP4",
            AnimationFormat::Gif => "GIF",
        }
    }

    /// File extension without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            AnimationFormat::Mp4 => "mp4",
            AnimationFormat::Gif => "gif",
        }
    }
}

impl fmt::Display for AnimationFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tag for a persisted composed image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImageTag {
    /// Display image of a strip-format template
    Strip,
    /// Display image of a full-sheet template
    FullSheet,
    /// Full-sheet copy made only for print routing
    PrintDuplicate,
}

impl ImageTag {
    /// Tag for the on-screen composed image.
    pub fn for_display(is_strip_format: bool) -> Self {
        if is_strip_format {
            ImageTag::Strip
        } else {
            ImageTag::FullSheet
        }
    }

    /// Persistence tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageTag::Strip => "strip",
            ImageTag::FullSheet => "full-sheet",
            ImageTag::PrintDuplicate => "print-duplicate",
        }
    }
}

impl fmt::Display for ImageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
