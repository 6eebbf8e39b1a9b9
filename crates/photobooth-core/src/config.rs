//! Configuration types for the photobooth session core.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::Error;

/// Booth configuration loaded from YAML file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BoothConfig {
    /// Session settings
    pub session: SessionSettings,
    /// Looping animation settings
    pub animation: AnimationSettings,
    /// Automatic session reset settings
    pub auto_clear: AutoClearSettings,
    /// Cosmetic retouch settings
    pub beauty: BeautySettings,
    /// Photo filter settings
    pub filters: FilterSettings,
    /// Template classification settings
    pub template: TemplateSettings,
    /// Logging settings
    pub logging: LoggingSettings,
}

impl BoothConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML string.
    pub fn from_yaml(yaml: &str) -> crate::Result<Self> {
        let config: BoothConfig =
            serde_yaml::from_str(yaml).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> crate::Result<()> {
        if self.session.default_photo_count == 0 {
            return Err(Error::Config(
                "session.default_photo_count must be > 0".to_string(),
            ));
        }

        self.animation.validate()?;

        if self.auto_clear.enabled && self.auto_clear.timeout_secs == 0 {
            return Err(Error::Config(
                "auto_clear.timeout_secs must be > 0 when auto_clear is enabled".to_string(),
            ));
        }

        if self.beauty.intensity > 100 {
            return Err(Error::Config(format!(
                "beauty.intensity must be within 0..=100, got {}",
                self.beauty.intensity
            )));
        }

        if self.template.strip_ratio <= 0.0 || self.template.strip_tolerance <= 0.0 {
            return Err(Error::Config(
                "template.strip_ratio and template.strip_tolerance must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Photos taken per session unless the caller overrides it
    pub default_photo_count: u32,
    /// Directory where animations and filtered photos are written
    pub output_directory: PathBuf,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            default_photo_count: 4,
            output_directory: PathBuf::from("./output"),
        }
    }
}

/// Looping animation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationSettings {
    /// Generate a looping animation after the last capture
    pub enabled: bool,
    /// Delay between frames in milliseconds
    pub frame_delay_ms: u64,
    /// Maximum GIF width in pixels
    pub gif_max_width: u32,
    /// Maximum GIF height in pixels
    pub gif_max_height: u32,
    /// GIF quality (1-100)
    pub gif_quality: u8,
    /// Upper bound on a single background generation job in seconds
    pub timeout_secs: u64,
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            frame_delay_ms: 500,
            gif_max_width: 800,
            gif_max_height: 800,
            gif_quality: 85,
            timeout_secs: 120,
        }
    }
}

impl AnimationSettings {
    fn validate(&self) -> crate::Result<()> {
        if self.frame_delay_ms == 0 {
            return Err(Error::Config(
                "animation.frame_delay_ms must be > 0".to_string(),
            ));
        }
        if self.gif_max_width == 0 || self.gif_max_height == 0 {
            return Err(Error::Config(
                "animation GIF dimensions must be > 0".to_string(),
            ));
        }
        if !(1..=100).contains(&self.gif_quality) {
            return Err(Error::Config(format!(
                "animation.gif_quality must be within 1..=100, got {}",
                self.gif_quality
            )));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Config(
                "animation.timeout_secs must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Automatic session reset settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoClearSettings {
    /// Reset the session after a period of inactivity
    pub enabled: bool,
    /// Inactivity period in seconds
    pub timeout_secs: u64,
}

impl Default for AutoClearSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_secs: 60,
        }
    }
}

/// Cosmetic retouch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BeautySettings {
    /// Apply the beauty pass to each captured photo
    pub enabled: bool,
    /// Retouch strength (0-100)
    pub intensity: u8,
}

impl Default for BeautySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            intensity: 50,
        }
    }
}

/// Photo filter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    /// Global switch for photo filters
    pub enabled: bool,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Template classification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateSettings {
    /// Width / height ratio of a strip template (2x6 inch strip by default)
    pub strip_ratio: f64,
    /// Accepted deviation around `strip_ratio`
    pub strip_tolerance: f64,
}

impl Default for TemplateSettings {
    fn default() -> Self {
        Self {
            strip_ratio: 2.0 / 6.0,
            strip_tolerance: 0.1,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
