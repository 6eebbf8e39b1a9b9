//! Error types for the photobooth session core.

use thiserror::Error;

/// Main error type for photobooth session operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A session is already in progress
    #[error("A session is already active")]
    AlreadyActive,

    /// Operation requires an active session
    #[error("No active session")]
    NoActiveSession,

    /// Every required photo has already been captured
    #[error("All {total} photos have already been captured")]
    AllPhotosCaptured {
        /// Photos required by the session
        total: u32,
    },

    /// Capture post-processing produced no usable file
    #[error("Capture failed: {0}")]
    CaptureFailed(String),

    /// Persistence collaborator failure
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Filter backend failure
    #[error("Filter error: {0}")]
    Filter(String),

    /// Animation encoder failure
    #[error("Encoder error: {0}")]
    Encoder(String),

    /// Background animation job exceeded its time budget
    #[error("Animation generation timed out after {0}s")]
    AnimationTimeout(u64),

    /// Invalid input or parameters
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with custom message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error comes from calling an operation in the wrong state.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Error::AlreadyActive
                | Error::NoActiveSession
                | Error::AllPhotosCaptured { .. }
                | Error::InvalidInput(_)
        )
    }

    /// Whether the UI should present this error to the customer as actionable.
    ///
    /// Animation and persistence failures degrade silently and never qualify.
    pub fn is_user_visible(&self) -> bool {
        self.is_usage_error() || matches!(self, Error::CaptureFailed(_))
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_active_error() {
        assert_eq!(Error::AlreadyActive.to_string(), "A session is already active");
    }

    #[test]
    fn test_no_active_session_error() {
        assert_eq!(Error::NoActiveSession.to_string(), "No active session");
    }

    #[test]
    fn test_all_photos_captured_error() {
        let err = Error::AllPhotosCaptured { total: 4 };
        assert_eq!(err.to_string(), "All 4 photos have already been captured");
    }

    #[test]
    fn test_capture_failed_error() {
        let err = Error::CaptureFailed("camera returned no file".to_string());
        assert_eq!(err.to_string(), "Capture failed: camera returned no file");
    }

    #[test]
    fn test_animation_timeout_error() {
        let err = Error::AnimationTimeout(120);
        assert_eq!(err.to_string(), "Animation generation timed out after 120s");
    }

    #[test]
    fn test_usage_errors() {
        assert!(Error::AlreadyActive.is_usage_error());
        assert!(Error::NoActiveSession.is_usage_error());
        assert!(Error::AllPhotosCaptured { total: 3 }.is_usage_error());
        assert!(!Error::CaptureFailed("x".to_string()).is_usage_error());
        assert!(!Error::Persistence("db locked".to_string()).is_usage_error());
    }

    #[test]
    fn test_user_visible_errors() {
        assert!(Error::CaptureFailed("x".to_string()).is_user_visible());
        assert!(Error::AlreadyActive.is_user_visible());
        assert!(!Error::Encoder("ffmpeg missing".to_string()).is_user_visible());
        assert!(!Error::Persistence("db locked".to_string()).is_user_visible());
        assert!(!Error::Filter("bad kernel".to_string()).is_user_visible());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_serialization_error_conversion() {
        let json_err = serde_json::from_str::<i32>("invalid json").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Serialization(_)));
    }
}
