//! Lifecycle events emitted to subscribers.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{AnimationFormat, EventRef, SessionId, SessionSnapshot, TemplateRef};

/// Result of a finished background animation job.
///
/// Carries the session it was generated for; consumers compare it against the
/// current session before acting on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationReady {
    /// Session the animation was generated for
    pub session_id: SessionId,
    /// Finished animation file
    pub animation_path: PathBuf,
    /// Format actually produced
    pub format: AnimationFormat,
}

/// Event emitted by the session lifecycle controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A new session started
    SessionStarted {
        /// New session id
        session_id: SessionId,
        /// Event supplied by the caller
        event: EventRef,
        /// Template supplied by the caller
        template: TemplateRef,
        /// Photos the session requires
        total_photos: u32,
    },

    /// A capture was accepted
    PhotoProcessed {
        /// Session id
        session_id: SessionId,
        /// Final path of the photo
        photo_path: PathBuf,
        /// One-based index of this photo
        index: u32,
        /// Photos the session requires
        total_photos: u32,
        /// Whether this was the last required photo
        is_complete: bool,
    },

    /// The looping animation for the current session is available
    AnimationReady(AnimationReady),

    /// The session was completed
    SessionCompleted(Box<SessionSnapshot>),

    /// An operation failed in a way the caller should know about
    SessionError {
        /// Error message
        error: String,
        /// Operation that failed
        operation: String,
    },

    /// The session was abandoned before completion
    SessionCancelled {
        /// Abandoned session id
        session_id: SessionId,
    },

    /// All session state was reset
    SessionCleared,

    /// The inactivity timer ran out
    AutoClearTimerExpired,
}

impl SessionEvent {
    /// Stable event name for logging and filtering.
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::SessionStarted { .. } => "session_started",
            SessionEvent::PhotoProcessed { .. } => "photo_processed",
            SessionEvent::AnimationReady(_) => "animation_ready",
            SessionEvent::SessionCompleted(_) => "session_completed",
            SessionEvent::SessionError { .. } => "session_error",
            SessionEvent::SessionCancelled { .. } => "session_cancelled",
            SessionEvent::SessionCleared => "session_cleared",
            SessionEvent::AutoClearTimerExpired => "auto_clear_timer_expired",
        }
    }

    /// Session the event refers to, if any.
    pub fn session_id(&self) -> Option<&SessionId> {
        match self {
            SessionEvent::SessionStarted { session_id, .. }
            | SessionEvent::PhotoProcessed { session_id, .. }
            | SessionEvent::SessionCancelled { session_id } => Some(session_id),
            SessionEvent::AnimationReady(ready) => Some(&ready.session_id),
            SessionEvent::SessionCompleted(snapshot) => Some(&snapshot.session_id),
            SessionEvent::SessionError { .. }
            | SessionEvent::SessionCleared
            | SessionEvent::AutoClearTimerExpired => None,
        }
    }
}
