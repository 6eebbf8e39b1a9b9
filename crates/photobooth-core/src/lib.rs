//! # photobooth-core
//!
//! Core types for the photobooth session core.
//!
//! This crate contains all fundamental types with **no internal dependencies**
//! on other photobooth crates. It provides:
//!
//! - Session types (SessionId, SessionState, SessionSnapshot)
//! - Event and template references supplied by the caller
//! - Output format tags for animations and composed images
//! - Lifecycle events emitted to subscribers
//! - Collaborator traits (capture, persistence, filters, encoders)
//! - Configuration and error types
//! - In-memory collaborator doubles for tests
//!
//! ## Architecture
//!
//! This is Layer 0 in the architecture - all other crates depend on this one,
//! but this crate has no dependencies on other photobooth crates.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod collaborators;
pub mod config;
pub mod error;
pub mod event;
pub mod format;
pub mod session;
pub mod testing;

// Re-export commonly used types
pub use collaborators::{
    AnimationEncoder, BeautyProcessor, CaptureProcessor, FilterBackend, GifOptions, RawCapture,
    SessionStore,
};
pub use config::{
    AnimationSettings, AutoClearSettings, BeautySettings, BoothConfig, FilterSettings,
    LoggingSettings, SessionSettings, TemplateSettings,
};
pub use error::{Error, Result};
pub use event::{AnimationReady, SessionEvent};
pub use format::{AnimationFormat, ImageTag};
pub use session::{
    ComposedImages, EventRef, PhotoFilter, SessionId, SessionSnapshot, SessionState, TemplateRef,
};
