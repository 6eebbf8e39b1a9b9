//! # photobooth-media
//!
//! Post-capture media pipeline for the photobooth session core.
//!
//! This crate provides:
//! - Looping animation generation with MP4 to GIF fallback
//! - Per-photo filter application with graceful per-item degradation
//! - Collision-free output file naming
//!
//! ## Architecture
//!
//! This is Layer 1 in the architecture - it depends on photobooth-core for
//! the collaborator traits and never touches pixels itself.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod animation;
pub mod filter;
pub mod naming;

// Re-export commonly used types
pub use animation::{AnimationGenerator, AnimationJob};
pub use filter::FilterApplicator;
pub use naming::{animation_stem, filtered_path, unique_output_path};
