//! # photobooth-session
//!
//! Capture session lifecycle management for self-service photo kiosks.
//!
//! This crate provides:
//! - Session start, completion, cancellation and reset
//! - Capture sequencing and completion detection
//! - Display/print composed image tracking
//! - Inactivity auto-clear
//! - Event broadcasting to subscribers
//! - A single coordinating task that serialises every state transition
//!
//! ## Architecture
//!
//! This is Layer 2 in the architecture - it depends on photobooth-core and
//! photobooth-media to drive one capture session at a time.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bus;
pub mod controller;
pub mod runtime;
pub mod sequencer;
pub mod timer;
pub mod tracker;

// Re-export commonly used types
pub use bus::EventBus;
pub use controller::{Collaborators, SessionLifecycleController, SessionPhase};
pub use runtime::{SessionHandle, SessionRuntime};
pub use sequencer::{CaptureSequencer, PhotoProgress};
pub use timer::{AutoClearTimer, TimerTick, TICK_INTERVAL};
pub use tracker::DualPathImageTracker;
