//! Inactivity countdown that resets the session.

use std::time::Duration;

use tracing::{debug, info};

use photobooth_core::AutoClearSettings;

/// Fixed interval between ticks.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Outcome of a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerTick {
    /// The timer is not running
    Idle,
    /// Still counting down
    Counting {
        /// Seconds elapsed since start
        elapsed_secs: u64,
        /// Seconds left before expiry
        remaining_secs: u64,
    },
    /// The timeout was reached; the timer has stopped itself
    Expired,
}

/// Tick-driven auto-clear countdown.
///
/// The owner feeds one [`tick`](Self::tick) per [`TICK_INTERVAL`]; the timer
/// only counts, so it never fires twice and never runs concurrently with
/// itself.
#[derive(Debug, Clone)]
pub struct AutoClearTimer {
    enabled: bool,
    timeout_secs: u64,
    elapsed_secs: u64,
    running: bool,
}

impl AutoClearTimer {
    /// Create a stopped timer from configuration.
    pub fn new(settings: &AutoClearSettings) -> Self {
        Self {
            enabled: settings.enabled,
            timeout_secs: settings.timeout_secs,
            elapsed_secs: 0,
            running: false,
        }
    }

    /// Start counting from zero; restarts if already running.
    ///
    /// Does nothing when auto-clear is disabled.
    pub fn start(&mut self) {
        if !self.enabled {
            debug!("Auto-clear disabled, timer not started");
            return;
        }
        if self.running {
            debug!("Auto-clear timer restarted");
        } else {
            info!("Auto-clear timer started: {}s", self.timeout_secs);
        }
        self.elapsed_secs = 0;
        self.running = true;
    }

    /// Stop counting and reset. Safe when not running.
    pub fn stop(&mut self) {
        self.running = false;
        self.elapsed_secs = 0;
    }

    /// Advance by one tick.
    pub fn tick(&mut self) -> TimerTick {
        if !self.running {
            return TimerTick::Idle;
        }

        self.elapsed_secs += 1;
        if self.elapsed_secs >= self.timeout_secs {
            info!("Auto-clear timer expired after {}s", self.elapsed_secs);
            self.stop();
            return TimerTick::Expired;
        }

        TimerTick::Counting {
            elapsed_secs: self.elapsed_secs,
            remaining_secs: self.timeout_secs - self.elapsed_secs,
        }
    }

    /// Whether the timer is counting.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Seconds counted since the last start.
    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed_secs
    }

    /// Seconds left, `None` when not running.
    pub fn remaining_secs(&self) -> Option<u64> {
        self.running
            .then(|| self.timeout_secs.saturating_sub(self.elapsed_secs))
    }
}
