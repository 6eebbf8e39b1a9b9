//! Event broadcasting to lifecycle subscribers.

use tokio::sync::broadcast;
use tracing::debug;

use photobooth_core::SessionEvent;

/// Default number of events buffered per subscriber.
const DEFAULT_CAPACITY: usize = 256;

/// Broadcast channel carrying [`SessionEvent`]s.
///
/// Cloning the bus shares the channel. Emitting is non-blocking and safe from
/// any task; emitting with no subscribers is not an error.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    /// Create a bus buffering `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Register a subscriber that receives every event emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    /// Emit an event to all current subscribers.
    pub fn emit(&self, event: SessionEvent) {
        let name = event.name();
        match self.sender.send(event) {
            Ok(receivers) => debug!("Emitted {} to {} subscribers", name, receivers),
            Err(_) => debug!("Emitted {} with no subscribers", name),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
