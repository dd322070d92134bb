//! Diagnostic event channel
//!
//! Partial failure is silent at the data level (a failing platform simply
//! contributes no posts), so the engine and the request layer publish what
//! happened here. Consumers subscribe; emitters never block.
//!
//! # Example
//!
//! ```
//! use libplurfeed::events::{Event, EventBus};
//! use libplurfeed::types::PlatformId;
//!
//! let bus = EventBus::new(100);
//! let mut receiver = bus.subscribe();
//!
//! bus.emit(Event::PlatformFetched {
//!     platform: PlatformId::Mastodon,
//!     count: 3,
//! });
//!
//! let event = receiver.try_recv().unwrap();
//! assert!(matches!(event, Event::PlatformFetched { count: 3, .. }));
//! ```

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::types::PlatformId;

/// Event receiver type alias
pub type EventReceiver = broadcast::Receiver<Event>;

/// Broadcast bus for diagnostic events
///
/// Events are dropped if no subscribers exist. Lagging subscribers lose the
/// oldest events first.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a new event bus buffering `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    /// Emit an event to all current subscribers
    pub fn emit(&self, event: Event) {
        // send() returns Err if no receivers exist, which is fine
        let _ = self.sender.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}

/// Engine operation an event refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Fetch,
    Post,
    Authenticate,
    Interact,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Fetch => write!(f, "fetch"),
            Operation::Post => write!(f, "post"),
            Operation::Authenticate => write!(f, "authenticate"),
            Operation::Interact => write!(f, "interact"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// An aggregation pass started over these platforms
    AggregationStarted {
        platforms: Vec<PlatformId>,
        limit: usize,
    },

    /// One platform contributed posts to a pass
    PlatformFetched { platform: PlatformId, count: usize },

    /// One platform failed an operation; the operation as a whole continued
    PlatformFailed {
        platform: PlatformId,
        operation: Operation,
        error: String,
    },

    /// An aggregation pass finished
    AggregationCompleted {
        total: usize,
        failed: Vec<PlatformId>,
    },

    /// The credential store could not be read; the call went out
    /// unauthenticated
    CredentialUnavailable { platform: PlatformId, error: String },
}
