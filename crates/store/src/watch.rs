//! Watch/Notify bus
//!
//! One broadcast channel per kind. Every subscriber receives every event
//! independently. Events are published while the store holds its write
//! lock, so each subscriber sees the events of a single object in the order
//! they were applied.
//!
//! Buffers are bounded: a subscriber that falls behind loses its oldest
//! unconsumed events and gets a `Resync` instead, telling it to re-list.

use objects::{Kind, Object};
use std::collections::HashMap;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::{trace, warn};

/// Default per-subscriber buffer size.
pub const DEFAULT_WATCH_BUFFER: usize = 256;

/// A change notification.
#[derive(Debug, Clone, PartialEq)]
pub enum WatchEvent {
    /// Object created
    Added(Object),

    /// Object updated (spec, status or metadata)
    Modified(Object),

    /// Object removed, carrying its last stored state
    Deleted(Object),

    /// Events were dropped for this subscriber; re-list to resynchronize
    Resync,
}

impl WatchEvent {
    /// The object carried by the event, if any.
    #[must_use]
    pub fn object(&self) -> Option<&Object> {
        match self {
            WatchEvent::Added(o) | WatchEvent::Modified(o) | WatchEvent::Deleted(o) => Some(o),
            WatchEvent::Resync => None,
        }
    }
}

/// Broadcast bus keyed by kind.
#[derive(Debug)]
pub struct WatchBus {
    senders: HashMap<Kind, broadcast::Sender<WatchEvent>>,
}

impl WatchBus {
    /// Create a bus whose subscribers buffer up to `capacity` events each.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let senders = Kind::ALL
            .iter()
            .map(|kind| (*kind, broadcast::channel(capacity).0))
            .collect();
        Self { senders }
    }

    /// Deliver `event` to every current subscriber of the object's kind.
    pub fn publish(&self, event: WatchEvent) {
        let Some(kind) = event.object().map(Object::kind) else {
            return;
        };
        if let Some(sender) = self.senders.get(&kind) {
            if sender.send(event).is_err() {
                trace!("No subscribers for {} events", kind);
            }
        }
    }

    /// New independent subscription to `kind`.
    #[must_use]
    pub fn subscribe(&self, kind: Kind) -> Watch {
        let receiver = match self.senders.get(&kind) {
            Some(sender) => sender.subscribe(),
            // Every kind gets a sender in `new`; an unknown kind gets a closed stream.
            None => broadcast::channel(1).1,
        };
        Watch { kind, receiver }
    }
}

impl Default for WatchBus {
    fn default() -> Self {
        Self::new(DEFAULT_WATCH_BUFFER)
    }
}

/// Receiving end of a subscription.
#[derive(Debug)]
pub struct Watch {
    kind: Kind,
    receiver: broadcast::Receiver<WatchEvent>,
}

impl Watch {
    /// Kind this subscription follows.
    #[must_use]
    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// Wait for the next event. `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<WatchEvent> {
        match self.receiver.recv().await {
            Ok(event) => Some(event),
            Err(RecvError::Lagged(skipped)) => {
                warn!("{} watch fell behind, {} events dropped, resync required", self.kind, skipped);
                Some(WatchEvent::Resync)
            }
            Err(RecvError::Closed) => None,
        }
    }

    /// Next buffered event without waiting.
    pub fn try_recv(&mut self) -> Option<WatchEvent> {
        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Lagged(skipped)) => {
                warn!("{} watch fell behind, {} events dropped, resync required", self.kind, skipped);
                Some(WatchEvent::Resync)
            }
            Err(TryRecvError::Empty | TryRecvError::Closed) => None,
        }
    }
}
