//! # Event bus for lifecycle events.
//!
//! [`Bus`] wraps [`tokio::sync::broadcast`] so that many concurrent service
//! workers can publish without blocking.
//!
//! ```text
//! Publishers (many):                 Receivers:
//!   worker A ──┐
//!   worker B ──┼──────► Bus ───────► subscriber listener ────► SubscriberSet
//!   worker C ──┤  (broadcast chan) └► Manager::events() receivers
//!   discovery ─┘
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks.
//! - **Bounded capacity**: one ring buffer shared by all receivers.
//! - **Lag handling**: slow receivers get `RecvError::Lagged(n)` and skip `n` items.
//! - **No persistence**: events are dropped when nobody is subscribed.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for lifecycle events. Cheap to clone.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus; capacity is clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all current receivers.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a receiver that observes events sent after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[tokio::test]
    async fn receivers_see_events_published_after_subscribing() {
        let bus = Bus::new(0);
        bus.publish(Event::new(EventKind::ServiceRunning).with_service("early"));

        let mut rx = bus.subscribe();
        bus.publish(Event::new(EventKind::ServiceStopped).with_service("web"));

        let ev = rx.recv().await.expect("event");
        assert_eq!(ev.kind, EventKind::ServiceStopped);
        assert_eq!(ev.service.as_deref(), Some("web"));
    }
}
