//! Broadcast event bus for distributing `TurnEvent` to multiple subscribers.
//!
//! Built on `tokio::sync::broadcast`, the `EventBus` supports multiple
//! concurrent subscribers. Publishing with no active subscribers is a no-op.

use suasion_types::event::TurnEvent;
use tokio::sync::broadcast;

/// Multi-consumer event bus for turn lifecycle events.
///
/// Wraps a `tokio::sync::broadcast` channel. Cloning the bus clones the
/// sender, allowing multiple producers and consumers.
pub struct EventBus {
    sender: broadcast::Sender<TurnEvent>,
}

impl EventBus {
    /// Create a new event bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Create a new subscriber that will receive all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<TurnEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no subscribers, the event is silently dropped.
    pub fn publish(&self, event: TurnEvent) {
        let _ = self.sender.send(event);
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("receiver_count", &self.sender.receiver_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn sample_event() -> TurnEvent {
        TurnEvent::TurnStarted {
            conversation_id: Uuid::now_v7(),
            message_id: Uuid::now_v7(),
        }
    }

    #[tokio::test]
    async fn publish_and_subscribe_delivers_event() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(sample_event());

        let received = rx.recv().await.unwrap();
        assert!(matches!(received, TurnEvent::TurnStarted { .. }));
    }

    #[tokio::test]
    async fn multiple_subscribers_each_receive_event() {
        let bus = EventBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(sample_event());

        assert!(matches!(rx1.recv().await.unwrap(), TurnEvent::TurnStarted { .. }));
        assert!(matches!(rx2.recv().await.unwrap(), TurnEvent::TurnStarted { .. }));
    }

    #[tokio::test]
    async fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::new(16);
        bus.publish(sample_event());
        bus.publish(sample_event());
    }

    #[test]
    fn clone_shares_channel() {
        let bus = EventBus::new(16);
        let bus2 = bus.clone();
        let mut rx = bus.subscribe();

        bus2.publish(sample_event());

        assert!(rx.try_recv().is_ok());
    }
}
