//! In-process event bus.

use tokio::sync::broadcast;
use tracing::info;

use slm_core::events::DomainEvent;
use slm_core::traits::EventSink;

/// Default number of events buffered per subscriber.
const DEFAULT_CAPACITY: usize = 256;

/// Broadcasts domain events to any number of subscribers and logs each one.
///
/// Slow subscribers lose the oldest events; publishers never wait.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<DomainEvent>,
}

impl EventBus {
    /// A bus buffering `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Receive every event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventSink for EventBus {
    fn publish(&self, event: DomainEvent) {
        info!(
            event_id = %event.id,
            event = event.name(),
            payload = %serde_json::to_string(&event.payload).unwrap_or_default(),
            "Domain event"
        );
        // No subscribers is not an error.
        let _ = self.sender.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slm_core::events::{EventPayload, UsageEvent};

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let bus = EventBus::default();
        bus.publish(UsageEvent::UsageCleared.into());
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        bus.publish(
            UsageEvent::UsageUpdated {
                total_bytes: 10,
                delta: 10,
            }
            .into(),
        );

        let event = rx.recv().await.unwrap();
        assert_eq!(event.name(), "usage_updated");
        assert!(matches!(
            event.payload,
            EventPayload::Usage(UsageEvent::UsageUpdated { total_bytes: 10, .. })
        ));
    }
}
