//! Fire-and-forget event publication.

use crate::events::DomainEvent;

/// Receives domain events. Publishing never fails and never blocks on
/// subscribers.
pub trait EventSink: Send + Sync + std::fmt::Debug + 'static {
    /// Publish an event.
    fn publish(&self, event: DomainEvent);
}
