//! Domain events emitted by the accounting service.
//!
//! Events are published through an [`EventSink`](crate::traits::EventSink)
//! and are purely observational: no accounting logic depends on a
//! subscriber being present.

pub mod settings;
pub mod usage;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use settings::SettingsEvent;
pub use usage::UsageEvent;

/// Wrapper for all domain events with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    /// Unique event ID.
    pub id: Uuid,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// The event payload.
    pub payload: EventPayload,
}

/// Union of all domain event types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event")]
pub enum EventPayload {
    /// A usage accounting event.
    Usage(UsageEvent),
    /// A quota settings event.
    Settings(SettingsEvent),
}

impl DomainEvent {
    /// Create a new domain event.
    pub fn new(payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            payload,
        }
    }

    /// Short event name used in logs.
    pub fn name(&self) -> &'static str {
        match &self.payload {
            EventPayload::Usage(event) => event.name(),
            EventPayload::Settings(event) => event.name(),
        }
    }
}

impl From<UsageEvent> for DomainEvent {
    fn from(event: UsageEvent) -> Self {
        Self::new(EventPayload::Usage(event))
    }
}

impl From<SettingsEvent> for DomainEvent {
    fn from(event: SettingsEvent) -> Self {
        Self::new(EventPayload::Settings(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_shape() {
        let event = DomainEvent::from(UsageEvent::UsageRecalculated {
            total_bytes: 42,
            processed: 2,
            missing: 1,
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["payload"]["domain"], "Usage");
        assert_eq!(json["payload"]["event"]["type"], "UsageRecalculated");
        assert_eq!(json["payload"]["event"]["missing"], 1);
        assert_eq!(event.name(), "usage_recalculated");
    }
}
