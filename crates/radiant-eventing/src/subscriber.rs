//! Subscriber contract for after-commit delivery.

use async_trait::async_trait;
use radiant_core::error::DomainError;
use radiant_core::store::StoredEvent;

/// Which event types a subscriber or projection consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFilter {
    /// A single event type.
    One(&'static str),
    /// Several event types.
    Many(&'static [&'static str]),
    /// Every event.
    All,
}

impl EventFilter {
    /// Returns `true` if `event_type` passes the filter.
    #[must_use]
    pub fn matches(&self, event_type: &str) -> bool {
        match self {
            Self::One(t) => *t == event_type,
            Self::Many(ts) => ts.contains(&event_type),
            Self::All => true,
        }
    }
}

/// Consumes committed events on its own task.
///
/// Delivery is at-least-once, so `handle` must be idempotent. An error is
/// logged by the bus and never reaches the writer or other subscribers.
#[async_trait]
pub trait EventSubscriber: Send + Sync {
    /// Subscriber name, used in logs.
    fn name(&self) -> &str;

    /// Event types this subscriber wants.
    fn filter(&self) -> EventFilter;

    /// Handles one event.
    async fn handle(&self, event: &StoredEvent) -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::EventFilter;

    #[test]
    fn test_filter_matching() {
        assert!(EventFilter::One("post.viewed").matches("post.viewed"));
        assert!(!EventFilter::One("post.viewed").matches("post.liked"));
        assert!(EventFilter::Many(&["post.created", "post.deleted"]).matches("post.deleted"));
        assert!(!EventFilter::Many(&["post.created"]).matches("post.viewed"));
        assert!(EventFilter::All.matches("anything"));
    }
}
