//! Domain event abstractions.

use std::collections::BTreeMap;
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::codec::EventCodec;

/// Contextual metadata attached to every domain event.
///
/// Serialized separately from the event payload so it can be inspected
/// without decoding the event body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// The user on whose behalf the event was produced, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Correlation ID for tracing a request through its effects.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<Uuid>,
    /// ID of the event or command that caused this event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub causation_id: Option<Uuid>,
    /// Free-form additional data.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl EventMetadata {
    /// Metadata for an event caused directly by a command.
    #[must_use]
    pub fn for_command(correlation_id: Uuid, user_id: Option<String>) -> Self {
        Self {
            user_id,
            correlation_id: Some(correlation_id),
            causation_id: Some(correlation_id),
            extra: BTreeMap::new(),
        }
    }

    /// Metadata for an event caused by an earlier event. Correlation and user
    /// are inherited; causation points at the parent event.
    #[must_use]
    pub fn caused_by(parent_event_id: Uuid, parent: &EventMetadata) -> Self {
        Self {
            user_id: parent.user_id.clone(),
            correlation_id: parent.correlation_id,
            causation_id: Some(parent_event_id),
            extra: BTreeMap::new(),
        }
    }
}

/// Immutable envelope around a typed event payload.
#[derive(Debug, Clone, PartialEq)]
pub struct EventEnvelope<E> {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// Aggregate/stream this event belongs to.
    pub aggregate_id: Uuid,
    /// Position within the aggregate stream, starting at 1.
    pub sequence_number: i64,
    /// Schema version of the payload shape as written.
    pub schema_version: i32,
    /// Timestamp of event creation.
    pub occurred_at: DateTime<Utc>,
    /// Contextual metadata.
    pub metadata: EventMetadata,
    /// The typed payload.
    pub payload: E,
}

impl<E: DomainEvent> EventEnvelope<E> {
    /// Stable type discriminant of the payload.
    pub fn event_type(&self) -> &'static str {
        self.payload.event_type()
    }
}

/// Trait that all domain event payload enums implement.
///
/// Each variant maps to a stable string discriminant. Encoding is explicit per
/// variant and decoding goes through the registry returned by [`codec`], so no
/// runtime type lookup is involved.
///
/// [`codec`]: DomainEvent::codec
pub trait DomainEvent: Clone + Debug + Send + Sync + 'static {
    /// Returns the event type discriminant (used for decode routing).
    fn event_type(&self) -> &'static str;

    /// Schema version of the payload shape. Distinct from the aggregate
    /// sequence number.
    fn schema_version(&self) -> i32 {
        1
    }

    /// Serializes the variant body (without the enum tag) to JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns the underlying `serde_json` error if serialization fails.
    fn encode_payload(&self) -> serde_json::Result<Vec<u8>>;

    /// The decode registry for this event family.
    fn codec() -> &'static EventCodec<Self>;
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::EventMetadata;

    #[test]
    fn test_caused_by_inherits_correlation_and_user() {
        // Arrange
        let correlation_id = Uuid::new_v4();
        let parent_event_id = Uuid::new_v4();
        let parent = EventMetadata::for_command(correlation_id, Some("u1".to_owned()));

        // Act
        let child = EventMetadata::caused_by(parent_event_id, &parent);

        // Assert
        assert_eq!(child.correlation_id, Some(correlation_id));
        assert_eq!(child.causation_id, Some(parent_event_id));
        assert_eq!(child.user_id.as_deref(), Some("u1"));
    }

    #[test]
    fn test_empty_metadata_serializes_to_empty_object() {
        let json = serde_json::to_string(&EventMetadata::default()).unwrap();

        assert_eq!(json, "{}");
    }
}
