//! Event store abstraction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DomainError;

/// An encoded event that has not been appended yet. The store assigns its
/// sequence number and global position.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingEvent {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// Event type discriminant for decode routing.
    pub event_type: String,
    /// Schema version of the payload shape.
    pub schema_version: i32,
    /// JSON-encoded payload.
    pub payload: Vec<u8>,
    /// JSON-encoded metadata.
    pub metadata: Vec<u8>,
    /// Timestamp of event creation.
    pub occurred_at: DateTime<Utc>,
}

/// Persisted representation of a domain event.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEvent {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// Aggregate this event belongs to.
    pub aggregate_id: Uuid,
    /// Event type discriminant for decode routing.
    pub event_type: String,
    /// Sequence number within the aggregate stream, contiguous from 1.
    pub sequence_number: i64,
    /// Position in the global log, strictly increasing across all streams.
    pub global_position: i64,
    /// Schema version of the payload shape.
    pub schema_version: i32,
    /// JSON-encoded payload.
    pub payload: Vec<u8>,
    /// JSON-encoded metadata.
    pub metadata: Vec<u8>,
    /// Timestamp of event creation.
    pub occurred_at: DateTime<Utc>,
}

impl StoredEvent {
    /// Builds the stored form of a pending event once the store has assigned
    /// its positions.
    #[must_use]
    pub fn from_pending(
        pending: PendingEvent,
        aggregate_id: Uuid,
        sequence_number: i64,
        global_position: i64,
    ) -> Self {
        Self {
            event_id: pending.event_id,
            aggregate_id,
            event_type: pending.event_type,
            sequence_number,
            global_position,
            schema_version: pending.schema_version,
            payload: pending.payload,
            metadata: pending.metadata,
            occurred_at: pending.occurred_at,
        }
    }
}

/// Append-only event log with per-aggregate optimistic concurrency.
///
/// Implementations must make `append` all-or-nothing: either every event is
/// persisted with contiguous sequence numbers, or none is.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Appends events to an aggregate stream.
    ///
    /// An empty `events` list is a no-op. Sequence numbers are assigned as
    /// `expected_version + index + 1`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::ConcurrencyConflict` if the stream's current
    /// version differs from `expected_version`; nothing is persisted in that
    /// case.
    async fn append(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        events: Vec<PendingEvent>,
    ) -> Result<Vec<StoredEvent>, DomainError>;

    /// Loads the full stream of an aggregate, ascending by sequence number.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::AggregateNotFound` if the stream has no events.
    async fn load(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError>;

    /// Loads the events of an aggregate with a sequence number greater than
    /// `from_version`. May be empty.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` on storage failure.
    async fn load_from(
        &self,
        aggregate_id: Uuid,
        from_version: i64,
    ) -> Result<Vec<StoredEvent>, DomainError>;

    /// Loads the entire global log ordered by global position.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` on storage failure.
    async fn load_all(&self) -> Result<Vec<StoredEvent>, DomainError>;

    /// Loads the global log tail after `watermark` (exclusive).
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` on storage failure.
    async fn load_all_from(&self, watermark: i64) -> Result<Vec<StoredEvent>, DomainError>;
}
