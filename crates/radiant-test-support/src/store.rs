//! Test stores — mock `EventStore` implementations for tests.

use std::sync::Mutex;

use async_trait::async_trait;
use radiant_core::clock::Clock;
use radiant_core::error::DomainError;
use radiant_core::event::{DomainEvent, EventEnvelope, EventMetadata};
use radiant_core::store::{EventStore, PendingEvent, StoredEvent};
use uuid::Uuid;

fn assign(aggregate_id: Uuid, expected_version: i64, events: Vec<PendingEvent>) -> Vec<StoredEvent> {
    let mut sequence_number = expected_version;
    events
        .into_iter()
        .map(|pending| {
            sequence_number += 1;
            StoredEvent::from_pending(pending, aggregate_id, sequence_number, sequence_number)
        })
        .collect()
}

/// Encodes `payloads` as the persisted history of `aggregate_id`, with
/// sequence numbers and global positions starting at 1.
///
/// # Panics
///
/// Panics if a payload fails to encode.
pub fn history_of<E: DomainEvent>(
    aggregate_id: Uuid,
    payloads: Vec<E>,
    clock: &dyn Clock,
) -> Vec<StoredEvent> {
    let pending = payloads
        .into_iter()
        .enumerate()
        .map(|(i, payload)| {
            let envelope = EventEnvelope {
                event_id: Uuid::new_v4(),
                aggregate_id,
                sequence_number: i64::try_from(i).unwrap() + 1,
                schema_version: payload.schema_version(),
                occurred_at: clock.now(),
                metadata: EventMetadata::default(),
                payload,
            };
            E::codec().encode(&envelope).unwrap()
        })
        .collect();
    assign(aggregate_id, 0, pending)
}

/// An event store that returns a fixed history from every load and records
/// every append. Appends always succeed.
#[derive(Debug)]
pub struct RecordingEventStore {
    history: Vec<StoredEvent>,
    appended: Mutex<Vec<(Uuid, i64, Vec<PendingEvent>)>>,
}

impl RecordingEventStore {
    /// Create a store that serves `history` from `load`.
    #[must_use]
    pub fn new(history: Vec<StoredEvent>) -> Self {
        Self {
            history,
            appended: Mutex::new(Vec::new()),
        }
    }

    /// Returns a snapshot of all appends as `(aggregate_id, expected_version,
    /// events)`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn appended(&self) -> Vec<(Uuid, i64, Vec<PendingEvent>)> {
        self.appended.lock().unwrap().clone()
    }

    /// Event types of everything appended, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn appended_types(&self) -> Vec<String> {
        self.appended
            .lock()
            .unwrap()
            .iter()
            .flat_map(|(_, _, events)| events.iter().map(|e| e.event_type.clone()))
            .collect()
    }
}

#[async_trait]
impl EventStore for RecordingEventStore {
    async fn append(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        events: Vec<PendingEvent>,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        self.appended
            .lock()
            .unwrap()
            .push((aggregate_id, expected_version, events.clone()));
        Ok(assign(aggregate_id, expected_version, events))
    }

    async fn load(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        if self.history.is_empty() {
            return Err(DomainError::AggregateNotFound(aggregate_id));
        }
        Ok(self.history.clone())
    }

    async fn load_from(
        &self,
        _aggregate_id: Uuid,
        from_version: i64,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(self
            .history
            .iter()
            .filter(|e| e.sequence_number > from_version)
            .cloned()
            .collect())
    }

    async fn load_all(&self) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(self.history.clone())
    }

    async fn load_all_from(&self, watermark: i64) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(self
            .history
            .iter()
            .filter(|e| e.global_position > watermark)
            .cloned()
            .collect())
    }
}

/// An event store with no history that silently accepts appends. Useful for
/// "aggregate not found" scenarios and creation commands.
#[derive(Debug)]
pub struct EmptyEventStore;

#[async_trait]
impl EventStore for EmptyEventStore {
    async fn append(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        events: Vec<PendingEvent>,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(assign(aggregate_id, expected_version, events))
    }

    async fn load(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        Err(DomainError::AggregateNotFound(aggregate_id))
    }

    async fn load_from(
        &self,
        _aggregate_id: Uuid,
        _from_version: i64,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(vec![])
    }

    async fn load_all(&self) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(vec![])
    }

    async fn load_all_from(&self, _watermark: i64) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(vec![])
    }
}

/// An event store that always returns an infrastructure error. Useful for
/// testing error-handling paths.
#[derive(Debug)]
pub struct FailingEventStore;

fn refused() -> DomainError {
    DomainError::Infrastructure("connection refused".into())
}

#[async_trait]
impl EventStore for FailingEventStore {
    async fn append(
        &self,
        _aggregate_id: Uuid,
        _expected_version: i64,
        _events: Vec<PendingEvent>,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        Err(refused())
    }

    async fn load(&self, _aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        Err(refused())
    }

    async fn load_from(
        &self,
        _aggregate_id: Uuid,
        _from_version: i64,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        Err(refused())
    }

    async fn load_all(&self) -> Result<Vec<StoredEvent>, DomainError> {
        Err(refused())
    }

    async fn load_all_from(&self, _watermark: i64) -> Result<Vec<StoredEvent>, DomainError> {
        Err(refused())
    }
}
