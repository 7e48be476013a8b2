//! In-process implementation of the `EventStore` trait.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use radiant_core::error::DomainError;
use radiant_core::store::{EventStore, PendingEvent, StoredEvent};

#[derive(Debug, Default)]
struct Log {
    events: Vec<StoredEvent>,
    streams: HashMap<Uuid, Vec<usize>>,
    event_ids: HashSet<Uuid>,
}

impl Log {
    #[allow(clippy::cast_possible_wrap)]
    fn version_of(&self, aggregate_id: Uuid) -> i64 {
        self.streams.get(&aggregate_id).map_or(0, Vec::len) as i64
    }

    fn stream(&self, aggregate_id: Uuid) -> impl Iterator<Item = &StoredEvent> {
        self.streams
            .get(&aggregate_id)
            .into_iter()
            .flatten()
            .map(|&i| &self.events[i])
    }
}

/// Event store held entirely in memory. A single mutex makes each append
/// atomic with respect to readers and other writers.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    log: Mutex<Log>,
}

impl InMemoryEventStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of events across all streams.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().events.len()
    }

    /// Returns `true` if nothing has been appended.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Appends validate fully before mutating, so a poisoned log is still
    // consistent.
    fn lock(&self) -> MutexGuard<'_, Log> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        events: Vec<PendingEvent>,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        if events.is_empty() {
            return Ok(Vec::new());
        }

        let mut log = self.lock();
        let actual = log.version_of(aggregate_id);
        if actual != expected_version {
            return Err(DomainError::ConcurrencyConflict {
                aggregate_id,
                expected: expected_version,
                actual,
            });
        }
        if let Some(duplicate) = events.iter().find(|e| log.event_ids.contains(&e.event_id)) {
            return Err(DomainError::Infrastructure(format!(
                "duplicate event id: {}",
                duplicate.event_id
            )));
        }

        let mut appended = Vec::with_capacity(events.len());
        let mut sequence_number = expected_version;
        for pending in events {
            sequence_number += 1;
            let index = log.events.len();
            #[allow(clippy::cast_possible_wrap)]
            let global_position = index as i64 + 1;
            let stored =
                StoredEvent::from_pending(pending, aggregate_id, sequence_number, global_position);
            log.event_ids.insert(stored.event_id);
            log.streams.entry(aggregate_id).or_default().push(index);
            log.events.push(stored.clone());
            appended.push(stored);
        }

        debug!(
            aggregate_id = %aggregate_id,
            from = expected_version + 1,
            to = sequence_number,
            "appended events"
        );
        Ok(appended)
    }

    async fn load(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        let events: Vec<StoredEvent> = self.lock().stream(aggregate_id).cloned().collect();
        if events.is_empty() {
            return Err(DomainError::AggregateNotFound(aggregate_id));
        }
        Ok(events)
    }

    async fn load_from(
        &self,
        aggregate_id: Uuid,
        from_version: i64,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(self
            .lock()
            .stream(aggregate_id)
            .filter(|e| e.sequence_number > from_version)
            .cloned()
            .collect())
    }

    async fn load_all(&self) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(self.lock().events.clone())
    }

    async fn load_all_from(&self, watermark: i64) -> Result<Vec<StoredEvent>, DomainError> {
        let log = self.lock();
        // Positions are dense from 1, so the tail starts at index `watermark`.
        let start = usize::try_from(watermark.max(0))
            .unwrap_or(usize::MAX)
            .min(log.events.len());
        Ok(log.events[start..].to_vec())
    }
}
