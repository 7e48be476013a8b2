//! Event-sourced entity abstraction.
//!
//! An aggregate is a plain state value with a pure `apply` fold. The generic
//! [`EventSourced`] wrapper owns identity, the persisted sequence, and the
//! buffer of events recorded since load.

use std::fmt::Debug;

use uuid::Uuid;

use crate::clock::Clock;
use crate::error::DomainError;
use crate::event::{DomainEvent, EventEnvelope, EventMetadata};
use crate::store::{PendingEvent, StoredEvent};

/// State folded from a closed family of events.
pub trait Aggregate: Default + Debug + Send + Sync + 'static {
    /// The event family this aggregate produces and consumes.
    type Event: DomainEvent;

    /// Short name used in logs.
    const AGGREGATE_TYPE: &'static str;

    /// Folds one event into the state. Must be deterministic.
    fn apply(&mut self, event: &Self::Event);
}

/// Generic event-sourced entity: `{id, sequence, uncommitted}` around an
/// [`Aggregate`] state.
#[derive(Debug)]
pub struct EventSourced<A: Aggregate> {
    id: Uuid,
    sequence: i64,
    state: A,
    uncommitted: Vec<EventEnvelope<A::Event>>,
}

impl<A: Aggregate> EventSourced<A> {
    /// Creates a fresh entity with no history.
    #[must_use]
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            sequence: 0,
            state: A::default(),
            uncommitted: Vec::new(),
        }
    }

    /// Rebuilds an entity by decoding and replaying its stored history in
    /// order. Nothing is buffered.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Codec` if any stored event cannot be decoded.
    pub fn from_history(id: Uuid, history: &[StoredEvent]) -> Result<Self, DomainError> {
        let mut entity = Self::new(id);
        entity.replay_stored(history)?;
        Ok(entity)
    }

    /// Decodes and replays additional persisted events.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Codec` if any stored event cannot be decoded.
    pub fn replay_stored(&mut self, history: &[StoredEvent]) -> Result<(), DomainError> {
        let codec = A::Event::codec();
        for stored in history {
            let envelope = codec.decode(stored)?;
            self.replay(&envelope);
        }
        Ok(())
    }

    /// Applies a persisted event without buffering it.
    pub fn replay(&mut self, envelope: &EventEnvelope<A::Event>) {
        self.state.apply(&envelope.payload);
        self.sequence += 1;
    }

    /// Applies a new event and buffers it for persistence. The event gets the
    /// next sequence number after the persisted ones and those already
    /// buffered.
    #[allow(clippy::cast_possible_wrap)]
    pub fn record(
        &mut self,
        payload: A::Event,
        metadata: EventMetadata,
        clock: &dyn Clock,
    ) -> &EventEnvelope<A::Event> {
        self.state.apply(&payload);
        let envelope = EventEnvelope {
            event_id: Uuid::new_v4(),
            aggregate_id: self.id,
            sequence_number: self.sequence + self.uncommitted.len() as i64 + 1,
            schema_version: payload.schema_version(),
            occurred_at: clock.now(),
            metadata,
            payload,
        };
        self.uncommitted.push(envelope);
        &self.uncommitted[self.uncommitted.len() - 1]
    }

    /// Aggregate identifier.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Number of persisted events applied. Used as the expected version on
    /// append.
    #[must_use]
    pub fn version(&self) -> i64 {
        self.sequence
    }

    /// Current folded state, including buffered events.
    #[must_use]
    pub fn state(&self) -> &A {
        &self.state
    }

    /// Events recorded since load, in order.
    #[must_use]
    pub fn uncommitted_events(&self) -> &[EventEnvelope<A::Event>] {
        &self.uncommitted
    }

    /// Encodes the buffered events for the store.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Codec` if any event fails to serialize.
    pub fn encode_uncommitted(&self) -> Result<Vec<PendingEvent>, DomainError> {
        let codec = A::Event::codec();
        self.uncommitted.iter().map(|e| codec.encode(e)).collect()
    }

    /// Marks buffered events as persisted and clears the buffer.
    #[allow(clippy::cast_possible_wrap)]
    pub fn mark_committed(&mut self) {
        self.sequence += self.uncommitted.len() as i64;
        self.uncommitted.clear();
    }
}
