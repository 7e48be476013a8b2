//! Event codec: explicit discriminant → decoder registry.
//!
//! Payload and metadata are serialized independently. Decoding picks the
//! payload shape solely from the stored `event_type` string.

use std::collections::HashMap;
use std::fmt;

use serde::de::DeserializeOwned;

use crate::error::DomainError;
use crate::event::{DomainEvent, EventEnvelope, EventMetadata};
use crate::store::{PendingEvent, StoredEvent};

type Decoder<E> = Box<dyn Fn(&[u8]) -> serde_json::Result<E> + Send + Sync>;

/// Registry mapping event type discriminants to decode functions for one
/// event family `E`.
pub struct EventCodec<E> {
    decoders: HashMap<&'static str, Decoder<E>>,
}

impl<E> fmt::Debug for EventCodec<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<_> = self.decoders.keys().collect();
        types.sort();
        f.debug_struct("EventCodec")
            .field("event_types", &types)
            .finish()
    }
}

impl<E: DomainEvent> Default for EventCodec<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: DomainEvent> EventCodec<E> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// Registers the payload type `P` under `event_type`, wrapped into the
    /// family enum by `wrap`.
    #[must_use]
    pub fn register<P>(mut self, event_type: &'static str, wrap: fn(P) -> E) -> Self
    where
        P: DeserializeOwned + 'static,
    {
        self.decoders.insert(
            event_type,
            Box::new(move |bytes| serde_json::from_slice::<P>(bytes).map(wrap)),
        );
        self
    }

    /// Returns `true` if `event_type` has a registered decoder.
    #[must_use]
    pub fn handles(&self, event_type: &str) -> bool {
        self.decoders.contains_key(event_type)
    }

    /// Encodes an envelope into its storable form.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Codec` if the payload or metadata cannot be
    /// serialized.
    pub fn encode(&self, envelope: &EventEnvelope<E>) -> Result<PendingEvent, DomainError> {
        let event_type = envelope.payload.event_type();
        let payload = envelope.payload.encode_payload().map_err(|e| {
            DomainError::Codec(format!("failed to serialize event {event_type}: {e}"))
        })?;
        Ok(PendingEvent {
            event_id: envelope.event_id,
            event_type: event_type.to_owned(),
            schema_version: envelope.schema_version,
            payload,
            metadata: encode_metadata(&envelope.metadata)?,
            occurred_at: envelope.occurred_at,
        })
    }

    /// Decodes a stored event using the decoder registered for its type.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Codec` for an unknown discriminant, a malformed
    /// payload, or malformed metadata.
    pub fn decode(&self, stored: &StoredEvent) -> Result<EventEnvelope<E>, DomainError> {
        let decoder = self.decoders.get(stored.event_type.as_str()).ok_or_else(|| {
            DomainError::Codec(format!("unknown event type: {}", stored.event_type))
        })?;
        let payload = decoder(&stored.payload).map_err(|e| {
            DomainError::Codec(format!(
                "failed to deserialize event {} ({}): {e}",
                stored.event_type, stored.event_id
            ))
        })?;
        Ok(EventEnvelope {
            event_id: stored.event_id,
            aggregate_id: stored.aggregate_id,
            sequence_number: stored.sequence_number,
            schema_version: stored.schema_version,
            occurred_at: stored.occurred_at,
            metadata: decode_metadata(&stored.metadata)?,
            payload,
        })
    }
}

/// Serializes event metadata on its own.
///
/// # Errors
///
/// Returns `DomainError::Codec` if serialization fails.
pub fn encode_metadata(metadata: &EventMetadata) -> Result<Vec<u8>, DomainError> {
    serde_json::to_vec(metadata)
        .map_err(|e| DomainError::Codec(format!("failed to serialize metadata: {e}")))
}

/// Deserializes event metadata without touching the payload.
///
/// # Errors
///
/// Returns `DomainError::Codec` if the bytes are not valid metadata JSON.
pub fn decode_metadata(bytes: &[u8]) -> Result<EventMetadata, DomainError> {
    serde_json::from_slice(bytes)
        .map_err(|e| DomainError::Codec(format!("failed to deserialize metadata: {e}")))
}
