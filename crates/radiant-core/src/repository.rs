//! Aggregate load/save over an [`EventStore`].

use tracing::debug;
use uuid::Uuid;

use crate::aggregate::{Aggregate, EventSourced};
use crate::error::DomainError;
use crate::store::{EventStore, StoredEvent};

/// Loads an aggregate by replaying its full stream.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the stream is empty, or
/// `DomainError::Codec` if an event cannot be decoded.
pub async fn load_aggregate<A: Aggregate>(
    store: &dyn EventStore,
    aggregate_id: Uuid,
) -> Result<EventSourced<A>, DomainError> {
    let history = store.load(aggregate_id).await?;
    debug!(
        aggregate_type = A::AGGREGATE_TYPE,
        aggregate_id = %aggregate_id,
        events = history.len(),
        "replaying aggregate"
    );
    EventSourced::from_history(aggregate_id, &history)
}

/// Brings a loaded aggregate up to date with events appended after it was
/// loaded. Any buffered events are kept.
///
/// # Errors
///
/// Returns `DomainError::Codec` if an event cannot be decoded.
pub async fn refresh_aggregate<A: Aggregate>(
    store: &dyn EventStore,
    aggregate: &mut EventSourced<A>,
) -> Result<usize, DomainError> {
    let newer = store.load_from(aggregate.id(), aggregate.version()).await?;
    aggregate.replay_stored(&newer)?;
    Ok(newer.len())
}

/// Appends an aggregate's buffered events using its load-time version as
/// the expected version, then marks them committed.
///
/// Saving with nothing buffered is a no-op.
///
/// # Errors
///
/// Returns `DomainError::ConcurrencyConflict` if another writer committed
/// first. The buffer is left intact in that case.
pub async fn save_aggregate<A: Aggregate>(
    store: &dyn EventStore,
    aggregate: &mut EventSourced<A>,
) -> Result<Vec<StoredEvent>, DomainError> {
    if aggregate.uncommitted_events().is_empty() {
        return Ok(Vec::new());
    }
    let pending = aggregate.encode_uncommitted()?;
    let stored = store
        .append(aggregate.id(), aggregate.version(), pending)
        .await?;
    aggregate.mark_committed();
    Ok(stored)
}
