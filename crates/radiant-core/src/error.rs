//! Kernel error types.

use thiserror::Error;
use uuid::Uuid;

/// Top-level error type for the event-sourcing kernel.
#[derive(Debug, Error)]
pub enum DomainError {
    /// No events exist for the aggregate.
    #[error("aggregate not found: {0}")]
    AggregateNotFound(Uuid),

    /// Optimistic concurrency conflict. Nothing was persisted; the caller must
    /// reload and re-issue the command.
    #[error(
        "concurrency conflict on aggregate {aggregate_id}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        /// The aggregate that had the conflict.
        aggregate_id: Uuid,
        /// The expected version.
        expected: i64,
        /// The actual version found.
        actual: i64,
    },

    /// An event or its metadata could not be encoded or decoded.
    #[error("codec failure: {0}")]
    Codec(String),

    /// No handler is registered for the dispatched command type.
    #[error("no handler registered for command: {0}")]
    NoHandlerFound(&'static str),

    /// A validation error in domain logic.
    #[error("validation error: {0}")]
    Validation(String),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl DomainError {
    /// Returns `true` for optimistic concurrency conflicts.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict { .. })
    }
}
