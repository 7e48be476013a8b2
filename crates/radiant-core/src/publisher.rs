//! After-commit publication seam.

use crate::store::StoredEvent;

/// Receives events once they are durably appended.
///
/// Implementations must not block: the dispatcher calls `publish` inline on
/// the command path, after the append has committed.
pub trait EventPublisher: Send + Sync {
    /// Hands freshly committed events to downstream delivery.
    fn publish(&self, events: &[StoredEvent]);
}

/// Publisher that drops everything. Useful where no delivery is wired.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPublisher;

impl EventPublisher for NoopPublisher {
    fn publish(&self, _events: &[StoredEvent]) {}
}
