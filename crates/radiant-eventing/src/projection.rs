//! Projection engine: derive read models from the global log.
//!
//! Projections receive events two ways. Live, through the bus via
//! [`ProjectionSubscriber`]; and in bulk, through [`ProjectionEngine`] which
//! replays the whole log (`rebuild_all`) or its tail past a watermark
//! (`catch_up`). Both paths may deliver the same event, so `apply` must be
//! idempotent.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use radiant_core::error::DomainError;
use radiant_core::store::{EventStore, StoredEvent};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::subscriber::{EventFilter, EventSubscriber};

/// A read model folded from events.
#[async_trait]
pub trait Projection: Send + Sync {
    /// Projection name, used in logs.
    fn name(&self) -> &str;

    /// Event types this projection consumes.
    fn filter(&self) -> EventFilter;

    /// Clears all projected state before a rebuild.
    async fn reset(&self) -> Result<(), DomainError>;

    /// Folds one event. Re-applying an event already reflected must leave
    /// the same end state.
    async fn apply(&self, event: &StoredEvent) -> Result<(), DomainError>;
}

/// Outcome of a rebuild or catch-up pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CatchUpReport {
    /// Events read from the log.
    pub processed: usize,
    /// Projection applications that failed and were skipped.
    pub failed: usize,
    /// Watermark after the pass.
    pub watermark: i64,
}

/// Replays the global log through registered projections.
pub struct ProjectionEngine {
    store: Arc<dyn EventStore>,
    projections: Vec<Arc<dyn Projection>>,
    watermark: AtomicI64,
    // Rebuild and catch-up passes never overlap.
    pass: Mutex<()>,
}

impl fmt::Debug for ProjectionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.projections.iter().map(|p| p.name()).collect();
        f.debug_struct("ProjectionEngine")
            .field("projections", &names)
            .field("watermark", &self.watermark())
            .finish_non_exhaustive()
    }
}

impl ProjectionEngine {
    /// Creates an engine reading from `store`.
    #[must_use]
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self {
            store,
            projections: Vec::new(),
            watermark: AtomicI64::new(0),
            pass: Mutex::new(()),
        }
    }

    /// Registers a projection.
    #[must_use]
    pub fn with_projection(mut self, projection: Arc<dyn Projection>) -> Self {
        self.projections.push(projection);
        self
    }

    /// Last global position processed.
    #[must_use]
    pub fn watermark(&self) -> i64 {
        self.watermark.load(Ordering::SeqCst)
    }

    /// Resets every projection and replays the full log in global order.
    ///
    /// # Errors
    ///
    /// Returns `DomainError` if a reset fails or the log cannot be read.
    #[instrument(skip(self))]
    pub async fn rebuild_all(&self) -> Result<CatchUpReport, DomainError> {
        let _pass = self.pass.lock().await;
        for projection in &self.projections {
            projection.reset().await?;
        }
        self.watermark.store(0, Ordering::SeqCst);
        let events = self.store.load_all().await?;
        let report = self.replay(&events).await;
        info!(
            processed = report.processed,
            failed = report.failed,
            watermark = report.watermark,
            "projections rebuilt"
        );
        Ok(report)
    }

    /// Replays the log tail after `watermark`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError` if the log cannot be read.
    #[instrument(skip(self))]
    pub async fn catch_up_from(&self, watermark: i64) -> Result<CatchUpReport, DomainError> {
        let _pass = self.pass.lock().await;
        let events = self.store.load_all_from(watermark).await?;
        let report = self.replay(&events).await;
        if report.processed > 0 {
            info!(
                from = watermark,
                processed = report.processed,
                failed = report.failed,
                watermark = report.watermark,
                "projections caught up"
            );
        }
        Ok(report)
    }

    /// Replays the log tail after the engine's own watermark.
    ///
    /// # Errors
    ///
    /// Returns `DomainError` if the log cannot be read.
    pub async fn catch_up(&self) -> Result<CatchUpReport, DomainError> {
        self.catch_up_from(self.watermark()).await
    }

    /// Runs `catch_up` every `interval` until `token` is cancelled.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn spawn_catch_up(
        self: Arc<Self>,
        interval: Duration,
        token: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick fires immediately; startup already rebuilt.
            ticker.tick().await;

            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = self.catch_up().await {
                            warn!(error = %e, "projection catch-up failed");
                        }
                    }
                }
            }
        })
    }

    async fn replay(&self, events: &[StoredEvent]) -> CatchUpReport {
        let mut report = CatchUpReport {
            watermark: self.watermark(),
            ..CatchUpReport::default()
        };
        for event in events {
            report.failed += apply_all(&self.projections, event).await;
            report.processed += 1;
            report.watermark = report.watermark.max(event.global_position);
        }
        self.watermark.fetch_max(report.watermark, Ordering::SeqCst);
        report.watermark = self.watermark();
        report
    }
}

async fn apply_all(projections: &[Arc<dyn Projection>], event: &StoredEvent) -> usize {
    let mut failed = 0;
    for projection in projections {
        if !projection.filter().matches(&event.event_type) {
            continue;
        }
        if let Err(e) = projection.apply(event).await {
            failed += 1;
            error!(
                projection = projection.name(),
                event_id = %event.event_id,
                event_type = %event.event_type,
                global_position = event.global_position,
                error = %e,
                "projection failed to apply event"
            );
        }
    }
    failed
}

/// Feeds a projection from the live bus.
pub struct ProjectionSubscriber {
    projection: Arc<dyn Projection>,
}

impl ProjectionSubscriber {
    /// Wraps `projection` as a bus subscriber.
    #[must_use]
    pub fn new(projection: Arc<dyn Projection>) -> Self {
        Self { projection }
    }
}

#[async_trait]
impl EventSubscriber for ProjectionSubscriber {
    fn name(&self) -> &str {
        self.projection.name()
    }

    fn filter(&self) -> EventFilter {
        self.projection.filter()
    }

    async fn handle(&self, event: &StoredEvent) -> Result<(), DomainError> {
        self.projection.apply(event).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex as StdMutex;

    use chrono::{TimeZone, Utc};
    use radiant_core::store::PendingEvent;
    use radiant_event_store::InMemoryEventStore;
    use radiant_test_support::FailingEventStore;
    use uuid::Uuid;

    use super::*;

    fn pending(event_type: &str) -> PendingEvent {
        PendingEvent {
            event_id: Uuid::new_v4(),
            event_type: event_type.to_owned(),
            schema_version: 1,
            payload: b"{}".to_vec(),
            metadata: b"{}".to_vec(),
            occurred_at: Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
        }
    }

    /// Counts events per aggregate, keyed by last applied sequence so
    /// re-delivery is a no-op.
    #[derive(Default)]
    struct CountingProjection {
        last_sequence: StdMutex<BTreeMap<Uuid, i64>>,
        resets: StdMutex<usize>,
    }

    impl CountingProjection {
        fn count(&self, aggregate_id: Uuid) -> i64 {
            self.last_sequence
                .lock()
                .unwrap()
                .get(&aggregate_id)
                .copied()
                .unwrap_or(0)
        }
    }

    #[async_trait]
    impl Projection for CountingProjection {
        fn name(&self) -> &str {
            "counting"
        }

        fn filter(&self) -> EventFilter {
            EventFilter::Many(&["thing.made", "thing.changed"])
        }

        async fn reset(&self) -> Result<(), DomainError> {
            self.last_sequence.lock().unwrap().clear();
            *self.resets.lock().unwrap() += 1;
            Ok(())
        }

        async fn apply(&self, event: &StoredEvent) -> Result<(), DomainError> {
            let mut seen = self.last_sequence.lock().unwrap();
            let last = seen.entry(event.aggregate_id).or_insert(0);
            if event.sequence_number > *last {
                *last = event.sequence_number;
            }
            Ok(())
        }
    }

    struct RejectingProjection;

    #[async_trait]
    impl Projection for RejectingProjection {
        fn name(&self) -> &str {
            "rejecting"
        }

        fn filter(&self) -> EventFilter {
            EventFilter::One("thing.changed")
        }

        async fn reset(&self) -> Result<(), DomainError> {
            Ok(())
        }

        async fn apply(&self, _event: &StoredEvent) -> Result<(), DomainError> {
            Err(DomainError::Codec("unreadable".into()))
        }
    }

    async fn seeded_store() -> (Arc<InMemoryEventStore>, Uuid, Uuid) {
        let store = Arc::new(InMemoryEventStore::new());
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        store
            .append(first, 0, vec![pending("thing.made"), pending("thing.changed")])
            .await
            .unwrap();
        store
            .append(second, 0, vec![pending("thing.made"), pending("other.noise")])
            .await
            .unwrap();
        (store, first, second)
    }

    #[tokio::test]
    async fn test_rebuild_all_resets_and_replays_full_log() {
        // Arrange
        let (store, first, second) = seeded_store().await;
        let projection = Arc::new(CountingProjection::default());
        let engine = ProjectionEngine::new(store).with_projection(projection.clone());

        // Act
        let report = engine.rebuild_all().await.unwrap();

        // Assert
        assert_eq!(report.processed, 4);
        assert_eq!(report.failed, 0);
        assert_eq!(report.watermark, 4);
        assert_eq!(projection.count(first), 2);
        assert_eq!(projection.count(second), 1);
        assert_eq!(*projection.resets.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_catch_up_replays_only_the_tail() {
        // Arrange
        let (store, first, _) = seeded_store().await;
        let projection = Arc::new(CountingProjection::default());
        let engine =
            ProjectionEngine::new(store.clone()).with_projection(projection.clone());
        engine.rebuild_all().await.unwrap();
        store
            .append(first, 2, vec![pending("thing.changed")])
            .await
            .unwrap();

        // Act
        let report = engine.catch_up().await.unwrap();

        // Assert
        assert_eq!(report.processed, 1);
        assert_eq!(report.watermark, 5);
        assert_eq!(engine.watermark(), 5);
        assert_eq!(projection.count(first), 3);
    }

    #[tokio::test]
    async fn test_catch_up_from_older_watermark_is_idempotent() {
        let (store, first, second) = seeded_store().await;
        let projection = Arc::new(CountingProjection::default());
        let engine = ProjectionEngine::new(store).with_projection(projection.clone());
        engine.rebuild_all().await.unwrap();

        let report = engine.catch_up_from(0).await.unwrap();

        assert_eq!(report.processed, 4);
        assert_eq!(report.watermark, 4);
        assert_eq!(projection.count(first), 2);
        assert_eq!(projection.count(second), 1);
    }

    #[tokio::test]
    async fn test_failing_projection_is_skipped_and_counted() {
        let (store, first, _) = seeded_store().await;
        let counting = Arc::new(CountingProjection::default());
        let engine = ProjectionEngine::new(store)
            .with_projection(Arc::new(RejectingProjection))
            .with_projection(counting.clone());

        let report = engine.rebuild_all().await.unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.watermark, 4);
        assert_eq!(counting.count(first), 2);
    }

    #[tokio::test]
    async fn test_unreadable_log_surfaces_error() {
        let engine = ProjectionEngine::new(Arc::new(FailingEventStore))
            .with_projection(Arc::new(CountingProjection::default()));

        let result = engine.catch_up().await;

        assert!(matches!(result, Err(DomainError::Infrastructure(_))));
        assert_eq!(engine.watermark(), 0);
    }

    #[tokio::test]
    async fn test_periodic_catch_up_picks_up_new_events_and_stops_on_cancel() {
        // Arrange
        let (store, first, _) = seeded_store().await;
        let projection = Arc::new(CountingProjection::default());
        let engine = Arc::new(
            ProjectionEngine::new(store.clone()).with_projection(projection.clone()),
        );
        let token = CancellationToken::new();
        let task = Arc::clone(&engine).spawn_catch_up(Duration::from_millis(10), token.clone());

        // Act
        store
            .append(first, 2, vec![pending("thing.changed")])
            .await
            .unwrap();
        let caught_up = time::timeout(Duration::from_secs(5), async {
            while engine.watermark() < 5 {
                time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await;
        token.cancel();
        task.await.unwrap();

        // Assert
        assert!(caught_up.is_ok());
        assert_eq!(projection.count(first), 3);
    }
}
