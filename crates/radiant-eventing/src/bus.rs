//! In-process event bus.
//!
//! Committed events enter a central channel through a [`BusPublisher`]. A
//! fan-out task routes each event to every matching subscriber's private
//! queue, and each subscriber drains its queue on its own task with its own
//! error boundary.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::FutureExt;
use radiant_core::publisher::EventPublisher;
use radiant_core::store::StoredEvent;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::subscriber::EventSubscriber;

const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Builder-phase bus: collect subscribers, then [`start`](EventBus::start).
pub struct EventBus {
    tx: mpsc::UnboundedSender<StoredEvent>,
    rx: mpsc::UnboundedReceiver<StoredEvent>,
    subscribers: Vec<Arc<dyn EventSubscriber>>,
    in_flight: Arc<AtomicUsize>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.subscribers.iter().map(|s| s.name()).collect();
        f.debug_struct("EventBus")
            .field("subscribers", &names)
            .finish_non_exhaustive()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    /// Creates a bus with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx,
            subscribers: Vec::new(),
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A handle for the write path. Events published before `start` are
    /// buffered and delivered once the bus runs.
    #[must_use]
    pub fn publisher(&self) -> BusPublisher {
        BusPublisher {
            tx: self.tx.clone(),
            in_flight: Arc::clone(&self.in_flight),
        }
    }

    /// Adds a subscriber.
    pub fn subscribe(&mut self, subscriber: Arc<dyn EventSubscriber>) {
        self.subscribers.push(subscriber);
    }

    /// Spawns the fan-out task and one consumer task per subscriber.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn start(self) -> DeliveryHandle {
        let token = CancellationToken::new();
        let mut tasks = Vec::with_capacity(self.subscribers.len() + 1);
        let mut routes = Vec::with_capacity(self.subscribers.len());

        for subscriber in self.subscribers {
            let (tx, rx) = mpsc::unbounded_channel();
            routes.push((Arc::clone(&subscriber), tx));
            tasks.push(tokio::spawn(consume(
                subscriber,
                rx,
                Arc::clone(&self.in_flight),
            )));
        }
        info!(subscribers = routes.len(), "event delivery started");

        tasks.push(tokio::spawn(fan_out(
            self.rx,
            routes,
            token.clone(),
            Arc::clone(&self.in_flight),
        )));

        DeliveryHandle {
            token,
            tasks,
            in_flight: self.in_flight,
        }
    }
}

/// Write-path handle that enqueues committed events for delivery.
#[derive(Debug, Clone)]
pub struct BusPublisher {
    tx: mpsc::UnboundedSender<StoredEvent>,
    in_flight: Arc<AtomicUsize>,
}

impl EventPublisher for BusPublisher {
    fn publish(&self, events: &[StoredEvent]) {
        for event in events {
            self.in_flight.fetch_add(1, Ordering::SeqCst);
            if self.tx.send(event.clone()).is_err() {
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                warn!(
                    event_id = %event.event_id,
                    event_type = %event.event_type,
                    "event delivery stopped, event not published"
                );
            }
        }
    }
}

/// Running bus: shut down and wait for delivery tasks.
#[derive(Debug)]
pub struct DeliveryHandle {
    token: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
    in_flight: Arc<AtomicUsize>,
}

impl DeliveryHandle {
    /// Number of events published but not yet handled by every matching
    /// subscriber.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Waits until every published event has been handled.
    pub async fn wait_idle(&self) {
        while self.in_flight() > 0 {
            tokio::time::sleep(IDLE_POLL_INTERVAL).await;
        }
    }

    /// Stops accepting new work. Events already published are still delivered.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Waits for the fan-out and all subscriber tasks to finish.
    pub async fn join(mut self) {
        for task in std::mem::take(&mut self.tasks) {
            if let Err(e) = task.await {
                error!(error = %e, "delivery task ended abnormally");
            }
        }
    }
}

fn route(
    routes: &[(Arc<dyn EventSubscriber>, mpsc::UnboundedSender<StoredEvent>)],
    event: &StoredEvent,
    in_flight: &AtomicUsize,
) {
    for (subscriber, tx) in routes {
        if !subscriber.filter().matches(&event.event_type) {
            continue;
        }
        in_flight.fetch_add(1, Ordering::SeqCst);
        if tx.send(event.clone()).is_err() {
            in_flight.fetch_sub(1, Ordering::SeqCst);
        }
    }
    in_flight.fetch_sub(1, Ordering::SeqCst);
}

async fn fan_out(
    mut rx: mpsc::UnboundedReceiver<StoredEvent>,
    routes: Vec<(Arc<dyn EventSubscriber>, mpsc::UnboundedSender<StoredEvent>)>,
    token: CancellationToken,
    in_flight: Arc<AtomicUsize>,
) {
    loop {
        tokio::select! {
            biased;
            maybe_event = rx.recv() => match maybe_event {
                Some(event) => route(&routes, &event, &in_flight),
                None => break,
            },
            () = token.cancelled() => {
                rx.close();
                while let Some(event) = rx.recv().await {
                    route(&routes, &event, &in_flight);
                }
                break;
            }
        }
    }
    // Dropping the routes closes every subscriber queue once it is drained.
    debug!("event fan-out stopped");
}

async fn consume(
    subscriber: Arc<dyn EventSubscriber>,
    mut rx: mpsc::UnboundedReceiver<StoredEvent>,
    in_flight: Arc<AtomicUsize>,
) {
    while let Some(event) = rx.recv().await {
        let outcome = AssertUnwindSafe(subscriber.handle(&event))
            .catch_unwind()
            .await;
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(
                subscriber = subscriber.name(),
                event_id = %event.event_id,
                event_type = %event.event_type,
                error = %e,
                "subscriber failed"
            ),
            Err(_) => error!(
                subscriber = subscriber.name(),
                event_id = %event.event_id,
                event_type = %event.event_type,
                "subscriber panicked"
            ),
        }
        in_flight.fetch_sub(1, Ordering::SeqCst);
    }
    debug!(subscriber = subscriber.name(), "subscriber stopped");
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use radiant_core::error::DomainError;
    use uuid::Uuid;

    use super::*;
    use crate::subscriber::EventFilter;

    fn event(event_type: &str, position: i64) -> StoredEvent {
        StoredEvent {
            event_id: Uuid::new_v4(),
            aggregate_id: Uuid::new_v4(),
            event_type: event_type.to_owned(),
            sequence_number: 1,
            global_position: position,
            schema_version: 1,
            payload: b"{}".to_vec(),
            metadata: b"{}".to_vec(),
            occurred_at: Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
        }
    }

    struct Recorder {
        filter: EventFilter,
        seen: Mutex<Vec<i64>>,
    }

    impl Recorder {
        fn new(filter: EventFilter) -> Arc<Self> {
            Arc::new(Self {
                filter,
                seen: Mutex::new(Vec::new()),
            })
        }

        fn seen(&self) -> Vec<i64> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl EventSubscriber for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        fn filter(&self) -> EventFilter {
            self.filter
        }

        async fn handle(&self, event: &StoredEvent) -> Result<(), DomainError> {
            self.seen.lock().unwrap().push(event.global_position);
            Ok(())
        }
    }

    struct Faulty {
        calls: AtomicUsize,
        panic: bool,
    }

    #[async_trait]
    impl EventSubscriber for Faulty {
        fn name(&self) -> &str {
            "faulty"
        }

        fn filter(&self) -> EventFilter {
            EventFilter::All
        }

        async fn handle(&self, _event: &StoredEvent) -> Result<(), DomainError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.panic {
                panic!("subscriber blew up");
            }
            Err(DomainError::Infrastructure("read model offline".into()))
        }
    }

    #[tokio::test]
    async fn test_events_reach_matching_subscribers_in_order() {
        // Arrange
        let all = Recorder::new(EventFilter::All);
        let viewed = Recorder::new(EventFilter::One("post.viewed"));
        let mut bus = EventBus::new();
        bus.subscribe(all.clone());
        bus.subscribe(viewed.clone());
        let publisher = bus.publisher();
        let handle = bus.start();

        // Act
        publisher.publish(&[
            event("post.created", 1),
            event("post.viewed", 2),
            event("post.viewed", 3),
        ]);
        handle.wait_idle().await;

        // Assert
        assert_eq!(all.seen(), vec![1, 2, 3]);
        assert_eq!(viewed.seen(), vec![2, 3]);
        handle.shutdown();
        handle.join().await;
    }

    #[tokio::test]
    async fn test_failing_subscriber_does_not_block_siblings() {
        // Arrange
        let recorder = Recorder::new(EventFilter::All);
        let failing = Arc::new(Faulty {
            calls: AtomicUsize::new(0),
            panic: false,
        });
        let panicking = Arc::new(Faulty {
            calls: AtomicUsize::new(0),
            panic: true,
        });
        let mut bus = EventBus::new();
        bus.subscribe(failing.clone());
        bus.subscribe(panicking.clone());
        bus.subscribe(recorder.clone());
        let publisher = bus.publisher();
        let handle = bus.start();

        // Act
        publisher.publish(&[event("a", 1), event("b", 2)]);
        handle.wait_idle().await;

        // Assert
        assert_eq!(recorder.seen(), vec![1, 2]);
        assert_eq!(failing.calls.load(Ordering::SeqCst), 2);
        assert_eq!(panicking.calls.load(Ordering::SeqCst), 2);
        handle.shutdown();
        handle.join().await;
    }

    #[tokio::test]
    async fn test_events_published_before_start_are_delivered() {
        let recorder = Recorder::new(EventFilter::All);
        let mut bus = EventBus::new();
        bus.subscribe(recorder.clone());
        let publisher = bus.publisher();

        publisher.publish(&[event("a", 1)]);
        let handle = bus.start();
        handle.wait_idle().await;

        assert_eq!(recorder.seen(), vec![1]);
        handle.shutdown();
        handle.join().await;
    }

    #[tokio::test]
    async fn test_shutdown_drains_published_events() {
        // Arrange
        let recorder = Recorder::new(EventFilter::All);
        let mut bus = EventBus::new();
        bus.subscribe(recorder.clone());
        let publisher = bus.publisher();
        let handle = bus.start();
        publisher.publish(&[event("a", 1), event("b", 2), event("c", 3)]);

        // Act
        handle.shutdown();
        handle.join().await;

        // Assert
        assert_eq!(recorder.seen(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_publish_after_shutdown_is_dropped() {
        let recorder = Recorder::new(EventFilter::All);
        let mut bus = EventBus::new();
        bus.subscribe(recorder.clone());
        let publisher = bus.publisher();
        let handle = bus.start();
        handle.shutdown();
        handle.join().await;

        publisher.publish(&[event("late", 9)]);

        assert!(recorder.seen().is_empty());
        assert_eq!(publisher.in_flight.load(Ordering::SeqCst), 0);
    }
}
