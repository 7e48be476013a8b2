//! Folds post views and deletions into trending records.

use std::sync::Arc;

use async_trait::async_trait;
use radiant_core::error::DomainError;
use radiant_core::event::DomainEvent;
use radiant_core::store::StoredEvent;
use radiant_eventing::{EventFilter, Projection};
use radiant_post::domain::events::{POST_DELETED_EVENT_TYPE, POST_VIEWED_EVENT_TYPE, PostEvent};
use tokio::sync::Mutex;
use tracing::debug;

use crate::store::{TrendingRecord, TrendingStore};

const TRENDING_EVENT_TYPES: &[&str] = &[POST_VIEWED_EVENT_TYPE, POST_DELETED_EVENT_TYPE];

/// Trending projection over a [`TrendingStore`].
///
/// A record is created on a post's first view. Each view event is folded
/// once, keyed by its stream sequence number.
pub struct TrendingProjection {
    store: Arc<dyn TrendingStore>,
    // Live delivery and catch-up may apply concurrently.
    apply_lock: Mutex<()>,
}

impl TrendingProjection {
    /// Creates a projection writing to `store`.
    #[must_use]
    pub fn new(store: Arc<dyn TrendingStore>) -> Self {
        Self {
            store,
            apply_lock: Mutex::new(()),
        }
    }
}

#[async_trait]
impl Projection for TrendingProjection {
    fn name(&self) -> &str {
        "trending"
    }

    fn filter(&self) -> EventFilter {
        EventFilter::Many(TRENDING_EVENT_TYPES)
    }

    async fn reset(&self) -> Result<(), DomainError> {
        let _guard = self.apply_lock.lock().await;
        self.store.clear().await
    }

    async fn apply(&self, event: &StoredEvent) -> Result<(), DomainError> {
        let envelope = PostEvent::codec().decode(event)?;
        let _guard = self.apply_lock.lock().await;
        let existing = self.store.find(event.aggregate_id).await?;

        if existing
            .as_ref()
            .is_some_and(|r| event.sequence_number <= r.last_sequence)
        {
            return Ok(());
        }

        match envelope.payload {
            PostEvent::Viewed(viewed) => {
                let mut record = existing
                    .unwrap_or_else(|| TrendingRecord::new(viewed.post_id, event.occurred_at));
                record.record_view(event.occurred_at);
                record.last_sequence = event.sequence_number;
                debug!(
                    post_id = %record.post_id,
                    view_count = record.view_count,
                    trend_score = record.trend_score,
                    "trending record updated"
                );
                self.store.save(record).await
            }
            PostEvent::Deleted(deleted) => {
                let Some(mut record) = existing else {
                    debug!(post_id = %deleted.post_id, "deleted post was never viewed");
                    return Ok(());
                };
                record.deleted = true;
                record.last_sequence = event.sequence_number;
                self.store.save(record).await
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use radiant_core::store::EventStore;
    use radiant_event_store::InMemoryEventStore;
    use radiant_post::application::command_handlers::{
        handle_create_post, handle_delete_post, handle_view_post,
    };
    use radiant_post::domain::commands::{CreatePost, DeletePost, ViewPost};
    use radiant_test_support::AdjustableClock;
    use uuid::Uuid;

    use super::*;
    use crate::store::InMemoryTrendingStore;

    async fn create(store: &InMemoryEventStore, clock: &AdjustableClock) -> Uuid {
        let post_id = Uuid::new_v4();
        handle_create_post(
            &CreatePost {
                correlation_id: Uuid::new_v4(),
                post_id,
                author_id: "author-1".into(),
                title: "Hello".into(),
                body: "World".into(),
                thumbnail_url: None,
                translation: None,
                causation_id: None,
            },
            clock,
            store,
        )
        .await
        .unwrap();
        post_id
    }

    async fn view(store: &InMemoryEventStore, clock: &AdjustableClock, post_id: Uuid) {
        handle_view_post(
            &ViewPost {
                correlation_id: Uuid::new_v4(),
                post_id,
                viewer_id: None,
            },
            clock,
            store,
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_views_create_record_lazily_and_decay_from_first_view() {
        // Arrange
        let start = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();
        let clock = AdjustableClock::new(start);
        let events = InMemoryEventStore::new();
        let post_id = create(&events, &clock).await;
        clock.advance(Duration::hours(1));
        view(&events, &clock, post_id).await;
        clock.advance(Duration::hours(3));
        view(&events, &clock, post_id).await;
        let trending = Arc::new(InMemoryTrendingStore::new());
        let projection = TrendingProjection::new(trending.clone());

        // Act
        for event in events.load(post_id).await.unwrap() {
            projection.apply(&event).await.unwrap();
        }

        // Assert
        let record = trending.find(post_id).await.unwrap().unwrap();
        assert_eq!(record.view_count, 2);
        assert_eq!(record.created_at, start + Duration::hours(1));
        assert_eq!(record.last_viewed_at, start + Duration::hours(4));
        assert!((record.trend_score - 1.0).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_redelivered_view_is_not_counted_twice() {
        // Arrange
        let clock = AdjustableClock::new(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap());
        let events = InMemoryEventStore::new();
        let post_id = create(&events, &clock).await;
        view(&events, &clock, post_id).await;
        let trending = Arc::new(InMemoryTrendingStore::new());
        let projection = TrendingProjection::new(trending.clone());
        let history = events.load(post_id).await.unwrap();

        // Act
        projection.apply(&history[1]).await.unwrap();
        projection.apply(&history[1]).await.unwrap();

        // Assert
        assert_eq!(trending.find(post_id).await.unwrap().unwrap().view_count, 1);
    }

    #[tokio::test]
    async fn test_deleted_post_is_soft_deleted() {
        // Arrange
        let clock = AdjustableClock::new(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap());
        let events = InMemoryEventStore::new();
        let post_id = create(&events, &clock).await;
        view(&events, &clock, post_id).await;
        handle_delete_post(
            &DeletePost {
                correlation_id: Uuid::new_v4(),
                post_id,
                deleted_by: "author-1".into(),
            },
            &clock,
            &events,
        )
        .await
        .unwrap();
        let trending = Arc::new(InMemoryTrendingStore::new());
        let projection = TrendingProjection::new(trending.clone());

        // Act
        for event in events.load(post_id).await.unwrap() {
            projection.apply(&event).await.unwrap();
        }

        // Assert
        let record = trending.find(post_id).await.unwrap().unwrap();
        assert!(record.deleted);
        assert_eq!(record.view_count, 1);
    }

    #[tokio::test]
    async fn test_filter_ignores_other_post_events() {
        let projection = TrendingProjection::new(Arc::new(InMemoryTrendingStore::new()));

        let filter = projection.filter();

        assert!(filter.matches(POST_VIEWED_EVENT_TYPE));
        assert!(filter.matches(POST_DELETED_EVENT_TYPE));
        assert!(!filter.matches("post.liked"));
    }
}
