//! Query handlers for the Post context.
//!
//! These replay the post's stream directly, so they always reflect the
//! latest committed state regardless of projection lag.

use chrono::{DateTime, Utc};
use radiant_core::aggregate::EventSourced;
use radiant_core::error::DomainError;
use radiant_core::store::EventStore;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::aggregates::Post;

/// Read-only view of a post aggregate.
#[derive(Debug, Serialize)]
pub struct PostView {
    /// The post identifier.
    pub post_id: Uuid,
    /// The post title.
    pub title: String,
    /// The post body.
    pub body: String,
    /// The author.
    pub author_id: String,
    /// Optional thumbnail URL.
    pub thumbnail_url: Option<String>,
    /// Translation session the post was published from.
    pub translation_session_id: Option<Uuid>,
    /// Number of likes.
    pub like_count: u64,
    /// Number of views.
    pub view_count: u64,
    /// Whether the post is soft-deleted.
    pub deleted: bool,
    /// When the post was created.
    pub created_at: DateTime<Utc>,
    /// When the post last changed.
    pub updated_at: DateTime<Utc>,
    /// Current version (event count).
    pub version: i64,
}

/// Retrieves a post by replaying its events. Deleted posts are returned with
/// `deleted` set.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if no events exist for the ID, or
/// `DomainError::Codec` if an event cannot be decoded.
pub async fn get_post_by_id(
    post_id: Uuid,
    store: &dyn EventStore,
) -> Result<PostView, DomainError> {
    let history = store.load(post_id).await?;
    let (Some(first), Some(last)) = (history.first(), history.last()) else {
        return Err(DomainError::AggregateNotFound(post_id));
    };
    let (created_at, updated_at) = (first.occurred_at, last.occurred_at);

    let post = EventSourced::<Post>::from_history(post_id, &history)?;
    let state = post.state();
    Ok(PostView {
        post_id,
        title: state.title().to_owned(),
        body: state.body().to_owned(),
        author_id: state.author_id().to_owned(),
        thumbnail_url: state.thumbnail_url().map(str::to_owned),
        translation_session_id: state.translation().map(|t| t.session_id),
        like_count: state.like_count(),
        view_count: state.view_count(),
        deleted: state.is_deleted(),
        created_at,
        updated_at,
        version: post.version(),
    })
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use radiant_core::error::DomainError;
    use radiant_test_support::{
        AdjustableClock, EmptyEventStore, FailingEventStore, RecordingEventStore,
    };
    use uuid::Uuid;

    use crate::application::command_handlers::{handle_create_post, handle_like_post};
    use crate::application::query_handlers::get_post_by_id;
    use crate::domain::commands::{CreatePost, LikePost};

    #[tokio::test]
    async fn test_get_post_by_id_returns_replayed_view() {
        // Arrange
        let post_id = Uuid::new_v4();
        let start = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();
        let clock = AdjustableClock::new(start);
        let store = radiant_event_store::InMemoryEventStore::new();
        handle_create_post(
            &CreatePost {
                correlation_id: Uuid::new_v4(),
                post_id,
                author_id: "author-1".into(),
                title: "Hello".into(),
                body: "World".into(),
                thumbnail_url: Some("https://cdn/t.png".into()),
                translation: None,
                causation_id: None,
            },
            &clock,
            &store,
        )
        .await
        .unwrap();
        clock.advance(chrono::Duration::minutes(5));
        handle_like_post(
            &LikePost {
                correlation_id: Uuid::new_v4(),
                post_id,
                liked_by: "fan".into(),
            },
            &clock,
            &store,
        )
        .await
        .unwrap();

        // Act
        let view = get_post_by_id(post_id, &store).await.unwrap();

        // Assert
        assert_eq!(view.post_id, post_id);
        assert_eq!(view.title, "Hello");
        assert_eq!(view.thumbnail_url.as_deref(), Some("https://cdn/t.png"));
        assert_eq!(view.like_count, 1);
        assert!(!view.deleted);
        assert_eq!(view.version, 2);
        assert_eq!(view.created_at, start);
        assert_eq!(view.updated_at, start + chrono::Duration::minutes(5));
    }

    #[tokio::test]
    async fn test_get_post_by_id_returns_not_found_when_no_events() {
        let post_id = Uuid::new_v4();

        let result = get_post_by_id(post_id, &EmptyEventStore).await;

        assert!(matches!(result, Err(DomainError::AggregateNotFound(id)) if id == post_id));
    }

    #[tokio::test]
    async fn test_get_post_by_id_with_empty_history_is_not_found() {
        let store = RecordingEventStore::new(vec![]);

        let result = get_post_by_id(Uuid::new_v4(), &store).await;

        assert!(matches!(result, Err(DomainError::AggregateNotFound(_))));
    }

    #[tokio::test]
    async fn test_get_post_by_id_propagates_store_failure() {
        let result = get_post_by_id(Uuid::new_v4(), &FailingEventStore).await;

        assert!(matches!(result, Err(DomainError::Infrastructure(_))));
    }
}
