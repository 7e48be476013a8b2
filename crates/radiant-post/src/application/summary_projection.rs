//! Post summary read model.
//!
//! Folded from the post stream and paged newest first with an opaque
//! `"<created_at>|<post_id>"` cursor. Rebuildable from the log at any time.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use radiant_core::cursor::{CursorError, PageCursor};
use radiant_core::error::DomainError;
use radiant_core::event::DomainEvent;
use radiant_core::store::StoredEvent;
use radiant_eventing::{EventFilter, Projection};
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::events::{
    POST_CREATED_EVENT_TYPE, POST_DELETED_EVENT_TYPE, POST_LIKED_EVENT_TYPE,
    POST_UPDATED_EVENT_TYPE, POST_VIEWED_EVENT_TYPE, PostEvent, PostField,
};

/// Largest page `list` returns.
pub const MAX_PAGE_SIZE: usize = 50;

const SUMMARY_EVENT_TYPES: &[&str] = &[
    POST_CREATED_EVENT_TYPE,
    POST_UPDATED_EVENT_TYPE,
    POST_LIKED_EVENT_TYPE,
    POST_VIEWED_EVENT_TYPE,
    POST_DELETED_EVENT_TYPE,
];

/// Listing row for a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostSummary {
    /// The post identifier.
    pub post_id: Uuid,
    /// The post title.
    pub title: String,
    /// The author.
    pub author_id: String,
    /// Optional thumbnail URL.
    pub thumbnail_url: Option<String>,
    /// Whether the post was published from a translation.
    pub translated: bool,
    /// Number of likes.
    pub like_count: u64,
    /// Number of views.
    pub view_count: u64,
    /// When the post was created.
    pub created_at: DateTime<Utc>,
    /// When the post last changed.
    pub updated_at: DateTime<Utc>,
}

/// One page of summaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostPage {
    /// Summaries, newest first.
    pub items: Vec<PostSummary>,
    /// Whether more rows follow this page.
    pub has_next_page: bool,
    /// Cursor of the last item, to pass as `after` for the next page.
    pub end_cursor: Option<String>,
}

#[derive(Debug)]
struct Row {
    summary: PostSummary,
    deleted: bool,
    last_sequence: i64,
}

/// In-memory post summary projection.
#[derive(Debug, Default)]
pub struct PostSummaryProjection {
    rows: RwLock<HashMap<Uuid, Row>>,
}

impl PostSummaryProjection {
    /// Creates an empty read model.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<Uuid, Row>> {
        self.rows.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Uuid, Row>> {
        self.rows.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Looks up a live post. Deleted posts are not returned.
    #[must_use]
    pub fn find(&self, post_id: Uuid) -> Option<PostSummary> {
        self.read()
            .get(&post_id)
            .filter(|row| !row.deleted)
            .map(|row| row.summary.clone())
    }

    /// Lists live posts ordered by `created_at` desc then id desc, starting
    /// after `after` when given. `limit` is clamped to `1..=50`.
    ///
    /// # Errors
    ///
    /// Returns a `CursorError` if `after` cannot be decoded.
    pub fn list(&self, after: Option<&str>, limit: usize) -> Result<PostPage, CursorError> {
        let after = after.map(PageCursor::decode).transpose()?;
        let limit = limit.clamp(1, MAX_PAGE_SIZE);

        let mut live: Vec<(String, PostSummary)> = self
            .read()
            .values()
            .filter(|row| !row.deleted)
            .map(|row| (row.summary.post_id.to_string(), row.summary.clone()))
            .collect();
        live.sort_by(|(a_id, a), (b_id, b)| {
            b.created_at.cmp(&a.created_at).then_with(|| b_id.cmp(a_id))
        });

        let mut remaining = live
            .into_iter()
            .filter(|(id, summary)| after.as_ref().is_none_or(|c| comes_after(c, id, summary)))
            .map(|(_, summary)| summary);
        let items: Vec<PostSummary> = remaining.by_ref().take(limit).collect();
        let has_next_page = remaining.next().is_some();
        let end_cursor = items
            .last()
            .map(|last| PageCursor::with_id(last.created_at, last.post_id.to_string()).encode());

        Ok(PostPage {
            items,
            has_next_page,
            end_cursor,
        })
    }

    /// Number of rows, deleted included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns `true` if nothing has been projected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn comes_after(cursor: &PageCursor, id: &str, summary: &PostSummary) -> bool {
    match &cursor.id {
        Some(cursor_id) => {
            summary.created_at < cursor.timestamp
                || (summary.created_at == cursor.timestamp && id < cursor_id.as_str())
        }
        None => summary.created_at < cursor.timestamp,
    }
}

#[async_trait]
impl Projection for PostSummaryProjection {
    fn name(&self) -> &str {
        "post-summary"
    }

    fn filter(&self) -> EventFilter {
        EventFilter::Many(SUMMARY_EVENT_TYPES)
    }

    async fn reset(&self) -> Result<(), DomainError> {
        self.write().clear();
        Ok(())
    }

    async fn apply(&self, event: &StoredEvent) -> Result<(), DomainError> {
        let envelope = PostEvent::codec().decode(event)?;
        let mut rows = self.write();

        if let PostEvent::Created(created) = &envelope.payload {
            if rows.contains_key(&created.post_id) {
                debug!(post_id = %created.post_id, "post summary already projected");
                return Ok(());
            }
            rows.insert(
                created.post_id,
                Row {
                    summary: PostSummary {
                        post_id: created.post_id,
                        title: created.title.clone(),
                        author_id: created.author_id.clone(),
                        thumbnail_url: created.thumbnail_url.clone(),
                        translated: created.translation.is_some(),
                        like_count: 0,
                        view_count: 0,
                        created_at: event.occurred_at,
                        updated_at: event.occurred_at,
                    },
                    deleted: false,
                    last_sequence: event.sequence_number,
                },
            );
            return Ok(());
        }

        let Some(row) = rows.get_mut(&event.aggregate_id) else {
            warn!(
                post_id = %event.aggregate_id,
                event_type = %event.event_type,
                "post summary missing for event"
            );
            return Ok(());
        };
        if event.sequence_number <= row.last_sequence {
            return Ok(());
        }
        row.last_sequence = event.sequence_number;
        row.summary.updated_at = event.occurred_at;

        match envelope.payload {
            PostEvent::Updated(updated) => match updated.field {
                PostField::Title => row.summary.title = updated.new_value.unwrap_or_default(),
                PostField::ThumbnailUrl => row.summary.thumbnail_url = updated.new_value,
                PostField::Body => {}
            },
            PostEvent::Liked(liked) => row.summary.like_count = liked.total_likes,
            PostEvent::Viewed(viewed) => row.summary.view_count = viewed.total_views,
            PostEvent::Deleted(_) => row.deleted = true,
            PostEvent::Created(_) => {}
        }
        Ok(())
    }
}
