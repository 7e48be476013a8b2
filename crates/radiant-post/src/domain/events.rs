//! Domain events for the Post context.

use std::sync::LazyLock;

use radiant_core::codec::EventCodec;
use radiant_core::event::DomainEvent;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event type for [`PostCreated`].
pub const POST_CREATED_EVENT_TYPE: &str = "post.created";
/// Event type for [`PostUpdated`].
pub const POST_UPDATED_EVENT_TYPE: &str = "post.updated";
/// Event type for [`PostLiked`].
pub const POST_LIKED_EVENT_TYPE: &str = "post.liked";
/// Event type for [`PostViewed`].
pub const POST_VIEWED_EVENT_TYPE: &str = "post.viewed";
/// Event type for [`PostDeleted`].
pub const POST_DELETED_EVENT_TYPE: &str = "post.deleted";

/// Where a post published from a translation came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationProvenance {
    /// The translation session that produced the post.
    pub session_id: Uuid,
    /// Title in the source language, if one could be derived.
    pub translated_title: Option<String>,
    /// Source sentences, in order.
    pub original_sentences: Vec<String>,
    /// Translated sentences, in order.
    pub translated_sentences: Vec<String>,
}

/// Emitted when a post is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostCreated {
    /// The post identifier.
    pub post_id: Uuid,
    /// The post title.
    pub title: String,
    /// The post body.
    pub body: String,
    /// The author.
    pub author_id: String,
    /// Optional thumbnail URL.
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    /// Set when the post was published from a translation.
    #[serde(default)]
    pub translation: Option<TranslationProvenance>,
}

/// An editable post field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostField {
    /// The title.
    Title,
    /// The body.
    Body,
    /// The thumbnail URL.
    ThumbnailUrl,
}

/// Emitted once per field whose value actually changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostUpdated {
    /// The post identifier.
    pub post_id: Uuid,
    /// The changed field.
    pub field: PostField,
    /// Value before the change.
    pub old_value: Option<String>,
    /// Value after the change.
    pub new_value: Option<String>,
    /// Who made the change.
    pub updated_by: String,
}

/// Emitted when a post is liked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostLiked {
    /// The post identifier.
    pub post_id: Uuid,
    /// Who liked it.
    pub liked_by: String,
    /// Like count after this like.
    pub total_likes: u64,
}

/// Emitted when a post is viewed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostViewed {
    /// The post identifier.
    pub post_id: Uuid,
    /// The viewer, if known.
    pub viewer_id: Option<String>,
    /// View count after this view.
    pub total_views: u64,
}

/// Emitted when a post is soft-deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostDeleted {
    /// The post identifier.
    pub post_id: Uuid,
    /// Who deleted it.
    pub deleted_by: String,
}

/// Event payload variants for the Post context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostEvent {
    /// A post has been created.
    Created(PostCreated),
    /// A post field has changed.
    Updated(PostUpdated),
    /// A post has been liked.
    Liked(PostLiked),
    /// A post has been viewed.
    Viewed(PostViewed),
    /// A post has been deleted.
    Deleted(PostDeleted),
}

static CODEC: LazyLock<EventCodec<PostEvent>> = LazyLock::new(|| {
    EventCodec::new()
        .register(POST_CREATED_EVENT_TYPE, PostEvent::Created)
        .register(POST_UPDATED_EVENT_TYPE, PostEvent::Updated)
        .register(POST_LIKED_EVENT_TYPE, PostEvent::Liked)
        .register(POST_VIEWED_EVENT_TYPE, PostEvent::Viewed)
        .register(POST_DELETED_EVENT_TYPE, PostEvent::Deleted)
});

impl DomainEvent for PostEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::Created(_) => POST_CREATED_EVENT_TYPE,
            Self::Updated(_) => POST_UPDATED_EVENT_TYPE,
            Self::Liked(_) => POST_LIKED_EVENT_TYPE,
            Self::Viewed(_) => POST_VIEWED_EVENT_TYPE,
            Self::Deleted(_) => POST_DELETED_EVENT_TYPE,
        }
    }

    fn encode_payload(&self) -> serde_json::Result<Vec<u8>> {
        match self {
            Self::Created(e) => serde_json::to_vec(e),
            Self::Updated(e) => serde_json::to_vec(e),
            Self::Liked(e) => serde_json::to_vec(e),
            Self::Viewed(e) => serde_json::to_vec(e),
            Self::Deleted(e) => serde_json::to_vec(e),
        }
    }

    fn codec() -> &'static EventCodec<Self> {
        &CODEC
    }
}
