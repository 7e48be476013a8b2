//! Aggregate for the Post context.
//!
//! `Post` is the folded state. Its domain methods validate against that state
//! and return the events to record; command handlers record them on the
//! `EventSourced<Post>` entity, which applies and buffers each one.

use radiant_core::aggregate::Aggregate;
use radiant_core::error::DomainError;
use uuid::Uuid;

use super::events::{
    PostCreated, PostDeleted, PostEvent, PostField, PostLiked, PostUpdated, PostViewed,
    TranslationProvenance,
};

/// Maximum title length, in characters.
pub const MAX_TITLE_LENGTH: usize = 200;
/// Maximum body length, in characters.
pub const MAX_BODY_LENGTH: usize = 10_000;

/// Folded state of a post.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Post {
    created: bool,
    title: String,
    body: String,
    author_id: String,
    thumbnail_url: Option<String>,
    translation: Option<TranslationProvenance>,
    like_count: u64,
    view_count: u64,
    deleted: bool,
}

fn validate_title(title: &str) -> Result<(), DomainError> {
    if title.trim().is_empty() {
        return Err(DomainError::Validation("post title must not be empty".into()));
    }
    let length = title.chars().count();
    if length > MAX_TITLE_LENGTH {
        return Err(DomainError::Validation(format!(
            "post title exceeds {MAX_TITLE_LENGTH} characters (actual: {length})"
        )));
    }
    Ok(())
}

fn validate_body(body: &str) -> Result<(), DomainError> {
    let length = body.chars().count();
    if length > MAX_BODY_LENGTH {
        return Err(DomainError::Validation(format!(
            "post body exceeds {MAX_BODY_LENGTH} characters (actual: {length})"
        )));
    }
    Ok(())
}

fn field_changed(
    post_id: Uuid,
    updated_by: &str,
    field: PostField,
    old_value: Option<&str>,
    new_value: &str,
) -> PostEvent {
    PostEvent::Updated(PostUpdated {
        post_id,
        field,
        old_value: old_value.map(str::to_owned),
        new_value: Some(new_value.to_owned()),
        updated_by: updated_by.to_owned(),
    })
}

impl Post {
    /// Validates a new post and produces its `PostCreated` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for a blank or over-long title, an
    /// over-long body, or a blank author.
    pub fn create(
        post_id: Uuid,
        author_id: &str,
        title: &str,
        body: &str,
        thumbnail_url: Option<String>,
        translation: Option<TranslationProvenance>,
    ) -> Result<PostEvent, DomainError> {
        if author_id.trim().is_empty() {
            return Err(DomainError::Validation("post author must not be empty".into()));
        }
        validate_title(title)?;
        validate_body(body)?;
        Ok(PostEvent::Created(PostCreated {
            post_id,
            title: title.to_owned(),
            body: body.to_owned(),
            author_id: author_id.to_owned(),
            thumbnail_url,
            translation,
        }))
    }

    /// Produces one `PostUpdated` per field whose value differs from the
    /// current one. Unchanged or omitted fields produce nothing.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the post is deleted or a new
    /// value fails validation.
    pub fn update(
        &self,
        post_id: Uuid,
        updated_by: &str,
        title: Option<&str>,
        body: Option<&str>,
        thumbnail_url: Option<&str>,
    ) -> Result<Vec<PostEvent>, DomainError> {
        self.ensure_live(post_id)?;
        let mut events = Vec::new();

        if let Some(title) = title.filter(|t| *t != self.title) {
            validate_title(title)?;
            events.push(field_changed(
                post_id,
                updated_by,
                PostField::Title,
                Some(&self.title),
                title,
            ));
        }
        if let Some(body) = body.filter(|b| *b != self.body) {
            validate_body(body)?;
            events.push(field_changed(
                post_id,
                updated_by,
                PostField::Body,
                Some(&self.body),
                body,
            ));
        }
        if let Some(url) = thumbnail_url.filter(|u| self.thumbnail_url.as_deref() != Some(*u)) {
            events.push(field_changed(
                post_id,
                updated_by,
                PostField::ThumbnailUrl,
                self.thumbnail_url.as_deref(),
                url,
            ));
        }
        Ok(events)
    }

    /// Produces a `PostLiked` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the post is deleted.
    pub fn like(&self, post_id: Uuid, liked_by: &str) -> Result<PostEvent, DomainError> {
        self.ensure_live(post_id)?;
        Ok(PostEvent::Liked(PostLiked {
            post_id,
            liked_by: liked_by.to_owned(),
            total_likes: self.like_count + 1,
        }))
    }

    /// Produces a `PostViewed` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the post is deleted.
    pub fn view(&self, post_id: Uuid, viewer_id: Option<String>) -> Result<PostEvent, DomainError> {
        self.ensure_live(post_id)?;
        Ok(PostEvent::Viewed(PostViewed {
            post_id,
            viewer_id,
            total_views: self.view_count + 1,
        }))
    }

    /// Produces a `PostDeleted` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the post is already deleted.
    pub fn delete(&self, post_id: Uuid, deleted_by: &str) -> Result<PostEvent, DomainError> {
        self.ensure_live(post_id)?;
        Ok(PostEvent::Deleted(PostDeleted {
            post_id,
            deleted_by: deleted_by.to_owned(),
        }))
    }

    fn ensure_live(&self, post_id: Uuid) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::AggregateNotFound(post_id));
        }
        if self.deleted {
            return Err(DomainError::Validation(format!("post {post_id} is deleted")));
        }
        Ok(())
    }

    /// The post title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// The post body.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// The author.
    #[must_use]
    pub fn author_id(&self) -> &str {
        &self.author_id
    }

    /// Optional thumbnail URL.
    #[must_use]
    pub fn thumbnail_url(&self) -> Option<&str> {
        self.thumbnail_url.as_deref()
    }

    /// Translation provenance, for posts published from a translation.
    #[must_use]
    pub fn translation(&self) -> Option<&TranslationProvenance> {
        self.translation.as_ref()
    }

    /// Number of likes.
    #[must_use]
    pub fn like_count(&self) -> u64 {
        self.like_count
    }

    /// Number of views.
    #[must_use]
    pub fn view_count(&self) -> u64 {
        self.view_count
    }

    /// Whether the post has been soft-deleted.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted
    }
}

impl Aggregate for Post {
    type Event = PostEvent;
    const AGGREGATE_TYPE: &'static str = "post";

    fn apply(&mut self, event: &PostEvent) {
        match event {
            PostEvent::Created(e) => {
                self.created = true;
                self.title.clone_from(&e.title);
                self.body.clone_from(&e.body);
                self.author_id.clone_from(&e.author_id);
                self.thumbnail_url.clone_from(&e.thumbnail_url);
                self.translation.clone_from(&e.translation);
            }
            PostEvent::Updated(e) => match e.field {
                PostField::Title => self.title = e.new_value.clone().unwrap_or_default(),
                PostField::Body => self.body = e.new_value.clone().unwrap_or_default(),
                PostField::ThumbnailUrl => self.thumbnail_url.clone_from(&e.new_value),
            },
            PostEvent::Liked(e) => self.like_count = e.total_likes,
            PostEvent::Viewed(e) => self.view_count = e.total_views,
            PostEvent::Deleted(_) => self.deleted = true,
        }
    }
}
