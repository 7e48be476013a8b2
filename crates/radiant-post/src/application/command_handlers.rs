//! Command handlers for the Post context.
//!
//! Each handler loads the aggregate, runs the domain method and persists the
//! resulting events. Publishing is left to the dispatcher.

use std::sync::Arc;

use async_trait::async_trait;
use radiant_core::aggregate::EventSourced;
use radiant_core::clock::Clock;
use radiant_core::command::{CommandDispatcher, CommandHandler, CommandOutcome};
use radiant_core::error::DomainError;
use radiant_core::event::EventMetadata;
use radiant_core::repository::{load_aggregate, save_aggregate};
use radiant_core::store::EventStore;
use tracing::{info, instrument};

use crate::domain::aggregates::Post;
use crate::domain::commands::{CreatePost, DeletePost, LikePost, UpdatePost, ViewPost};

async fn commit(
    store: &dyn EventStore,
    post: &mut EventSourced<Post>,
) -> Result<CommandOutcome, DomainError> {
    let events = save_aggregate(store, post).await?;
    Ok(CommandOutcome {
        aggregate_id: post.id(),
        events,
    })
}

/// Handles `CreatePost`: validates and appends `post.created` to a new
/// stream.
///
/// # Errors
///
/// Returns `DomainError::Validation` for invalid content, or
/// `DomainError::ConcurrencyConflict` if a post with that id already exists.
#[instrument(skip_all, fields(post_id = %command.post_id))]
pub async fn handle_create_post(
    command: &CreatePost,
    clock: &dyn Clock,
    store: &dyn EventStore,
) -> Result<CommandOutcome, DomainError> {
    let event = Post::create(
        command.post_id,
        &command.author_id,
        &command.title,
        &command.body,
        command.thumbnail_url.clone(),
        command.translation.clone(),
    )?;

    let mut metadata =
        EventMetadata::for_command(command.correlation_id, Some(command.author_id.clone()));
    if command.causation_id.is_some() {
        metadata.causation_id = command.causation_id;
    }

    let mut post = EventSourced::<Post>::new(command.post_id);
    post.record(event, metadata, clock);
    let outcome = commit(store, &mut post).await?;
    info!(author_id = %command.author_id, "post created");
    Ok(outcome)
}

/// Handles `UpdatePost`: appends one `post.updated` per changed field.
/// Nothing is appended when every supplied value matches the current one.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the post does not exist, or
/// `DomainError::Validation` if it is deleted or a value is invalid.
#[instrument(skip_all, fields(post_id = %command.post_id))]
pub async fn handle_update_post(
    command: &UpdatePost,
    clock: &dyn Clock,
    store: &dyn EventStore,
) -> Result<CommandOutcome, DomainError> {
    let mut post = load_aggregate::<Post>(store, command.post_id).await?;
    let events = post.state().update(
        command.post_id,
        &command.updated_by,
        command.title.as_deref(),
        command.body.as_deref(),
        command.thumbnail_url.as_deref(),
    )?;
    for event in events {
        let metadata =
            EventMetadata::for_command(command.correlation_id, Some(command.updated_by.clone()));
        post.record(event, metadata, clock);
    }
    commit(store, &mut post).await
}

/// Handles `LikePost`.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the post does not exist, or
/// `DomainError::Validation` if it is deleted.
#[instrument(skip_all, fields(post_id = %command.post_id))]
pub async fn handle_like_post(
    command: &LikePost,
    clock: &dyn Clock,
    store: &dyn EventStore,
) -> Result<CommandOutcome, DomainError> {
    let mut post = load_aggregate::<Post>(store, command.post_id).await?;
    let event = post.state().like(command.post_id, &command.liked_by)?;
    post.record(
        event,
        EventMetadata::for_command(command.correlation_id, Some(command.liked_by.clone())),
        clock,
    );
    commit(store, &mut post).await
}

/// Handles `ViewPost`.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the post does not exist, or
/// `DomainError::Validation` if it is deleted.
#[instrument(skip_all, fields(post_id = %command.post_id))]
pub async fn handle_view_post(
    command: &ViewPost,
    clock: &dyn Clock,
    store: &dyn EventStore,
) -> Result<CommandOutcome, DomainError> {
    let mut post = load_aggregate::<Post>(store, command.post_id).await?;
    let event = post
        .state()
        .view(command.post_id, command.viewer_id.clone())?;
    post.record(
        event,
        EventMetadata::for_command(command.correlation_id, command.viewer_id.clone()),
        clock,
    );
    commit(store, &mut post).await
}

/// Handles `DeletePost`: records the soft-delete marker.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the post does not exist, or
/// `DomainError::Validation` if it is already deleted.
#[instrument(skip_all, fields(post_id = %command.post_id))]
pub async fn handle_delete_post(
    command: &DeletePost,
    clock: &dyn Clock,
    store: &dyn EventStore,
) -> Result<CommandOutcome, DomainError> {
    let mut post = load_aggregate::<Post>(store, command.post_id).await?;
    let event = post.state().delete(command.post_id, &command.deleted_by)?;
    post.record(
        event,
        EventMetadata::for_command(command.correlation_id, Some(command.deleted_by.clone())),
        clock,
    );
    let outcome = commit(store, &mut post).await?;
    info!(deleted_by = %command.deleted_by, "post deleted");
    Ok(outcome)
}

/// Dispatcher-facing handler for every Post command.
#[derive(Clone)]
pub struct PostCommandHandler {
    clock: Arc<dyn Clock>,
    store: Arc<dyn EventStore>,
}

impl PostCommandHandler {
    /// Creates a handler over the given clock and store.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, store: Arc<dyn EventStore>) -> Self {
        Self { clock, store }
    }
}

macro_rules! route {
    ($command:ty, $handler:ident) => {
        #[async_trait]
        impl CommandHandler<$command> for PostCommandHandler {
            async fn handle(&self, command: &$command) -> Result<CommandOutcome, DomainError> {
                $handler(command, self.clock.as_ref(), self.store.as_ref()).await
            }
        }
    };
}

route!(CreatePost, handle_create_post);
route!(UpdatePost, handle_update_post);
route!(LikePost, handle_like_post);
route!(ViewPost, handle_view_post);
route!(DeletePost, handle_delete_post);

/// Registers every Post command on `dispatcher`.
pub fn register_post_handlers(
    dispatcher: &mut CommandDispatcher,
    clock: Arc<dyn Clock>,
    store: Arc<dyn EventStore>,
) {
    let handler = PostCommandHandler::new(clock, store);
    dispatcher.register::<CreatePost, _>(handler.clone());
    dispatcher.register::<UpdatePost, _>(handler.clone());
    dispatcher.register::<LikePost, _>(handler.clone());
    dispatcher.register::<ViewPost, _>(handler.clone());
    dispatcher.register::<DeletePost, _>(handler);
}
