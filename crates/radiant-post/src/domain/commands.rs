//! Commands for the Post context.

use radiant_core::command::Command;
use radiant_core::error::DomainError;
use uuid::Uuid;

use super::events::TranslationProvenance;

/// Command to create a new post.
#[derive(Debug, Clone)]
pub struct CreatePost {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The identifier to create the post under.
    pub post_id: Uuid,
    /// The author.
    pub author_id: String,
    /// The post title.
    pub title: String,
    /// The post body.
    pub body: String,
    /// Optional thumbnail URL.
    pub thumbnail_url: Option<String>,
    /// Set when publishing a finished translation.
    pub translation: Option<TranslationProvenance>,
    /// Event that caused this command, if any.
    pub causation_id: Option<Uuid>,
}

/// Command to edit a post. `None` fields are left untouched.
#[derive(Debug, Clone)]
pub struct UpdatePost {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The post identifier.
    pub post_id: Uuid,
    /// Who is editing.
    pub updated_by: String,
    /// New title.
    pub title: Option<String>,
    /// New body.
    pub body: Option<String>,
    /// New thumbnail URL.
    pub thumbnail_url: Option<String>,
}

/// Command to like a post.
#[derive(Debug, Clone)]
pub struct LikePost {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The post identifier.
    pub post_id: Uuid,
    /// Who likes it.
    pub liked_by: String,
}

/// Command to record a post view.
#[derive(Debug, Clone)]
pub struct ViewPost {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The post identifier.
    pub post_id: Uuid,
    /// The viewer, if known.
    pub viewer_id: Option<String>,
}

/// Command to soft-delete a post.
#[derive(Debug, Clone)]
pub struct DeletePost {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The post identifier.
    pub post_id: Uuid,
    /// Who is deleting.
    pub deleted_by: String,
}

macro_rules! post_command {
    ($command:ty, $name:literal) => {
        impl Command for $command {
            type Error = DomainError;

            fn command_type(&self) -> &'static str {
                $name
            }

            fn correlation_id(&self) -> Uuid {
                self.correlation_id
            }
        }
    };
}

post_command!(CreatePost, "post.create");
post_command!(UpdatePost, "post.update");
post_command!(LikePost, "post.like");
post_command!(ViewPost, "post.view");
post_command!(DeletePost, "post.delete");
