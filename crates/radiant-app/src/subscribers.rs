//! Cross-context reactions wired by the kernel.

use std::sync::Arc;

use async_trait::async_trait;
use radiant_core::command::CommandDispatcher;
use radiant_core::codec::decode_metadata;
use radiant_core::error::DomainError;
use radiant_core::event::DomainEvent;
use radiant_core::repository::load_aggregate;
use radiant_core::store::{EventStore, StoredEvent};
use radiant_eventing::{EventFilter, EventSubscriber};
use radiant_post::domain::aggregates::{MAX_BODY_LENGTH, MAX_TITLE_LENGTH};
use radiant_post::domain::commands::CreatePost;
use radiant_post::domain::events::TranslationProvenance;
use radiant_translation::domain::aggregates::TranslationSession;
use radiant_translation::domain::events::{
    TRANSLATION_COMPLETED_EVENT_TYPE, TranslationCompleted, TranslationEvent,
};
use tracing::{debug, info};
use uuid::Uuid;

/// Title used when a translation has no usable first sentence.
pub const FALLBACK_TITLE: &str = "Translated post";

/// Id of the post published from translation session `session_id`.
#[must_use]
pub fn translated_post_id(session_id: Uuid) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, session_id.as_bytes())
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Publishes every completed translation as a post by the requesting user.
pub struct TranslatedPostPublisher {
    dispatcher: Arc<CommandDispatcher>,
    store: Arc<dyn EventStore>,
}

impl TranslatedPostPublisher {
    /// Creates the subscriber.
    #[must_use]
    pub fn new(dispatcher: Arc<CommandDispatcher>, store: Arc<dyn EventStore>) -> Self {
        Self { dispatcher, store }
    }

    fn post_for(completed: &TranslationCompleted, author_id: String) -> CreatePost {
        let title = completed
            .sentence_pairs
            .first()
            .map(|p| p.translated.trim())
            .filter(|t| !t.is_empty())
            .map_or_else(
                || FALLBACK_TITLE.to_owned(),
                |t| truncate_chars(t, MAX_TITLE_LENGTH),
            );
        CreatePost {
            correlation_id: Uuid::new_v4(),
            post_id: translated_post_id(completed.session_id),
            author_id,
            title,
            body: truncate_chars(&completed.translated_text, MAX_BODY_LENGTH),
            thumbnail_url: None,
            translation: Some(TranslationProvenance {
                session_id: completed.session_id,
                translated_title: completed
                    .sentence_pairs
                    .first()
                    .map(|p| p.original.clone()),
                original_sentences: completed
                    .sentence_pairs
                    .iter()
                    .map(|p| p.original.clone())
                    .collect(),
                translated_sentences: completed
                    .sentence_pairs
                    .iter()
                    .map(|p| p.translated.clone())
                    .collect(),
            }),
            causation_id: None,
        }
    }
}

#[async_trait]
impl EventSubscriber for TranslatedPostPublisher {
    fn name(&self) -> &str {
        "translated-post-publisher"
    }

    fn filter(&self) -> EventFilter {
        EventFilter::One(TRANSLATION_COMPLETED_EVENT_TYPE)
    }

    async fn handle(&self, event: &StoredEvent) -> Result<(), DomainError> {
        let envelope = TranslationEvent::codec().decode(event)?;
        let TranslationEvent::Completed(completed) = envelope.payload else {
            return Ok(());
        };

        let session =
            load_aggregate::<TranslationSession>(self.store.as_ref(), completed.session_id)
                .await?;
        let mut command = Self::post_for(&completed, session.state().user_id().to_owned());
        let metadata = decode_metadata(&event.metadata)?;
        command.correlation_id = metadata.correlation_id.unwrap_or(event.event_id);
        command.causation_id = Some(event.event_id);

        match self.dispatcher.dispatch(&command).await {
            Ok(_) => {
                info!(
                    session_id = %completed.session_id,
                    post_id = %command.post_id,
                    "translated post published"
                );
                Ok(())
            }
            Err(e) if e.is_conflict() => {
                debug!(post_id = %command.post_id, "translated post already published");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
