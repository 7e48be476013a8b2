//! Command handlers for the Translation context.

use std::sync::Arc;

use async_trait::async_trait;
use radiant_core::aggregate::EventSourced;
use radiant_core::clock::Clock;
use radiant_core::command::{CommandDispatcher, CommandHandler, CommandOutcome};
use radiant_core::event::EventMetadata;
use radiant_core::repository::{load_aggregate, save_aggregate};
use radiant_core::store::EventStore;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::domain::aggregates::{RequestOptions, TranslationSession};
use crate::domain::commands::{CompleteTranslation, FailTranslation, RequestTranslation};
use crate::error::TranslationError;

fn outcome_metadata(
    correlation_id: Uuid,
    causation_id: Uuid,
    user_id: Option<String>,
) -> EventMetadata {
    EventMetadata {
        user_id,
        correlation_id: Some(correlation_id),
        causation_id: Some(causation_id),
        ..EventMetadata::default()
    }
}

/// Handles `RequestTranslation`: validates, detects the source language and
/// opens the session in `IN_PROGRESS`. Returns without waiting for the
/// translation.
///
/// # Errors
///
/// Returns `TranslationError::InvalidInput` or
/// `TranslationError::TextTooLong` before anything is appended, or a
/// `Domain` error from the store.
#[instrument(skip_all, fields(session_id = %command.session_id, user_id = %command.user_id))]
pub async fn handle_request_translation(
    command: &RequestTranslation,
    clock: &dyn Clock,
    store: &dyn EventStore,
) -> Result<CommandOutcome, TranslationError> {
    let event = TranslationSession::request(
        command.session_id,
        &command.user_id,
        &command.source_text,
        RequestOptions {
            source_language_hint: command.source_language_hint,
            preserve_formatting: command.preserve_formatting,
            target_language: command.target_language,
        },
    )?;

    let mut session = EventSourced::<TranslationSession>::new(command.session_id);
    session.record(
        event,
        EventMetadata::for_command(command.correlation_id, Some(command.user_id.clone())),
        clock,
    );
    let events = save_aggregate(store, &mut session).await?;
    info!(
        text_length = session.state().text_length(),
        source_language = ?session.state().source_language().map(|l| l.code),
        "translation requested"
    );
    Ok(CommandOutcome {
        aggregate_id: command.session_id,
        events,
    })
}

/// Handles `CompleteTranslation`.
///
/// # Errors
///
/// Returns `TranslationError::InvalidStateTransition` if the session is
/// already terminal, `TranslationError::InvalidInput` for a malformed
/// result, or a `Domain` error from the store.
#[instrument(skip_all, fields(session_id = %command.session_id))]
pub async fn handle_complete_translation(
    command: &CompleteTranslation,
    clock: &dyn Clock,
    store: &dyn EventStore,
) -> Result<CommandOutcome, TranslationError> {
    let mut session = load_aggregate::<TranslationSession>(store, command.session_id).await?;
    let event = session.state().complete(
        command.session_id,
        &command.translated_text,
        command.sentence_pairs.clone(),
        command.metadata,
    )?;
    session.record(
        event,
        outcome_metadata(command.correlation_id, command.causation_id, command.user_id.clone()),
        clock,
    );
    let events = save_aggregate(store, &mut session).await?;
    info!(
        pairs = command.sentence_pairs.len(),
        processing_time_ms = command.metadata.processing_time_ms,
        "translation completed"
    );
    Ok(CommandOutcome {
        aggregate_id: command.session_id,
        events,
    })
}

/// Handles `FailTranslation`.
///
/// # Errors
///
/// Returns `TranslationError::InvalidStateTransition` if the session is
/// already terminal, or a `Domain` error from the store.
#[instrument(skip_all, fields(session_id = %command.session_id))]
pub async fn handle_fail_translation(
    command: &FailTranslation,
    clock: &dyn Clock,
    store: &dyn EventStore,
) -> Result<CommandOutcome, TranslationError> {
    let mut session = load_aggregate::<TranslationSession>(store, command.session_id).await?;
    let event = session
        .state()
        .fail(command.session_id, command.kind, &command.message)?;
    session.record(
        event,
        outcome_metadata(command.correlation_id, command.causation_id, command.user_id.clone()),
        clock,
    );
    let events = save_aggregate(store, &mut session).await?;
    warn!(kind = %command.kind, message = %command.message, "translation failed");
    Ok(CommandOutcome {
        aggregate_id: command.session_id,
        events,
    })
}

/// Dispatcher-facing handler for every Translation command.
#[derive(Clone)]
pub struct TranslationCommandHandler {
    clock: Arc<dyn Clock>,
    store: Arc<dyn EventStore>,
}

impl TranslationCommandHandler {
    /// Creates a handler over the given clock and store.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, store: Arc<dyn EventStore>) -> Self {
        Self { clock, store }
    }
}

macro_rules! route {
    ($command:ty, $handler:ident) => {
        #[async_trait]
        impl CommandHandler<$command> for TranslationCommandHandler {
            async fn handle(&self, command: &$command) -> Result<CommandOutcome, TranslationError> {
                $handler(command, self.clock.as_ref(), self.store.as_ref()).await
            }
        }
    };
}

route!(RequestTranslation, handle_request_translation);
route!(CompleteTranslation, handle_complete_translation);
route!(FailTranslation, handle_fail_translation);

/// Registers every Translation command on `dispatcher`.
pub fn register_translation_handlers(
    dispatcher: &mut CommandDispatcher,
    clock: Arc<dyn Clock>,
    store: Arc<dyn EventStore>,
) {
    let handler = TranslationCommandHandler::new(clock, store);
    dispatcher.register::<RequestTranslation, _>(handler.clone());
    dispatcher.register::<CompleteTranslation, _>(handler.clone());
    dispatcher.register::<FailTranslation, _>(handler);
}
