//! Query handlers for the Translation context.

use chrono::{DateTime, Utc};
use radiant_core::aggregate::EventSourced;
use radiant_core::error::DomainError;
use radiant_core::store::EventStore;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::aggregates::TranslationSession;
use crate::domain::language::Language;
use crate::domain::model::{Failure, TranslationStatus};

/// Status view of a translation session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationSessionView {
    /// The session identifier.
    pub id: Uuid,
    /// Current status.
    pub status: TranslationStatus,
    /// Length of the source text, in characters.
    pub text_length: usize,
    /// Detected or hinted source language.
    pub source_language: Language,
    /// When the session was requested.
    pub created_at: DateTime<Utc>,
    /// When the session reached a terminal state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Why the session failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<Failure>,
}

/// Retrieves a session's status by replaying its stream.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the session was never
/// requested, or `DomainError::Codec` if an event cannot be decoded.
pub async fn get_translation_session(
    session_id: Uuid,
    store: &dyn EventStore,
) -> Result<TranslationSessionView, DomainError> {
    let history = store.load(session_id).await?;
    let (Some(first), Some(last)) = (history.first(), history.last()) else {
        return Err(DomainError::AggregateNotFound(session_id));
    };
    let (created_at, last_at) = (first.occurred_at, last.occurred_at);

    let session = EventSourced::<TranslationSession>::from_history(session_id, &history)?;
    let state = session.state();
    let (Some(status), Some(source_language)) = (state.status(), state.source_language()) else {
        return Err(DomainError::AggregateNotFound(session_id));
    };
    Ok(TranslationSessionView {
        id: session_id,
        status,
        text_length: state.text_length(),
        source_language: source_language.clone(),
        created_at,
        completed_at: status.is_terminal().then_some(last_at),
        failure: state.failure().cloned(),
    })
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use radiant_event_store::InMemoryEventStore;
    use radiant_test_support::{AdjustableClock, EmptyEventStore, FailingEventStore};

    use super::*;
    use crate::application::command_handlers::{
        handle_fail_translation, handle_request_translation,
    };
    use crate::domain::commands::{FailTranslation, RequestTranslation};
    use crate::domain::language::LanguageCode;
    use crate::error::TranslationErrorKind;

    #[tokio::test]
    async fn test_get_translation_session_in_progress_has_no_completion() {
        // Arrange
        let start = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();
        let clock = AdjustableClock::new(start);
        let store = InMemoryEventStore::new();
        let command = RequestTranslation::new("u1", "Hello world! This is a test translation.");
        handle_request_translation(&command, &clock, &store)
            .await
            .unwrap();

        // Act
        let view = get_translation_session(command.session_id, &store)
            .await
            .unwrap();

        // Assert
        assert_eq!(view.status, TranslationStatus::InProgress);
        assert_eq!(view.text_length, 40);
        assert_eq!(view.source_language.code, LanguageCode::En);
        assert_eq!(view.created_at, start);
        assert_eq!(view.completed_at, None);
        assert_eq!(view.failure, None);
    }

    #[tokio::test]
    async fn test_get_translation_session_failed_reports_failure_and_completion() {
        // Arrange
        let start = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();
        let clock = AdjustableClock::new(start);
        let store = InMemoryEventStore::new();
        let command = RequestTranslation::new("u1", "こんにちは");
        handle_request_translation(&command, &clock, &store)
            .await
            .unwrap();
        clock.advance(Duration::seconds(3));
        handle_fail_translation(
            &FailTranslation {
                correlation_id: command.correlation_id,
                causation_id: Uuid::new_v4(),
                user_id: Some("u1".into()),
                session_id: command.session_id,
                kind: TranslationErrorKind::ServiceUnavailable,
                message: String::new(),
            },
            &clock,
            &store,
        )
        .await
        .unwrap();

        // Act
        let view = get_translation_session(command.session_id, &store)
            .await
            .unwrap();

        // Assert
        assert_eq!(view.status, TranslationStatus::Failed);
        assert_eq!(view.source_language.code, LanguageCode::Ja);
        assert_eq!(view.completed_at, Some(start + Duration::seconds(3)));
        let failure = view.failure.unwrap();
        assert_eq!(failure.kind, TranslationErrorKind::ServiceUnavailable);
    }

    #[tokio::test]
    async fn test_view_serializes_camel_case() {
        let clock = AdjustableClock::new(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap());
        let store = InMemoryEventStore::new();
        let command = RequestTranslation::new("u1", "Hello");
        handle_request_translation(&command, &clock, &store)
            .await
            .unwrap();

        let view = get_translation_session(command.session_id, &store)
            .await
            .unwrap();
        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["status"], "IN_PROGRESS");
        assert_eq!(json["textLength"], 5);
        assert_eq!(json["sourceLanguage"]["code"], "EN");
        assert!(json.get("completedAt").is_none());
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let session_id = Uuid::new_v4();

        let result = get_translation_session(session_id, &EmptyEventStore).await;

        assert!(matches!(result, Err(DomainError::AggregateNotFound(id)) if id == session_id));
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let result = get_translation_session(Uuid::new_v4(), &FailingEventStore).await;

        assert!(matches!(result, Err(DomainError::Infrastructure(_))));
    }
}
