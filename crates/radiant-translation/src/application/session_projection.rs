//! Translation session read model, by id and by user.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use radiant_core::error::DomainError;
use radiant_core::event::DomainEvent;
use radiant_core::store::StoredEvent;
use radiant_eventing::{EventFilter, Projection};
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::domain::events::{
    TRANSLATION_COMPLETED_EVENT_TYPE, TRANSLATION_FAILED_EVENT_TYPE,
    TRANSLATION_REQUESTED_EVENT_TYPE, TranslationEvent,
};
use crate::domain::language::{Language, LanguageCode};
use crate::domain::model::{Failure, TranslationStatus};

const SESSION_EVENT_TYPES: &[&str] = &[
    TRANSLATION_REQUESTED_EVENT_TYPE,
    TRANSLATION_COMPLETED_EVENT_TYPE,
    TRANSLATION_FAILED_EVENT_TYPE,
];

/// A session as listed to its user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionRecord {
    /// The session identifier.
    pub session_id: Uuid,
    /// Who asked.
    pub user_id: String,
    /// Current status.
    pub status: TranslationStatus,
    /// Source length in characters.
    pub text_length: usize,
    /// Detected or hinted source language.
    pub source_language: Language,
    /// Requested target language.
    pub target_language: LanguageCode,
    /// Sentences translated, once completed.
    pub sentence_count: usize,
    /// Why the session failed.
    pub failure: Option<Failure>,
    /// When the session was requested.
    pub created_at: DateTime<Utc>,
    /// When the session reached a terminal state.
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    last_sequence: i64,
}

/// In-memory projection of translation sessions.
#[derive(Debug, Default)]
pub struct TranslationSessionProjection {
    records: RwLock<HashMap<Uuid, SessionRecord>>,
}

impl TranslationSessionProjection {
    /// Creates an empty read model.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<Uuid, SessionRecord>> {
        self.records.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Uuid, SessionRecord>> {
        self.records.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Looks up a session.
    #[must_use]
    pub fn find(&self, session_id: Uuid) -> Option<SessionRecord> {
        self.read().get(&session_id).cloned()
    }

    /// Sessions requested by `user_id`, newest first.
    #[must_use]
    pub fn find_by_user(&self, user_id: &str) -> Vec<SessionRecord> {
        let mut sessions: Vec<SessionRecord> = self
            .read()
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.session_id.cmp(&a.session_id))
        });
        sessions
    }

    /// Number of projected sessions.
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

#[async_trait]
impl Projection for TranslationSessionProjection {
    fn name(&self) -> &str {
        "translation-sessions"
    }

    fn filter(&self) -> EventFilter {
        EventFilter::Many(SESSION_EVENT_TYPES)
    }

    async fn reset(&self) -> Result<(), DomainError> {
        self.write().clear();
        Ok(())
    }

    async fn apply(&self, event: &StoredEvent) -> Result<(), DomainError> {
        let envelope = TranslationEvent::codec().decode(event)?;
        let mut records = self.write();

        if let TranslationEvent::Requested(requested) = envelope.payload {
            records
                .entry(requested.session_id)
                .or_insert_with(|| SessionRecord {
                    session_id: requested.session_id,
                    user_id: requested.user_id,
                    status: TranslationStatus::InProgress,
                    text_length: requested.text_length,
                    source_language: requested.source_language,
                    target_language: requested.target_language,
                    sentence_count: 0,
                    failure: None,
                    created_at: event.occurred_at,
                    completed_at: None,
                    last_sequence: event.sequence_number,
                });
            return Ok(());
        }

        let Some(record) = records.get_mut(&event.aggregate_id) else {
            warn!(
                session_id = %event.aggregate_id,
                event_type = %event.event_type,
                "translation session missing for event"
            );
            return Ok(());
        };
        if event.sequence_number <= record.last_sequence {
            return Ok(());
        }
        record.last_sequence = event.sequence_number;
        record.completed_at = Some(event.occurred_at);

        match envelope.payload {
            TranslationEvent::Completed(completed) => {
                record.status = TranslationStatus::Completed;
                record.sentence_count = completed.sentence_pairs.len();
            }
            TranslationEvent::Failed(failed) => {
                record.status = TranslationStatus::Failed;
                record.failure = Some(Failure {
                    kind: failed.kind,
                    message: failed.message,
                });
            }
            TranslationEvent::Requested(_) => {}
        }
        Ok(())
    }
}
