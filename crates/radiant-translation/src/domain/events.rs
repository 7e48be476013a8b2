//! Domain events for the Translation context.

use std::sync::LazyLock;

use radiant_core::codec::EventCodec;
use radiant_core::event::DomainEvent;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::language::{Language, LanguageCode};
use super::model::{SentencePair, TranslationMetadata};
use crate::error::TranslationErrorKind;

/// Event type for [`TranslationRequested`].
pub const TRANSLATION_REQUESTED_EVENT_TYPE: &str = "translation.requested";
/// Event type for [`TranslationCompleted`].
pub const TRANSLATION_COMPLETED_EVENT_TYPE: &str = "translation.completed";
/// Event type for [`TranslationFailed`].
pub const TRANSLATION_FAILED_EVENT_TYPE: &str = "translation.failed";

/// Emitted when a translation session is opened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationRequested {
    /// The session identifier.
    pub session_id: Uuid,
    /// Who asked.
    pub user_id: String,
    /// Detected or hinted source language.
    pub source_language: Language,
    /// The text to translate.
    pub source_text: String,
    /// Length of `source_text` in characters.
    pub text_length: usize,
    /// Requested target language.
    pub target_language: LanguageCode,
    /// Whether layout should survive translation.
    pub preserve_formatting: bool,
}

/// Emitted when the provider produced a translation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationCompleted {
    /// The session identifier.
    pub session_id: Uuid,
    /// Full translated text.
    pub translated_text: String,
    /// Aligned sentences, ordered from 0.
    pub sentence_pairs: Vec<SentencePair>,
    /// Provider statistics.
    pub metadata: TranslationMetadata,
}

/// Emitted when the session could not be translated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationFailed {
    /// The session identifier.
    pub session_id: Uuid,
    /// Failure category.
    pub kind: TranslationErrorKind,
    /// Failure message.
    pub message: String,
}

/// Event payload variants for the Translation context.
#[derive(Debug, Clone, PartialEq)]
pub enum TranslationEvent {
    /// A session was opened.
    Requested(TranslationRequested),
    /// A session completed.
    Completed(TranslationCompleted),
    /// A session failed.
    Failed(TranslationFailed),
}

static CODEC: LazyLock<EventCodec<TranslationEvent>> = LazyLock::new(|| {
    EventCodec::new()
        .register(TRANSLATION_REQUESTED_EVENT_TYPE, TranslationEvent::Requested)
        .register(TRANSLATION_COMPLETED_EVENT_TYPE, TranslationEvent::Completed)
        .register(TRANSLATION_FAILED_EVENT_TYPE, TranslationEvent::Failed)
});

impl DomainEvent for TranslationEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::Requested(_) => TRANSLATION_REQUESTED_EVENT_TYPE,
            Self::Completed(_) => TRANSLATION_COMPLETED_EVENT_TYPE,
            Self::Failed(_) => TRANSLATION_FAILED_EVENT_TYPE,
        }
    }

    fn encode_payload(&self) -> serde_json::Result<Vec<u8>> {
        match self {
            Self::Requested(e) => serde_json::to_vec(e),
            Self::Completed(e) => serde_json::to_vec(e),
            Self::Failed(e) => serde_json::to_vec(e),
        }
    }

    fn codec() -> &'static EventCodec<Self> {
        &CODEC
    }
}
