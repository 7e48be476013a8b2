//! Commands for the Translation context.

use radiant_core::command::Command;
use uuid::Uuid;

use super::language::LanguageCode;
use super::model::{SentencePair, TranslationMetadata};
use crate::error::{TranslationError, TranslationErrorKind};

/// Command to open a translation session.
#[derive(Debug, Clone)]
pub struct RequestTranslation {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The identifier to open the session under.
    pub session_id: Uuid,
    /// Who asks.
    pub user_id: String,
    /// The text to translate.
    pub source_text: String,
    /// Skips language detection when set.
    pub source_language_hint: Option<LanguageCode>,
    /// Whether layout should survive translation.
    pub preserve_formatting: bool,
    /// Target language.
    pub target_language: LanguageCode,
}

impl RequestTranslation {
    /// A request with fresh ids, formatting preserved and Korean as the
    /// target.
    #[must_use]
    pub fn new(user_id: impl Into<String>, source_text: impl Into<String>) -> Self {
        Self {
            correlation_id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
            user_id: user_id.into(),
            source_text: source_text.into(),
            source_language_hint: None,
            preserve_formatting: true,
            target_language: LanguageCode::Ko,
        }
    }

    /// Sets the source language hint.
    #[must_use]
    pub fn with_hint(mut self, hint: LanguageCode) -> Self {
        self.source_language_hint = Some(hint);
        self
    }

    /// Sets the target language.
    #[must_use]
    pub fn with_target(mut self, target: LanguageCode) -> Self {
        self.target_language = target;
        self
    }
}

/// Command recording a successful translation.
#[derive(Debug, Clone)]
pub struct CompleteTranslation {
    /// Correlation ID inherited from the request.
    pub correlation_id: Uuid,
    /// The requested event that triggered this outcome.
    pub causation_id: Uuid,
    /// The requesting user.
    pub user_id: Option<String>,
    /// The session.
    pub session_id: Uuid,
    /// Full translated text.
    pub translated_text: String,
    /// Aligned sentences.
    pub sentence_pairs: Vec<SentencePair>,
    /// Provider statistics.
    pub metadata: TranslationMetadata,
}

/// Command recording a failed translation.
#[derive(Debug, Clone)]
pub struct FailTranslation {
    /// Correlation ID inherited from the request.
    pub correlation_id: Uuid,
    /// The requested event that triggered this outcome.
    pub causation_id: Uuid,
    /// The requesting user.
    pub user_id: Option<String>,
    /// The session.
    pub session_id: Uuid,
    /// Failure category.
    pub kind: TranslationErrorKind,
    /// Failure message.
    pub message: String,
}

macro_rules! translation_command {
    ($command:ty, $name:literal) => {
        impl Command for $command {
            type Error = TranslationError;

            fn command_type(&self) -> &'static str {
                $name
            }

            fn correlation_id(&self) -> Uuid {
                self.correlation_id
            }
        }
    };
}

translation_command!(RequestTranslation, "translation.request");
translation_command!(CompleteTranslation, "translation.complete");
translation_command!(FailTranslation, "translation.fail");
