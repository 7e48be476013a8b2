//! The translation session aggregate and its state machine.
//!
//! `IN_PROGRESS` on request, then exactly one of `COMPLETED` or `FAILED`.
//! Terminal states are never left.

use radiant_core::aggregate::Aggregate;
use radiant_core::error::DomainError;
use uuid::Uuid;

use super::events::{
    TranslationCompleted, TranslationEvent, TranslationFailed, TranslationRequested,
};
use super::language::{Language, LanguageCode, detect_language};
use super::model::{
    Failure, SentencePair, TranslationMetadata, TranslationStatus, validate_sentence_pairs,
};
use crate::error::{TranslationError, TranslationErrorKind};

/// Longest accepted source text, in characters.
pub const MAX_SOURCE_TEXT_LENGTH: usize = 20_000;

/// Failure message used when none is supplied.
pub const DEFAULT_FAILURE_MESSAGE: &str = "Translation request failed";

/// Folded state of a translation session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranslationSession {
    status: Option<TranslationStatus>,
    user_id: String,
    source_language: Option<Language>,
    source_text: String,
    text_length: usize,
    target_language: Option<LanguageCode>,
    preserve_formatting: bool,
    translated_text: Option<String>,
    sentence_pairs: Vec<SentencePair>,
    metadata: Option<TranslationMetadata>,
    failure: Option<Failure>,
}

/// Inputs to [`TranslationSession::request`].
#[derive(Debug, Clone, Copy)]
pub struct RequestOptions {
    /// Skips detection when set.
    pub source_language_hint: Option<LanguageCode>,
    /// Whether layout should survive translation.
    pub preserve_formatting: bool,
    /// Target language.
    pub target_language: LanguageCode,
}

impl TranslationSession {
    /// Validates a request, detects the source language and produces the
    /// `TranslationRequested` event.
    ///
    /// # Errors
    ///
    /// Returns `TranslationError::InvalidInput` for a blank user or text, or
    /// `TranslationError::TextTooLong` above [`MAX_SOURCE_TEXT_LENGTH`].
    pub fn request(
        session_id: Uuid,
        user_id: &str,
        source_text: &str,
        options: RequestOptions,
    ) -> Result<TranslationEvent, TranslationError> {
        if user_id.trim().is_empty() {
            return Err(TranslationError::InvalidInput("User id must not be blank".into()));
        }
        if source_text.trim().is_empty() {
            return Err(TranslationError::InvalidInput(
                "Source text must not be blank".into(),
            ));
        }
        let text_length = source_text.chars().count();
        if text_length > MAX_SOURCE_TEXT_LENGTH {
            return Err(TranslationError::TextTooLong {
                actual: text_length,
                max: MAX_SOURCE_TEXT_LENGTH,
            });
        }

        Ok(TranslationEvent::Requested(TranslationRequested {
            session_id,
            user_id: user_id.to_owned(),
            source_language: detect_language(source_text, options.source_language_hint),
            source_text: source_text.to_owned(),
            text_length,
            target_language: options.target_language,
            preserve_formatting: options.preserve_formatting,
        }))
    }

    /// Produces `TranslationCompleted`.
    ///
    /// # Errors
    ///
    /// Returns `TranslationError::InvalidStateTransition` unless the session
    /// is in progress, or `TranslationError::InvalidInput` for blank text or
    /// malformed sentence pairs.
    pub fn complete(
        &self,
        session_id: Uuid,
        translated_text: &str,
        sentence_pairs: Vec<SentencePair>,
        metadata: TranslationMetadata,
    ) -> Result<TranslationEvent, TranslationError> {
        self.ensure_in_progress(session_id)?;
        if translated_text.trim().is_empty() {
            return Err(TranslationError::InvalidInput(
                "Translated text must not be blank".into(),
            ));
        }
        validate_sentence_pairs(&sentence_pairs)?;
        if metadata.chunk_count == 0 {
            return Err(TranslationError::InvalidInput(
                "Chunk count must be greater than zero".into(),
            ));
        }
        Ok(TranslationEvent::Completed(TranslationCompleted {
            session_id,
            translated_text: translated_text.to_owned(),
            sentence_pairs,
            metadata,
        }))
    }

    /// Produces `TranslationFailed`. A blank message is replaced with
    /// [`DEFAULT_FAILURE_MESSAGE`].
    ///
    /// # Errors
    ///
    /// Returns `TranslationError::InvalidStateTransition` unless the session
    /// is in progress.
    pub fn fail(
        &self,
        session_id: Uuid,
        kind: TranslationErrorKind,
        message: &str,
    ) -> Result<TranslationEvent, TranslationError> {
        self.ensure_in_progress(session_id)?;
        let message = if message.trim().is_empty() {
            DEFAULT_FAILURE_MESSAGE
        } else {
            message
        };
        Ok(TranslationEvent::Failed(TranslationFailed {
            session_id,
            kind,
            message: message.to_owned(),
        }))
    }

    fn ensure_in_progress(&self, session_id: Uuid) -> Result<(), TranslationError> {
        match self.status {
            None => Err(DomainError::AggregateNotFound(session_id).into()),
            Some(TranslationStatus::InProgress) => Ok(()),
            Some(from) => Err(TranslationError::InvalidStateTransition { session_id, from }),
        }
    }

    /// Current status, `None` before the request event.
    #[must_use]
    pub fn status(&self) -> Option<TranslationStatus> {
        self.status
    }

    /// Who requested the translation.
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Detected or hinted source language.
    #[must_use]
    pub fn source_language(&self) -> Option<&Language> {
        self.source_language.as_ref()
    }

    /// The text to translate.
    #[must_use]
    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    /// Length of the source text in characters.
    #[must_use]
    pub fn text_length(&self) -> usize {
        self.text_length
    }

    /// Requested target language.
    #[must_use]
    pub fn target_language(&self) -> Option<LanguageCode> {
        self.target_language
    }

    /// Whether layout should survive translation.
    #[must_use]
    pub fn preserve_formatting(&self) -> bool {
        self.preserve_formatting
    }

    /// Translated text, once completed.
    #[must_use]
    pub fn translated_text(&self) -> Option<&str> {
        self.translated_text.as_deref()
    }

    /// Aligned sentences, once completed.
    #[must_use]
    pub fn sentence_pairs(&self) -> &[SentencePair] {
        &self.sentence_pairs
    }

    /// Provider statistics, once completed.
    #[must_use]
    pub fn metadata(&self) -> Option<&TranslationMetadata> {
        self.metadata.as_ref()
    }

    /// Failure, once failed.
    #[must_use]
    pub fn failure(&self) -> Option<&Failure> {
        self.failure.as_ref()
    }
}

impl Aggregate for TranslationSession {
    type Event = TranslationEvent;
    const AGGREGATE_TYPE: &'static str = "translation_session";

    fn apply(&mut self, event: &TranslationEvent) {
        match event {
            TranslationEvent::Requested(e) => {
                self.status = Some(TranslationStatus::InProgress);
                self.user_id.clone_from(&e.user_id);
                self.source_language = Some(e.source_language.clone());
                self.source_text.clone_from(&e.source_text);
                self.text_length = e.text_length;
                self.target_language = Some(e.target_language);
                self.preserve_formatting = e.preserve_formatting;
            }
            TranslationEvent::Completed(e) => {
                self.status = Some(TranslationStatus::Completed);
                self.translated_text = Some(e.translated_text.clone());
                self.sentence_pairs.clone_from(&e.sentence_pairs);
                self.metadata = Some(e.metadata);
            }
            TranslationEvent::Failed(e) => {
                self.status = Some(TranslationStatus::Failed);
                self.failure = Some(Failure {
                    kind: e.kind,
                    message: e.message.clone(),
                });
            }
        }
    }
}
