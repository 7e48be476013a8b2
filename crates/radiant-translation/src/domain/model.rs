//! Value types shared by translation events, the session aggregate and
//! its views.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{TranslationError, TranslationErrorKind};

/// Lifecycle status of a translation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TranslationStatus {
    /// Requested, awaiting the provider.
    InProgress,
    /// Translated successfully. Terminal.
    Completed,
    /// Failed. Terminal.
    Failed,
}

impl TranslationStatus {
    /// Returns `true` for `Completed` and `Failed`.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

impl fmt::Display for TranslationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        })
    }
}

/// An aligned source/translation sentence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentencePair {
    /// Zero-based position.
    pub order: u32,
    /// Source sentence.
    pub original: String,
    /// Translated sentence.
    pub translated: String,
}

/// Provider statistics for a completed translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationMetadata {
    /// Wall time spent translating.
    pub processing_time_ms: u64,
    /// Tokens consumed.
    pub token_count: u32,
    /// Chunks the text was split into. Always positive.
    pub chunk_count: u32,
}

impl TranslationMetadata {
    /// Builds metadata.
    ///
    /// # Errors
    ///
    /// Returns `TranslationError::InvalidInput` if `chunk_count` is zero.
    pub fn new(
        processing_time_ms: u64,
        token_count: u32,
        chunk_count: u32,
    ) -> Result<Self, TranslationError> {
        if chunk_count == 0 {
            return Err(TranslationError::InvalidInput(
                "Chunk count must be greater than zero".into(),
            ));
        }
        Ok(Self {
            processing_time_ms,
            token_count,
            chunk_count,
        })
    }
}

/// Why a session failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    /// Failure category.
    pub kind: TranslationErrorKind,
    /// Human-readable message.
    pub message: String,
}

/// Checks that pairs are numbered `0..n` in order and carry non-blank text.
///
/// # Errors
///
/// Returns `TranslationError::InvalidInput` naming the first offending pair.
pub fn validate_sentence_pairs(pairs: &[SentencePair]) -> Result<(), TranslationError> {
    if pairs.is_empty() {
        return Err(TranslationError::InvalidInput(
            "Sentence pairs must not be empty".into(),
        ));
    }
    for (expected, pair) in (0_u32..).zip(pairs) {
        if pair.order != expected {
            return Err(TranslationError::InvalidInput(format!(
                "Sentence pair order must be contiguous from 0 (expected {expected}, found {})",
                pair.order
            )));
        }
        if pair.original.trim().is_empty() || pair.translated.trim().is_empty() {
            return Err(TranslationError::InvalidInput(format!(
                "Sentence pair {expected} has blank text"
            )));
        }
    }
    Ok(())
}
