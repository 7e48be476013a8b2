//! The external translation capability and normalisation of its answers.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::domain::language::LanguageCode;
use crate::domain::model::{SentencePair, TranslationMetadata};
use crate::error::TranslationError;

/// Tokens assumed per sentence when the provider reports none.
pub const AVERAGE_TOKENS_PER_SENTENCE: u32 = 32;

/// What the provider is asked to translate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderRequest {
    /// The session being translated.
    pub session_id: Uuid,
    /// Source language.
    pub source_language: LanguageCode,
    /// Target language.
    pub target_language: LanguageCode,
    /// The text.
    pub source_text: String,
    /// Whether layout should survive translation.
    pub preserve_formatting: bool,
}

/// One sentence as returned by the provider. Order is positional.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProviderSentence {
    /// Source sentence.
    pub original: String,
    /// Translated sentence.
    pub translated: String,
}

/// Optional statistics reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct ProviderMetadata {
    /// Reported processing time.
    pub processing_time_ms: Option<u64>,
    /// Reported token usage.
    pub token_count: Option<u32>,
    /// Reported chunking.
    pub chunk_count: Option<u32>,
}

/// The provider's raw answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProviderResponse {
    /// Full translated text.
    pub translated_text: String,
    /// Sentences in order.
    #[serde(default)]
    pub sentence_pairs: Vec<ProviderSentence>,
    /// Statistics, if any.
    #[serde(default)]
    pub metadata: Option<ProviderMetadata>,
}

/// A provider answer after normalisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedTranslation {
    /// Full translated text.
    pub translated_text: String,
    /// Sentences numbered from 0.
    pub sentence_pairs: Vec<SentencePair>,
    /// Statistics with defaults filled in.
    pub metadata: TranslationMetadata,
}

/// An external translation capability.
///
/// Implementations map their own failures onto [`TranslationError`]
/// variants; anything unclassified should be `Unknown`.
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    /// Translates one request.
    async fn translate(&self, request: &ProviderRequest)
    -> Result<ProviderResponse, TranslationError>;
}

/// Renumbers pairs `0..n` and fills missing statistics.
///
/// # Errors
///
/// Returns `TranslationError::Unknown` if the answer has no pairs, blank
/// translated text or a blank sentence.
pub fn normalize(
    response: ProviderResponse,
    elapsed: Duration,
) -> Result<NormalizedTranslation, TranslationError> {
    if response.sentence_pairs.is_empty() {
        return Err(TranslationError::Unknown(
            "Translation response did not contain sentence pairs".into(),
        ));
    }
    if response.translated_text.trim().is_empty() {
        return Err(TranslationError::Unknown(
            "Translation response did not contain translated text".into(),
        ));
    }

    let sentence_pairs = (0_u32..)
        .zip(response.sentence_pairs)
        .map(|(order, pair)| {
            if pair.original.trim().is_empty() || pair.translated.trim().is_empty() {
                return Err(TranslationError::Unknown(format!(
                    "Translation response contained a blank sentence at {order}"
                )));
            }
            Ok(SentencePair {
                order,
                original: pair.original,
                translated: pair.translated,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let count = u32::try_from(sentence_pairs.len()).unwrap_or(u32::MAX);
    let reported = response.metadata.unwrap_or_default();
    let metadata = TranslationMetadata::new(
        reported
            .processing_time_ms
            .unwrap_or_else(|| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)),
        reported
            .token_count
            .unwrap_or_else(|| count.saturating_mul(AVERAGE_TOKENS_PER_SENTENCE)),
        reported
            .chunk_count
            .filter(|c| *c > 0)
            .unwrap_or_else(|| count.max(1)),
    )?;

    Ok(NormalizedTranslation {
        translated_text: response.translated_text,
        sentence_pairs,
        metadata,
    })
}

/// Calls `provider` under `timeout` and normalises the answer.
///
/// # Errors
///
/// Returns `TranslationError::Timeout` if the provider does not answer in
/// time, the provider's own error, or a normalisation error.
pub async fn translate_within(
    provider: &dyn TranslationProvider,
    request: &ProviderRequest,
    timeout: Duration,
) -> Result<NormalizedTranslation, TranslationError> {
    let started = Instant::now();
    let response = tokio::time::timeout(timeout, provider.translate(request))
        .await
        .map_err(|_| TranslationError::Timeout("Translation request timed out".into()))??;
    let elapsed = started.elapsed();
    debug!(
        session_id = %request.session_id,
        elapsed_ms = elapsed.as_millis(),
        pairs = response.sentence_pairs.len(),
        "provider answered"
    );
    normalize(response, elapsed)
}

/// Deterministic in-process provider.
///
/// Splits the text into sentences and tags each with the target language
/// code, e.g. `"[KO] Hello world!"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineTranslationProvider;

fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    for c in text.chars() {
        if c != '\n' {
            current.push(c);
        }
        if matches!(c, '.' | '!' | '?' | '。' | '！' | '？' | '\n') {
            let sentence = current.trim();
            if !sentence.is_empty() {
                sentences.push(sentence.to_owned());
            }
            current.clear();
        }
    }
    let rest = current.trim();
    if !rest.is_empty() {
        sentences.push(rest.to_owned());
    }
    sentences
}

#[async_trait]
impl TranslationProvider for OfflineTranslationProvider {
    async fn translate(
        &self,
        request: &ProviderRequest,
    ) -> Result<ProviderResponse, TranslationError> {
        let sentence_pairs: Vec<ProviderSentence> = split_sentences(&request.source_text)
            .into_iter()
            .map(|original| ProviderSentence {
                translated: format!("[{}] {original}", request.target_language),
                original,
            })
            .collect();
        let separator = if request.preserve_formatting { "\n" } else { " " };
        let translated_text = sentence_pairs
            .iter()
            .map(|p| p.translated.as_str())
            .collect::<Vec<_>>()
            .join(separator);
        Ok(ProviderResponse {
            translated_text,
            sentence_pairs,
            metadata: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TranslationErrorKind;

    fn sentence(original: &str, translated: &str) -> ProviderSentence {
        ProviderSentence {
            original: original.into(),
            translated: translated.into(),
        }
    }

    fn request(text: &str) -> ProviderRequest {
        ProviderRequest {
            session_id: Uuid::new_v4(),
            source_language: LanguageCode::En,
            target_language: LanguageCode::Ko,
            source_text: text.into(),
            preserve_formatting: false,
        }
    }

    struct SlowProvider;

    #[async_trait]
    impl TranslationProvider for SlowProvider {
        async fn translate(
            &self,
            _request: &ProviderRequest,
        ) -> Result<ProviderResponse, TranslationError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(ProviderResponse::default())
        }
    }

    #[test]
    fn test_normalize_renumbers_and_fills_defaults() {
        // Arrange
        let response = ProviderResponse {
            translated_text: "하나. 둘. 셋.".into(),
            sentence_pairs: vec![
                sentence("One.", "하나."),
                sentence("Two.", "둘."),
                sentence("Three.", "셋."),
            ],
            metadata: None,
        };

        // Act
        let normalized = normalize(response, Duration::from_millis(250)).unwrap();

        // Assert
        let orders: Vec<u32> = normalized.sentence_pairs.iter().map(|p| p.order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
        assert_eq!(normalized.metadata.processing_time_ms, 250);
        assert_eq!(normalized.metadata.token_count, 96);
        assert_eq!(normalized.metadata.chunk_count, 3);
    }

    #[test]
    fn test_normalize_prefers_reported_metadata() {
        let response = ProviderResponse {
            translated_text: "하나.".into(),
            sentence_pairs: vec![sentence("One.", "하나.")],
            metadata: Some(ProviderMetadata {
                processing_time_ms: Some(7),
                token_count: Some(11),
                chunk_count: Some(2),
            }),
        };

        let normalized = normalize(response, Duration::from_secs(1)).unwrap();

        assert_eq!(
            normalized.metadata,
            TranslationMetadata::new(7, 11, 2).unwrap()
        );
    }

    #[test]
    fn test_normalize_rejects_empty_pairs_as_unknown() {
        let response = ProviderResponse {
            translated_text: "something".into(),
            sentence_pairs: vec![],
            metadata: None,
        };

        let error = normalize(response, Duration::ZERO).unwrap_err();

        assert_eq!(error.kind(), TranslationErrorKind::Unknown);
    }

    #[test]
    fn test_normalize_rejects_blank_translated_text() {
        let response = ProviderResponse {
            translated_text: "  ".into(),
            sentence_pairs: vec![sentence("One.", "하나.")],
            metadata: None,
        };

        assert!(normalize(response, Duration::ZERO).is_err());
    }

    #[test]
    fn test_split_sentences_keeps_terminators() {
        let sentences = split_sentences("Hello world! This is a test translation.\nTrailing");

        assert_eq!(
            sentences,
            vec!["Hello world!", "This is a test translation.", "Trailing"]
        );
    }

    #[tokio::test]
    async fn test_offline_provider_tags_target_language() {
        let response = OfflineTranslationProvider
            .translate(&request("Hello world! Bye."))
            .await
            .unwrap();

        assert_eq!(response.sentence_pairs.len(), 2);
        assert_eq!(response.sentence_pairs[0].translated, "[KO] Hello world!");
        assert_eq!(response.translated_text, "[KO] Hello world! [KO] Bye.");
    }

    #[tokio::test]
    async fn test_translate_within_times_out() {
        let result =
            translate_within(&SlowProvider, &request("Hello."), Duration::from_millis(20)).await;

        assert_eq!(result.unwrap_err().kind(), TranslationErrorKind::Timeout);
    }
}
