//! Translation failure taxonomy.

use std::fmt;

use radiant_core::error::DomainError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::model::TranslationStatus;

/// Stable failure category recorded on a failed session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TranslationErrorKind {
    /// The provider could not be reached.
    ServiceUnavailable,
    /// The request was malformed.
    InvalidInput,
    /// The provider did not answer in time.
    Timeout,
    /// The provider throttled the request.
    RateLimited,
    /// The caller may not translate.
    Unauthorized,
    /// The source text is over the length limit.
    TextTooLong,
    /// The worker pool refused the job.
    ThreadPoolExhausted,
    /// Anything else.
    #[serde(rename = "UNKNOWN_ERROR")]
    Unknown,
}

impl TranslationErrorKind {
    /// The stable string code.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            Self::InvalidInput => "INVALID_INPUT",
            Self::Timeout => "TIMEOUT",
            Self::RateLimited => "RATE_LIMITED",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::TextTooLong => "TEXT_TOO_LONG",
            Self::ThreadPoolExhausted => "THREAD_POOL_EXHAUSTED",
            Self::Unknown => "UNKNOWN_ERROR",
        }
    }

    /// Message used when a failure carries no message of its own.
    #[must_use]
    pub fn default_message(self) -> &'static str {
        match self {
            Self::ServiceUnavailable => "Translation service is temporarily unavailable",
            Self::InvalidInput => "Invalid translation input",
            Self::Timeout => "Translation request timed out",
            Self::RateLimited => "Translation provider rate limit reached",
            Self::Unauthorized => "Admin role required for translation access",
            Self::TextTooLong => "Input text is too long",
            Self::ThreadPoolExhausted => "Translation executor is at capacity",
            Self::Unknown => "Unknown translation failure",
        }
    }
}

impl fmt::Display for TranslationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Errors raised by translation requests and the workflow.
#[derive(Debug, Error)]
pub enum TranslationError {
    /// The request was malformed.
    #[error("{0}")]
    InvalidInput(String),

    /// The source text is over the length limit.
    #[error("Input text exceeds maximum length of {max} characters (actual: {actual})")]
    TextTooLong {
        /// Length of the rejected text, in characters.
        actual: usize,
        /// The limit.
        max: usize,
    },

    /// The provider rejected the text as too long.
    #[error("{0}")]
    ProviderTextTooLong(String),

    /// The caller may not translate.
    #[error("{0}")]
    Unauthorized(String),

    /// The provider could not be reached.
    #[error("{0}")]
    ServiceUnavailable(String),

    /// The provider did not answer in time.
    #[error("{0}")]
    Timeout(String),

    /// The provider throttled the request.
    #[error("{0}")]
    RateLimited(String),

    /// The worker pool refused the job.
    #[error("{0}")]
    ThreadPoolExhausted(String),

    /// Anything else.
    #[error("{0}")]
    Unknown(String),

    /// A terminal transition was attempted on a session that is not in
    /// progress.
    #[error("translation session {session_id} cannot leave state {from}")]
    InvalidStateTransition {
        /// The session.
        session_id: Uuid,
        /// Its current status.
        from: TranslationStatus,
    },

    /// A kernel error.
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl TranslationError {
    /// Builds the error for `kind`, falling back to the kind's default
    /// message when `message` is blank.
    #[must_use]
    pub fn of_kind(kind: TranslationErrorKind, message: impl Into<String>) -> Self {
        let mut message = message.into();
        if message.trim().is_empty() {
            kind.default_message().clone_into(&mut message);
        }
        match kind {
            TranslationErrorKind::ServiceUnavailable => Self::ServiceUnavailable(message),
            TranslationErrorKind::InvalidInput => Self::InvalidInput(message),
            TranslationErrorKind::Timeout => Self::Timeout(message),
            TranslationErrorKind::RateLimited => Self::RateLimited(message),
            TranslationErrorKind::Unauthorized => Self::Unauthorized(message),
            TranslationErrorKind::ThreadPoolExhausted => Self::ThreadPoolExhausted(message),
            TranslationErrorKind::TextTooLong => Self::ProviderTextTooLong(message),
            TranslationErrorKind::Unknown => Self::Unknown(message),
        }
    }

    /// The failure category this error is recorded as.
    #[must_use]
    pub fn kind(&self) -> TranslationErrorKind {
        match self {
            Self::InvalidInput(_) | Self::Domain(DomainError::Validation(_)) => {
                TranslationErrorKind::InvalidInput
            }
            Self::TextTooLong { .. } | Self::ProviderTextTooLong(_) => {
                TranslationErrorKind::TextTooLong
            }
            Self::Unauthorized(_) => TranslationErrorKind::Unauthorized,
            Self::ServiceUnavailable(_) => TranslationErrorKind::ServiceUnavailable,
            Self::Timeout(_) => TranslationErrorKind::Timeout,
            Self::RateLimited(_) => TranslationErrorKind::RateLimited,
            Self::ThreadPoolExhausted(_) => TranslationErrorKind::ThreadPoolExhausted,
            Self::Unknown(_) | Self::InvalidStateTransition { .. } | Self::Domain(_) => {
                TranslationErrorKind::Unknown
            }
        }
    }

    /// The stable string code of [`Self::kind`].
    #[must_use]
    pub fn code(&self) -> &'static str {
        self.kind().code()
    }
}
