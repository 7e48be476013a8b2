//! Opaque pagination cursor for ordered scans.
//!
//! Encoded as base64 of an RFC 3339 timestamp, optionally followed by
//! `|<id>` as a tie-breaker.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;

/// A decoded page cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor {
    /// Timestamp of the last item on the previous page.
    pub timestamp: DateTime<Utc>,
    /// Identifier of that item, for rows sharing a timestamp.
    pub id: Option<String>,
}

/// A cursor supplied by a client could not be decoded.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CursorError {
    /// Not valid base64.
    #[error("cursor is not valid base64")]
    Encoding,
    /// Decoded bytes are not UTF-8.
    #[error("cursor is not valid UTF-8")]
    Utf8,
    /// The timestamp part is not RFC 3339.
    #[error("cursor timestamp is invalid: {0}")]
    Timestamp(String),
    /// The id part is present but empty.
    #[error("cursor id is empty")]
    EmptyId,
}

impl PageCursor {
    /// Cursor on a timestamp alone.
    #[must_use]
    pub fn at(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            id: None,
        }
    }

    /// Cursor on a timestamp with an id tie-breaker.
    #[must_use]
    pub fn with_id(timestamp: DateTime<Utc>, id: impl Into<String>) -> Self {
        Self {
            timestamp,
            id: Some(id.into()),
        }
    }

    /// Encodes the cursor as an opaque string.
    #[must_use]
    pub fn encode(&self) -> String {
        let timestamp = self.timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true);
        let raw = match &self.id {
            Some(id) => format!("{timestamp}|{id}"),
            None => timestamp,
        };
        STANDARD.encode(raw)
    }

    /// Decodes an opaque cursor string.
    ///
    /// # Errors
    ///
    /// Returns a `CursorError` describing which part is malformed.
    pub fn decode(cursor: &str) -> Result<Self, CursorError> {
        let bytes = STANDARD
            .decode(cursor.trim())
            .map_err(|_| CursorError::Encoding)?;
        let raw = String::from_utf8(bytes).map_err(|_| CursorError::Utf8)?;
        let (timestamp, id) = match raw.split_once('|') {
            Some((_, "")) => return Err(CursorError::EmptyId),
            Some((ts, id)) => (ts, Some(id.to_owned())),
            None => (raw.as_str(), None),
        };
        let timestamp = DateTime::parse_from_rfc3339(timestamp)
            .map_err(|e| CursorError::Timestamp(e.to_string()))?
            .with_timezone(&Utc);
        Ok(Self { timestamp, id })
    }
}
