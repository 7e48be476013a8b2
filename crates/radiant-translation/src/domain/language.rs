//! Languages and heuristic script-based detection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TranslationError;

/// Supported language codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LanguageCode {
    /// English.
    En,
    /// Japanese.
    Ja,
    /// Chinese.
    Zh,
    /// Korean.
    Ko,
    /// Not recognised.
    Unknown,
}

impl LanguageCode {
    /// The upper-case code, e.g. `"EN"`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::En => "EN",
            Self::Ja => "JA",
            Self::Zh => "ZH",
            Self::Ko => "KO",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// English display name.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::En => "English",
            Self::Ja => "Japanese",
            Self::Zh => "Chinese",
            Self::Ko => "Korean",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LanguageCode {
    type Err = TranslationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Self::En, Self::Ja, Self::Zh, Self::Ko, Self::Unknown]
            .into_iter()
            .find(|code| code.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| TranslationError::InvalidInput(format!("Unsupported language code: {s}")))
    }
}

/// A language with an optional detection confidence in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Language {
    /// The code.
    pub code: LanguageCode,
    /// Display name.
    pub name: String,
    /// Detection confidence, when detected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl Language {
    /// Builds a language with its display name.
    ///
    /// # Errors
    ///
    /// Returns `TranslationError::InvalidInput` if `confidence` is outside
    /// `[0, 1]`.
    pub fn new(code: LanguageCode, confidence: Option<f64>) -> Result<Self, TranslationError> {
        if confidence.is_some_and(|c| !(0.0..=1.0).contains(&c)) {
            return Err(TranslationError::InvalidInput(
                "Confidence must be between 0.0 and 1.0".into(),
            ));
        }
        Ok(Self::detected(code, confidence))
    }

    /// Parses a free-form code. Unrecognised codes become `UNKNOWN` named
    /// after the upper-cased input.
    ///
    /// # Errors
    ///
    /// Returns `TranslationError::InvalidInput` if `confidence` is outside
    /// `[0, 1]`.
    pub fn parse(code: &str, confidence: Option<f64>) -> Result<Self, TranslationError> {
        match code.parse::<LanguageCode>() {
            Ok(code) => Self::new(code, confidence),
            Err(_) => {
                let mut language = Self::new(LanguageCode::Unknown, confidence)?;
                language.name = code.trim().to_uppercase();
                Ok(language)
            }
        }
    }

    fn detected(code: LanguageCode, confidence: Option<f64>) -> Self {
        Self {
            code,
            name: code.display_name().to_owned(),
            confidence,
        }
    }
}

const HIRAGANA: (u32, u32) = (0x3040, 0x309F);
const KATAKANA: (u32, u32) = (0x30A0, 0x30FF);
const HANGUL_SYLLABLES: (u32, u32) = (0xAC00, 0xD7A3);
const CJK_IDEOGRAPHS: [(u32, u32); 3] = [
    (0x4E00, 0x9FFF),
    (0x3400, 0x4DBF),
    (0x2_0000, 0x2_A6DF),
];

fn within(c: char, (lo, hi): (u32, u32)) -> bool {
    (lo..=hi).contains(&u32::from(c))
}

/// Detects the language of `text`.
///
/// A hint wins with confidence 1.0. Blank text is English with confidence
/// 0.0. Otherwise the first matching script decides: kana → Japanese
/// (0.95), CJK ideographs → Chinese (0.95), Hangul → Korean (0.9), anything
/// else → English (0.85).
#[must_use]
pub fn detect_language(text: &str, hint: Option<LanguageCode>) -> Language {
    if let Some(code) = hint {
        return Language::detected(code, Some(1.0));
    }
    let text = text.trim();
    if text.is_empty() {
        return Language::detected(LanguageCode::En, Some(0.0));
    }

    let (code, confidence) = if text
        .chars()
        .any(|c| within(c, HIRAGANA) || within(c, KATAKANA))
    {
        (LanguageCode::Ja, 0.95)
    } else if text
        .chars()
        .any(|c| CJK_IDEOGRAPHS.iter().any(|range| within(c, *range)))
    {
        (LanguageCode::Zh, 0.95)
    } else if text.chars().any(|c| within(c, HANGUL_SYLLABLES)) {
        (LanguageCode::Ko, 0.9)
    } else {
        (LanguageCode::En, 0.85)
    };
    Language::detected(code, Some(confidence))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hint_short_circuits_detection() {
        let language = detect_language("안녕하세요", Some(LanguageCode::Ja));

        assert_eq!(language.code, LanguageCode::Ja);
        assert_eq!(language.confidence, Some(1.0));
    }

    #[test]
    fn test_blank_text_is_english_with_zero_confidence() {
        let language = detect_language("   ", None);

        assert_eq!(language.code, LanguageCode::En);
        assert_eq!(language.confidence, Some(0.0));
    }

    #[test]
    fn test_script_tiers() {
        assert_eq!(detect_language("こんにちは世界", None).code, LanguageCode::Ja);
        assert_eq!(detect_language("カタカナ", None).code, LanguageCode::Ja);
        assert_eq!(detect_language("你好世界", None).code, LanguageCode::Zh);
        assert_eq!(detect_language("𠀀", None).code, LanguageCode::Zh);
        let korean = detect_language("안녕하세요", None);
        assert_eq!(korean.code, LanguageCode::Ko);
        assert_eq!(korean.confidence, Some(0.9));
        let english = detect_language("Hello world!", None);
        assert_eq!(english.code, LanguageCode::En);
        assert_eq!(english.confidence, Some(0.85));
        assert_eq!(english.name, "English");
    }

    #[test]
    fn test_kana_wins_over_ideographs() {
        let language = detect_language("日本語のテキスト", None);

        assert_eq!(language.code, LanguageCode::Ja);
        assert_eq!(language.confidence, Some(0.95));
    }

    #[test]
    fn test_parse_codes() {
        assert_eq!("ko".parse::<LanguageCode>().unwrap(), LanguageCode::Ko);
        assert!("xx".parse::<LanguageCode>().is_err());

        let unknown = Language::parse("fr", None).unwrap();
        assert_eq!(unknown.code, LanguageCode::Unknown);
        assert_eq!(unknown.name, "FR");
    }

    #[test]
    fn test_confidence_out_of_range_is_rejected() {
        assert!(Language::new(LanguageCode::En, Some(1.5)).is_err());
        assert!(Language::new(LanguageCode::En, Some(-0.1)).is_err());
        assert!(Language::new(LanguageCode::En, None).is_ok());
    }
}
