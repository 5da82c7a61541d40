//! Supported language codes.
//!
//! The relay translates between a closed set of ISO 639-1 languages. Codes
//! coming in over the wire are validated through [`Language::from_code`];
//! anything outside the set fails closed at the boundary.
//!
//! Romanized Hindi ("Hinglish" written in Latin letters) is a *detection*
//! outcome, not a language of its own: the detector reports
//! `{language: Hi, is_romanized: true}` and translation targets always use
//! the native code.

use serde::{Deserialize, Serialize};

use crate::error::LangError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "en")]
    En,
    #[serde(rename = "es")]
    Es,
    #[serde(rename = "fr")]
    Fr,
    #[serde(rename = "de")]
    De,
    #[serde(rename = "it")]
    It,
    #[serde(rename = "pt")]
    Pt,
    #[serde(rename = "ru")]
    Ru,
    #[serde(rename = "ja")]
    Ja,
    #[serde(rename = "ko")]
    Ko,
    #[serde(rename = "zh")]
    Zh,
    #[serde(rename = "ar")]
    Ar,
    #[serde(rename = "hi")]
    Hi,
}

impl Language {
    pub const ALL: [Language; 12] = [
        Language::En,
        Language::Es,
        Language::Fr,
        Language::De,
        Language::It,
        Language::Pt,
        Language::Ru,
        Language::Ja,
        Language::Ko,
        Language::Zh,
        Language::Ar,
        Language::Hi,
    ];

    /// Parse an ISO 639-1 code. `"hi-rom"` is accepted and maps to [`Language::Hi`]
    /// because romanized input is translated as native Hindi.
    pub fn from_code(code: &str) -> Result<Language, LangError> {
        match code {
            "en" => Ok(Language::En),
            "es" => Ok(Language::Es),
            "fr" => Ok(Language::Fr),
            "de" => Ok(Language::De),
            "it" => Ok(Language::It),
            "pt" => Ok(Language::Pt),
            "ru" => Ok(Language::Ru),
            "ja" => Ok(Language::Ja),
            "ko" => Ok(Language::Ko),
            "zh" => Ok(Language::Zh),
            "ar" => Ok(Language::Ar),
            "hi" | "hi-rom" => Ok(Language::Hi),
            other => Err(LangError::UnknownCode(other.to_string())),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Es => "es",
            Language::Fr => "fr",
            Language::De => "de",
            Language::It => "it",
            Language::Pt => "pt",
            Language::Ru => "ru",
            Language::Ja => "ja",
            Language::Ko => "ko",
            Language::Zh => "zh",
            Language::Ar => "ar",
            Language::Hi => "hi",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Es => "Spanish",
            Language::Fr => "French",
            Language::De => "German",
            Language::It => "Italian",
            Language::Pt => "Portuguese",
            Language::Ru => "Russian",
            Language::Ja => "Japanese",
            Language::Ko => "Korean",
            Language::Zh => "Chinese",
            Language::Ar => "Arabic",
            Language::Hi => "Hindi",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for Language {
    type Err = LangError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::from_code(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_code_round_trip() {
        for lang in Language::ALL {
            assert_eq!(Language::from_code(lang.code()).unwrap(), lang);
        }
    }

    #[test]
    fn from_code_rejects_unknown() {
        assert!(Language::from_code("tlh").is_err());
        assert!(Language::from_code("").is_err());
        assert!(Language::from_code("EN").is_err());
    }

    #[test]
    fn romanized_tag_maps_to_hindi() {
        assert_eq!(Language::from_code("hi-rom").unwrap(), Language::Hi);
    }

    #[test]
    fn serde_uses_iso_codes() {
        let json = serde_json::to_string(&Language::Es).unwrap();
        assert_eq!(json, "\"es\"");
        let back: Language = serde_json::from_str("\"ja\"").unwrap();
        assert_eq!(back, Language::Ja);
    }
}
