//! Fixed response languages
//!
//! A language picks three things at once: the locale passed to speech
//! recognition, the voice used for synthesis, and a directive appended to
//! the personality instruction so the model answers in that language.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Identifier of a supported language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LanguageId {
    #[default]
    English,
    Spanish,
    French,
    German,
    Hindi,
}

impl LanguageId {
    /// Every language, in selector order
    pub const ALL: [Self; 5] = [
        Self::English,
        Self::Spanish,
        Self::French,
        Self::German,
        Self::Hindi,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::English => "english",
            Self::Spanish => "spanish",
            Self::French => "french",
            Self::German => "german",
            Self::Hindi => "hindi",
        }
    }

    /// Parse a wire identifier, display name or recognition locale
    ///
    /// # Errors
    ///
    /// Returns `LanguageNotFound` if nothing matches
    pub fn parse(value: &str) -> Result<Self> {
        let needle = value.trim();
        Self::ALL
            .into_iter()
            .find(|id| {
                let language = id.language();
                id.as_str().eq_ignore_ascii_case(needle)
                    || language.display_name.eq_ignore_ascii_case(needle)
                    || language.locale.eq_ignore_ascii_case(needle)
            })
            .ok_or_else(|| Error::LanguageNotFound(value.to_string()))
    }

    #[must_use]
    pub const fn language(self) -> &'static Language {
        match self {
            Self::English => &LANGUAGES[0],
            Self::Spanish => &LANGUAGES[1],
            Self::French => &LANGUAGES[2],
            Self::German => &LANGUAGES[3],
            Self::Hindi => &LANGUAGES[4],
        }
    }
}

impl std::fmt::Display for LanguageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A supported conversation language
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Language {
    pub id: LanguageId,
    pub display_name: &'static str,
    /// BCP 47 locale passed to speech recognition
    pub locale: &'static str,
    /// Synthesis voice name
    pub voice: &'static str,
    pub flag: &'static str,
    /// Directive appended to the system instruction
    pub instruction: &'static str,
}

/// The language table
pub static LANGUAGES: [Language; 5] = [
    Language {
        id: LanguageId::English,
        display_name: "English",
        locale: "en-US",
        voice: "en-US-Neural2-F",
        flag: "🇺🇸",
        instruction: "Always respond in English.",
    },
    Language {
        id: LanguageId::Spanish,
        display_name: "Spanish",
        locale: "es-ES",
        voice: "es-ES-Neural2-A",
        flag: "🇪🇸",
        instruction: "Always respond in Spanish (Español), regardless of the language the user writes in.",
    },
    Language {
        id: LanguageId::French,
        display_name: "French",
        locale: "fr-FR",
        voice: "fr-FR-Neural2-A",
        flag: "🇫🇷",
        instruction: "Always respond in French (Français), regardless of the language the user writes in.",
    },
    Language {
        id: LanguageId::German,
        display_name: "German",
        locale: "de-DE",
        voice: "de-DE-Neural2-A",
        flag: "🇩🇪",
        instruction: "Always respond in German (Deutsch), regardless of the language the user writes in.",
    },
    Language {
        id: LanguageId::Hindi,
        display_name: "Hindi",
        locale: "hi-IN",
        voice: "hi-IN-Neural2-A",
        flag: "🇮🇳",
        instruction: "Always respond in Hindi (हिन्दी), regardless of the language the user writes in.",
    },
];

/// Compose the full system instruction for a personality and language
#[must_use]
pub fn compose_instruction(personality: &str, language: &Language) -> String {
    format!("{personality}\n\n{}", language.instruction)
}
