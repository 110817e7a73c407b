//! Client events and the interaction handler
//!
//! Every browser action becomes one `ClientEvent`. The handler applies it to
//! the session, performs whatever external calls the transition needs, and
//! answers with an `Outcome` for the browser to render.

mod handler;

pub use handler::{ChatHandler, HandlerOptions};

use serde::{Deserialize, Serialize};

use crate::language::LanguageId;
use crate::personality::PersonalityId;
use crate::session::SessionSnapshot;

/// Prefix of the assistant message recorded when generation fails
pub const GENERATION_ERROR_PREFIX: &str = "An error occurred: ";

/// Prefix of notices for recognition service failures
pub const SPEECH_SERVICE_ERROR_PREFIX: &str = "Speech service error: ";

/// Prefix of notices for local failures while preparing a capture
pub const LOCAL_ERROR_PREFIX: &str = "Error: ";

/// Warning shown when the recognizer heard nothing usable
pub const NOT_UNDERSTOOD_MESSAGE: &str =
    "Could not understand the audio. Please try again and speak clearly.";

/// A user action
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    SelectPersonality {
        personality: PersonalityId,
    },
    SelectLanguage {
        language: LanguageId,
    },
    /// A finished recording (WAV); delivered as a raw request body
    #[serde(skip)]
    AudioCaptured {
        audio: Vec<u8>,
    },
    /// Send the pending transcript
    ConfirmVoice,
    SubmitText {
        text: String,
    },
    ClearHistory,
    /// Fetch (synthesizing if needed) the audio for a message
    SpeakMessage {
        index: usize,
    },
}

impl ClientEvent {
    /// Short name for logging
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::SelectPersonality { .. } => "select_personality",
            Self::SelectLanguage { .. } => "select_language",
            Self::AudioCaptured { .. } => "audio_captured",
            Self::ConfirmVoice => "confirm_voice",
            Self::SubmitText { .. } => "submit_text",
            Self::ClearHistory => "clear_history",
            Self::SpeakMessage { .. } => "speak_message",
        }
    }
}

/// Severity of a notice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A user-visible message that is not part of the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            text: text.into(),
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            text: text.into(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }
}

/// Result of handling one event
#[derive(Debug, Clone, Serialize)]
pub struct Outcome {
    /// `false` when the re-entrancy guard turned the event away
    pub accepted: bool,
    pub notices: Vec<Notice>,
    pub session: SessionSnapshot,
    /// Audio for `SpeakMessage`, served separately from the JSON body
    #[serde(skip)]
    pub audio: Option<Vec<u8>>,
}

impl Outcome {
    #[must_use]
    pub fn has_level(&self, level: NoticeLevel) -> bool {
        self.notices.iter().any(|n| n.level == level)
    }
}
