//! Error types for the voice chat service

use thiserror::Error;

/// Result type alias for voice chat operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the voice chat service
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Unknown personality identifier
    #[error("personality not found: {0}")]
    PersonalityNotFound(String),

    /// Unknown language identifier
    #[error("language not found: {0}")]
    LanguageNotFound(String),

    /// Audio decoding/encoding error
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech-to-text service error
    #[error("STT error: {0}")]
    Stt(String),

    /// Text-to-speech service error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Text generation service error
    #[error("LLM error: {0}")]
    Llm(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
