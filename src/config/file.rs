//! TOML configuration file loading
//!
//! Supports `~/.config/voice-chat/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::Result;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    /// Text generation configuration
    #[serde(default)]
    pub generation: GenerationFileConfig,

    /// Speech recognition and synthesis configuration
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerFileConfig,

    /// Session lifetime configuration
    #[serde(default)]
    pub sessions: SessionsFileConfig,
}

/// Text generation configuration
#[derive(Debug, Default, Deserialize)]
pub struct GenerationFileConfig {
    /// Model identifier (e.g. "gemini-2.5-flash")
    pub model: Option<String>,

    /// Forward earlier turns to the model
    pub include_history: Option<bool>,
}

/// Voice processing configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// Enable voice input/output
    pub enabled: Option<bool>,

    /// STT provider ("google" or "whisper")
    pub stt_provider: Option<String>,

    /// Whisper model (e.g. "whisper-1")
    pub whisper_model: Option<String>,

    /// TTS speaking rate
    pub tts_speed: Option<f64>,

    /// Synthesize replies as soon as they arrive
    pub auto_speak: Option<bool>,

    /// Directory for synthesis scratch files
    pub scratch_dir: Option<String>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    pub gemini: Option<String>,
    pub google: Option<String>,
    pub openai: Option<String>,
}

/// Server/runtime configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    /// Bind address
    pub host: Option<String>,

    /// API server port
    pub port: Option<u16>,

    /// Web UI directory
    pub static_dir: Option<String>,

    /// Global request budget per minute
    pub rate_limit_per_minute: Option<u32>,

    /// Timeout for calls to external services
    pub http_timeout_secs: Option<u64>,
}

/// Session lifetime configuration
#[derive(Debug, Default, Deserialize)]
pub struct SessionsFileConfig {
    /// Idle time after which a session is dropped
    pub ttl_secs: Option<u64>,
}

/// Load the TOML config file from the standard path
///
/// Returns `ConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> ConfigFile {
    let Some(path) = config_file_path() else {
        return ConfigFile::default();
    };

    if !path.exists() {
        return ConfigFile::default();
    }

    match load_config_file_from(&path) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to load config file, using defaults"
            );
            ConfigFile::default()
        }
    }
}

/// Load a specific TOML config file
///
/// # Errors
///
/// Returns error if the file cannot be read or parsed
pub fn load_config_file_from(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)?;
    let config = toml::from_str(&content)?;
    tracing::info!(path = %path.display(), "loaded config file");
    Ok(config)
}

/// Return the config file path: `~/.config/voice-chat/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("voice-chat").join("config.toml"))
}
