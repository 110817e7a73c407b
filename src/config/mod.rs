//! Configuration management for the voice chat service
//!
//! Values resolve as environment > TOML file > default. A `.env` file in the
//! working directory is folded into the environment at startup.

pub mod file;

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::voice::SttProvider;
use crate::{Result, llm};

use file::ConfigFile;

/// Voice chat configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// Text generation configuration
    pub generation: GenerationConfig,

    /// Voice configuration
    pub voice: VoiceConfig,

    /// API keys
    pub api_keys: ApiKeys,

    /// Idle time after which a session is dropped
    pub session_ttl: Duration,

    /// Timeout for calls to external services
    pub http_timeout: Duration,
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Path to static files directory (web UI)
    pub static_dir: Option<PathBuf>,

    /// Global request budget per minute (`None` = unlimited)
    pub rate_limit_per_minute: Option<u32>,
}

/// Text generation configuration
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// Gemini model identifier
    pub model: String,

    /// Forward earlier turns to the model
    pub include_history: bool,
}

/// Voice processing configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Enable voice input/output
    pub enabled: bool,

    /// Speech recognition backend
    pub stt_provider: SttProvider,

    /// Whisper model (when `stt_provider` is Whisper)
    pub whisper_model: String,

    /// TTS speaking rate (0.25 to 4.0)
    pub tts_speed: f64,

    /// Synthesize replies as soon as they arrive
    pub auto_speak: bool,

    /// Directory for synthesis scratch files (`None` = system temp)
    pub scratch_dir: Option<PathBuf>,
}

/// API keys for external services
#[derive(Clone, Default)]
pub struct ApiKeys {
    /// Gemini API key (text generation)
    pub gemini: Option<String>,

    /// Google Cloud API key (speech recognition and synthesis)
    pub google: Option<String>,

    /// `OpenAI` API key (Whisper)
    pub openai: Option<String>,
}

impl std::fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn mask(key: Option<&String>) -> &'static str {
            if key.is_some() { "<set>" } else { "<unset>" }
        }

        f.debug_struct("ApiKeys")
            .field("gemini", &mask(self.gemini.as_ref()))
            .field("google", &mask(self.google.as_ref()))
            .field("openai", &mask(self.openai.as_ref()))
            .finish()
    }
}

impl Config {
    /// Load configuration from the environment and the standard config file
    ///
    /// # Errors
    ///
    /// Returns error if a value is invalid
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration, reading the TOML file at `path` if given
    ///
    /// # Errors
    ///
    /// Returns error if an explicit config file cannot be read or a value is invalid
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "loaded .env file"),
            Err(e) if e.not_found() => {}
            Err(e) => tracing::warn!(error = %e, "failed to load .env file"),
        }

        let fc = match path {
            Some(path) => file::load_config_file_from(path)?,
            None => file::load_config_file(),
        };

        Self::resolve(fc, |key| std::env::var(key).ok())
    }

    /// Merge a parsed config file with environment lookups
    ///
    /// # Errors
    ///
    /// Returns error if a value is invalid
    pub fn resolve(fc: ConfigFile, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let parse_bool = |key: &str| env(key).map(|v| matches!(v.trim(), "1" | "true" | "yes"));

        // API keys (env > toml > None)
        let api_keys = ApiKeys {
            gemini: env("GEMINI_API_KEY").or(fc.api_keys.gemini),
            google: env("GOOGLE_API_KEY").or(fc.api_keys.google),
            openai: env("OPENAI_API_KEY").or(fc.api_keys.openai),
        };

        // Server config (env > toml > default)
        let server = ServerConfig {
            host: env("VOICE_CHAT_HOST")
                .or(fc.server.host)
                .unwrap_or_else(|| "127.0.0.1".to_string()),
            port: env("VOICE_CHAT_PORT")
                .or_else(|| env("PORT"))
                .and_then(|s| s.parse().ok())
                .or(fc.server.port)
                .unwrap_or(8501),
            static_dir: env("VOICE_CHAT_STATIC_DIR")
                .or(fc.server.static_dir)
                .map(PathBuf::from),
            rate_limit_per_minute: env("VOICE_CHAT_RATE_LIMIT")
                .and_then(|s| s.parse().ok())
                .or(fc.server.rate_limit_per_minute)
                .filter(|&n| n > 0),
        };

        let generation = GenerationConfig {
            model: env("VOICE_CHAT_MODEL")
                .or(fc.generation.model)
                .unwrap_or_else(|| llm::DEFAULT_MODEL.to_string()),
            include_history: parse_bool("VOICE_CHAT_INCLUDE_HISTORY")
                .or(fc.generation.include_history)
                .unwrap_or(false),
        };

        let stt_provider = match env("VOICE_CHAT_STT_PROVIDER").or(fc.voice.stt_provider) {
            Some(name) => SttProvider::parse(&name)?,
            None => SttProvider::Google,
        };

        let voice = VoiceConfig {
            enabled: !parse_bool("VOICE_CHAT_DISABLE_VOICE").unwrap_or(false)
                && fc.voice.enabled.unwrap_or(true),
            stt_provider,
            whisper_model: fc
                .voice
                .whisper_model
                .unwrap_or_else(|| "whisper-1".to_string()),
            tts_speed: fc.voice.tts_speed.unwrap_or(1.0).clamp(0.25, 4.0),
            auto_speak: parse_bool("VOICE_CHAT_AUTO_SPEAK")
                .or(fc.voice.auto_speak)
                .unwrap_or(true),
            scratch_dir: fc.voice.scratch_dir.map(PathBuf::from),
        };

        let session_ttl = Duration::from_secs(
            env("VOICE_CHAT_SESSION_TTL")
                .and_then(|s| s.parse().ok())
                .or(fc.sessions.ttl_secs)
                .unwrap_or(3600),
        );

        let http_timeout = Duration::from_secs(fc.server.http_timeout_secs.unwrap_or(60));

        Ok(Self {
            server,
            generation,
            voice,
            api_keys,
            session_ttl,
            http_timeout,
        })
    }

    /// Key required by the configured STT provider
    #[must_use]
    pub fn stt_api_key(&self) -> Option<&str> {
        match self.voice.stt_provider {
            SttProvider::Google => self.api_keys.google.as_deref(),
            SttProvider::Whisper => self.api_keys.openai.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_sources() {
        let config = Config::resolve(ConfigFile::default(), env_of(&[])).unwrap();

        assert_eq!(config.server.port, 8501);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.generation.model, llm::DEFAULT_MODEL);
        assert!(!config.generation.include_history);
        assert!(config.voice.enabled);
        assert!(config.voice.auto_speak);
        assert_eq!(config.voice.stt_provider, SttProvider::Google);
        assert_eq!(config.session_ttl, Duration::from_secs(3600));
        assert!(config.api_keys.gemini.is_none());
        assert!(config.server.rate_limit_per_minute.is_none());
    }

    #[test]
    fn env_overrides_file() {
        let fc: ConfigFile = toml::from_str(
            r#"
            [server]
            port = 9000
            [api_keys]
            gemini = "from-file"
            [generation]
            include_history = true
            "#,
        )
        .unwrap();

        let config = Config::resolve(
            fc,
            env_of(&[
                ("VOICE_CHAT_PORT", "9100"),
                ("GEMINI_API_KEY", "from-env"),
            ]),
        )
        .unwrap();

        assert_eq!(config.server.port, 9100);
        assert_eq!(config.api_keys.gemini.as_deref(), Some("from-env"));
        assert!(config.generation.include_history);
    }

    #[test]
    fn whisper_uses_openai_key() {
        let config = Config::resolve(
            ConfigFile::default(),
            env_of(&[
                ("VOICE_CHAT_STT_PROVIDER", "whisper"),
                ("OPENAI_API_KEY", "sk-test"),
                ("GOOGLE_API_KEY", "g-test"),
            ]),
        )
        .unwrap();

        assert_eq!(config.stt_api_key(), Some("sk-test"));
    }

    #[test]
    fn unknown_stt_provider_is_rejected() {
        let result = Config::resolve(
            ConfigFile::default(),
            env_of(&[("VOICE_CHAT_STT_PROVIDER", "carrier-pigeon")]),
        );
        assert!(result.is_err());
    }

    #[test]
    fn debug_masks_keys() {
        let keys = ApiKeys {
            gemini: Some("secret-value".to_string()),
            ..ApiKeys::default()
        };
        let rendered = format!("{keys:?}");
        assert!(!rendered.contains("secret-value"));
        assert!(rendered.contains("<set>"));
    }
}
