//! Text-to-speech (TTS) processing
//!
//! Synthesis goes through a scratch file: the provider writes the audio to a
//! temporary path owned by the call, the bytes are read back, and the file is
//! removed before returning.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;

use crate::{Error, Result};

/// Produces spoken audio for a message
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Synthesize `text` with the given voice
    ///
    /// # Returns
    ///
    /// Audio bytes (MP3 format)
    ///
    /// # Errors
    ///
    /// Returns error if synthesis fails
    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

/// Synthesizes speech from text with Google Cloud Text-to-Speech
pub struct TextToSpeech {
    client: reqwest::Client,
    api_key: String,
    speed: f64,
    base_url: String,
    scratch_dir: Option<PathBuf>,
}

impl TextToSpeech {
    /// Create a new TTS instance
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new_google(api_key: String, speed: f64, timeout: Duration) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(
                "Google API key required for speech synthesis".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::builder().timeout(timeout).build()?,
            api_key,
            speed,
            base_url: "https://texttospeech.googleapis.com/v1".to_string(),
            scratch_dir: None,
        })
    }

    /// Point the client at a different API root
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Write scratch files somewhere other than the system temp directory
    #[must_use]
    pub fn with_scratch_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.scratch_dir = dir;
        self
    }

    /// Synthesize `text` into the file at `path`
    ///
    /// # Errors
    ///
    /// Returns error if the service call or the file write fails
    pub async fn synthesize_to_file(&self, text: &str, voice: &str, path: &Path) -> Result<()> {
        #[derive(serde::Serialize)]
        #[serde(rename_all = "camelCase")]
        struct SynthesizeRequest<'a> {
            input: Input<'a>,
            voice: VoiceSelection<'a>,
            audio_config: AudioConfig,
        }

        #[derive(serde::Serialize)]
        struct Input<'a> {
            text: &'a str,
        }

        #[derive(serde::Serialize)]
        #[serde(rename_all = "camelCase")]
        struct VoiceSelection<'a> {
            language_code: &'a str,
            name: &'a str,
        }

        #[derive(serde::Serialize)]
        #[serde(rename_all = "camelCase")]
        struct AudioConfig {
            audio_encoding: &'static str,
            speaking_rate: f64,
        }

        #[derive(serde::Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct SynthesizeResponse {
            audio_content: String,
        }

        tracing::debug!(chars = text.len(), voice, "starting synthesis");

        let request = SynthesizeRequest {
            input: Input { text },
            voice: VoiceSelection {
                language_code: voice_language_code(voice),
                name: voice,
            },
            audio_config: AudioConfig {
                audio_encoding: "MP3",
                speaking_rate: self.speed,
            },
        };

        let response = self
            .client
            .post(format!("{}/text:synthesize", self.base_url))
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Google TTS API error");
            return Err(Error::Tts(format!("Google TTS error {status}: {body}")));
        }

        let result: SynthesizeResponse = response.json().await?;
        let audio = base64::engine::general_purpose::STANDARD
            .decode(result.audio_content)
            .map_err(|e| Error::Tts(format!("invalid audio payload: {e}")))?;

        tokio::fs::write(path, &audio).await?;
        Ok(())
    }

    fn scratch_file(&self) -> Result<tempfile::TempPath> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("voice-chat-tts-").suffix(".mp3");
        let file = match &self.scratch_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        Ok(file.into_temp_path())
    }
}

#[async_trait]
impl Synthesizer for TextToSpeech {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>> {
        let path = self.scratch_file()?;

        let written = self.synthesize_to_file(text, voice, &path).await;
        let audio = match written {
            Ok(()) => tokio::fs::read(&path).await.map_err(Error::from),
            Err(e) => Err(e),
        };

        if let Err(e) = path.close() {
            tracing::warn!(error = %e, "failed to remove synthesis scratch file");
        }

        let audio = audio?;
        tracing::info!(audio_bytes = audio.len(), voice, "synthesis complete");
        Ok(audio)
    }

    fn name(&self) -> &'static str {
        "google"
    }
}

/// Language code embedded in a voice name (`en-US-Neural2-F` -> `en-US`)
#[must_use]
pub fn voice_language_code(voice: &str) -> &str {
    let mut dashes = voice.match_indices('-').map(|(i, _)| i);
    match (dashes.next(), dashes.next()) {
        (Some(_), Some(second)) => &voice[..second],
        _ => voice,
    }
}
