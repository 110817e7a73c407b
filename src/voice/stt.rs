//! Speech-to-text (STT) processing

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;

use super::wav;
use crate::{Error, Result};

/// What the recognizer made of a capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transcript {
    /// Recognized speech
    Text(String),
    /// Audio was processed but no speech was recognized
    NoMatch,
}

impl Transcript {
    /// Map recognizer text to a transcript, treating blank text as no match
    fn from_text(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            Self::NoMatch
        } else {
            Self::Text(trimmed.to_string())
        }
    }
}

/// Turns recorded speech into text
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe a WAV capture spoken in `locale`
    ///
    /// # Errors
    ///
    /// `Error::Audio` if the capture is unreadable, `Error::Stt`/`Error::Http`
    /// if the service fails
    async fn transcribe(&self, audio: &[u8], locale: &str) -> Result<Transcript>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

/// Response from Google Speech-to-Text `speech:recognize`
#[derive(serde::Deserialize)]
struct GoogleRecognizeResponse {
    #[serde(default)]
    results: Vec<GoogleResult>,
}

#[derive(serde::Deserialize)]
struct GoogleResult {
    #[serde(default)]
    alternatives: Vec<GoogleAlternative>,
}

#[derive(serde::Deserialize)]
struct GoogleAlternative {
    #[serde(default)]
    transcript: String,
}

/// Response from OpenAI Whisper transcription API
#[derive(serde::Deserialize)]
struct WhisperResponse {
    text: String,
}

/// STT provider backend
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SttProvider {
    Google,
    Whisper,
}

impl SttProvider {
    /// Parse a provider name from configuration
    ///
    /// # Errors
    ///
    /// Returns error for unknown provider names
    pub fn parse(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "google" => Ok(Self::Google),
            "whisper" | "openai" => Ok(Self::Whisper),
            other => Err(Error::Config(format!("unknown STT provider: {other}"))),
        }
    }
}

/// Transcribes speech to text
pub struct SpeechToText {
    client: reqwest::Client,
    api_key: String,
    model: String,
    provider: SttProvider,
    base_url: String,
}

impl SpeechToText {
    /// Create a new STT instance using Google Cloud Speech-to-Text
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new_google(api_key: String, timeout: Duration) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(
                "Google API key required for speech recognition".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::builder().timeout(timeout).build()?,
            api_key,
            model: "default".to_string(),
            provider: SttProvider::Google,
            base_url: "https://speech.googleapis.com/v1".to_string(),
        })
    }

    /// Create a new STT instance using `OpenAI` Whisper
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new_whisper(api_key: String, model: String, timeout: Duration) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(
                "OpenAI API key required for Whisper".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::builder().timeout(timeout).build()?,
            api_key,
            model,
            provider: SttProvider::Whisper,
            base_url: "https://api.openai.com/v1".to_string(),
        })
    }

    /// Point the client at a different API root
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub const fn provider(&self) -> SttProvider {
        self.provider
    }

    /// Transcribe using Google Cloud Speech-to-Text
    async fn transcribe_google(&self, audio: &[u8], locale: &str) -> Result<Transcript> {
        let info = wav::inspect(audio)?;
        tracing::debug!(
            audio_bytes = audio.len(),
            sample_rate = info.sample_rate,
            channels = info.channels,
            locale,
            "starting Google transcription"
        );

        let body = google_request_body(audio, &info, locale);

        let response = self
            .client
            .post(format!("{}/speech:recognize", self.base_url))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Google STT request failed");
                e
            })?;

        let status = response.status();
        tracing::debug!(status = %status, "received response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Google STT API error");
            return Err(Error::Stt(format!("Google STT API error {status}: {body}")));
        }

        let result: GoogleRecognizeResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse Google STT response");
            e
        })?;

        let transcript: Vec<String> = result
            .results
            .into_iter()
            .filter_map(|r| r.alternatives.into_iter().next())
            .map(|a| a.transcript)
            .collect();

        let transcript = Transcript::from_text(&transcript.join(" "));
        tracing::info!(?transcript, "transcription complete");
        Ok(transcript)
    }

    /// Transcribe using `OpenAI` Whisper
    async fn transcribe_whisper(&self, audio: &[u8], locale: &str) -> Result<Transcript> {
        wav::inspect(audio)?;
        tracing::debug!(audio_bytes = audio.len(), locale, "starting Whisper transcription");

        let language = locale.split('-').next().unwrap_or(locale).to_string();
        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(audio.to_vec())
                    .file_name("audio.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| Error::Stt(e.to_string()))?,
            )
            .text("model", self.model.clone())
            .text("language", language);

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Whisper request failed");
                e
            })?;

        let status = response.status();
        tracing::debug!(status = %status, "received response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Whisper API error");
            return Err(Error::Stt(format!("Whisper API error {status}: {body}")));
        }

        let result: WhisperResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse response");
            e
        })?;

        let transcript = Transcript::from_text(&result.text);
        tracing::info!(?transcript, "transcription complete");
        Ok(transcript)
    }
}

#[async_trait]
impl Transcriber for SpeechToText {
    async fn transcribe(&self, audio: &[u8], locale: &str) -> Result<Transcript> {
        match self.provider {
            SttProvider::Google => self.transcribe_google(audio, locale).await,
            SttProvider::Whisper => self.transcribe_whisper(audio, locale).await,
        }
    }

    fn name(&self) -> &'static str {
        match self.provider {
            SttProvider::Google => "google",
            SttProvider::Whisper => "whisper",
        }
    }
}

fn google_request_body(audio: &[u8], info: &wav::WavInfo, locale: &str) -> serde_json::Value {
    let mut config = serde_json::json!({
        "languageCode": locale,
        "audioChannelCount": info.channels,
        "enableAutomaticPunctuation": true,
    });
    // LINEAR16 captures can be described exactly; anything else is left to
    // the service's header detection
    if info.is_linear16() {
        config["encoding"] = "LINEAR16".into();
        config["sampleRateHertz"] = info.sample_rate.into();
    }

    serde_json::json!({
        "config": config,
        "audio": {
            "content": base64::engine::general_purpose::STANDARD.encode(audio),
        },
    })
}
