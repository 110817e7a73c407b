//! Shared test utilities

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;
use uuid::Uuid;
use voice_chat::llm::{GenerationRequest, Generator};
use voice_chat::session::{Session, SessionHandle};
use voice_chat::voice::{SAMPLE_RATE, Synthesizer, Transcriber, Transcript, samples_to_wav};
use voice_chat::{ChatHandler, Error, HandlerOptions, Result};

/// Bytes returned by the fake synthesizer
pub const FAKE_MP3: &[u8] = b"ID3\x04fake-mp3";

/// How the fake generator answers
#[derive(Clone)]
pub enum Reply {
    /// Answer with the prompt
    Echo,
    Fixed(String),
    Fail(String),
}

/// In-process generation service
pub struct FakeGenerator {
    reply: Reply,
    gate: Option<Arc<Notify>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl FakeGenerator {
    pub fn new(reply: Reply) -> Self {
        Self {
            reply,
            gate: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Hold every call until the gate is notified
    pub fn gated(reply: Reply, gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new(reply)
        }
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Generator for FakeGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        match &self.reply {
            Reply::Echo => Ok(request.prompt.clone()),
            Reply::Fixed(text) => Ok(text.clone()),
            Reply::Fail(message) => Err(Error::Llm(message.clone())),
        }
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// In-process recognition service
pub struct FakeTranscriber {
    result: std::result::Result<Transcript, String>,
    gate: Option<Arc<Notify>>,
    calls: AtomicUsize,
    locales: Mutex<Vec<String>>,
}

impl FakeTranscriber {
    pub fn text(text: &str) -> Self {
        Self::with(Ok(Transcript::Text(text.to_string())))
    }

    pub fn no_match() -> Self {
        Self::with(Ok(Transcript::NoMatch))
    }

    pub fn failing(message: &str) -> Self {
        Self::with(Err(message.to_string()))
    }

    /// Recognize `text`, holding every call until the gate is notified
    pub fn gated(text: &str, gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::text(text)
        }
    }

    fn with(result: std::result::Result<Transcript, String>) -> Self {
        Self {
            result,
            gate: None,
            calls: AtomicUsize::new(0),
            locales: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn locales(&self) -> Vec<String> {
        self.locales.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(&self, _audio: &[u8], locale: &str) -> Result<Transcript> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.locales.lock().unwrap().push(locale.to_string());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.result.clone().map_err(Error::Stt)
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// In-process synthesis service
pub struct FakeSynthesizer {
    fail: bool,
    requests: Mutex<Vec<(String, String)>>,
}

impl FakeSynthesizer {
    pub fn new() -> Self {
        Self {
            fail: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    /// `(text, voice)` pairs, in call order
    pub fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Synthesizer for FakeSynthesizer {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>> {
        self.requests
            .lock()
            .unwrap()
            .push((text.to_string(), voice.to_string()));
        if self.fail {
            return Err(Error::Tts("quota exhausted".to_string()));
        }
        Ok(FAKE_MP3.to_vec())
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// A handler wired to fakes, with handles kept for assertions
pub struct Harness {
    pub generator: Arc<FakeGenerator>,
    pub transcriber: Arc<FakeTranscriber>,
    pub synthesizer: Arc<FakeSynthesizer>,
    pub handler: ChatHandler,
}

impl Harness {
    pub fn new(
        generator: FakeGenerator,
        transcriber: FakeTranscriber,
        synthesizer: FakeSynthesizer,
    ) -> Self {
        Self::with_options(generator, transcriber, synthesizer, HandlerOptions::default())
    }

    pub fn with_options(
        generator: FakeGenerator,
        transcriber: FakeTranscriber,
        synthesizer: FakeSynthesizer,
        options: HandlerOptions,
    ) -> Self {
        let generator = Arc::new(generator);
        let transcriber = Arc::new(transcriber);
        let synthesizer = Arc::new(synthesizer);

        let handler = ChatHandler::new(generator.clone())
            .with_transcriber(Some(transcriber.clone() as Arc<dyn Transcriber>))
            .with_synthesizer(Some(synthesizer.clone() as Arc<dyn Synthesizer>))
            .with_options(options);

        Self {
            generator,
            transcriber,
            synthesizer,
            handler,
        }
    }

    /// Echo generator, transcriber answering `"hello there"`, working synthesizer
    pub fn echo() -> Self {
        Self::new(
            FakeGenerator::new(Reply::Echo),
            FakeTranscriber::text("hello there"),
            FakeSynthesizer::new(),
        )
    }
}

/// A fresh, unregistered session
pub fn new_session() -> SessionHandle {
    Arc::new(tokio::sync::Mutex::new(Session::new(Uuid::new_v4())))
}

/// A short 440 Hz tone encoded as 16 kHz mono WAV
pub fn wav_fixture(duration_secs: f32) -> Vec<u8> {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let count = (SAMPLE_RATE as f32 * duration_secs) as usize;
    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..count)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            0.3 * (2.0 * std::f32::consts::PI * 440.0 * t).sin()
        })
        .collect();
    samples_to_wav(&samples, SAMPLE_RATE).expect("failed to encode test WAV")
}

/// Wait until the session's submission guard is set
pub async fn wait_for_submission(session: &SessionHandle) {
    for _ in 0..1000 {
        if session.lock().await.is_submitting() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("submission never started");
}

/// Wait until the transcriber has been called `count` times
pub async fn wait_for_transcriptions(transcriber: &FakeTranscriber, count: usize) {
    for _ in 0..1000 {
        if transcriber.calls() >= count {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("transcription never started");
}

/// Serve `router` on an ephemeral local port and return its base URL
pub async fn spawn_mock(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind mock server");
    let addr = listener.local_addr().expect("mock server has no address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("mock server failed");
    });
    format!("http://{addr}")
}

/// Last JSON body a mock handler received
#[derive(Clone, Default)]
pub struct Captured(Arc<Mutex<Option<serde_json::Value>>>);

impl Captured {
    pub fn store(&self, value: serde_json::Value) {
        *self.0.lock().unwrap() = Some(value);
    }

    pub fn take(&self) -> serde_json::Value {
        self.0.lock().unwrap().take().expect("mock received no request")
    }
}
