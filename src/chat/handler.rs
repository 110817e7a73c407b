//! Session state machine
//!
//! `Idle -> Transcribed -> Submitting -> Idle` for voice input and
//! `Idle -> Submitting -> Idle` for typed input. The session lock is held only
//! for transitions; every call to an external service runs unlocked and its
//! result is committed under a fresh lock.

use std::sync::Arc;

use super::{
    ClientEvent, GENERATION_ERROR_PREFIX, LOCAL_ERROR_PREFIX, NOT_UNDERSTOOD_MESSAGE, Notice,
    Outcome, SPEECH_SERVICE_ERROR_PREFIX,
};
use crate::Error;
use crate::language::{LanguageId, compose_instruction};
use crate::llm::{GenerationRequest, Generator};
use crate::personality::PersonalityId;
use crate::session::{
    Phase, Session, SessionHandle, SubmissionTicket, TranscriptionCommit, TranscriptionOutcome,
    fingerprint,
};
use crate::voice::{Synthesizer, Transcriber, Transcript};

/// Behavior switches for the handler
#[derive(Debug, Clone, Copy)]
pub struct HandlerOptions {
    /// Synthesize every successful reply as soon as it arrives
    pub auto_speak: bool,
    /// Forward earlier turns to the generation service
    pub include_history: bool,
}

impl Default for HandlerOptions {
    fn default() -> Self {
        Self {
            auto_speak: true,
            include_history: false,
        }
    }
}

/// Applies client events to sessions
#[derive(Clone)]
pub struct ChatHandler {
    generator: Arc<dyn Generator>,
    transcriber: Option<Arc<dyn Transcriber>>,
    synthesizer: Option<Arc<dyn Synthesizer>>,
    options: HandlerOptions,
}

/// Everything a submission needs once the lock is released
struct Admitted {
    ticket: SubmissionTicket,
    request: GenerationRequest,
    voice: &'static str,
}

impl ChatHandler {
    #[must_use]
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self {
            generator,
            transcriber: None,
            synthesizer: None,
            options: HandlerOptions::default(),
        }
    }

    #[must_use]
    pub fn with_transcriber(mut self, transcriber: Option<Arc<dyn Transcriber>>) -> Self {
        self.transcriber = transcriber;
        self
    }

    #[must_use]
    pub fn with_synthesizer(mut self, synthesizer: Option<Arc<dyn Synthesizer>>) -> Self {
        self.synthesizer = synthesizer;
        self
    }

    #[must_use]
    pub const fn with_options(mut self, options: HandlerOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub const fn stt_available(&self) -> bool {
        self.transcriber.is_some()
    }

    #[must_use]
    pub const fn tts_available(&self) -> bool {
        self.synthesizer.is_some()
    }

    #[must_use]
    pub fn generator_name(&self) -> &'static str {
        self.generator.name()
    }

    /// Handle one client event for a session
    pub async fn handle(&self, session: &SessionHandle, event: ClientEvent) -> Outcome {
        let kind = event.kind();
        let outcome = match event {
            ClientEvent::SelectPersonality { personality } => {
                self.select_personality(session, personality).await
            }
            ClientEvent::SelectLanguage { language } => {
                self.select_language(session, language).await
            }
            ClientEvent::AudioCaptured { audio } => self.audio_captured(session, &audio).await,
            ClientEvent::ConfirmVoice => self.confirm_voice(session).await,
            ClientEvent::SubmitText { text } => self.submit_text(session, text).await,
            ClientEvent::ClearHistory => self.clear_history(session).await,
            ClientEvent::SpeakMessage { index } => self.speak_message(session, index).await,
        };

        tracing::debug!(
            session = %outcome.session.id,
            event = kind,
            accepted = outcome.accepted,
            notices = outcome.notices.len(),
            "event handled"
        );
        outcome
    }

    async fn select_personality(
        &self,
        session: &SessionHandle,
        personality: PersonalityId,
    ) -> Outcome {
        let mut s = session.lock().await;
        s.touch();
        let mut notices = Vec::new();
        if s.select_personality(personality) {
            let preset = personality.personality();
            tracing::info!(session = %s.id(), personality = %personality, "personality changed");
            notices.push(Notice::info(format!(
                "{} Switched to {}. Chat history cleared.",
                preset.icon, preset.name
            )));
        }
        finish(&s, notices)
    }

    async fn select_language(&self, session: &SessionHandle, language: LanguageId) -> Outcome {
        let mut s = session.lock().await;
        s.touch();
        let mut notices = Vec::new();
        if s.select_language(language) {
            let entry = language.language();
            tracing::info!(session = %s.id(), language = %language, "language changed");
            notices.push(Notice::info(format!(
                "{} Now speaking {}. Chat history cleared.",
                entry.flag, entry.display_name
            )));
        }
        finish(&s, notices)
    }

    async fn clear_history(&self, session: &SessionHandle) -> Outcome {
        let mut s = session.lock().await;
        s.touch();
        s.clear_history();
        tracing::info!(session = %s.id(), "history cleared");
        finish(&s, vec![Notice::info("Chat history cleared.")])
    }

    async fn audio_captured(&self, session: &SessionHandle, audio: &[u8]) -> Outcome {
        let (transcriber, ticket, locale) = {
            let mut s = session.lock().await;
            s.touch();

            if audio.is_empty() {
                return finish(&s, vec![Notice::warning("No audio was captured.")]);
            }

            let capture = fingerprint(audio);
            if !s.is_new_capture(&capture) {
                tracing::debug!(session = %s.id(), "capture unchanged, replaying transcription");
                let notices = match s.last_transcription() {
                    Some(TranscriptionOutcome::Text(_)) if s.pending_transcript().is_none() => {
                        vec![Notice::info(
                            "This recording was already handled. Record again to send a new voice message.",
                        )]
                    }
                    Some(outcome) => transcription_notices(outcome),
                    None => Vec::new(),
                };
                return finish(&s, notices);
            }

            if s.is_transcribing(&capture) {
                return finish(
                    &s,
                    vec![Notice::info("This recording is already being transcribed.")],
                );
            }

            let Some(transcriber) = self.transcriber.clone() else {
                return finish(&s, vec![Notice::error("Voice input is not configured.")]);
            };

            let locale = s.language().language().locale;
            (transcriber, s.begin_transcription(capture), locale)
        };

        let outcome = match transcriber.transcribe(audio, locale).await {
            Ok(Transcript::Text(text)) => TranscriptionOutcome::Text(text),
            Ok(Transcript::NoMatch) => TranscriptionOutcome::NotUnderstood,
            Err(Error::Audio(message)) => {
                TranscriptionOutcome::Failed(format!("{LOCAL_ERROR_PREFIX}{message}"))
            }
            Err(e) => {
                tracing::warn!(provider = transcriber.name(), error = %e, "transcription failed");
                TranscriptionOutcome::Failed(format!("{SPEECH_SERVICE_ERROR_PREFIX}{e}"))
            }
        };

        let mut s = session.lock().await;
        let notices = transcription_notices(&outcome);
        match s.finish_transcription(ticket, outcome) {
            TranscriptionCommit::Recorded => finish(&s, notices),
            TranscriptionCommit::Reset => {
                tracing::info!(session = %s.id(), "conversation reset during transcription, result dropped");
                finish(
                    &s,
                    vec![Notice::info(
                        "The conversation was reset before the recording was transcribed. Please record again.",
                    )],
                )
            }
            TranscriptionCommit::Superseded => {
                tracing::debug!(session = %s.id(), "newer capture pending, result dropped");
                finish(&s, Vec::new())
            }
        }
    }

    async fn confirm_voice(&self, session: &SessionHandle) -> Outcome {
        let admitted = {
            let mut s = session.lock().await;
            s.touch();
            if s.is_submitting() {
                return busy(&s);
            }
            let Some(text) = s.take_transcript() else {
                return finish(
                    &s,
                    vec![Notice::warning("There is no transcribed voice message to send.")],
                );
            };
            match self.admit(&mut s, text) {
                Ok(admitted) => admitted,
                Err(outcome) => return *outcome,
            }
        };

        self.run_submission(session, admitted).await
    }

    async fn submit_text(&self, session: &SessionHandle, text: String) -> Outcome {
        let admitted = {
            let mut s = session.lock().await;
            s.touch();
            if text.trim().is_empty() {
                return finish(&s, vec![Notice::warning("Please enter a message.")]);
            }
            match self.admit(&mut s, text) {
                Ok(admitted) => admitted,
                Err(outcome) => return *outcome,
            }
        };

        let mut outcome = self.run_submission(session, admitted).await;
        if matches!(outcome.session.phase, Phase::Transcribed { .. }) {
            outcome.notices.push(Notice::info(
                "Your transcribed voice message is still waiting to be sent.",
            ));
        }
        outcome
    }

    /// Pass the prompt through the guard and compose the generation request
    fn admit(&self, s: &mut Session, prompt: String) -> Result<Admitted, Box<Outcome>> {
        let prompt = prompt.trim().to_string();
        let history = if self.options.include_history {
            s.messages().to_vec()
        } else {
            Vec::new()
        };

        let Some(ticket) = s.begin_submission(prompt.clone()) else {
            return Err(Box::new(busy(s)));
        };

        let language = s.language().language();
        let instruction = compose_instruction(s.personality().personality().instruction, language);

        tracing::info!(
            session = %s.id(),
            personality = %s.personality(),
            language = %s.language(),
            prompt_chars = prompt.len(),
            "prompt submitted"
        );

        Ok(Admitted {
            ticket,
            request: GenerationRequest {
                instruction,
                prompt,
                history,
            },
            voice: language.voice,
        })
    }

    /// Generate, commit, and optionally synthesize a reply
    ///
    /// Runs detached so the guard is released even if the caller goes away.
    async fn run_submission(&self, session: &SessionHandle, admitted: Admitted) -> Outcome {
        let this = self.clone();
        let task_session = Arc::clone(session);
        let task = tokio::spawn(async move { this.complete(&task_session, admitted).await });

        match task.await {
            Ok(notices) => {
                let s = session.lock().await;
                finish(&s, notices)
            }
            Err(e) => {
                tracing::error!(error = %e, "submission task failed");
                let mut s = session.lock().await;
                s.release_guard();
                finish(
                    &s,
                    vec![Notice::error(format!("{GENERATION_ERROR_PREFIX}{e}"))],
                )
            }
        }
    }

    async fn complete(&self, session: &SessionHandle, admitted: Admitted) -> Vec<Notice> {
        let Admitted {
            ticket,
            request,
            voice,
        } = admitted;
        let mut notices = Vec::new();
        tracing::debug!(
            provider = self.generator.name(),
            history = request.history.len(),
            "generating reply"
        );

        let (reply, failed) = match self.generator.generate(&request).await {
            Ok(text) => (text, false),
            Err(e) => {
                tracing::warn!(provider = self.generator.name(), error = %e, "generation failed");
                let message = format!("{GENERATION_ERROR_PREFIX}{e}");
                notices.push(Notice::error(message.clone()));
                (message, true)
            }
        };

        let (index, epoch) = {
            let mut s = session.lock().await;
            let index = s.finish_submission(ticket, reply.clone());
            if index.is_none() {
                tracing::info!(session = %s.id(), "conversation reset during generation, reply dropped");
                notices.push(Notice::info(
                    "The conversation was reset before the reply arrived.",
                ));
            }
            (index, s.epoch())
        };

        if let (Some(index), false, true, Some(synthesizer)) = (
            index,
            failed,
            self.options.auto_speak,
            self.synthesizer.as_ref(),
        ) {
            match synthesizer.synthesize(&reply, voice).await {
                Ok(audio) => {
                    session.lock().await.cache_audio(epoch, index, audio);
                }
                Err(e) => {
                    tracing::warn!(provider = synthesizer.name(), error = %e, "synthesis failed");
                    notices.push(Notice::error(format!("Could not synthesize audio: {e}")));
                }
            }
        }

        notices
    }

    async fn speak_message(&self, session: &SessionHandle, index: usize) -> Outcome {
        let (synthesizer, text, voice, epoch) = {
            let mut s = session.lock().await;
            s.touch();

            let Some(message) = s.messages().get(index) else {
                return finish(&s, vec![Notice::warning(format!("There is no message {index}."))]);
            };

            if let Some(audio) = s.audio(index) {
                let audio = audio.to_vec();
                let mut outcome = finish(&s, Vec::new());
                outcome.audio = Some(audio);
                return outcome;
            }

            let Some(synthesizer) = self.synthesizer.as_ref() else {
                return finish(&s, vec![Notice::error("Speech synthesis is not configured.")]);
            };

            (
                synthesizer,
                message.content.clone(),
                s.language().language().voice,
                s.epoch(),
            )
        };

        match synthesizer.synthesize(&text, voice).await {
            Ok(audio) => {
                let mut s = session.lock().await;
                s.cache_audio(epoch, index, audio.clone());
                let mut outcome = finish(&s, Vec::new());
                outcome.audio = Some(audio);
                outcome
            }
            Err(e) => {
                tracing::warn!(provider = synthesizer.name(), error = %e, "synthesis failed");
                let s = session.lock().await;
                finish(
                    &s,
                    vec![Notice::error(format!("Could not synthesize audio: {e}"))],
                )
            }
        }
    }
}

fn transcription_notices(outcome: &TranscriptionOutcome) -> Vec<Notice> {
    match outcome {
        TranscriptionOutcome::Text(text) => vec![
            Notice::success(format!("Transcribed: {text}")),
            Notice::info("Send the voice message, or copy the text to edit it first."),
        ],
        TranscriptionOutcome::NotUnderstood => vec![Notice::warning(NOT_UNDERSTOOD_MESSAGE)],
        TranscriptionOutcome::Failed(message) => vec![Notice::error(message.clone())],
    }
}

fn finish(s: &Session, notices: Vec<Notice>) -> Outcome {
    Outcome {
        accepted: true,
        notices,
        session: s.snapshot(),
        audio: None,
    }
}

fn busy(s: &Session) -> Outcome {
    Outcome {
        accepted: false,
        notices: vec![Notice::warning(
            "A message is already being answered. Please wait.",
        )],
        session: s.snapshot(),
        audio: None,
    }
}
