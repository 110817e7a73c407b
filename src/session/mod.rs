//! Per-session conversation state
//!
//! A `Session` holds everything one browser client accumulates: the selected
//! personality and language, the message history, synthesized audio keyed by
//! message index, and the guards that keep transcription and submission from
//! running twice for the same user action.

mod store;

pub use store::{SessionHandle, SessionStore};

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::language::LanguageId;
use crate::personality::PersonalityId;

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A message in the conversation history
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Where a session is in the interaction cycle
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    /// Voice input was recognized and awaits confirmation
    Transcribed { text: String },
    /// A prompt is with the generation service
    Submitting,
}

/// Stored outcome of the last transcription, replayed for identical captures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptionOutcome {
    Text(String),
    NotUnderstood,
    Failed(String),
}

/// Proof that a submission was admitted by the re-entrancy guard
#[derive(Debug)]
pub struct SubmissionTicket {
    epoch: u64,
}

/// Proof that a capture was handed to the recognition service
#[derive(Debug)]
pub struct TranscriptionTicket {
    fingerprint: String,
    epoch: u64,
}

/// What happened to a transcription result on commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptionCommit {
    Recorded,
    /// History was reset while the capture was with the service
    Reset,
    /// A newer capture started after this one
    Superseded,
}

/// Conversation state for one browser client
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    created_at: DateTime<Utc>,
    last_active: DateTime<Utc>,
    personality: PersonalityId,
    language: LanguageId,
    messages: Vec<Message>,
    audio: HashMap<usize, Vec<u8>>,
    /// Recognized voice input awaiting confirmation
    transcript: Option<String>,
    last_capture: Option<String>,
    last_transcription: Option<TranscriptionOutcome>,
    transcribing: Option<String>,
    submitting: bool,
    /// Incremented on every history reset
    epoch: u64,
}

impl Session {
    /// Create a session with default personality and language
    #[must_use]
    pub fn new(id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id,
            created_at: now,
            last_active: now,
            personality: PersonalityId::default(),
            language: LanguageId::default(),
            messages: Vec::new(),
            audio: HashMap::new(),
            transcript: None,
            last_capture: None,
            last_transcription: None,
            transcribing: None,
            submitting: false,
            epoch: 0,
        }
    }

    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub const fn last_active(&self) -> DateTime<Utc> {
        self.last_active
    }

    pub fn touch(&mut self) {
        self.last_active = Utc::now();
    }

    #[must_use]
    pub const fn personality(&self) -> PersonalityId {
        self.personality
    }

    #[must_use]
    pub const fn language(&self) -> LanguageId {
        self.language
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Current phase; a pending transcript survives a submission
    #[must_use]
    pub fn phase(&self) -> Phase {
        if self.submitting {
            Phase::Submitting
        } else if let Some(text) = &self.transcript {
            Phase::Transcribed { text: text.clone() }
        } else {
            Phase::Idle
        }
    }

    #[must_use]
    pub fn pending_transcript(&self) -> Option<&str> {
        self.transcript.as_deref()
    }

    #[must_use]
    pub const fn is_submitting(&self) -> bool {
        self.submitting
    }

    #[must_use]
    pub const fn epoch(&self) -> u64 {
        self.epoch
    }

    #[must_use]
    pub fn audio(&self, index: usize) -> Option<&[u8]> {
        self.audio.get(&index).map(Vec::as_slice)
    }

    /// Message indices that have synthesized audio, ascending
    #[must_use]
    pub fn audio_indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self.audio.keys().copied().collect();
        indices.sort_unstable();
        indices
    }

    /// Switch personality; returns `true` and resets history if it changed
    pub fn select_personality(&mut self, personality: PersonalityId) -> bool {
        if self.personality == personality {
            return false;
        }
        self.personality = personality;
        self.reset_history();
        true
    }

    /// Switch language; returns `true` and resets history if it changed
    pub fn select_language(&mut self, language: LanguageId) -> bool {
        if self.language == language {
            return false;
        }
        self.language = language;
        self.reset_history();
        true
    }

    /// Drop all messages and cached audio
    pub fn clear_history(&mut self) {
        self.reset_history();
    }

    fn reset_history(&mut self) {
        self.messages.clear();
        self.audio.clear();
        self.epoch += 1;
    }

    /// Whether `fingerprint` differs from the last processed capture
    #[must_use]
    pub fn is_new_capture(&self, fingerprint: &str) -> bool {
        self.last_capture.as_deref() != Some(fingerprint)
    }

    /// Result stored for the last processed capture
    #[must_use]
    pub const fn last_transcription(&self) -> Option<&TranscriptionOutcome> {
        self.last_transcription.as_ref()
    }

    /// Whether `fingerprint` is the capture currently being transcribed
    #[must_use]
    pub fn is_transcribing(&self, fingerprint: &str) -> bool {
        self.transcribing.as_deref() == Some(fingerprint)
    }

    /// Mark a capture as handed to the recognition service
    ///
    /// A later capture replaces it; the earlier result is then dropped on
    /// commit.
    pub fn begin_transcription(&mut self, fingerprint: String) -> TranscriptionTicket {
        self.transcribing = Some(fingerprint.clone());
        TranscriptionTicket {
            fingerprint,
            epoch: self.epoch,
        }
    }

    /// Commit a transcription result started with `begin_transcription`
    pub fn finish_transcription(
        &mut self,
        ticket: TranscriptionTicket,
        outcome: TranscriptionOutcome,
    ) -> TranscriptionCommit {
        if !self.is_transcribing(&ticket.fingerprint) {
            return TranscriptionCommit::Superseded;
        }
        self.transcribing = None;
        if ticket.epoch != self.epoch {
            return TranscriptionCommit::Reset;
        }
        self.record_transcription(ticket.fingerprint, outcome);
        TranscriptionCommit::Recorded
    }

    /// Record a transcription result for a capture
    ///
    /// Recognized text becomes the pending transcript; anything else drops
    /// the previous one.
    pub fn record_transcription(&mut self, fingerprint: String, outcome: TranscriptionOutcome) {
        self.transcript = match &outcome {
            TranscriptionOutcome::Text(text) => Some(text.clone()),
            TranscriptionOutcome::NotUnderstood | TranscriptionOutcome::Failed(_) => None,
        };
        self.last_capture = Some(fingerprint);
        self.last_transcription = Some(outcome);
    }

    /// Take the pending transcript, if any
    pub fn take_transcript(&mut self) -> Option<String> {
        self.transcript.take()
    }

    /// Admit a prompt through the re-entrancy guard
    ///
    /// Appends the user message and marks the session as submitting. Returns
    /// `None` when another submission is still in flight.
    pub fn begin_submission(&mut self, prompt: String) -> Option<SubmissionTicket> {
        if self.submitting {
            return None;
        }
        self.submitting = true;
        self.messages.push(Message::user(prompt));
        Some(SubmissionTicket { epoch: self.epoch })
    }

    /// Release the guard and append the reply
    ///
    /// Returns the reply's message index, or `None` if history was reset
    /// while the reply was being generated.
    pub fn finish_submission(&mut self, ticket: SubmissionTicket, reply: String) -> Option<usize> {
        self.release_guard();
        if ticket.epoch != self.epoch {
            return None;
        }
        self.messages.push(Message::assistant(reply));
        Some(self.messages.len() - 1)
    }

    /// Clear the guard without a reply (the submission was abandoned)
    pub fn release_guard(&mut self) {
        self.submitting = false;
    }

    /// Cache synthesized audio for a message
    ///
    /// Ignored (returns `false`) when history was reset after `epoch` or the
    /// index no longer names a message.
    pub fn cache_audio(&mut self, epoch: u64, index: usize, audio: Vec<u8>) -> bool {
        if epoch != self.epoch || index >= self.messages.len() {
            return false;
        }
        self.audio.insert(index, audio);
        true
    }

    /// Serializable view for the browser
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id,
            personality: self.personality,
            language: self.language,
            messages: self.messages.clone(),
            audio: self.audio_indices(),
            phase: self.phase(),
            created_at: self.created_at,
        }
    }
}

/// Browser-facing view of a session
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub personality: PersonalityId,
    pub language: LanguageId,
    pub messages: Vec<Message>,
    /// Message indices with cached audio
    pub audio: Vec<usize>,
    pub phase: Phase,
    pub created_at: DateTime<Utc>,
}

/// Content fingerprint of a recorded capture
#[must_use]
pub fn fingerprint(audio: &[u8]) -> String {
    hex::encode(Sha256::digest(audio))
}
