//! Voice Chat - conversational web front-end for a hosted language model
//!
//! This library provides the core functionality for the voice chat service:
//! - Personality and language presets
//! - Per-session conversation state with re-entrancy guards
//! - Speech-to-text and text-to-speech adapters
//! - Text generation via the Gemini API
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    Browser                           │
//! │   Selectors  │  Record  │  Text input  │  Playback  │
//! └────────────────────┬────────────────────────────────┘
//!                      │ HTTP
//! ┌────────────────────▼────────────────────────────────┐
//! │                 Voice Chat                           │
//! │   API  │  Sessions  │  Chat handler  │  Config      │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │            External services                         │
//! │   Gemini  │  Speech-to-Text  │  Text-to-Speech      │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod chat;
pub mod config;
pub mod error;
pub mod language;
pub mod llm;
pub mod personality;
pub mod session;
pub mod voice;

pub use chat::{ChatHandler, ClientEvent, HandlerOptions, Notice, NoticeLevel, Outcome};
pub use config::Config;
pub use error::{Error, Result};
pub use language::{Language, LanguageId};
pub use personality::{Personality, PersonalityId};
pub use session::{Message, Role, Session, SessionStore};
