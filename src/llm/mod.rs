//! Text generation
//!
//! The generation adapter receives a fully composed system instruction and
//! the latest user prompt. Prior turns are only forwarded when the caller
//! explicitly puts them in the request.

mod gemini;

pub use gemini::{DEFAULT_MODEL, GeminiClient};

use async_trait::async_trait;

use crate::Result;
use crate::session::Message;

/// A single generation call
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    /// Personality instruction followed by the language directive
    pub instruction: String,
    /// Latest user prompt
    pub prompt: String,
    /// Earlier turns, oldest first (empty unless history forwarding is on)
    pub history: Vec<Message>,
}

/// Produces assistant replies
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate a reply
    ///
    /// # Errors
    ///
    /// Returns error if the service call fails or yields no text
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}
