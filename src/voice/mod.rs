//! Voice processing module
//!
//! Speech recognition for recorded captures and speech synthesis for
//! assistant replies. Both are thin adapters over hosted APIs.

mod stt;
mod tts;
pub mod wav;

pub use stt::{SpeechToText, SttProvider, Transcriber, Transcript};
pub use tts::{Synthesizer, TextToSpeech, voice_language_code};
pub use wav::{SAMPLE_RATE, WavInfo, samples_to_wav};
