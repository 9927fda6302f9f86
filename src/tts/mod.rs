//! Text-to-speech for section narration.
//!
//! * [`SpeechSynthesizer`]: async trait: text + voice in, MPEG bytes out.
//! * [`ElevenLabsClient`]: REST backend; streams the reply and buffers it.
//! * [`voice_for_language`]: language → [`VoiceConfig`] lookup with a fixed
//!   default for unknown languages.
//! * [`TtsError`]: error variants for synthesis.

pub mod client;
pub mod voices;

pub use client::{ElevenLabsClient, SpeechSynthesizer, TtsError};
pub use voices::{voice_for_language, VoiceConfig, DEFAULT_VOICE, LANGUAGE_VOICES};

#[cfg(test)]
pub use client::MockSynthesizer;
