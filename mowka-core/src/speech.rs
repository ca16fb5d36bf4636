//! Speech interfaces: text-to-speech and speech-to-text seams.
//!
//! The vendor integrations live outside this crate. The dialogue service
//! only needs these capabilities, and degrades gracefully when they fail:
//! synthesis failure turns an audio turn into a text-only turn, and an
//! inaudible transcription is surfaced as a retryable condition.

use async_trait::async_trait;
use thiserror::Error;

/// Errors from speech synthesis.
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("synthesis backend error: {0}")]
    Backend(String),

    #[error("unknown voice: {0}")]
    UnknownVoice(String),
}

/// Errors from speech transcription.
#[derive(Debug, Error)]
pub enum TranscriptionError {
    #[error("transcription backend error: {0}")]
    Backend(String),

    #[error("audio was inaudible or too short")]
    Inaudible,
}

/// Turns NPC reply text into audio in the NPC's voice.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// `expression` is an optional voice-tone hint (e.g. "sadly").
    async fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
        expression: Option<&str>,
    ) -> Result<Vec<u8>, SynthesisError>;
}

/// Turns player audio into text.
#[async_trait]
pub trait SpeechTranscriber: Send + Sync {
    /// Implementations must map an empty or blank transcript to
    /// [`TranscriptionError::Inaudible`] rather than returning it.
    async fn transcribe(&self, audio: &[u8]) -> Result<String, TranscriptionError>;
}
