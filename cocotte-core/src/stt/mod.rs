//! Speech-to-text abstraction over the transcription provider.

mod fake;
mod whisper;

pub use fake::FakeTranscriber;
pub use whisper::WhisperTranscriber;

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

use crate::types::Language;

/// Error type for transcription.
#[derive(Debug, Error)]
pub enum SttError {
    #[error("transcription request failed: {0}")]
    RequestFailed(String),

    #[error("transcription API returned error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for transcription providers.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe the audio file at `path` in the given language.
    async fn transcribe(&self, path: &Path, language: Language) -> Result<String, SttError>;
}
