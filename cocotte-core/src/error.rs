use thiserror::Error;

use crate::llm::LlmError;
use crate::stt::SttError;

/// Errors from the audio downloader subprocess.
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("downloader binary not found in PATH")]
    BinaryNotFound,

    #[error("downloader exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("downloader produced no output file")]
    NoOutput,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the analysis and generation pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("no platform handler matches url: {0}")]
    UnsupportedPlatform(String),

    /// The LLM determined the content is not culinary. Carries the
    /// localized, user-visible message.
    #[error("{message}")]
    NotRecipe { message: String },

    #[error("audio extraction failed: {0}")]
    Download(#[from] DownloadError),

    #[error("transcription failed: {0}")]
    Transcription(#[from] SttError),

    #[error("LLM request failed: {0}")]
    Llm(#[from] LlmError),

    #[error("invalid recipe payload: {0}")]
    InvalidPayload(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
