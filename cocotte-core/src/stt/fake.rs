//! Fake transcriber for tests.

use async_trait::async_trait;
use std::path::Path;

use super::{SttError, Transcriber};
use crate::types::Language;

/// Test transcriber returning a fixed transcript.
#[derive(Debug, Default)]
pub struct FakeTranscriber {
    transcript: String,
}

impl FakeTranscriber {
    pub fn new(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
        }
    }
}

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(&self, path: &Path, _language: Language) -> Result<String, SttError> {
        // Still touch the file so pipeline tests exercise the audio lifecycle.
        tokio::fs::metadata(path).await?;
        Ok(self.transcript.clone())
    }
}
