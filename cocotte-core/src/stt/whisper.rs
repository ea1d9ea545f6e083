//! Whisper transcription over the OpenAI audio API.

use async_trait::async_trait;
use reqwest::multipart;
use serde::Deserialize;
use std::path::Path;

use super::{SttError, Transcriber};
use crate::types::Language;

/// Transcriber backed by the OpenAI `audio/transcriptions` endpoint.
pub struct WhisperTranscriber {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl WhisperTranscriber {
    pub fn new(client: reqwest::Client, api_key: String) -> Self {
        Self {
            client,
            api_key,
            model: "whisper-1".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(&self, path: &Path, language: Language) -> Result<String, SttError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio.mp3".to_string());

        let part = multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("audio/mpeg")
            .map_err(|e| SttError::RequestFailed(e.to_string()))?;

        let form = multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone())
            .text("language", language.as_str().to_string());

        let response = self
            .client
            .post("https://api.openai.com/v1/audio/transcriptions")
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| SttError::RequestFailed(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| SttError::RequestFailed(e.to_string()))?;

        if status != 200 {
            return Err(SttError::ApiError {
                status,
                message: text,
            });
        }

        let parsed: TranscriptionResponse =
            serde_json::from_str(&text).map_err(|e| SttError::RequestFailed(e.to_string()))?;
        Ok(parsed.text)
    }
}
