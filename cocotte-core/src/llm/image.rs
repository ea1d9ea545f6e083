//! Image generation providers for the preference-based generation flow.

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::LlmError;

/// Result of an image generation call: either a remote URL to download, or
/// the decoded image bytes when the provider answers inline.
#[derive(Debug, Clone)]
pub enum GeneratedImage {
    Url(String),
    Bytes(Vec<u8>),
}

/// Trait for image providers. One square 1024x1024 dish image per call.
#[async_trait]
pub trait ImageProvider: Send + Sync + fmt::Debug {
    async fn generate(&self, prompt: &str) -> Result<GeneratedImage, LlmError>;

    fn provider_name(&self) -> &'static str;
}

/// Build the image provider selected by `IMAGE_PROVIDER` / `IMAGE_MODEL`.
pub fn create_image_provider_from_env(
    client: reqwest::Client,
) -> Result<Arc<dyn ImageProvider>, LlmError> {
    let provider = std::env::var("IMAGE_PROVIDER").unwrap_or_else(|_| "openai".to_string());

    match provider.as_str() {
        "openai" => {
            let api_key = std::env::var("OPENAI_API_KEY")
                .map_err(|_| LlmError::NotConfigured("OPENAI_API_KEY not set".to_string()))?;
            let model = std::env::var("IMAGE_MODEL").unwrap_or_else(|_| "dall-e-3".to_string());
            Ok(Arc::new(OpenAiImageProvider::new(client, api_key, model)))
        }
        "gemini" => {
            let api_key = std::env::var("GEMINI_API_KEY")
                .map_err(|_| LlmError::NotConfigured("GEMINI_API_KEY not set".to_string()))?;
            let model = std::env::var("IMAGE_MODEL")
                .unwrap_or_else(|_| "gemini-2.0-flash-preview-image-generation".to_string());
            Ok(Arc::new(GeminiImageProvider::new(client, api_key, model)))
        }
        other => Err(LlmError::NotConfigured(format!(
            "Unknown image provider: {}",
            other
        ))),
    }
}

/// Decode a `data:image/...;base64,...` payload into raw bytes.
pub fn decode_data_url(data_url: &str) -> Result<Vec<u8>, LlmError> {
    let encoded = data_url
        .split_once("base64,")
        .map(|(_, rest)| rest)
        .ok_or_else(|| LlmError::ParseError("not a base64 data URL".to_string()))?;
    general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| LlmError::ParseError(format!("invalid base64 image: {}", e)))
}

/// OpenAI images API provider.
#[derive(Debug)]
pub struct OpenAiImageProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiImageProvider {
    pub fn new(client: reqwest::Client, api_key: String, model: String) -> Self {
        Self {
            client,
            api_key,
            model,
        }
    }
}

#[derive(Debug, Serialize)]
struct OpenAiImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u8,
    size: &'static str,
    response_format: &'static str,
}

#[derive(Debug, Deserialize)]
struct OpenAiImageResponse {
    data: Vec<OpenAiImageData>,
}

#[derive(Debug, Deserialize)]
struct OpenAiImageData {
    b64_json: Option<String>,
    url: Option<String>,
}

#[async_trait]
impl ImageProvider for OpenAiImageProvider {
    async fn generate(&self, prompt: &str) -> Result<GeneratedImage, LlmError> {
        let body = OpenAiImageRequest {
            model: &self.model,
            prompt,
            n: 1,
            size: "1024x1024",
            response_format: "b64_json",
        };

        let response = self
            .client
            .post("https://api.openai.com/v1/images/generations")
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        if status != 200 {
            return Err(LlmError::ApiError {
                status,
                message: text,
            });
        }

        let parsed: OpenAiImageResponse =
            serde_json::from_str(&text).map_err(|e| LlmError::ParseError(e.to_string()))?;

        let first = parsed
            .data
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::ParseError("empty image response".to_string()))?;

        if let Some(b64) = first.b64_json {
            let bytes = general_purpose::STANDARD
                .decode(b64.as_bytes())
                .map_err(|e| LlmError::ParseError(format!("invalid base64 image: {}", e)))?;
            return Ok(GeneratedImage::Bytes(bytes));
        }
        if let Some(url) = first.url {
            return Ok(GeneratedImage::Url(url));
        }
        Err(LlmError::ParseError(
            "image response carries neither b64 nor url".to_string(),
        ))
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

/// Gemini image provider. The model answers with inline base64 data.
#[derive(Debug)]
pub struct GeminiImageProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiImageProvider {
    pub fn new(client: reqwest::Client, api_key: String, model: String) -> Self {
        Self {
            client,
            api_key,
            model,
        }
    }
}

#[derive(Debug, Serialize)]
struct GeminiImageRequest<'a> {
    contents: Vec<GeminiImageContent<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiImageConfig,
}

#[derive(Debug, Serialize)]
struct GeminiImageContent<'a> {
    parts: Vec<GeminiImageTextPart<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiImageTextPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GeminiImageConfig {
    #[serde(rename = "responseModalities")]
    response_modalities: Vec<&'static str>,
}

#[derive(Debug, Deserialize)]
struct GeminiImageResponse {
    candidates: Vec<GeminiImageCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiImageCandidate {
    content: GeminiImageResponseContent,
}

#[derive(Debug, Deserialize)]
struct GeminiImageResponseContent {
    parts: Vec<GeminiImageResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiImageResponsePart {
    #[serde(rename = "inlineData")]
    inline_data: Option<GeminiInlineData>,
}

#[derive(Debug, Deserialize)]
struct GeminiInlineData {
    data: String,
}

#[async_trait]
impl ImageProvider for GeminiImageProvider {
    async fn generate(&self, prompt: &str) -> Result<GeneratedImage, LlmError> {
        let body = GeminiImageRequest {
            contents: vec![GeminiImageContent {
                parts: vec![GeminiImageTextPart { text: prompt }],
            }],
            generation_config: GeminiImageConfig {
                response_modalities: vec!["TEXT", "IMAGE"],
            },
        };

        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.model, self.api_key
        );

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        if status != 200 {
            return Err(LlmError::ApiError {
                status,
                message: text,
            });
        }

        let parsed: GeminiImageResponse =
            serde_json::from_str(&text).map_err(|e| LlmError::ParseError(e.to_string()))?;

        let data = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().find_map(|p| p.inline_data))
            .ok_or_else(|| LlmError::ParseError("no inline image in response".to_string()))?;

        let bytes = general_purpose::STANDARD
            .decode(data.data.as_bytes())
            .map_err(|e| LlmError::ParseError(format!("invalid base64 image: {}", e)))?;
        Ok(GeneratedImage::Bytes(bytes))
    }

    fn provider_name(&self) -> &'static str {
        "gemini"
    }
}

/// Fake image provider for tests.
#[derive(Debug, Default)]
pub struct FakeImageProvider {
    bytes: Vec<u8>,
}

impl FakeImageProvider {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

#[async_trait]
impl ImageProvider for FakeImageProvider {
    async fn generate(&self, _prompt: &str) -> Result<GeneratedImage, LlmError> {
        Ok(GeneratedImage::Bytes(self.bytes.clone()))
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_data_url() {
        let bytes = decode_data_url("data:image/png;base64,aGVsbG8=").unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn test_decode_data_url_rejects_plain_text() {
        assert!(decode_data_url("https://example.com/img.png").is_err());
    }
}
