//! LLM provider abstraction for recipe extraction and generation.
//!
//! This module provides a trait-based abstraction over different LLM
//! providers (OpenAI, Gemini) with a fake implementation for testing.

mod fake;
mod gemini;
pub mod image;
mod openai;

pub use fake::FakeProvider;
pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Error type for LLM operations.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("API request failed: {0}")]
    RequestFailed(String),

    #[error("API returned error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

/// A single-turn completion request.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Ask the provider for a JSON object response where supported.
    pub json_response: bool,
}

impl ChatRequest {
    pub fn json(prompt: String, temperature: f32) -> Self {
        Self {
            prompt,
            temperature,
            max_tokens: 4096,
            json_response: true,
        }
    }
}

/// Trait for LLM providers.
///
/// Implementations should be stateless and thread-safe. The provider is
/// responsible for making API calls and returning the model's text response.
#[async_trait]
pub trait LlmProvider: Send + Sync + fmt::Debug {
    /// Send a prompt to the LLM and get a text response.
    async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError>;

    /// Get the provider name (e.g., "openai", "gemini", "fake").
    fn provider_name(&self) -> &'static str;

    /// Get the model name (e.g., "gpt-4o-mini").
    fn model_name(&self) -> &str;
}

/// Build the text provider selected by `AI_PROVIDER` / `AI_MODEL`.
pub fn create_provider_from_env(client: reqwest::Client) -> Result<Arc<dyn LlmProvider>, LlmError> {
    let provider = std::env::var("AI_PROVIDER").unwrap_or_else(|_| "openai".to_string());

    match provider.as_str() {
        "openai" => {
            let api_key = std::env::var("OPENAI_API_KEY")
                .map_err(|_| LlmError::NotConfigured("OPENAI_API_KEY not set".to_string()))?;
            let model =
                std::env::var("AI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
            Ok(Arc::new(OpenAiProvider::new(client, api_key, model)))
        }
        "gemini" => {
            let api_key = std::env::var("GEMINI_API_KEY")
                .map_err(|_| LlmError::NotConfigured("GEMINI_API_KEY not set".to_string()))?;
            let model =
                std::env::var("AI_MODEL").unwrap_or_else(|_| "gemini-1.5-flash".to_string());
            Ok(Arc::new(GeminiProvider::new(client, api_key, model)))
        }
        other => Err(LlmError::NotConfigured(format!(
            "Unknown provider: {}",
            other
        ))),
    }
}
