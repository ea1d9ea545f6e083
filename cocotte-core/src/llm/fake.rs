//! Fake LLM provider for tests.

use super::{ChatRequest, LlmError, LlmProvider};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Test provider that replays queued responses in order, falling back to a
/// default response when the queue is empty.
#[derive(Debug, Default)]
pub struct FakeProvider {
    responses: Mutex<VecDeque<String>>,
    default_response: Option<String>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider that always answers with the same text.
    pub fn with_default(response: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            default_response: Some(response.into()),
        }
    }

    /// Queue a one-shot response.
    pub fn push_response(&self, response: impl Into<String>) {
        self.responses
            .lock()
            .expect("fake provider lock poisoned")
            .push_back(response.into());
    }
}

#[async_trait]
impl LlmProvider for FakeProvider {
    async fn complete(&self, _request: &ChatRequest) -> Result<String, LlmError> {
        let queued = self
            .responses
            .lock()
            .expect("fake provider lock poisoned")
            .pop_front();

        queued
            .or_else(|| self.default_response.clone())
            .ok_or_else(|| LlmError::RequestFailed("no fake response queued".to_string()))
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }

    fn model_name(&self) -> &str {
        "fake-model"
    }
}
