use std::fmt;

use async_trait::async_trait;

use crate::error::{FetchError, GenerationError};

/// Trait for hosted text-generation backends.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g., "gemini", "mock").
    fn name(&self) -> &str;

    /// Send a single-shot generation request and return the reply text.
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, GenerationError>;
}

/// Trait for reading a remote file through the cross-origin relay.
#[async_trait]
pub trait SourceRelay: Send + Sync {
    /// Fetch the raw body addressed by `url`.
    async fn fetch_raw(&self, url: &str) -> Result<String, FetchError>;
}

/// Request to an LLM provider.
#[derive(Clone)]
pub struct LlmRequest {
    pub model: String,
    pub prompt: String,
    pub api_key: String,
}

impl fmt::Debug for LlmRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmRequest")
            .field("model", &self.model)
            .field("prompt_chars", &self.prompt.chars().count())
            .field("api_key", &"***")
            .finish()
    }
}

/// Response from an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
    pub provider: String,
    pub model: String,
    pub latency_ms: u64,
}
