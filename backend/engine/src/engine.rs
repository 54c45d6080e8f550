use std::sync::Arc;

use tracing::{debug, info, warn};

use codecontext_core::{GenerationError, LlmProvider, LlmRequest};

use crate::prompt::{build_prompt, ContextBudget};
use crate::transcript::Transcript;

/// Output of one successful conversation turn.
#[derive(Debug, Clone)]
pub struct TurnReply {
    pub reply: String,
    pub transcript: Transcript,
    pub provider: String,
    pub latency_ms: u64,
}

/// Builds the composite prompt and asks the provider for one reply.
#[derive(Clone)]
pub struct ConversationEngine {
    provider: Arc<dyn LlmProvider>,
    model: String,
    budget: ContextBudget,
}

impl ConversationEngine {
    pub fn new(provider: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            budget: ContextBudget::unbounded(),
        }
    }

    pub fn with_budget(mut self, budget: ContextBudget) -> Self {
        self.budget = budget;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run one turn. On failure nothing is appended; the caller keeps its
    /// transcript as it was.
    pub async fn turn(
        &self,
        source: &str,
        transcript: &Transcript,
        prompt: &str,
        api_key: &str,
    ) -> Result<TurnReply, GenerationError> {
        if api_key.trim().is_empty() {
            return Err(GenerationError::InvalidCredential {
                message: "no API key configured".to_string(),
            });
        }

        let request = LlmRequest {
            model: self.model.clone(),
            prompt: build_prompt(source, transcript.as_str(), prompt, &self.budget),
            api_key: api_key.to_string(),
        };

        debug!(
            provider = self.provider.name(),
            model = %self.model,
            prompt_chars = request.prompt.chars().count(),
            budgeted = !self.budget.is_unbounded(),
            "Requesting reply"
        );

        let response = self.provider.complete(&request).await.map_err(|e| {
            warn!(provider = self.provider.name(), error = %e, "Generation failed");
            e
        })?;

        info!(
            provider = %response.provider,
            latency_ms = response.latency_ms,
            reply_chars = response.content.chars().count(),
            "Reply generated"
        );

        Ok(TurnReply {
            transcript: transcript.appended(&response.content),
            reply: response.content,
            provider: response.provider,
            latency_ms: response.latency_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MockProvider;

    #[tokio::test]
    async fn appends_reply_with_newline() {
        let mock = Arc::new(MockProvider::new("mock").with_response("reply1"));
        let engine = ConversationEngine::new(mock.clone(), "gemini-pro");

        let old = Transcript::new().appended("reply0");
        let out = engine.turn("code", &old, "explain", "key").await.unwrap();

        assert_eq!(out.reply, "reply1");
        assert_eq!(out.transcript.as_str(), format!("{}\n{}", old.as_str(), out.reply));
        assert_eq!(old.as_str(), "\nreply0");
    }

    #[tokio::test]
    async fn prompt_carries_source_history_and_question() {
        let mock = Arc::new(MockProvider::new("mock"));
        let engine = ConversationEngine::new(mock.clone(), "gemini-pro");

        let history = Transcript::new().appended("earlier answer");
        engine.turn("fn main() {}", &history, "now optimize it", "key").await.unwrap();

        let prompt = &mock.prompts()[0];
        assert!(prompt.contains("code context: fn main() {}."));
        assert!(prompt.contains("Previous conversation: \nearlier answer."));
        assert!(prompt.ends_with("User's prompt: now optimize it"));
    }

    #[tokio::test]
    async fn empty_key_fails_without_calling_provider() {
        let mock = Arc::new(MockProvider::new("mock"));
        let engine = ConversationEngine::new(mock.clone(), "gemini-pro");

        let err = engine.turn("code", &Transcript::new(), "q", "  ").await.unwrap_err();
        assert!(matches!(err, GenerationError::InvalidCredential { .. }));
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn budget_shapes_prompt_only() {
        let mock = Arc::new(MockProvider::new("mock").with_response("r"));
        let engine = ConversationEngine::new(mock.clone(), "gemini-pro").with_budget(ContextBudget {
            max_transcript_chars: Some(3),
            max_source_chars: Some(2),
        });

        let history = Transcript::new().appended("long history");
        let out = engine.turn("abcdef", &history, "q", "key").await.unwrap();

        let prompt = &mock.prompts()[0];
        assert!(prompt.contains("code context: ab\n[...]."));
        assert!(prompt.contains("Previous conversation: [...]\nory."));
        assert_eq!(out.transcript.as_str(), "\nlong history\nr");
    }

    #[tokio::test]
    async fn provider_error_passes_through() {
        let mock = Arc::new(
            MockProvider::new("mock").with_error(GenerationError::Unknown { message: "boom".into() }),
        );
        let engine = ConversationEngine::new(mock, "gemini-pro");
        let err = engine.turn("code", &Transcript::new(), "q", "key").await.unwrap_err();
        assert_eq!(err, GenerationError::Unknown { message: "boom".into() });
    }
}
