use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use codecontext_core::{GenerationError, LlmProvider, LlmRequest, LlmResponse};

/// A mock LLM provider that replays scripted outcomes and records requests.
pub struct MockProvider {
    name: String,
    script: Mutex<VecDeque<Result<String, GenerationError>>>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl MockProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful reply.
    pub fn with_response(self, response: impl Into<String>) -> Self {
        self.push(Ok(response.into()));
        self
    }

    /// Queue a failure.
    pub fn with_error(self, error: GenerationError) -> Self {
        self.push(Err(error));
        self
    }

    fn push(&self, outcome: Result<String, GenerationError>) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(outcome);
        }
    }

    /// Number of `complete` calls so far.
    pub fn calls(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// Prompts received, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|r| r.iter().map(|req| req.prompt.clone()).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, req: &LlmRequest) -> Result<LlmResponse, GenerationError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(req.clone());
        }
        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        let content = match next {
            Some(outcome) => outcome?,
            None => "Mock response".to_string(),
        };
        Ok(LlmResponse {
            content,
            provider: self.name.clone(),
            model: req.model.clone(),
            latency_ms: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(prompt: &str) -> LlmRequest {
        LlmRequest {
            model: "mock".into(),
            prompt: prompt.into(),
            api_key: "k".into(),
        }
    }

    #[tokio::test]
    async fn replays_script_then_default() {
        let mock = MockProvider::new("mock")
            .with_response("first")
            .with_error(GenerationError::NetworkFailure { message: "down".into() });

        assert_eq!(mock.complete(&request("a")).await.unwrap().content, "first");
        assert!(mock.complete(&request("b")).await.is_err());
        assert_eq!(mock.complete(&request("c")).await.unwrap().content, "Mock response");
        assert_eq!(mock.prompts(), vec!["a", "b", "c"]);
        assert_eq!(mock.calls(), 3);
    }
}
