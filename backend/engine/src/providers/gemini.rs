use std::time::Instant;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use codecontext_core::{GenerationError, LlmProvider, LlmRequest, LlmResponse};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google Gemini `generateContent` provider.
pub struct GeminiProvider {
    client: Client,
    base_url: String,
}

impl GeminiProvider {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }
}

impl Default for GeminiProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    details: Vec<ErrorDetail>,
}

#[derive(Deserialize)]
struct ErrorDetail {
    reason: Option<String>,
}

/// Map a non-success response to the generation error taxonomy.
fn classify_http_error(status: StatusCode, body: &str) -> GenerationError {
    let parsed = serde_json::from_str::<ErrorEnvelope>(body).ok();
    let message = parsed
        .as_ref()
        .map(|e| e.error.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.trim().chars().take(200).collect());

    let key_rejected = parsed.as_ref().is_some_and(|e| {
        e.error
            .details
            .iter()
            .any(|d| d.reason.as_deref() == Some("API_KEY_INVALID"))
    }) || body.contains("API_KEY_INVALID");

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            GenerationError::InvalidCredential { message }
        }
        StatusCode::BAD_REQUEST if key_rejected => GenerationError::InvalidCredential { message },
        _ => {
            let api_status = parsed.map(|e| e.error.status).unwrap_or_default();
            GenerationError::Unknown {
                message: if api_status.is_empty() {
                    format!("Gemini returned {}: {}", status.as_u16(), message)
                } else {
                    format!("Gemini returned {} {}: {}", status.as_u16(), api_status, message)
                },
            }
        }
    }
}

/// Concatenate the first candidate's text parts, or explain why there are none.
fn extract_reply(response: GenerateContentResponse) -> Result<String, GenerationError> {
    let block_reason = response.prompt_feedback.and_then(|f| f.block_reason);
    let Some(candidate) = response.candidates.into_iter().next() else {
        return Err(GenerationError::Unknown {
            message: match block_reason {
                Some(reason) => format!("prompt blocked: {reason}"),
                None => "model returned no candidates".to_string(),
            },
        });
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        let reason = candidate.finish_reason.unwrap_or_else(|| "UNKNOWN".to_string());
        return Err(GenerationError::Unknown {
            message: format!("model declined to answer (finish reason: {reason})"),
        });
    }

    Ok(text)
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, GenerationError> {
        let start = Instant::now();

        let body = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(request.prompt.clone()),
                }],
            }],
        };

        debug!(
            model = %request.model,
            prompt_chars = request.prompt.chars().count(),
            "Sending request to Gemini"
        );

        let response = self
            .client
            .post(format!("{}/models/{}:generateContent", self.base_url, request.model))
            .query(&[("key", request.api_key.as_str())])
            .json(&body)
            .send()
            .await
            // The request URL carries the key; keep it out of the message.
            .map_err(|e| GenerationError::NetworkFailure {
                message: e.without_url().to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let err = classify_http_error(status, &error_body);
            warn!(status = status.as_u16(), category = err.category(), "Gemini request rejected");
            return Err(err);
        }

        let parsed: GenerateContentResponse =
            response.json().await.map_err(|e| GenerationError::Unknown {
                message: format!("failed to parse Gemini response: {}", e.without_url()),
            })?;

        let content = extract_reply(parsed)?;

        Ok(LlmResponse {
            content,
            provider: "gemini".to_string(),
            model: request.model.clone(),
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}
