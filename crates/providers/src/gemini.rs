//! Native Google Gemini provider (`generateContent`).
//!
//! Authenticates with the `x-goog-api-key` header. System messages become
//! `systemInstruction`; every other message is sent as a `user` turn.
//!
//! Gemini reports some failures inside a `200` body rather than through the
//! status code: a blocked prompt (`promptFeedback.blockReason`) or a
//! candidate stopped for safety (`finishReason`). Both surface as
//! [`CompletionError::Blocked`].

use std::time::Duration;

use async_trait::async_trait;
use docchat_core::error::CompletionError;
use docchat_core::message::Role;
use docchat_core::provider::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::http::{self, DEFAULT_TIMEOUT};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Finish reasons that mean the candidate text was withheld.
const BLOCKING_FINISH_REASONS: &[&str] = &[
    "SAFETY",
    "RECITATION",
    "BLOCKLIST",
    "PROHIBITED_CONTENT",
    "SPII",
];

pub struct GeminiProvider {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("base_url", &self.base_url)
            .field("api_key", &"***")
            .finish()
    }
}

impl GeminiProvider {
    pub fn new(api_key: impl Into<String>) -> Result<Self, CompletionError> {
        Self::with_options(DEFAULT_BASE_URL, api_key, DEFAULT_TIMEOUT)
    }

    pub fn with_options(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, CompletionError> {
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client: http::build_client(timeout)?,
        })
    }

    fn to_api_request(request: &CompletionRequest) -> GenerateContentRequest {
        let system: Vec<&str> = request
            .messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect();

        let contents = request
            .messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| Content {
                role: Some(
                    match m.role {
                        Role::Assistant => "model",
                        _ => "user",
                    }
                    .into(),
                ),
                parts: vec![Part {
                    text: Some(m.content.clone()),
                }],
            })
            .collect();

        GenerateContentRequest {
            contents,
            system_instruction: (!system.is_empty()).then(|| Content {
                role: None,
                parts: vec![Part {
                    text: Some(system.join("\n\n")),
                }],
            }),
            generation_config: GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            },
        }
    }

    fn from_api_response(
        response: GenerateContentResponse,
        requested_model: &str,
    ) -> Result<Completion, CompletionError> {
        if let Some(reason) = response
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_ref())
        {
            return Err(CompletionError::Blocked {
                reason: format!("prompt blocked ({reason})"),
            });
        }

        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or(CompletionError::EmptyResponse)?;

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            if let Some(reason) = candidate
                .finish_reason
                .as_deref()
                .filter(|r| BLOCKING_FINISH_REASONS.contains(r))
            {
                return Err(CompletionError::Blocked {
                    reason: format!("response stopped ({reason})"),
                });
            }
            return Err(CompletionError::EmptyResponse);
        }

        let usage = response.usage_metadata.map(|u| Usage {
            prompt_tokens: u.prompt_token_count,
            completion_tokens: u.candidates_token_count,
            total_tokens: u.total_token_count,
        });

        Ok(Completion {
            text,
            usage,
            model: response
                .model_version
                .unwrap_or_else(|| requested_model.to_string()),
        })
    }
}

/// Gemini puts an invalid key behind a 400, not a 401.
fn gemini_status_error(model: &str, status: u16, body: &str) -> CompletionError {
    if let Ok(err) = serde_json::from_str::<ApiErrorBody>(body) {
        let message = err.error.message;
        if status == 400 && message.contains("API key") {
            return CompletionError::AuthenticationFailed(message);
        }
        return http::status_error("gemini", model, status, &message);
    }
    http::status_error("gemini", model, status, body)
}

#[async_trait]
impl CompletionClient for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Completion, CompletionError> {
        let model = request.model.trim_start_matches("models/").to_string();
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, model);
        let body = Self::to_api_request(&request);

        debug!(provider = "gemini", model = %model, "Sending completion request");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(http::send_error)?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(gemini_status_error(&model, status, &error_body));
        }

        let api_response: GenerateContentResponse =
            response.json().await.map_err(|e| CompletionError::ApiError {
                status_code: status,
                message: format!("Failed to parse response: {e}"),
            })?;

        Self::from_api_response(api_response, &model)
    }

    async fn list_models(&self) -> Result<Vec<String>, CompletionError> {
        let url = format!("{}/v1beta/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
            .map_err(http::send_error)?;

        if !response.status().is_success() {
            return Ok(Vec::new());
        }

        let body: ModelList = response
            .json()
            .await
            .map_err(|e| CompletionError::Network(e.to_string()))?;

        Ok(body
            .models
            .into_iter()
            .map(|m| m.name.trim_start_matches("models/").to_string())
            .collect())
    }

    async fn health_check(&self) -> Result<bool, CompletionError> {
        let url = format!("{}/v1beta/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
            .map_err(http::send_error)?;

        Ok(response.status().is_success())
    }
}

// --- Gemini API types (internal) ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

#[derive(Debug, Deserialize)]
struct ModelInfo {
    name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<Completion, CompletionError> {
        let resp: GenerateContentResponse = serde_json::from_str(json).unwrap();
        GeminiProvider::from_api_response(resp, "gemini-2.0-flash")
    }

    #[test]
    fn constructor_trims_base_url() {
        let provider =
            GeminiProvider::with_options("http://localhost:1234/", "k", DEFAULT_TIMEOUT).unwrap();
        assert_eq!(provider.name(), "gemini");
        assert_eq!(provider.base_url, "http://localhost:1234");
        assert!(!format!("{provider:?}").contains("\"k\""));
    }

    #[test]
    fn request_body_shape() {
        let request = CompletionRequest::for_prompt("gemini-2.0-flash", "Summarize", Some("Be brief."))
            .with_temperature(0.3)
            .with_max_tokens(Some(256));
        let body = serde_json::to_value(GeminiProvider::to_api_request(&request)).unwrap();

        assert_eq!(body["contents"].as_array().unwrap().len(), 1);
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "Summarize");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "Be brief.");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 256);
        assert!(body["generationConfig"]["temperature"].as_f64().unwrap() > 0.29);
    }

    #[test]
    fn request_without_system_omits_instruction() {
        let request = CompletionRequest::for_prompt("m", "hi", None);
        let body = serde_json::to_value(GeminiProvider::to_api_request(&request)).unwrap();
        assert!(body.get("systemInstruction").is_none());
        assert!(body["generationConfig"].get("maxOutputTokens").is_none());
    }

    #[test]
    fn parses_text_and_usage() {
        let completion = parse(
            r#"{
                "candidates": [{
                    "content": {"role": "model", "parts": [{"text": "Hello, "}, {"text": "world"}]},
                    "finishReason": "STOP"
                }],
                "usageMetadata": {"promptTokenCount": 4, "candidatesTokenCount": 2, "totalTokenCount": 6},
                "modelVersion": "gemini-2.0-flash-001"
            }"#,
        )
        .unwrap();
        assert_eq!(completion.text, "Hello, world");
        assert_eq!(completion.model, "gemini-2.0-flash-001");
        assert_eq!(completion.usage.unwrap().total_tokens, 6);
    }

    #[test]
    fn blocked_prompt_is_reported() {
        let err = parse(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#).unwrap_err();
        assert!(matches!(err, CompletionError::Blocked { reason } if reason.contains("SAFETY")));
    }

    #[test]
    fn safety_stop_without_text_is_blocked() {
        let err = parse(r#"{"candidates": [{"finishReason": "SAFETY"}]}"#).unwrap_err();
        assert!(matches!(err, CompletionError::Blocked { .. }));
    }

    #[test]
    fn no_candidates_is_empty_response() {
        let err = parse(r#"{"candidates": []}"#).unwrap_err();
        assert!(matches!(err, CompletionError::EmptyResponse));
    }

    #[test]
    fn invalid_key_maps_to_auth_failure() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid. Please pass a valid API key.", "status": "INVALID_ARGUMENT"}}"#;
        let err = gemini_status_error("m", 400, body);
        assert!(matches!(err, CompletionError::AuthenticationFailed(_)));

        let err = gemini_status_error("m", 500, r#"{"error": {"message": "internal"}}"#);
        assert!(matches!(
            err,
            CompletionError::ApiError { status_code: 500, message } if message == "internal"
        ));
    }
}
