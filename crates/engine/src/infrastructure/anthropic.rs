//! Anthropic Messages API client.
//!
//! The Messages API has no structured-output parameter, so the response
//! schema hint is appended to the system prompt.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::infrastructure::ports::{
    FinishReason, LlmError, LlmPort, LlmRequest, LlmResponse, MessageRole, TokenUsage,
};

pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-haiku-latest";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// The API requires `max_tokens`; used when the request leaves it unset.
const DEFAULT_MAX_TOKENS: u32 = 2048;

#[derive(Clone)]
pub struct AnthropicClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl AnthropicClient {
    pub fn new(api_key: &str, model: &str, timeout_secs: u64) -> Self {
        Self::with_base_url(DEFAULT_ANTHROPIC_BASE_URL, api_key, model, timeout_secs)
    }

    pub fn with_base_url(base_url: &str, api_key: &str, model: &str, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }

    pub fn provider_id(&self) -> String {
        format!("anthropic/{}", self.model)
    }
}

#[async_trait]
impl LlmPort for AnthropicClient {
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse, LlmError> {
        let api_request = build_request(&self.model, &request);

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&api_request)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .map_err(|e| LlmError::RequestFailed(e.to_string()))?;
            return Err(LlmError::from_status(status.as_u16(), error_text));
        }

        let api_response: MessagesResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        convert_response(api_response, self.provider_id())
    }
}

fn build_request(model: &str, request: &LlmRequest) -> MessagesRequest {
    let schema_hint = request.response_schema.as_ref().map(|schema| {
        format!("Respond with a single JSON object matching this JSON schema, and nothing else:\n{schema}")
    });
    let system = match (request.system_prompt.clone(), schema_hint) {
        (Some(prompt), Some(hint)) => Some(format!("{prompt}\n\n{hint}")),
        (prompt, hint) => prompt.or(hint),
    };

    MessagesRequest {
        model: model.to_string(),
        system,
        max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        temperature: request.temperature,
        messages: request
            .messages
            .iter()
            .map(|msg| MessagesMessage {
                role: match msg.role {
                    MessageRole::User => "user",
                    MessageRole::Assistant => "assistant",
                }
                .to_string(),
                content: msg.content.clone(),
            })
            .collect(),
    }
}

fn convert_response(response: MessagesResponse, provider_id: String) -> Result<LlmResponse, LlmError> {
    let content = response
        .content
        .into_iter()
        .filter(|block| block.r#type == "text")
        .filter_map(|block| block.text)
        .collect::<Vec<_>>()
        .join("");
    if content.is_empty() {
        return Err(LlmError::InvalidResponse("No text content in response".to_string()));
    }

    let finish_reason = match response.stop_reason.as_deref() {
        Some("end_turn") | Some("stop_sequence") | None => FinishReason::Stop,
        Some("max_tokens") => FinishReason::Length,
        Some(_) => FinishReason::Unknown,
    };

    Ok(LlmResponse {
        content,
        finish_reason,
        usage: response.usage.map(|u| TokenUsage {
            prompt_tokens: u.input_tokens,
            completion_tokens: u.output_tokens,
            total_tokens: u.input_tokens.saturating_add(u.output_tokens),
        }),
        provider_id,
    })
}

// =============================================================================
// Messages API types
// =============================================================================

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    messages: Vec<MessagesMessage>,
}

#[derive(Debug, Serialize)]
struct MessagesMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
    usage: Option<MessagesUsage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    r#type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessagesUsage {
    input_tokens: u32,
    output_tokens: u32,
}
