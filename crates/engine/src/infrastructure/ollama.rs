//! Ollama LLM client (OpenAI-compatible API)
//!
//! Works against any server exposing `/v1/chat/completions`. The response
//! schema hint is sent as `response_format: json_schema`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::infrastructure::ports::{
    FinishReason, LlmError, LlmPort, LlmRequest, LlmResponse, MessageRole, TokenUsage,
};

/// Client for Ollama's OpenAI-compatible API
#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
}

/// Default Ollama base URL.
pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";

/// Default model for Ollama.
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.2";

/// Default request timeout; local models can be slow.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

impl OllamaClient {
    pub fn new(base_url: &str, model: &str) -> Self {
        Self::with_timeout(base_url, model, DEFAULT_TIMEOUT_SECS)
    }

    pub fn with_timeout(base_url: &str, model: &str, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    /// `family/model`, as stored with saved games.
    pub fn provider_id(&self) -> String {
        format!("openai_compatible/{}", self.model)
    }
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new(DEFAULT_OLLAMA_BASE_URL, DEFAULT_OLLAMA_MODEL)
    }
}

#[async_trait]
impl LlmPort for OllamaClient {
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse, LlmError> {
        let api_request = build_request(&self.model, &request);

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
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

        let api_response: OpenAIChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        convert_response(api_response, self.provider_id())
    }
}

fn build_request(model: &str, request: &LlmRequest) -> OpenAIChatRequest {
    OpenAIChatRequest {
        model: model.to_string(),
        messages: build_messages(request),
        temperature: request.temperature,
        max_tokens: request.max_tokens,
        response_format: request
            .response_schema
            .clone()
            .map(|schema| OpenAIResponseFormat {
                r#type: "json_schema".to_string(),
                json_schema: OpenAIJsonSchema {
                    name: "turn_result".to_string(),
                    schema,
                },
            }),
    }
}

fn build_messages(request: &LlmRequest) -> Vec<OpenAIMessage> {
    let mut messages = Vec::new();

    if let Some(system) = &request.system_prompt {
        messages.push(OpenAIMessage {
            role: "system".to_string(),
            content: Some(system.clone()),
        });
    }

    for msg in &request.messages {
        messages.push(OpenAIMessage {
            role: match msg.role {
                MessageRole::User => "user",
                MessageRole::Assistant => "assistant",
            }
            .to_string(),
            content: Some(msg.content.clone()),
        });
    }

    messages
}

fn convert_response(
    response: OpenAIChatResponse,
    provider_id: String,
) -> Result<LlmResponse, LlmError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::InvalidResponse("No choices in LLM response".to_string()))?;

    let finish_reason = match choice.finish_reason.as_deref() {
        Some("stop") | None => FinishReason::Stop,
        Some("length") => FinishReason::Length,
        Some("content_filter") => FinishReason::ContentFilter,
        Some(_) => FinishReason::Unknown,
    };

    Ok(LlmResponse {
        content: choice.message.content.unwrap_or_default(),
        finish_reason,
        usage: response.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        }),
        provider_id,
    })
}

// =============================================================================
// OpenAI API types
// =============================================================================

#[derive(Debug, Serialize)]
struct OpenAIChatRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<OpenAIResponseFormat>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct OpenAIResponseFormat {
    r#type: String,
    json_schema: OpenAIJsonSchema,
}

#[derive(Debug, Serialize)]
struct OpenAIJsonSchema {
    name: String,
    schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct OpenAIChatResponse {
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize, Default)]
struct OpenAIChoice {
    message: OpenAIMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ports::PromptMessage;

    #[test]
    fn schema_hint_becomes_response_format() {
        let request = LlmRequest::new(vec![PromptMessage::user("Advance the turn")])
            .with_system_prompt("You narrate world events")
            .with_response_schema(serde_json::json!({"type": "object"}));

        let body = serde_json::to_value(build_request("llama3.2", &request))
            .expect("request serializes");

        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "Advance the turn");
        assert_eq!(body["response_format"]["type"], "json_schema");
        assert_eq!(body["response_format"]["json_schema"]["schema"]["type"], "object");
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn response_without_choices_is_invalid() {
        let response: OpenAIChatResponse =
            serde_json::from_str(r#"{"choices": [], "usage": null}"#).expect("parses");
        assert!(matches!(
            convert_response(response, "openai_compatible/test".into()),
            Err(LlmError::InvalidResponse(_))
        ));
    }

    #[test]
    fn first_choice_content_is_returned() {
        let response: OpenAIChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"{\"events\":[]}"},"finish_reason":"length"}],
                "usage":{"prompt_tokens":10,"completion_tokens":5,"total_tokens":15}}"#,
        )
        .expect("parses");

        let converted =
            convert_response(response, "openai_compatible/test".into()).expect("has a choice");
        assert_eq!(converted.content, r#"{"events":[]}"#);
        assert_eq!(converted.finish_reason, FinishReason::Length);
        assert_eq!(converted.usage.map(|u| u.total_tokens), Some(15));
        assert_eq!(converted.provider_id, "openai_compatible/test");
    }

    #[test]
    fn provider_id_names_the_backend_family_and_model() {
        let client = OllamaClient::new(DEFAULT_OLLAMA_BASE_URL, "qwen2.5:14b");
        assert_eq!(client.provider_id(), "openai_compatible/qwen2.5:14b");
    }
}
