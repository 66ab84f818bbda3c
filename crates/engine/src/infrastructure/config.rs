//! Application configuration

use std::env;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use statecraft_domain::GameId;

use crate::infrastructure::anthropic::{AnthropicClient, DEFAULT_ANTHROPIC_MODEL};
use crate::infrastructure::ollama::{
    OllamaClient, DEFAULT_OLLAMA_BASE_URL, DEFAULT_OLLAMA_MODEL, DEFAULT_TIMEOUT_SECS,
};
use crate::infrastructure::ports::LlmPort;
use crate::infrastructure::resilient_llm::{CascadingLlmClient, RetryConfig};
use crate::use_cases::turn::ChaosLevel;

pub const DEFAULT_PLAYER_NATION: &str = "United States";

/// Which provider family serves narrative requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmBackend {
    /// Ollama or any `/v1/chat/completions` server
    OpenAiCompatible,
    Anthropic,
}

impl std::str::FromStr for LlmBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai_compatible" | "openai" | "ollama" => Ok(Self::OpenAiCompatible),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            other => bail!("unknown LLM_BACKEND '{other}' (expected openai_compatible or anthropic)"),
        }
    }
}

/// Narrative gateway configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub backend: LlmBackend,
    pub ollama_base_url: String,
    /// Priority-ordered model cascade for the OpenAI-compatible backend
    pub ollama_models: Vec<String>,
    pub anthropic_api_key: Option<String>,
    /// Priority-ordered model cascade for the Anthropic backend
    pub anthropic_models: Vec<String>,
    pub retry: RetryConfig,
    pub timeout_secs: u64,
}

/// Application configuration loaded from environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub chaos: ChaosLevel,
    /// SQLite file for saves; `None` keeps games in memory
    pub save_db_path: Option<String>,
    /// Saved game to resume
    pub game_id: Option<GameId>,
    pub player_nation: String,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = RetryConfig::default();

        Ok(Self {
            llm: LlmConfig {
                backend: var("LLM_BACKEND")
                    .as_deref()
                    .unwrap_or("openai_compatible")
                    .parse()?,
                ollama_base_url: var("OLLAMA_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_OLLAMA_BASE_URL.to_string()),
                ollama_models: model_list(var("OLLAMA_MODELS"), DEFAULT_OLLAMA_MODEL),
                anthropic_api_key: var("ANTHROPIC_API_KEY"),
                anthropic_models: model_list(var("ANTHROPIC_MODELS"), DEFAULT_ANTHROPIC_MODEL),
                retry: RetryConfig {
                    max_retries: parse_or(var("LLM_MAX_RETRIES"), defaults.max_retries)
                        .context("LLM_MAX_RETRIES must be a non-negative integer")?,
                    base_delay_ms: parse_or(var("LLM_BASE_DELAY_MS"), defaults.base_delay_ms)
                        .context("LLM_BASE_DELAY_MS must be a non-negative integer")?,
                    max_delay_ms: parse_or(var("LLM_MAX_DELAY_MS"), defaults.max_delay_ms)
                        .context("LLM_MAX_DELAY_MS must be a non-negative integer")?,
                    jitter_factor: defaults.jitter_factor,
                },
                timeout_secs: parse_or(var("LLM_TIMEOUT_SECS"), DEFAULT_TIMEOUT_SECS)
                    .context("LLM_TIMEOUT_SECS must be a non-negative integer")?,
            },
            chaos: var("CHAOS_LEVEL")
                .as_deref()
                .unwrap_or("balanced")
                .parse()
                .map_err(anyhow::Error::msg)
                .context("CHAOS_LEVEL must be calm, balanced or chaotic")?,
            save_db_path: var("SAVE_DB_PATH"),
            game_id: var("GAME_ID")
                .map(|id| id.parse::<GameId>())
                .transpose()
                .context("GAME_ID must be a UUID")?,
            player_nation: var("PLAYER_NATION")
                .unwrap_or_else(|| DEFAULT_PLAYER_NATION.to_string()),
        })
    }
}

fn model_list(raw: Option<String>, default: &str) -> Vec<String> {
    let models: Vec<String> = raw
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if models.is_empty() {
        vec![default.to_string()]
    } else {
        models
    }
}

fn parse_or<T: std::str::FromStr>(raw: Option<String>, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(value) => Ok(value.parse()?),
        None => Ok(default),
    }
}

/// Builds the narrative gateway: one retrying client per model, cascaded in order.
pub fn build_gateway(config: &LlmConfig) -> Result<Arc<dyn LlmPort>> {
    let clients: Vec<(String, Arc<dyn LlmPort>)> = match config.backend {
        LlmBackend::OpenAiCompatible => config
            .ollama_models
            .iter()
            .map(|model| {
                let client =
                    OllamaClient::with_timeout(&config.ollama_base_url, model, config.timeout_secs);
                (client.provider_id(), Arc::new(client) as Arc<dyn LlmPort>)
            })
            .collect(),
        LlmBackend::Anthropic => {
            let api_key = config
                .anthropic_api_key
                .as_deref()
                .context("ANTHROPIC_API_KEY is required when LLM_BACKEND=anthropic")?;
            config
                .anthropic_models
                .iter()
                .map(|model| {
                    let client = AnthropicClient::new(api_key, model, config.timeout_secs);
                    (client.provider_id(), Arc::new(client) as Arc<dyn LlmPort>)
                })
                .collect()
        }
    };

    let cascade = CascadingLlmClient::with_retry(clients, config.retry.clone());
    tracing::info!(
        backend = ?config.backend,
        models = ?cascade.labels(),
        max_retries = config.retry.max_retries,
        base_delay_ms = config.retry.base_delay_ms,
        "Narrative gateway configured"
    );
    Ok(Arc::new(cascade))
}
