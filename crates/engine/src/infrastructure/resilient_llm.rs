//! Resilient LLM clients: exponential backoff retry and model cascade.
//!
//! `ResilientLlmClient` wraps one model with retry logic for transient
//! failures. `CascadingLlmClient` tries a priority-ordered list of such
//! wrapped models until one answers. Backoff state lives on the stack of each
//! call, so both are safe to share between concurrent turns and diplomacy.

use async_trait::async_trait;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

use crate::infrastructure::ports::{LlmError, LlmPort, LlmRequest, LlmResponse};

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (0 = no retries, just the initial attempt)
    pub max_retries: u32,
    /// Base delay in milliseconds before first retry
    pub base_delay_ms: u64,
    /// Maximum delay in milliseconds (caps exponential growth)
    pub max_delay_ms: u64,
    /// Jitter factor (0.0-1.0) for randomizing delays to prevent thundering herd
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30000,
            jitter_factor: 0.2,
        }
    }
}

/// Wrapper that adds retry logic to any LLM client
pub struct ResilientLlmClient {
    inner: Arc<dyn LlmPort>,
    config: RetryConfig,
}

impl ResilientLlmClient {
    /// Create a new resilient wrapper around an existing LLM client
    pub fn new(inner: Arc<dyn LlmPort>, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    /// Calculate delay for a given attempt number using exponential backoff with jitter
    fn calculate_delay(&self, attempt: u32) -> u64 {
        let base = self.config.base_delay_ms;
        // Exponential: base * 2^(attempt-1)
        let exponential = base.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)));
        let capped = exponential.min(self.config.max_delay_ms);

        // Add jitter: ±jitter_factor around the delay
        let jitter_range = (capped as f64 * self.config.jitter_factor) as i64;
        if jitter_range > 0 {
            let jitter = rand::thread_rng().gen_range(-jitter_range..=jitter_range);
            (capped as i64 + jitter).max(0) as u64
        } else {
            capped
        }
    }
}

#[async_trait]
impl LlmPort for ResilientLlmClient {
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse, LlmError> {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            match self.inner.generate(request.clone()).await {
                Ok(response) => {
                    if attempt > 0 {
                        tracing::info!(
                            attempt = attempt + 1,
                            provider = %response.provider_id,
                            "LLM request succeeded after retry"
                        );
                    }
                    return Ok(response);
                }
                Err(e) => {
                    if !e.is_transient() {
                        tracing::error!(error = %e, "LLM request failed with non-retryable error");
                        return Err(e);
                    }

                    if attempt < self.config.max_retries {
                        let delay = self.calculate_delay(attempt + 1);
                        tracing::warn!(
                            attempt = attempt + 1,
                            max_retries = self.config.max_retries,
                            delay_ms = delay,
                            error = %e,
                            "LLM request failed, retrying..."
                        );
                        tokio::time::sleep(Duration::from_millis(delay)).await;
                    }

                    last_error = Some(e);
                }
            }
        }

        let error =
            last_error.unwrap_or_else(|| LlmError::RequestFailed("Unknown error".to_string()));
        tracing::error!(
            attempts = self.config.max_retries + 1,
            error = %error,
            "LLM request failed after all retry attempts"
        );
        Err(error)
    }
}

/// One entry of the cascade: a label for logs plus the client to call.
pub struct CascadeTier {
    pub label: String,
    pub client: Arc<dyn LlmPort>,
}

/// Tries capability-equivalent models in priority order.
///
/// Auth failures stop the cascade at once: the next model would reuse the
/// same credentials.
pub struct CascadingLlmClient {
    tiers: Vec<CascadeTier>,
}

impl CascadingLlmClient {
    pub fn new(tiers: Vec<CascadeTier>) -> Self {
        Self { tiers }
    }

    /// Wraps every `(label, client)` in a `ResilientLlmClient` with the same config.
    pub fn with_retry(clients: Vec<(String, Arc<dyn LlmPort>)>, config: RetryConfig) -> Self {
        Self::new(
            clients
                .into_iter()
                .map(|(label, client)| CascadeTier {
                    label,
                    client: Arc::new(ResilientLlmClient::new(client, config.clone())),
                })
                .collect(),
        )
    }

    pub fn labels(&self) -> Vec<&str> {
        self.tiers.iter().map(|tier| tier.label.as_str()).collect()
    }
}

#[async_trait]
impl LlmPort for CascadingLlmClient {
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse, LlmError> {
        let mut attempted = Vec::with_capacity(self.tiers.len());
        let mut last = String::from("no providers configured");

        for tier in &self.tiers {
            attempted.push(tier.label.clone());
            match tier.client.generate(request.clone()).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_auth_failure() => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        provider = %tier.label,
                        error = %e,
                        "Provider exhausted, falling back to next model"
                    );
                    last = e.to_string();
                }
            }
        }

        tracing::error!(attempted = ?attempted, "Every provider in the cascade failed");
        Err(LlmError::Unavailable { attempted, last })
    }
}
