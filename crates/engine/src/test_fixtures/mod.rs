//! Shared test doubles for use case tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::Notify;

use crate::infrastructure::clock::FixedClock;
use crate::infrastructure::ports::{
    ClockPort, FinishReason, LlmError, LlmPort, LlmRequest, LlmResponse,
};

pub const SCRIPTED_PROVIDER_ID: &str = "scripted/test";

/// Timestamp every fixture clock reports.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 9, 30, 0)
        .single()
        .expect("valid timestamp")
}

pub fn fixed_clock() -> Arc<dyn ClockPort> {
    Arc::new(FixedClock(fixed_now()))
}

/// LLM fake that answers from a script, one entry per call.
///
/// An exhausted script answers with [`LlmError::Unavailable`]. When built
/// with [`ScriptedLlm::gated`], every call waits for the gate to be opened.
pub struct ScriptedLlm {
    script: Mutex<VecDeque<Result<String, LlmError>>>,
    requests: Mutex<Vec<LlmRequest>>,
    calls: AtomicU32,
    gate: Option<Arc<Notify>>,
}

impl ScriptedLlm {
    pub fn new(script: Vec<Result<String, LlmError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
            calls: AtomicU32::new(0),
            gate: None,
        }
    }

    /// Always answers with `content`.
    pub fn replying(content: &str) -> Self {
        Self::new(vec![Ok(content.to_string()); 16])
    }

    pub fn gated(script: Vec<Result<String, LlmError>>, gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new(script)
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<LlmRequest> {
        self.requests.lock().expect("requests lock").last().cloned()
    }
}

#[async_trait]
impl LlmPort for ScriptedLlm {
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().expect("requests lock").push(request);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let next = self.script.lock().expect("script lock").pop_front();
        match next {
            Some(Ok(content)) => Ok(LlmResponse {
                content,
                finish_reason: FinishReason::Stop,
                usage: None,
                provider_id: SCRIPTED_PROVIDER_ID.to_string(),
            }),
            Some(Err(error)) => Err(error),
            None => Err(LlmError::Unavailable {
                attempted: vec![SCRIPTED_PROVIDER_ID.to_string()],
                last: "script exhausted".to_string(),
            }),
        }
    }
}
