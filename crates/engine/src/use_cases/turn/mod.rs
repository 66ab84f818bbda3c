//! Turn use cases.
//!
//! One turn is: assemble a request from the current state, ask the narrative
//! gateway, normalize whatever comes back, and reduce it into the next state.
//! Provider failures never stop a turn; they resolve with the fallback result.

mod normalize;
mod prompt;

use std::sync::Arc;

use statecraft_domain::{apply_turn, GameEvent, GameState, PlayerOrder, TurnReport, TurnResult};

use crate::infrastructure::ports::{ClockPort, LlmError, LlmPort, LlmRequest, LlmResponse};

pub use normalize::{extract_json, normalize, normalize_replies};
pub use prompt::{build_diplomacy_request, build_turn_request, ChaosLevel};

/// Container for turn use cases.
pub struct TurnUseCases {
    pub advance: Arc<AdvanceTurn>,
}

impl TurnUseCases {
    pub fn new(advance: Arc<AdvanceTurn>) -> Self {
        Self { advance }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    #[error("The game is over: {reason}")]
    GameOver { reason: String },
}

impl TurnError {
    fn game_over(state: &GameState) -> Self {
        Self::GameOver {
            reason: state.game_over_reason().unwrap_or("game over").to_string(),
        }
    }
}

/// Result of resolving one turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub state: GameState,
    /// Events appended this turn, player order first
    pub new_events: Vec<GameEvent>,
    /// Provider that produced the narrative, `None` when the fallback was used
    pub provider_id: Option<String>,
    /// Why the turn ran on the fallback result, if it did
    pub degraded: Option<String>,
    pub report: TurnReport,
}

/// Use case for advancing the game by one turn.
pub struct AdvanceTurn {
    llm: Arc<dyn LlmPort>,
    clock: Arc<dyn ClockPort>,
    chaos: ChaosLevel,
}

impl AdvanceTurn {
    pub fn new(llm: Arc<dyn LlmPort>, clock: Arc<dyn ClockPort>, chaos: ChaosLevel) -> Self {
        Self { llm, clock, chaos }
    }

    /// Builds the gateway request for the next turn.
    pub fn prepare(&self, state: &GameState, order: &PlayerOrder) -> Result<LlmRequest, TurnError> {
        if state.is_game_over() {
            return Err(TurnError::game_over(state));
        }
        Ok(build_turn_request(state, order, self.chaos))
    }

    /// Calls the gateway. Kept separate so callers can await it without
    /// holding any lock on the state.
    pub async fn generate(&self, request: LlmRequest) -> Result<LlmResponse, LlmError> {
        self.llm.generate(request).await
    }

    /// Folds a gateway answer, or its failure, into the next state.
    pub fn resolve(
        &self,
        state: GameState,
        order: &PlayerOrder,
        raw: Result<LlmResponse, LlmError>,
    ) -> Result<TurnOutcome, TurnError> {
        if state.is_game_over() {
            return Err(TurnError::game_over(&state));
        }

        let (result, provider_id, degraded) = match raw {
            Ok(response) => (normalize(&response.content), Some(response.provider_id), None),
            Err(error) => {
                if error.is_auth_failure() {
                    tracing::error!(error = %error, "Provider rejected credentials, using fallback turn");
                } else {
                    tracing::warn!(error = %error, "Narrative generation failed, using fallback turn");
                }
                (TurnResult::fallback(), None, Some(error.to_string()))
            }
        };

        let turn = state.turn;
        let transition = apply_turn(state, order, &result, self.clock.now());
        let report = transition.report;

        if let Some(error) = &report.alliance_rejected {
            tracing::warn!(error = %error, "Alliance update rejected");
        }
        if !report.inbound.rejected.is_empty() {
            tracing::debug!(
                dropped = report.inbound.rejected.len(),
                "Dropped inbound messages that failed validation"
            );
        }

        tracing::info!(
            turn = turn,
            date = %transition.state.current_date,
            events = report.new_events.len(),
            annexed = report.territory.annexed_by_player.len(),
            provider = provider_id.as_deref().unwrap_or("fallback"),
            game_over = ?report.defeat,
            "Turn resolved"
        );

        Ok(TurnOutcome {
            state: transition.state,
            new_events: report.new_events.clone(),
            provider_id,
            degraded,
            report,
        })
    }

    /// Plays one full turn.
    pub async fn execute(
        &self,
        state: GameState,
        order: &PlayerOrder,
    ) -> Result<TurnOutcome, TurnError> {
        let request = self.prepare(&state, order)?;
        let raw = self.generate(request).await;
        self.resolve(state, order, raw)
    }
}
