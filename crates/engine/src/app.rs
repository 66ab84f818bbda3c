//! Application state and composition.

use std::sync::Arc;

use tokio::sync::mpsc;

use statecraft_domain::{GameId, GameState};

use crate::infrastructure::{
    clock::SystemClock,
    ports::{ClockPort, GameRepo, LlmPort},
};
use crate::use_cases;
use crate::use_cases::session::{GameSession, Notification, SessionError, SessionServices};
use crate::use_cases::turn::ChaosLevel;

/// Main application state.
///
/// Holds the shared gateway, the save repository and all use cases.
pub struct App {
    pub llm: Arc<dyn LlmPort>,
    pub repo: Arc<dyn GameRepo>,
    pub clock: Arc<dyn ClockPort>,
    pub use_cases: UseCases,
}

/// Container for all use cases.
pub struct UseCases {
    pub turn: use_cases::TurnUseCases,
    pub diplomacy: use_cases::DiplomacyUseCases,
}

impl App {
    pub fn new(llm: Arc<dyn LlmPort>, repo: Arc<dyn GameRepo>, chaos: ChaosLevel) -> Self {
        Self::with_clock(llm, repo, Arc::new(SystemClock::new()), chaos)
    }

    pub fn with_clock(
        llm: Arc<dyn LlmPort>,
        repo: Arc<dyn GameRepo>,
        clock: Arc<dyn ClockPort>,
        chaos: ChaosLevel,
    ) -> Self {
        let advance = Arc::new(use_cases::turn::AdvanceTurn::new(
            llm.clone(),
            clock.clone(),
            chaos,
        ));
        let exchange = Arc::new(use_cases::diplomacy::ExchangeMessages::new(
            llm.clone(),
            clock.clone(),
        ));

        let use_cases = UseCases {
            turn: use_cases::TurnUseCases::new(advance),
            diplomacy: use_cases::DiplomacyUseCases::new(exchange),
        };

        Self {
            llm,
            repo,
            clock,
            use_cases,
        }
    }

    fn session_services(&self) -> SessionServices {
        SessionServices {
            advance: self.use_cases.turn.advance.clone(),
            exchange: self.use_cases.diplomacy.exchange.clone(),
            repo: self.repo.clone(),
            clock: self.clock.clone(),
        }
    }

    /// Starts a fresh game for `player_nation`.
    pub fn new_session(
        &self,
        player_nation: &str,
    ) -> Result<(GameSession, mpsc::UnboundedReceiver<Notification>), SessionError> {
        let state = GameState::new(player_nation)?;
        tracing::info!(game_id = %state.game_id, nation = %state.player_nation, "New game started");
        Ok(GameSession::new(state, self.session_services()))
    }

    /// Resumes a saved game.
    pub async fn load_session(
        &self,
        game_id: GameId,
    ) -> Result<(GameSession, mpsc::UnboundedReceiver<Notification>), SessionError> {
        GameSession::load(game_id, self.session_services()).await
    }
}
