//! Persistence port for saved games.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use statecraft_domain::{GameEvent, GameId, GameState};

use super::error::RepoError;

/// Everything needed to resume a game.
///
/// The unbounded event history travels apart from the state so the state
/// row stays small.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedGame {
    pub state: GameState,
    pub history: Vec<GameEvent>,
    /// Last provider that produced a turn
    pub provider_id: Option<String>,
    /// Provider calls made so far
    pub usage_counter: u64,
    pub saved_at: DateTime<Utc>,
}

impl SavedGame {
    /// Splits the history off a live state.
    pub fn capture(
        state: &GameState,
        provider_id: Option<String>,
        usage_counter: u64,
        saved_at: DateTime<Utc>,
    ) -> Self {
        let mut state = state.clone();
        let history = std::mem::take(&mut state.event_history);
        Self {
            state,
            history,
            provider_id,
            usage_counter,
            saved_at,
        }
    }

    /// Rejoins state and history.
    pub fn into_state(self) -> GameState {
        let mut state = self.state;
        state.event_history = self.history;
        state
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GameRepo: Send + Sync {
    async fn save(&self, game_id: GameId, game: &SavedGame) -> Result<(), RepoError>;
    async fn load(&self, game_id: GameId) -> Result<Option<SavedGame>, RepoError>;
    async fn delete(&self, game_id: GameId) -> Result<(), RepoError>;
}
