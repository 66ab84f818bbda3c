//! In-memory save game storage, used when no database path is configured.

use async_trait::async_trait;
use dashmap::DashMap;
use statecraft_domain::GameId;

use crate::infrastructure::ports::{GameRepo, RepoError, SavedGame};

#[derive(Default)]
pub struct InMemoryGameRepo {
    games: DashMap<GameId, SavedGame>,
}

impl InMemoryGameRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }
}

#[async_trait]
impl GameRepo for InMemoryGameRepo {
    async fn save(&self, game_id: GameId, game: &SavedGame) -> Result<(), RepoError> {
        self.games.insert(game_id, game.clone());
        Ok(())
    }

    async fn load(&self, game_id: GameId) -> Result<Option<SavedGame>, RepoError> {
        Ok(self.games.get(&game_id).map(|entry| entry.value().clone()))
    }

    async fn delete(&self, game_id: GameId) -> Result<(), RepoError> {
        self.games.remove(&game_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use statecraft_domain::GameState;

    #[tokio::test]
    async fn stores_and_forgets_games() {
        let repo = InMemoryGameRepo::new();
        let state = GameState::new("Canada").expect("valid nation");

        repo.save(state.game_id, &SavedGame::capture(&state, None, 0, Utc::now()))
            .await
            .expect("save");
        assert_eq!(repo.len(), 1);

        let loaded = repo.load(state.game_id).await.expect("load").expect("present");
        assert_eq!(loaded.into_state(), state);

        repo.delete(state.game_id).await.expect("delete");
        assert!(repo.is_empty());
    }
}
