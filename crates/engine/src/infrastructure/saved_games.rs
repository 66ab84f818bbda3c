//! SQLite-backed save game storage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use std::sync::Arc;
use statecraft_domain::common::{format_game_date, parse_game_date_or};
use statecraft_domain::{GameEvent, GameId, GameState};

use crate::infrastructure::ports::{ClockPort, GameRepo, RepoError, SavedGame};

/// SQLite implementation of [`GameRepo`].
///
/// One row per game. The state and the full event history are stored as
/// separate JSON columns; the game date is also kept as plain text so it
/// can be read without decoding the state.
pub struct SqliteGameRepo {
    pool: SqlitePool,
    clock: Arc<dyn ClockPort>,
}

impl SqliteGameRepo {
    pub async fn new(db_path: &str, clock: Arc<dyn ClockPort>) -> Result<Self, RepoError> {
        let pool = SqlitePool::connect(&format!("sqlite:{}?mode=rwc", db_path))
            .await
            .map_err(|e| RepoError::database("saved_games", e))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS saved_games (
                game_id TEXT PRIMARY KEY,
                state_json TEXT NOT NULL,
                history_json TEXT NOT NULL,
                provider_id TEXT,
                usage_counter INTEGER NOT NULL DEFAULT 0,
                game_date TEXT NOT NULL,
                saved_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| RepoError::database("saved_games", e))?;

        Ok(Self { pool, clock })
    }
}

#[async_trait]
impl GameRepo for SqliteGameRepo {
    async fn save(&self, game_id: GameId, game: &SavedGame) -> Result<(), RepoError> {
        let state_json =
            serde_json::to_string(&game.state).map_err(RepoError::serialization)?;
        let history_json =
            serde_json::to_string(&game.history).map_err(RepoError::serialization)?;
        let usage_counter = i64::try_from(game.usage_counter).unwrap_or(i64::MAX);

        sqlx::query(
            r#"
            INSERT INTO saved_games
                (game_id, state_json, history_json, provider_id, usage_counter, game_date, saved_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(game_id) DO UPDATE SET
                state_json = excluded.state_json,
                history_json = excluded.history_json,
                provider_id = excluded.provider_id,
                usage_counter = excluded.usage_counter,
                game_date = excluded.game_date,
                saved_at = excluded.saved_at
            "#,
        )
        .bind(game_id.to_string())
        .bind(state_json)
        .bind(history_json)
        .bind(game.provider_id.as_deref())
        .bind(usage_counter)
        .bind(format_game_date(game.state.current_date))
        .bind(game.saved_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::database("save_game", e))?;

        Ok(())
    }

    async fn load(&self, game_id: GameId) -> Result<Option<SavedGame>, RepoError> {
        let row = sqlx::query(
            r#"
            SELECT state_json, history_json, provider_id, usage_counter, game_date, saved_at
            FROM saved_games WHERE game_id = ?
            "#,
        )
        .bind(game_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::database("load_game", e))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let state_json: String = row.get("state_json");
        let history_json: String = row.get("history_json");
        let game_date: String = row.get("game_date");
        let saved_at: String = row.get("saved_at");
        let usage_counter: i64 = row.get("usage_counter");

        let mut state: GameState =
            serde_json::from_str(&state_json).map_err(RepoError::serialization)?;
        state.current_date = parse_game_date_or(&game_date, state.current_date);
        state
            .check_invariants()
            .map_err(|e| RepoError::serialization(format!("saved state is inconsistent: {e}")))?;

        let history: Vec<GameEvent> =
            serde_json::from_str(&history_json).map_err(RepoError::serialization)?;

        Ok(Some(SavedGame {
            state,
            history,
            provider_id: row.get("provider_id"),
            usage_counter: u64::try_from(usage_counter).unwrap_or(0),
            saved_at: DateTime::parse_from_rfc3339(&saved_at)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| self.clock.now()),
        }))
    }

    async fn delete(&self, game_id: GameId) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM saved_games WHERE game_id = ?")
            .bind(game_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::database("delete_game", e))?;
        Ok(())
    }
}
