//! A running game.
//!
//! Turn submission and diplomacy are gated independently: one turn and one
//! message exchange may be outstanding at the same time, and both await the
//! gateway without holding the state lock. Results are merged into the state
//! as it is when they arrive.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex, RwLock};

use statecraft_domain::turn::mark_thread_read;
use statecraft_domain::{DomainError, GameId, GameState, PlayerOrder, ThreadKey};

use crate::infrastructure::ports::{ClockPort, GameRepo, RepoError, SavedGame};
use crate::use_cases::diplomacy::{DiplomacyError, ExchangeMessages, ExchangeOutcome};
use crate::use_cases::turn::{AdvanceTurn, TurnError, TurnOutcome};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("A turn is already being processed")]
    TurnInProgress,
    #[error("A diplomatic exchange is already in progress")]
    MessageInProgress,
    #[error(transparent)]
    Turn(#[from] TurnError),
    #[error(transparent)]
    Diplomacy(#[from] DiplomacyError),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Out-of-band events for the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    SaveFailed { game_id: GameId, error: String },
}

/// Collaborators shared by every session.
#[derive(Clone)]
pub struct SessionServices {
    pub advance: Arc<AdvanceTurn>,
    pub exchange: Arc<ExchangeMessages>,
    pub repo: Arc<dyn GameRepo>,
    pub clock: Arc<dyn ClockPort>,
}

struct Live {
    game: GameState,
    provider_id: Option<String>,
}

/// Clears its flag on drop, so early returns release the gate.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct GameSession {
    game_id: GameId,
    live: RwLock<Live>,
    services: SessionServices,
    turn_in_progress: AtomicBool,
    message_in_progress: AtomicBool,
    usage_counter: AtomicU64,
    save_seq: AtomicU64,
    /// Sequence number of the newest save that reached the repository
    last_saved: Arc<Mutex<u64>>,
    notifications: mpsc::UnboundedSender<Notification>,
}

impl GameSession {
    /// Starts a session on `state`. The receiver gets save failures.
    pub fn new(
        state: GameState,
        services: SessionServices,
    ) -> (Self, mpsc::UnboundedReceiver<Notification>) {
        Self::restore(state, None, 0, services)
    }

    /// Resumes a saved game.
    pub async fn load(
        game_id: GameId,
        services: SessionServices,
    ) -> Result<(Self, mpsc::UnboundedReceiver<Notification>), SessionError> {
        let saved = services
            .repo
            .load(game_id)
            .await?
            .ok_or_else(|| RepoError::not_found("game", game_id))?;

        tracing::info!(
            game_id = %game_id,
            turn = saved.state.turn,
            usage = saved.usage_counter,
            "Game loaded"
        );
        let provider_id = saved.provider_id.clone();
        let usage = saved.usage_counter;
        Ok(Self::restore(saved.into_state(), provider_id, usage, services))
    }

    fn restore(
        state: GameState,
        provider_id: Option<String>,
        usage: u64,
        services: SessionServices,
    ) -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = Self {
            game_id: state.game_id,
            live: RwLock::new(Live {
                game: state,
                provider_id,
            }),
            services,
            turn_in_progress: AtomicBool::new(false),
            message_in_progress: AtomicBool::new(false),
            usage_counter: AtomicU64::new(usage),
            save_seq: AtomicU64::new(0),
            last_saved: Arc::new(Mutex::new(0)),
            notifications: tx,
        };
        (session, rx)
    }

    pub fn game_id(&self) -> GameId {
        self.game_id
    }

    pub fn usage_count(&self) -> u64 {
        self.usage_counter.load(Ordering::SeqCst)
    }

    pub fn is_turn_in_progress(&self) -> bool {
        self.turn_in_progress.load(Ordering::Acquire)
    }

    pub async fn snapshot(&self) -> GameState {
        self.live.read().await.game.clone()
    }

    pub async fn provider_id(&self) -> Option<String> {
        self.live.read().await.provider_id.clone()
    }

    /// Plays one turn.
    pub async fn submit_turn(&self, order: PlayerOrder) -> Result<TurnOutcome, SessionError> {
        let _gate =
            InFlight::acquire(&self.turn_in_progress).ok_or(SessionError::TurnInProgress)?;

        let request = {
            let live = self.live.read().await;
            self.services.advance.prepare(&live.game, &order)?
        };

        self.usage_counter.fetch_add(1, Ordering::SeqCst);
        let raw = self.services.advance.generate(request).await;

        let mut live = self.live.write().await;
        let outcome = self
            .services
            .advance
            .resolve(live.game.clone(), &order, raw)?;
        live.game = outcome.state.clone();
        if outcome.provider_id.is_some() {
            live.provider_id = outcome.provider_id.clone();
        }
        self.spawn_save(&live);
        Ok(outcome)
    }

    /// Sends a diplomatic message and merges the replies.
    pub async fn send_message(
        &self,
        targets: &[String],
        text: &str,
    ) -> Result<ExchangeOutcome, SessionError> {
        let _gate =
            InFlight::acquire(&self.message_in_progress).ok_or(SessionError::MessageInProgress)?;

        let dispatch = {
            let mut live = self.live.write().await;
            let dispatch = self.services.exchange.prepare(&mut live.game, targets, text)?;
            self.spawn_save(&live);
            dispatch
        };

        self.usage_counter.fetch_add(1, Ordering::SeqCst);
        let raw = self.services.exchange.generate(dispatch.request).await;

        let mut live = self.live.write().await;
        let outcome = self
            .services
            .exchange
            .resolve(&mut live.game, &dispatch.message, raw);
        if outcome.delivered > 0 {
            self.spawn_save(&live);
        }
        Ok(outcome)
    }

    /// Marks the thread with exactly these participants as read.
    pub async fn mark_thread_read(&self, participants: &[String]) -> usize {
        let mut live = self.live.write().await;
        let thread = ThreadKey::new(
            &live.game.player_nation,
            participants.iter().map(String::as_str),
        );
        let marked = mark_thread_read(&mut live.game, &thread);
        if marked > 0 {
            self.spawn_save(&live);
        }
        marked
    }

    /// Saves in the background. A save that finishes after a newer one is
    /// discarded.
    fn spawn_save(&self, live: &Live) {
        let seq = self.save_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let saved = SavedGame::capture(
            &live.game,
            live.provider_id.clone(),
            self.usage_count(),
            self.services.clock.now(),
        );
        let game_id = self.game_id;
        let repo = self.services.repo.clone();
        let last_saved = self.last_saved.clone();
        let notifications = self.notifications.clone();

        tokio::spawn(async move {
            let mut last = last_saved.lock().await;
            if *last > seq {
                tracing::debug!(game_id = %game_id, seq, "Skipping stale save");
                return;
            }
            match repo.save(game_id, &saved).await {
                Ok(()) => {
                    *last = seq;
                    tracing::debug!(game_id = %game_id, turn = saved.state.turn, "Game saved");
                }
                Err(e) => {
                    tracing::error!(game_id = %game_id, error = %e, "Failed to save game");
                    let _ = notifications.send(Notification::SaveFailed {
                        game_id,
                        error: e.to_string(),
                    });
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::memory_repo::InMemoryGameRepo;
    use crate::infrastructure::ports::{LlmPort, MockGameRepo};
    use crate::test_fixtures::{fixed_clock, ScriptedLlm, SCRIPTED_PROVIDER_ID};
    use crate::use_cases::turn::ChaosLevel;
    use tokio::sync::Notify;

    const QUIET_TURN: &str = r#"{"events": [{"headline": "Calm", "description": "Nothing stirs."}]}"#;

    fn services(
        turn_llm: Arc<dyn LlmPort>,
        chat_llm: Arc<dyn LlmPort>,
        repo: Arc<dyn GameRepo>,
    ) -> SessionServices {
        SessionServices {
            advance: Arc::new(AdvanceTurn::new(turn_llm, fixed_clock(), ChaosLevel::Calm)),
            exchange: Arc::new(ExchangeMessages::new(chat_llm, fixed_clock())),
            repo,
            clock: fixed_clock(),
        }
    }

    /// Lets spawned save tasks run to completion.
    async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    async fn wait_for_calls(llm: &ScriptedLlm, calls: u32) {
        while llm.calls() < calls {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn turn_is_applied_counted_and_saved() {
        let llm = Arc::new(ScriptedLlm::replying(QUIET_TURN));
        let repo = Arc::new(InMemoryGameRepo::new());
        let state = GameState::new("Sweden").expect("valid nation");
        let game_id = state.game_id;
        let (session, _rx) =
            GameSession::new(state, services(llm.clone(), llm.clone(), repo.clone()));

        let outcome = session
            .submit_turn(PlayerOrder::new("Expand wind power"))
            .await
            .expect("turn resolves");
        settle().await;

        assert_eq!(outcome.state.turn, 2);
        assert_eq!(session.snapshot().await.turn, 2);
        assert_eq!(session.usage_count(), 1);
        assert_eq!(session.provider_id().await.as_deref(), Some(SCRIPTED_PROVIDER_ID));
        assert!(!session.is_turn_in_progress());

        let saved = repo.load(game_id).await.expect("load").expect("saved");
        assert_eq!(saved.state.turn, 2);
        assert_eq!(saved.usage_counter, 1);
    }

    #[tokio::test]
    async fn second_turn_is_rejected_while_one_is_outstanding() {
        let gate = Arc::new(Notify::new());
        let llm = Arc::new(ScriptedLlm::gated(
            vec![Ok(QUIET_TURN.to_string())],
            gate.clone(),
        ));
        let repo = Arc::new(InMemoryGameRepo::new());
        let (session, _rx) = GameSession::new(
            GameState::new("Poland").expect("valid nation"),
            services(llm.clone(), llm.clone(), repo),
        );
        let session = Arc::new(session);

        let first = tokio::spawn({
            let session = session.clone();
            async move { session.submit_turn(PlayerOrder::new("Build roads")).await }
        });
        wait_for_calls(&llm, 1).await;

        let second = session.submit_turn(PlayerOrder::new("Build rails")).await;
        assert!(matches!(second, Err(SessionError::TurnInProgress)));

        gate.notify_one();
        let outcome = first.await.expect("task joins").expect("turn resolves");
        assert_eq!(outcome.state.turn, 2);
        assert_eq!(llm.calls(), 1);
        assert!(!session.is_turn_in_progress());
    }

    #[tokio::test]
    async fn diplomacy_during_a_turn_survives_the_turn() {
        let gate = Arc::new(Notify::new());
        let turn_llm = Arc::new(ScriptedLlm::gated(
            vec![Ok(QUIET_TURN.to_string())],
            gate.clone(),
        ));
        let chat_llm = Arc::new(ScriptedLlm::replying(
            r#"{"replies": [{"sender": "Ukraine", "text": "Thank you, neighbour."}]}"#,
        ));
        let repo = Arc::new(InMemoryGameRepo::new());
        let (session, _rx) = GameSession::new(
            GameState::new("Poland").expect("valid nation"),
            services(turn_llm.clone(), chat_llm, repo),
        );
        let session = Arc::new(session);

        let turn = tokio::spawn({
            let session = session.clone();
            async move { session.submit_turn(PlayerOrder::new("Mobilize reserves")).await }
        });
        wait_for_calls(&turn_llm, 1).await;

        let exchange = session
            .send_message(&["Ukraine".to_string()], "We stand with you.")
            .await
            .expect("message accepted");
        assert_eq!(exchange.delivered, 1);

        gate.notify_one();
        turn.await.expect("task joins").expect("turn resolves");

        let state = session.snapshot().await;
        assert_eq!(state.turn, 2);
        assert_eq!(state.chat_history.len(), 2);
        assert_eq!(state.unread_message_count(), 1);
        assert_eq!(session.usage_count(), 2);

        let marked = session.mark_thread_read(&["ukraine".to_string()]).await;
        assert_eq!(marked, 1);
        assert_eq!(session.snapshot().await.unread_message_count(), 0);
    }

    #[tokio::test]
    async fn failed_save_is_reported_but_state_is_kept() {
        let llm = Arc::new(ScriptedLlm::replying(QUIET_TURN));
        let mut repo = MockGameRepo::new();
        repo.expect_save()
            .returning(|_, _| Err(RepoError::database("save_game", "disk full")));
        let state = GameState::new("Egypt").expect("valid nation");
        let game_id = state.game_id;
        let (session, mut rx) =
            GameSession::new(state, services(llm.clone(), llm, Arc::new(repo)));

        session
            .submit_turn(PlayerOrder::new("Expand the canal"))
            .await
            .expect("turn resolves despite the save failure");

        let notification = rx.recv().await.expect("a notification");
        assert!(matches!(
            notification,
            Notification::SaveFailed { game_id: id, ref error } if id == game_id && error.contains("disk full")
        ));
        assert_eq!(session.snapshot().await.turn, 2);
    }

    #[tokio::test]
    async fn load_restores_state_provider_and_usage() {
        let llm = Arc::new(ScriptedLlm::replying(QUIET_TURN));
        let repo = Arc::new(InMemoryGameRepo::new());
        let state = GameState::new("Turkey").expect("valid nation");
        let game_id = state.game_id;
        repo.save(
            game_id,
            &SavedGame::capture(&state, Some("openai_compatible/qwen".into()), 7, crate::test_fixtures::fixed_now()),
        )
        .await
        .expect("seed save");

        let (session, _rx) =
            GameSession::load(game_id, services(llm.clone(), llm, repo.clone()))
                .await
                .expect("game loads");

        assert_eq!(session.game_id(), game_id);
        assert_eq!(session.usage_count(), 7);
        assert_eq!(session.provider_id().await.as_deref(), Some("openai_compatible/qwen"));
        assert_eq!(session.snapshot().await, state);

        let missing = GameSession::load(GameId::new(), services(
            Arc::new(ScriptedLlm::replying(QUIET_TURN)),
            Arc::new(ScriptedLlm::replying(QUIET_TURN)),
            repo,
        ))
        .await;
        assert!(matches!(missing, Err(SessionError::Repo(ref e)) if e.is_not_found()));
    }

    #[tokio::test]
    async fn finished_games_refuse_new_turns() {
        let llm = Arc::new(ScriptedLlm::replying(QUIET_TURN));
        let mut state = GameState::new("Iran").expect("valid nation");
        state.game_over = Some(statecraft_domain::Defeat::SystemicCollapse);
        let (session, _rx) = GameSession::new(
            state,
            services(llm.clone(), llm.clone(), Arc::new(InMemoryGameRepo::new())),
        );

        let result = session.submit_turn(PlayerOrder::new("Reform")).await;

        assert!(matches!(result, Err(SessionError::Turn(TurnError::GameOver { .. }))));
        assert_eq!(session.usage_count(), 0);
        assert_eq!(llm.calls(), 0);
    }
}
