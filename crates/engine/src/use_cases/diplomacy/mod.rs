//! Diplomacy use cases.
//!
//! The player's message is appended straight away; replies arrive later from
//! the narrative gateway and are merged into whatever the state is by then.

use std::sync::Arc;

use statecraft_domain::turn::{accept_replies, send_player_message, thread_messages, OutgoingRejection};
use statecraft_domain::{ChatMessage, GameState, ThreadKey};

use crate::infrastructure::ports::{ClockPort, LlmError, LlmPort, LlmRequest, LlmResponse};
use crate::use_cases::turn::{build_diplomacy_request, normalize_replies};

/// Thread messages replayed to the provider as conversation history.
pub const THREAD_HISTORY_LEN: usize = 10;

/// Container for diplomacy use cases.
pub struct DiplomacyUseCases {
    pub exchange: Arc<ExchangeMessages>,
}

impl DiplomacyUseCases {
    pub fn new(exchange: Arc<ExchangeMessages>) -> Self {
        Self { exchange }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DiplomacyError {
    #[error("No valid recipients for this message")]
    NoRecipients,
    #[error("Message text cannot be empty")]
    EmptyMessage,
    #[error("The game is over: {reason}")]
    GameOver { reason: String },
}

impl From<OutgoingRejection> for DiplomacyError {
    fn from(rejection: OutgoingRejection) -> Self {
        match rejection {
            OutgoingRejection::NoRecipients => Self::NoRecipients,
            OutgoingRejection::EmptyMessage => Self::EmptyMessage,
        }
    }
}

/// An appended player message and the request that asks for its replies.
#[derive(Debug, Clone)]
pub struct Dispatch {
    pub message: ChatMessage,
    pub request: LlmRequest,
}

#[derive(Debug, Clone, Default)]
pub struct ExchangeOutcome {
    /// Replies appended to the chat history
    pub delivered: usize,
    /// Replies dropped by sender validation
    pub dropped: usize,
    pub provider_id: Option<String>,
    /// Why no replies could be requested, if the gateway failed
    pub degraded: Option<String>,
}

/// Use case for one round of player-initiated diplomacy.
pub struct ExchangeMessages {
    llm: Arc<dyn LlmPort>,
    clock: Arc<dyn ClockPort>,
}

impl ExchangeMessages {
    pub fn new(llm: Arc<dyn LlmPort>, clock: Arc<dyn ClockPort>) -> Self {
        Self { llm, clock }
    }

    /// Appends the player's message and builds the reply request.
    pub fn prepare(
        &self,
        state: &mut GameState,
        targets: &[String],
        text: &str,
    ) -> Result<Dispatch, DiplomacyError> {
        if let Some(reason) = state.game_over_reason() {
            return Err(DiplomacyError::GameOver {
                reason: reason.to_string(),
            });
        }

        let message = send_player_message(state, targets, text, self.clock.now())?;
        let recipients: Vec<String> = message.targets.iter().cloned().collect();

        let thread = ThreadKey::of(&message, &state.player_nation);
        let earlier: Vec<&ChatMessage> = thread_messages(state, &thread)
            .filter(|m| m.id != message.id)
            .collect();
        let history = &earlier[earlier.len().saturating_sub(THREAD_HISTORY_LEN)..];
        let request = build_diplomacy_request(state, history, &recipients, &message.text);

        tracing::debug!(
            recipients = ?recipients,
            history = history.len(),
            "Player message sent"
        );
        Ok(Dispatch { message, request })
    }

    pub async fn generate(&self, request: LlmRequest) -> Result<LlmResponse, LlmError> {
        self.llm.generate(request).await
    }

    /// Merges replies to `sent` into the state.
    ///
    /// A gateway failure leaves the recipients pending; the player's message
    /// is already in the history either way.
    pub fn resolve(
        &self,
        state: &mut GameState,
        sent: &ChatMessage,
        raw: Result<LlmResponse, LlmError>,
    ) -> ExchangeOutcome {
        let response = match raw {
            Ok(response) => response,
            Err(error) => {
                tracing::warn!(error = %error, "No diplomatic replies, gateway failed");
                return ExchangeOutcome {
                    degraded: Some(error.to_string()),
                    ..ExchangeOutcome::default()
                };
            }
        };

        let replies = normalize_replies(&response.content);
        let report = accept_replies(state, &sent.targets, &replies, self.clock.now());
        for rejection in &report.rejected {
            tracing::warn!(reason = ?rejection, "Dropped diplomatic reply");
        }
        tracing::info!(
            delivered = report.delivered,
            dropped = report.rejected.len(),
            "Diplomatic replies received"
        );

        ExchangeOutcome {
            delivered: report.delivered,
            dropped: report.rejected.len(),
            provider_id: Some(response.provider_id),
            degraded: None,
        }
    }

    /// Sends a message and waits for the replies.
    pub async fn execute(
        &self,
        state: &mut GameState,
        targets: &[String],
        text: &str,
    ) -> Result<ExchangeOutcome, DiplomacyError> {
        let dispatch = self.prepare(state, targets, text)?;
        let raw = self.generate(dispatch.request).await;
        Ok(self.resolve(state, &dispatch.message, raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{fixed_clock, ScriptedLlm};
    use statecraft_domain::Defeat;

    fn exchange(llm: Arc<ScriptedLlm>) -> ExchangeMessages {
        ExchangeMessages::new(llm, fixed_clock())
    }

    fn targets(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[tokio::test]
    async fn replies_from_addressed_nations_are_delivered_unread() {
        let llm = Arc::new(ScriptedLlm::replying(
            r#"{"replies": [
                {"sender": "Germany", "text": "We are open to talks."},
                {"sender": "Brazil", "text": "Nobody asked us, but hello."}
            ]}"#,
        ));
        let mut state = GameState::new("France").expect("valid nation");

        let outcome = exchange(llm)
            .execute(&mut state, &targets(&["germany", "Italy"]), "A summit in Rome?")
            .await
            .expect("message accepted");

        assert_eq!(outcome.delivered, 1);
        assert_eq!(outcome.dropped, 1);
        assert_eq!(state.chat_history.len(), 2);
        assert!(state.chat_history[0].is_read);
        assert!(!state.chat_history[1].is_read);
        assert_eq!(state.chat_history[1].sender_nation, "Germany");
        assert!(!state.pending_responses.contains("Germany"));
        assert!(state.pending_responses.contains("Italy"));
    }

    #[tokio::test]
    async fn spoofed_replies_never_reach_the_history() {
        let llm = Arc::new(ScriptedLlm::replying(
            r#"[{"sender": "France", "text": "We agree with ourselves."}]"#,
        ));
        let mut state = GameState::new("France").expect("valid nation");

        let outcome = exchange(llm)
            .execute(&mut state, &targets(&["Spain"]), "Hello neighbour")
            .await
            .expect("message accepted");

        assert_eq!(outcome.delivered, 0);
        assert_eq!(state.chat_history.len(), 1);
    }

    #[tokio::test]
    async fn gateway_failure_keeps_the_outgoing_message() {
        let llm = Arc::new(ScriptedLlm::new(vec![Err(LlmError::Overloaded(
            "HTTP 529".into(),
        ))]));
        let mut state = GameState::new("Japan").expect("valid nation");

        let outcome = exchange(llm)
            .execute(&mut state, &targets(&["China"]), "Let us discuss fisheries")
            .await
            .expect("message accepted");

        assert!(outcome.degraded.is_some());
        assert_eq!(state.chat_history.len(), 1);
        assert!(state.pending_responses.contains("China"));
    }

    #[tokio::test]
    async fn invalid_messages_are_rejected_without_calling_the_provider() {
        let llm = Arc::new(ScriptedLlm::replying("{}"));
        let use_case = exchange(llm.clone());
        let mut state = GameState::new("Ghana").expect("valid nation");

        assert!(matches!(
            use_case.execute(&mut state, &targets(&["Ghana"]), "Hi").await,
            Err(DiplomacyError::NoRecipients)
        ));
        assert!(matches!(
            use_case.execute(&mut state, &targets(&["Togo"]), "   ").await,
            Err(DiplomacyError::EmptyMessage)
        ));

        state.game_over = Some(Defeat::NationDissolved);
        assert!(matches!(
            use_case.execute(&mut state, &targets(&["Nigeria"]), "Help").await,
            Err(DiplomacyError::GameOver { .. })
        ));
        assert_eq!(llm.calls(), 0);
        assert!(state.chat_history.is_empty());
    }

    #[tokio::test]
    async fn earlier_thread_messages_are_replayed() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            Ok(r#"{"replies": [{"sender": "Mexico", "text": "Yes."}]}"#.to_string()),
            Ok(r#"{"replies": []}"#.to_string()),
        ]));
        let use_case = exchange(llm.clone());
        let mut state = GameState::new("United States").expect("valid nation");

        use_case
            .execute(&mut state, &targets(&["Mexico"]), "Trade talks?")
            .await
            .expect("first message");
        use_case
            .execute(&mut state, &targets(&["Mexico"]), "Great, next week then.")
            .await
            .expect("second message");

        let request = llm.last_request().expect("request sent");
        assert_eq!(request.messages.len(), 3);
    }
}
