//! Prompt assembly for turn and diplomacy requests.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::str::FromStr;

use serde_json::{json, Value};

use statecraft_domain::{ChatMessage, EventCategory, GameState, PlayerOrder, RECENT_EVENT_WINDOW};

use crate::infrastructure::ports::{LlmRequest, PromptMessage};

/// Number of chat messages quoted in a turn request.
pub const CHAT_SNIPPET_LEN: usize = 6;

/// Upper bound on generated tokens for one turn.
pub const TURN_MAX_TOKENS: u32 = 2048;

/// Upper bound on generated tokens for one diplomacy exchange.
pub const DIPLOMACY_MAX_TOKENS: u32 = 1024;

/// How eventful the world should be.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChaosLevel {
    Calm,
    #[default]
    Balanced,
    Chaotic,
}

impl ChaosLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Calm => "calm",
            Self::Balanced => "balanced",
            Self::Chaotic => "chaotic",
        }
    }

    pub fn directive(&self) -> &'static str {
        match self {
            Self::Calm => {
                "Keep the world calm: favour diplomacy, gradual change and small stat movements. \
                 Wars and crises should be rare and need a clear cause."
            }
            Self::Balanced => {
                "Keep the world plausible: mix routine developments with the occasional \
                 surprise, and let consequences follow from the player's choices."
            }
            Self::Chaotic => {
                "Make the world volatile: coups, sudden wars, market crashes and bold moves by \
                 other nations are common. Large stat swings are acceptable."
            }
        }
    }

    pub fn temperature(&self) -> f32 {
        match self {
            Self::Calm => 0.6,
            Self::Balanced => 0.8,
            Self::Chaotic => 1.0,
        }
    }
}

impl std::fmt::Display for ChaosLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChaosLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "calm" | "low" => Ok(Self::Calm),
            "balanced" | "normal" | "medium" => Ok(Self::Balanced),
            "chaotic" | "high" | "chaos" => Ok(Self::Chaotic),
            other => Err(format!("unknown chaos level '{other}'")),
        }
    }
}

const TURN_SYSTEM_PROMPT: &str = r#"You are the world simulator of a turn-based geopolitical strategy game set in the present day.

Each turn the player, the head of government of one nation, issues orders. You decide what happens in the world as a result and during the elapsed time.

RULES:
1. Stay grounded in real geography and real nations. Other nations act in their own interest.
2. Stat changes are integers, usually between -15 and +15. Stats are tension, economy, military, popularity and corruption, each on a 0-100 scale.
3. Only report nuclear acquisition, space programs, annexations or dissolutions when the story genuinely supports them.
4. Map updates use the actions "dissolve", "annex", "build_entity" and "remove_entity". Annexations without a new owner go to the player.
5. Incoming messages are letters other nations send the player. Never write a message as if it came from the player's own nation.
6. Report structured effects on the player's nation in "effects" (attacked, bombarded, casualties, nuclearStrikeReceived).

You MUST respond with a single JSON object and nothing else."#;

const DIPLOMACY_SYSTEM_PROMPT: &str = r#"You voice the governments of foreign nations in a geopolitical strategy game.

The player has written to one or more nations. Reply in character for each addressed nation that would plausibly answer, in a few sentences of diplomatic prose. Nations may refuse, bargain or threaten.

You MUST respond with a single JSON object of the form {"replies": [{"sender": "<nation>", "text": "<reply>"}]} and nothing else."#;

/// JSON schema hint for a turn response.
pub fn turn_response_schema() -> Value {
    let stat = json!({"type": "integer"});
    let categories: Vec<&str> = EventCategory::ALL.iter().map(|c| c.as_str()).collect();
    json!({
        "type": "object",
        "properties": {
            "timeIncrement": {"type": "string", "enum": ["day", "month", "year"]},
            "events": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "category": {"type": "string", "enum": categories},
                        "headline": {"type": "string"},
                        "description": {"type": "string"},
                        "relatedNation": {"type": "string"}
                    },
                    "required": ["category", "headline", "description"]
                }
            },
            "statChanges": {
                "type": "object",
                "properties": {
                    "tension": stat,
                    "economy": stat,
                    "military": stat,
                    "popularity": stat,
                    "corruption": stat
                }
            },
            "spaceProgram": {"type": "boolean"},
            "nuclearAcquired": {"type": "boolean"},
            "effects": {
                "type": "object",
                "properties": {
                    "attacked": {"type": "boolean"},
                    "bombarded": {"type": "boolean"},
                    "casualties": {"type": "boolean"},
                    "nuclearStrikeReceived": {"type": "boolean"}
                }
            },
            "mapUpdates": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "action": {
                            "type": "string",
                            "enum": ["dissolve", "annex", "build_entity", "remove_entity"]
                        },
                        "target": {"type": "string"},
                        "newOwner": {"type": "string"},
                        "entityType": {"type": "string"},
                        "lat": {"type": "number"},
                        "lng": {"type": "number"},
                        "label": {"type": "string"}
                    },
                    "required": ["action"]
                }
            },
            "infrastructureUpdates": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "nation": {"type": "string"},
                        "type": {"type": "string"},
                        "delta": {"type": "integer"}
                    },
                    "required": ["type", "delta"]
                }
            },
            "incomingMessages": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "sender": {"type": "string"},
                        "text": {"type": "string"},
                        "targets": {"type": "array", "items": {"type": "string"}}
                    },
                    "required": ["sender", "text"]
                }
            },
            "allianceUpdate": {
                "type": "object",
                "properties": {
                    "action": {"type": "string", "enum": ["create", "update", "dissolve"]},
                    "name": {"type": "string"},
                    "type": {"type": "string"},
                    "members": {"type": "array", "items": {"type": "string"}},
                    "leader": {"type": "string"}
                },
                "required": ["action"]
            }
        },
        "required": ["timeIncrement", "events", "statChanges"]
    })
}

/// JSON schema hint for a diplomacy response.
pub fn replies_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "replies": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "sender": {"type": "string"},
                        "text": {"type": "string"}
                    },
                    "required": ["sender", "text"]
                }
            }
        },
        "required": ["replies"]
    })
}

/// Builds the request for one turn.
pub fn build_turn_request(state: &GameState, order: &PlayerOrder, chaos: ChaosLevel) -> LlmRequest {
    let user_message = format!(
        r#"## Nation
{}
## Recent History
{}
## Diplomacy
{}
## World Mood
{}

## Orders
{}

Resolve this turn and respond with the JSON object."#,
        nation_context(state),
        history_section(state),
        chat_snippet(state),
        chaos.directive(),
        orders_section(order),
    );

    LlmRequest::new(vec![PromptMessage::user(user_message)])
        .with_system_prompt(TURN_SYSTEM_PROMPT)
        .with_temperature(chaos.temperature())
        .with_max_tokens(Some(TURN_MAX_TOKENS))
        .with_response_schema(turn_response_schema())
}

/// Builds the request for one diplomatic exchange.
///
/// Earlier messages in the same thread are replayed as conversation turns:
/// the player's as user messages, foreign replies as assistant messages.
pub fn build_diplomacy_request(
    state: &GameState,
    history: &[&ChatMessage],
    recipients: &[String],
    text: &str,
) -> LlmRequest {
    let mut messages: Vec<PromptMessage> = history
        .iter()
        .map(|message| {
            if message.is_from_player() {
                PromptMessage::user(message.text.clone())
            } else {
                PromptMessage::assistant(format!(
                    r#"{{"replies": [{{"sender": {}, "text": {}}}]}}"#,
                    Value::String(message.sender_nation.clone()),
                    Value::String(message.text.clone()),
                ))
            }
        })
        .collect();

    messages.push(PromptMessage::user(format!(
        r#"## Context
{}
## Addressed Nations
{}

## Message from {}
{}"#,
        nation_context(state),
        recipients.join(", "),
        state.player_nation,
        text.trim(),
    )));

    LlmRequest::new(messages)
        .with_system_prompt(DIPLOMACY_SYSTEM_PROMPT)
        .with_temperature(ChaosLevel::Balanced.temperature())
        .with_max_tokens(Some(DIPLOMACY_MAX_TOKENS))
        .with_response_schema(replies_schema())
}

fn nation_context(state: &GameState) -> String {
    let stats = &state.stats;
    let mut out = String::new();
    let _ = writeln!(out, "Player nation: {}", state.player_nation);
    let _ = writeln!(out, "Date: {} (turn {})", state.current_date, state.turn);
    let _ = writeln!(
        out,
        "Stats: tension {}, economy {}, military {}, popularity {}, corruption {}",
        stats.tension, stats.economy, stats.military, stats.popularity, stats.corruption
    );
    let _ = writeln!(
        out,
        "Nuclear arsenal: {}. Space program: {}.",
        yes_no(state.has_nuclear),
        yes_no(state.has_space_program)
    );
    let _ = writeln!(
        out,
        "Territories held: {}",
        state.player_territories().collect::<Vec<_>>().join(", ")
    );
    if let Some(alliance) = &state.alliance {
        let _ = writeln!(
            out,
            "Alliance: {} ({}), led by {}, members: {}",
            alliance.name(),
            alliance.kind(),
            alliance.leader(),
            alliance
                .members()
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    if let Some(row) = state.infrastructure.get(&state.player_nation) {
        let installations = row
            .iter()
            .map(|(kind, count)| format!("{kind} x{count}"))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(out, "Infrastructure: {installations}");
    }
    out
}

/// The last events verbatim, plus a per-category count of anything older.
fn history_section(state: &GameState) -> String {
    let mut out = String::new();
    let history = &state.event_history;
    let older = history.len().saturating_sub(RECENT_EVENT_WINDOW);

    if older > 0 {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for event in &history[..older] {
            *counts.entry(event.category.as_str()).or_default() += 1;
        }
        let summary = counts
            .iter()
            .map(|(category, count)| format!("{count} {category}"))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(out, "Earlier: {older} events ({summary})");
    }

    let recent: Vec<_> = if history.is_empty() {
        state.recent_events.iter().collect()
    } else {
        history[older..].iter().collect()
    };
    if recent.is_empty() {
        out.push_str("Nothing of note yet.\n");
    }
    for event in recent {
        let _ = writeln!(
            out,
            "- [{}] {}: {} {}",
            event.date, event.category, event.headline, event.description
        );
    }
    out
}

fn chat_snippet(state: &GameState) -> String {
    let skip = state.chat_history.len().saturating_sub(CHAT_SNIPPET_LEN);
    let lines: Vec<String> = state.chat_history[skip..]
        .iter()
        .map(|message| {
            let to = message
                .targets
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            format!("- {} to {}: {}", message.sender_nation, to, message.text)
        })
        .collect();
    if lines.is_empty() {
        "No recent correspondence.\n".to_string()
    } else {
        lines.join("\n") + "\n"
    }
}

fn orders_section(order: &PlayerOrder) -> String {
    let mut out = String::new();
    let text = order.text.trim();
    if text.is_empty() {
        out.push_str("The government issues no new orders this turn.");
    } else {
        out.push_str(text);
    }
    if !order.queued.is_empty() {
        out.push_str("\n\nQueued actions:");
        for queued in &order.queued {
            let _ = write!(out, "\n- {}", queued.trim());
        }
    }
    out
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
