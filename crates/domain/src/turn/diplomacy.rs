//! Diplomacy routing: outgoing player messages, replies, unsolicited inbound
//! messages and conversation threads.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use thiserror::Error;

use crate::common::none_if_blank;
use crate::entities::ChatMessage;
use crate::game_state::GameState;
use crate::turn::result::{DiplomaticReply, InboundMessage};
use crate::value_objects::{canonical_nation, is_playable_nation, is_supranational_actor};

/// Identity of a conversation: the order-independent set of non-player participants.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ThreadKey(BTreeSet<String>);

impl ThreadKey {
    /// Builds a key from raw names, canonicalizing them and dropping the player.
    pub fn new<'a>(player_nation: &str, names: impl IntoIterator<Item = &'a str>) -> Self {
        Self(
            names
                .into_iter()
                .filter_map(canonical_nation)
                .filter(|name| name != player_nation)
                .collect(),
        )
    }

    pub fn of(message: &ChatMessage, player_nation: &str) -> Self {
        Self(message.participants_excluding(player_nation))
    }

    pub fn participants(&self) -> &BTreeSet<String> {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Why an outgoing player message was refused.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OutgoingRejection {
    #[error("Message has no valid recipients")]
    NoRecipients,
    #[error("Message text is empty")]
    EmptyMessage,
}

/// Why an inbound or reply message was dropped.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InboundRejection {
    #[error("Message has no sender")]
    NoSender,
    #[error("Message claims to come from the player's own nation '{0}'")]
    SpoofedSender(String),
    #[error("Sender '{0}' is not a recognized nation")]
    UnknownSender(String),
    #[error("Sender '{0}' was not addressed")]
    NotAddressed(String),
    #[error("Message from '{0}' has no text")]
    EmptyText(String),
}

/// Result of delivering a batch of provider-authored messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub rejected: Vec<InboundRejection>,
}

/// Static roster, supranational actors, and anyone currently holding territory.
pub fn is_recognized_sender(state: &GameState, nation: &str) -> bool {
    is_playable_nation(nation)
        || is_supranational_actor(nation)
        || state.territory_owners.values().any(|owner| owner == nation)
}

/// Appends the player's message and marks every recipient as pending.
///
/// Recipients are canonicalized; the player and unrecognized names are dropped.
pub fn send_player_message(
    state: &mut GameState,
    targets: &[String],
    text: &str,
    now: DateTime<Utc>,
) -> Result<ChatMessage, OutgoingRejection> {
    let text = none_if_blank(text).ok_or(OutgoingRejection::EmptyMessage)?;
    let recipients: BTreeSet<String> = targets
        .iter()
        .filter_map(|target| canonical_nation(target))
        .filter(|target| *target != state.player_nation && is_recognized_sender(state, target))
        .collect();
    if recipients.is_empty() {
        return Err(OutgoingRejection::NoRecipients);
    }

    state.pending_responses.extend(recipients.iter().cloned());
    let message = ChatMessage::from_player(state.player_nation.clone(), recipients, text, now);
    state.chat_history.push(message.clone());
    Ok(message)
}

/// Appends replies from the addressed nations as unread messages.
///
/// Each reply is addressed to the player and the rest of the original
/// recipients, so it lands in the same thread as the outgoing message.
pub fn accept_replies(
    state: &mut GameState,
    addressed: &BTreeSet<String>,
    replies: &[DiplomaticReply],
    now: DateTime<Utc>,
) -> DeliveryReport {
    let mut report = DeliveryReport::default();
    for reply in replies {
        let sender = match validate_sender(state, &reply.sender) {
            Ok(sender) => sender,
            Err(rejection) => {
                report.rejected.push(rejection);
                continue;
            }
        };
        if !addressed.contains(&sender) {
            report.rejected.push(InboundRejection::NotAddressed(sender));
            continue;
        }
        let Some(text) = none_if_blank(&reply.text) else {
            report.rejected.push(InboundRejection::EmptyText(sender));
            continue;
        };

        let targets = addressed
            .iter()
            .filter(|nation| **nation != sender)
            .cloned()
            .chain(std::iter::once(state.player_nation.clone()))
            .collect();
        state.pending_responses.remove(&sender);
        state
            .chat_history
            .push(ChatMessage::from_nation(sender, targets, text, now));
        report.delivered += 1;
    }
    report
}

/// Validates one unsolicited message and builds the chat entry for it.
///
/// The player is always added to the targets.
pub fn accept_inbound(
    state: &GameState,
    message: &InboundMessage,
    now: DateTime<Utc>,
) -> Result<ChatMessage, InboundRejection> {
    let sender = validate_sender(state, &message.sender)?;
    let text = none_if_blank(&message.text)
        .ok_or_else(|| InboundRejection::EmptyText(sender.clone()))?;

    let mut targets: BTreeSet<String> = message
        .targets
        .iter()
        .filter_map(|target| canonical_nation(target))
        .filter(|target| *target != sender)
        .collect();
    targets.insert(state.player_nation.clone());

    Ok(ChatMessage::from_nation(sender, targets, text, now))
}

/// Validates and appends a batch of unsolicited messages.
pub fn deliver_inbound(
    state: &mut GameState,
    messages: &[InboundMessage],
    now: DateTime<Utc>,
) -> DeliveryReport {
    let mut report = DeliveryReport::default();
    for message in messages {
        match accept_inbound(state, message, now) {
            Ok(chat) => {
                state.chat_history.push(chat);
                report.delivered += 1;
            }
            Err(rejection) => report.rejected.push(rejection),
        }
    }
    report
}

/// Marks unread nation messages of exactly this thread as read.
///
/// Returns how many messages changed.
pub fn mark_thread_read(state: &mut GameState, thread: &ThreadKey) -> usize {
    let player = state.player_nation.clone();
    let mut marked = 0;
    for message in state
        .chat_history
        .iter_mut()
        .filter(|message| !message.is_read && !message.is_from_player())
    {
        if ThreadKey::of(message, &player) == *thread {
            message.is_read = true;
            marked += 1;
        }
    }
    marked
}

/// Every message of one thread, oldest first.
pub fn thread_messages<'a>(
    state: &'a GameState,
    thread: &'a ThreadKey,
) -> impl Iterator<Item = &'a ChatMessage> + 'a {
    state
        .chat_history
        .iter()
        .filter(move |message| ThreadKey::of(message, &state.player_nation) == *thread)
}

/// Distinct threads in order of their first message.
pub fn threads(state: &GameState) -> Vec<ThreadKey> {
    let mut seen = Vec::new();
    for message in &state.chat_history {
        let key = ThreadKey::of(message, &state.player_nation);
        if !key.is_empty() && !seen.contains(&key) {
            seen.push(key);
        }
    }
    seen
}

fn validate_sender(state: &GameState, raw: &str) -> Result<String, InboundRejection> {
    let sender = canonical_nation(raw).ok_or(InboundRejection::NoSender)?;
    if sender == state.player_nation {
        return Err(InboundRejection::SpoofedSender(sender));
    }
    if !is_recognized_sender(state, &sender) {
        return Err(InboundRejection::UnknownSender(sender));
    }
    Ok(sender)
}
