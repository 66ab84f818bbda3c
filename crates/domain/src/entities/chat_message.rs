//! ChatMessage entity - one diplomatic message
//!
//! Messages are never deleted; the only mutation is flipping `is_read`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::MessageId;

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderRole {
    Player,
    Ai,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub sender_role: SenderRole,
    /// Canonical name of the sending nation or actor
    pub sender_nation: String,
    /// Canonical names of the addressed nations
    pub targets: BTreeSet<String>,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub is_read: bool,
}

impl ChatMessage {
    /// A message the player wrote. Self-authored messages are always read.
    pub fn from_player(
        player_nation: impl Into<String>,
        targets: BTreeSet<String>,
        text: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MessageId::new(),
            sender_role: SenderRole::Player,
            sender_nation: player_nation.into(),
            targets,
            text: text.into(),
            timestamp,
            is_read: true,
        }
    }

    /// A message from another nation, arriving unread.
    pub fn from_nation(
        sender_nation: impl Into<String>,
        targets: BTreeSet<String>,
        text: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MessageId::new(),
            sender_role: SenderRole::Ai,
            sender_nation: sender_nation.into(),
            targets,
            text: text.into(),
            timestamp,
            is_read: false,
        }
    }

    pub fn is_from_player(&self) -> bool {
        self.sender_role == SenderRole::Player
    }

    /// Sender plus targets, minus the player.
    ///
    /// This set is the identity of the conversation thread the message belongs to.
    pub fn participants_excluding(&self, player_nation: &str) -> BTreeSet<String> {
        self.targets
            .iter()
            .chain(std::iter::once(&self.sender_nation))
            .filter(|nation| nation.as_str() != player_nation)
            .cloned()
            .collect()
    }
}
