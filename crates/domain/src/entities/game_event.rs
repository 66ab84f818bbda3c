//! GameEvent entity - one line of the world's chronicle
//!
//! Events are append-only. The reducer creates one for the player's order and
//! one per narrative item the provider returns; nothing edits them afterwards.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DomainError;
use crate::EventId;

/// Event classification used for display and for penalty rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    /// The player's own order
    Player,
    /// General world news
    #[default]
    World,
    Crisis,
    Economy,
    /// Armed conflict - drives the war penalties
    War,
    Alliance,
}

impl EventCategory {
    pub const ALL: [EventCategory; 6] = [
        Self::Player,
        Self::World,
        Self::Crisis,
        Self::Economy,
        Self::War,
        Self::Alliance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Player => "player",
            Self::World => "world",
            Self::Crisis => "crisis",
            Self::Economy => "economy",
            Self::War => "war",
            Self::Alliance => "alliance",
        }
    }

    pub fn is_war(&self) -> bool {
        matches!(self, Self::War)
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EventCategory {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "player" => Ok(Self::Player),
            "world" | "news" | "diplomacy" => Ok(Self::World),
            "crisis" | "disaster" => Ok(Self::Crisis),
            "economy" | "economic" | "trade" => Ok(Self::Economy),
            "war" | "military" | "conflict" => Ok(Self::War),
            "alliance" | "treaty" => Ok(Self::Alliance),
            other => Err(DomainError::parse(format!("unknown event category '{other}'"))),
        }
    }
}

/// An immutable chronicle entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEvent {
    pub id: EventId,
    pub date: NaiveDate,
    pub category: EventCategory,
    pub headline: String,
    pub description: String,
    /// Canonical name of the nation the event concerns, if any
    pub related_nation: Option<String>,
}

impl GameEvent {
    pub fn new(
        date: NaiveDate,
        category: EventCategory,
        headline: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: EventId::new(),
            date,
            category,
            headline: headline.into(),
            description: description.into(),
            related_nation: None,
        }
    }

    pub fn with_related_nation(mut self, nation: Option<String>) -> Self {
        self.related_nation = nation;
        self
    }

    /// Headline and description joined, as scanned by the penalty rules.
    pub fn narrative_text(&self) -> String {
        format!("{} {}", self.headline, self.description)
    }
}
