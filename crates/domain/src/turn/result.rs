//! Typed turn result - the only shape of provider output the reducer sees.
//!
//! The engine's normalizer builds these from untrusted text and fills every
//! gap with a default, so every field here is already valid.

use crate::entities::{EntityKind, EventCategory, Position};
use crate::value_objects::{StatDeltas, TimeIncrement};

pub const FALLBACK_HEADLINE: &str = "A Quiet Period";
pub const FALLBACK_DESCRIPTION: &str =
    "Diplomatic channels remain quiet as the world watches and waits.";

/// One story fragment proposed by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NarrativeItem {
    pub category: EventCategory,
    pub headline: String,
    pub description: String,
    pub related_nation: Option<String>,
}

impl NarrativeItem {
    pub fn text(&self) -> String {
        format!("{} {}", self.headline, self.description)
    }
}

/// Optional boolean capability signals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TurnFlags {
    pub space_program: Option<bool>,
    pub nuclear_acquired: Option<bool>,
}

/// Structured effects a provider may report directly.
///
/// When a field is `Some`, it decides the matching penalty and the keyword
/// scan for that penalty is skipped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TurnEffects {
    pub attacked: Option<bool>,
    pub bombarded: Option<bool>,
    pub casualties: Option<bool>,
    pub nuclear_strike_received: Option<bool>,
}

/// One ownership or installation change, applied in order.
#[derive(Debug, Clone, PartialEq)]
pub enum MapUpdate {
    /// Territory leaves the owned set and becomes neutral
    Dissolve { territory: String },
    /// Territory passes to `new_owner` (the player when absent)
    Annex {
        territory: String,
        new_owner: Option<String>,
    },
    BuildEntity {
        kind: EntityKind,
        /// Type string exactly as the provider wrote it
        raw_kind: String,
        position: Position,
        label: Option<String>,
        owner: Option<String>,
    },
    /// Removes entities whose id equals, or whose label contains, the selector
    RemoveEntity { selector: String },
}

impl MapUpdate {
    /// Territory this update targets, for last-write-wins ordering.
    pub fn territory(&self) -> Option<&str> {
        match self {
            Self::Dissolve { territory } | Self::Annex { territory, .. } => Some(territory.as_str()),
            Self::BuildEntity { .. } | Self::RemoveEntity { .. } => None,
        }
    }
}

/// Signed change to one row of the infrastructure table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfrastructureUpdate {
    pub nation: Option<String>,
    pub kind: String,
    pub delta: i32,
}

/// An unsolicited message the provider claims some nation sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub sender: String,
    pub text: String,
    pub targets: Vec<String>,
}

/// A reply to a message the player sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiplomaticReply {
    pub sender: String,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllianceAction {
    Create,
    Update,
    Dissolve,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllianceUpdate {
    pub action: AllianceAction,
    pub name: Option<String>,
    pub kind: Option<String>,
    pub members: Vec<String>,
    pub leader: Option<String>,
}

/// A fully-defaulted provider response for one turn.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TurnResult {
    pub time_increment: TimeIncrement,
    pub events: Vec<NarrativeItem>,
    pub deltas: StatDeltas,
    pub flags: TurnFlags,
    pub effects: TurnEffects,
    pub map_updates: Vec<MapUpdate>,
    pub infrastructure_updates: Vec<InfrastructureUpdate>,
    pub inbound_messages: Vec<InboundMessage>,
    pub alliance_update: Option<AllianceUpdate>,
}

impl TurnResult {
    /// The safe result used whenever provider output is unusable: one neutral
    /// event, zero deltas, nothing else.
    pub fn fallback() -> Self {
        Self {
            events: vec![NarrativeItem {
                category: EventCategory::World,
                headline: FALLBACK_HEADLINE.to_string(),
                description: FALLBACK_DESCRIPTION.to_string(),
                related_nation: None,
            }],
            ..Self::default()
        }
    }

    /// Every narrative item joined by newlines.
    pub fn narrative_text(&self) -> String {
        self.events
            .iter()
            .map(NarrativeItem::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn has_war_event(&self) -> bool {
        self.events.iter().any(|event| event.category.is_war())
    }
}
