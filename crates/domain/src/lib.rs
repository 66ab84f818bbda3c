pub mod common;
pub mod entities;
pub mod error;
pub mod game_state;
pub mod ids;
pub mod turn;
pub mod value_objects;

pub use entities::{
    Alliance, ChatMessage, EntityKind, EventCategory, GameEvent, MapEntity, Position, SenderRole,
};

pub use error::DomainError;

pub use game_state::{GameState, NUCLEAR_SILO_KEY, RECENT_EVENT_WINDOW};

// Re-export ID types
pub use ids::{EntityId, EventId, GameId, MessageId};

pub use turn::{
    apply_turn, Defeat, DiplomaticReply, InboundMessage, MapUpdate, NarrativeItem, PlayerOrder,
    ThreadKey, TurnReport, TurnResult, TurnTransition,
};

pub use value_objects::{
    canonical_nation, launch_date, StatDeltas, StatKind, Stats, TimeIncrement, STAT_MAX, STAT_MIN,
};
