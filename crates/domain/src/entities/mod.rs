//! Domain entities - records with identity that live inside the game state

mod alliance;
mod chat_message;
mod game_event;
mod map_entity;

pub use alliance::Alliance;
pub use chat_message::{ChatMessage, SenderRole};
pub use game_event::{EventCategory, GameEvent};
pub use map_entity::{EntityKind, MapEntity, Position};
