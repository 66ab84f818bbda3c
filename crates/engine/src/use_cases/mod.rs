//! Use cases - User story orchestration.
//!
//! Each module contains use cases for a specific domain area.

pub mod diplomacy;
pub mod session;
pub mod turn;

pub use diplomacy::DiplomacyUseCases;
pub use session::{GameSession, SessionServices};
pub use turn::TurnUseCases;
