//! Statecraft Engine library.
//!
//! Everything around the pure rules in `statecraft-domain`: the narrative
//! gateway, turn and diplomacy orchestration, sessions and save games.
//!
//! ## Structure
//!
//! - `use_cases/` - Turn, diplomacy and session orchestration
//! - `infrastructure/` - External dependency implementations (ports + adapters)
//! - `app` - Application composition

pub mod app;
pub mod infrastructure;
pub mod use_cases;

/// Shared test doubles.
#[cfg(test)]
pub mod test_fixtures;

pub use app::App;
