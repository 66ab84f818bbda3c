//! Common utility functions shared by the turn rules and the engine.
//!
//! # Design Principles
//!
//! - **Pure functions only** - no side effects, no I/O
//! - **Minimal dependencies** - only chrono for date utilities

pub mod datetime;
pub mod string;

// Re-export commonly used functions at crate root for convenience
pub use datetime::{format_game_date, parse_game_date, parse_game_date_or};
pub use string::{contains_any_ignore_case, none_if_blank, truncate_chars};
