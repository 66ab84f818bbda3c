//! Session use cases.
//!
//! A session owns one running game and serializes access to it.

mod game_session;

pub use game_session::{GameSession, Notification, SessionError, SessionServices};
