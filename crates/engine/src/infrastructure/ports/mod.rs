//! Port traits for infrastructure boundaries.
//!
//! These are the ONLY abstractions in the engine. Everything else is concrete types.
//! Ports exist for:
//! - Narrative generation (could swap Ollama -> Anthropic -> anything OpenAI-compatible)
//! - Saved games (could swap SQLite -> in-memory)
//! - Clock (for testing)

mod error;
mod external;
mod repos;
mod testing;

// =============================================================================
// Repository Ports
// =============================================================================
pub use repos::{GameRepo, SavedGame};

#[cfg(test)]
pub use repos::MockGameRepo;

// =============================================================================
// External Service Ports
// =============================================================================
pub use external::{
    FinishReason, LlmPort, LlmRequest, LlmResponse, MessageRole, PromptMessage, TokenUsage,
};

// =============================================================================
// Testing Ports
// =============================================================================
pub use testing::ClockPort;

#[cfg(test)]
pub use testing::MockClockPort;

// =============================================================================
// Error Types
// =============================================================================
pub use error::{LlmError, RepoError};
