//! Infrastructure implementations.
//!
//! Contains port trait implementations for external dependencies.

pub mod anthropic;
pub mod clock;
pub mod config;
pub mod memory_repo;
pub mod ollama;
pub mod ports;
pub mod resilient_llm;
pub mod saved_games;
