//! The player's instructions for one turn.

use serde::{Deserialize, Serialize};

/// Free-text order plus any structured orders queued from the UI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerOrder {
    pub text: String,
    #[serde(default)]
    pub queued: Vec<String>,
}

impl PlayerOrder {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            queued: Vec::new(),
        }
    }

    pub fn with_queued(mut self, queued: Vec<String>) -> Self {
        self.queued = queued;
        self
    }

    /// Free text followed by each queued order on its own line, blanks skipped.
    pub fn combined(&self) -> String {
        std::iter::once(self.text.as_str())
            .chain(self.queued.iter().map(String::as_str))
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn is_blank(&self) -> bool {
        self.combined().is_empty()
    }
}
