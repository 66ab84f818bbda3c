//! Win/loss evaluation.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::game_state::GameState;
use crate::value_objects::{Stats, STAT_MAX, STAT_MIN};

/// Number of simultaneous failure conditions that collapse the state.
pub const COLLAPSE_THRESHOLD: usize = 3;

/// Why the game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Defeat {
    /// The player no longer holds their home territory
    NationDissolved,
    /// Too many gauges hit their failure bound at once
    SystemicCollapse,
}

impl Defeat {
    pub fn message(&self) -> &'static str {
        match self {
            Self::NationDissolved => {
                "Your nation has been dissolved. Its homeland is no longer under your control."
            }
            Self::SystemicCollapse => {
                "Systemic collapse: your government has fallen as the state failed on every front."
            }
        }
    }
}

impl fmt::Display for Defeat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

/// Counts failing gauges: economy, military or popularity at the floor,
/// tension or corruption at the ceiling.
pub fn collapse_conditions(stats: &Stats) -> usize {
    [
        stats.economy <= STAT_MIN,
        stats.military <= STAT_MIN,
        stats.popularity <= STAT_MIN,
        stats.tension >= STAT_MAX,
        stats.corruption >= STAT_MAX,
    ]
    .into_iter()
    .filter(|failing| *failing)
    .count()
}

/// Returns the defeat the state is in, if any. Dissolution is checked first.
pub fn evaluate_outcome(state: &GameState) -> Option<Defeat> {
    if state.owner_of(state.home_territory()) != Some(state.player_nation.as_str()) {
        return Some(Defeat::NationDissolved);
    }
    if collapse_conditions(&state.stats) >= COLLAPSE_THRESHOLD {
        return Some(Defeat::SystemicCollapse);
    }
    None
}
