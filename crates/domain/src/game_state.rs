//! GameState - the single authoritative aggregate of a running game.
//!
//! The state is an explicit value: the reducer takes one `GameState` and
//! returns the next, persistence stores it, and nothing else mutates it.
//!
//! # Invariants
//!
//! - every stat gauge is within `[0, 100]`
//! - owned territories (keys of `territory_owners`) and `neutral_territories` are disjoint
//! - the player owns their home territory unless the game is over
//! - `recent_events` holds at most [`RECENT_EVENT_WINDOW`] entries
//! - nation names are canonical (see [`canonical_nation`])
//!
//! `has_nuclear` and `has_space_program` only ever go from `false` to `true`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::entities::{Alliance, ChatMessage, EventCategory, GameEvent, MapEntity};
use crate::error::DomainError;
use crate::turn::Defeat;
use crate::value_objects::{
    canonical_nation, is_known_nuclear_power, launch_date, Stats, PLAYABLE_NATIONS,
};
use crate::GameId;

/// Size of the bounded recent-event window.
pub const RECENT_EVENT_WINDOW: usize = 10;

/// Infrastructure row key counted by the nuclear annexation check.
pub const NUCLEAR_SILO_KEY: &str = "nuclear_silo";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub game_id: GameId,
    pub current_date: NaiveDate,
    /// Turn being played; starts at 1 and grows by exactly 1 per resolved turn
    pub turn: u32,
    /// Canonical name of the nation the player governs
    pub player_nation: String,
    /// The owned set: territory -> owning nation
    pub territory_owners: BTreeMap<String, String>,
    /// Dissolved territories nobody owns
    pub neutral_territories: BTreeSet<String>,
    pub map_entities: Vec<MapEntity>,
    /// nation -> installation type -> count
    pub infrastructure: BTreeMap<String, BTreeMap<String, u32>>,
    pub stats: Stats,
    pub has_nuclear: bool,
    pub has_space_program: bool,
    pub alliance: Option<Alliance>,
    pub chat_history: Vec<ChatMessage>,
    /// Nations the player wrote to that have not answered yet
    pub pending_responses: BTreeSet<String>,
    pub recent_events: VecDeque<GameEvent>,
    /// Unbounded chronicle. Persistence stores it apart from the state row.
    #[serde(default)]
    pub event_history: Vec<GameEvent>,
    /// Terminal flag and reason; once set the game is frozen
    pub game_over: Option<Defeat>,
}

impl GameState {
    /// Creates a fresh game with the launch defaults.
    ///
    /// Every roster nation owns its home territory; the player's nation is
    /// added when it is not on the roster.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if `player_nation` is blank.
    pub fn new(player_nation: &str) -> Result<Self, DomainError> {
        let player = canonical_nation(player_nation)
            .ok_or_else(|| DomainError::validation("Player nation cannot be empty"))?;

        let mut territory_owners: BTreeMap<String, String> = PLAYABLE_NATIONS
            .iter()
            .map(|nation| (nation.to_string(), nation.to_string()))
            .collect();
        territory_owners.insert(player.clone(), player.clone());

        let start = launch_date();
        let opening = GameEvent::new(
            start,
            EventCategory::Player,
            format!("A new government takes office in {player}"),
            format!("The leadership of {player} begins its first term amid an uneasy world."),
        )
        .with_related_nation(Some(player.clone()));

        let mut state = Self {
            game_id: GameId::new(),
            current_date: start,
            turn: 1,
            has_nuclear: is_known_nuclear_power(&player),
            player_nation: player,
            territory_owners,
            neutral_territories: BTreeSet::new(),
            map_entities: Vec::new(),
            infrastructure: BTreeMap::new(),
            stats: Stats::default(),
            has_space_program: false,
            alliance: None,
            chat_history: Vec::new(),
            pending_responses: BTreeSet::new(),
            recent_events: VecDeque::new(),
            event_history: Vec::new(),
            game_over: None,
        };
        state.record_events(vec![opening]);
        Ok(state)
    }

    /// The player's home territory carries the nation's name.
    #[inline]
    pub fn home_territory(&self) -> &str {
        &self.player_nation
    }

    #[inline]
    pub fn is_game_over(&self) -> bool {
        self.game_over.is_some()
    }

    /// User-facing reason for the end of the game, if it ended.
    pub fn game_over_reason(&self) -> Option<&'static str> {
        self.game_over.map(|defeat| defeat.message())
    }

    pub fn owner_of(&self, territory: &str) -> Option<&str> {
        self.territory_owners.get(territory).map(String::as_str)
    }

    /// Territories currently held by the player.
    pub fn player_territories(&self) -> impl Iterator<Item = &str> + '_ {
        self.territory_owners
            .iter()
            .filter(|(_, owner)| **owner == self.player_nation)
            .map(|(territory, _)| territory.as_str())
    }

    /// Every nation currently holding at least one territory.
    pub fn territorial_nations(&self) -> BTreeSet<&str> {
        self.territory_owners.values().map(String::as_str).collect()
    }

    /// Installation count for one nation and type.
    pub fn installation_count(&self, nation: &str, kind: &str) -> u32 {
        self.infrastructure
            .get(nation)
            .and_then(|row| row.get(kind))
            .copied()
            .unwrap_or(0)
    }

    /// Whether the territory brings a nuclear arsenal with it when annexed.
    pub fn territory_has_nuclear_arsenal(&self, territory: &str) -> bool {
        is_known_nuclear_power(territory)
            || self.installation_count(territory, NUCLEAR_SILO_KEY) > 0
    }

    pub fn unread_message_count(&self) -> usize {
        self.chat_history
            .iter()
            .filter(|message| !message.is_read && !message.is_from_player())
            .count()
    }

    /// Appends events to both the bounded window and the full history.
    pub fn record_events(&mut self, events: Vec<GameEvent>) {
        for event in events {
            self.recent_events.push_back(event.clone());
            self.event_history.push(event);
        }
        while self.recent_events.len() > RECENT_EVENT_WINDOW {
            self.recent_events.pop_front();
        }
    }

    /// Checks every structural invariant.
    ///
    /// Used after loading a save and throughout the tests.
    pub fn check_invariants(&self) -> Result<(), DomainError> {
        if !self.stats.is_within_bounds() {
            return Err(DomainError::constraint(format!(
                "stat gauges out of bounds: {:?}",
                self.stats
            )));
        }
        if let Some(overlap) = self
            .neutral_territories
            .iter()
            .find(|territory| self.territory_owners.contains_key(*territory))
        {
            return Err(DomainError::constraint(format!(
                "territory '{overlap}' is both owned and neutral"
            )));
        }
        let home_owner = self.owner_of(self.home_territory());
        if !self.is_game_over() && home_owner != Some(self.player_nation.as_str()) {
            return Err(DomainError::constraint(
                "player lost their home territory but the game is not over",
            ));
        }
        if self.recent_events.len() > RECENT_EVENT_WINDOW {
            return Err(DomainError::constraint("recent event window overflow"));
        }
        if let Some(alliance) = &self.alliance {
            if !alliance.is_member(alliance.leader()) {
                return Err(DomainError::constraint("alliance leader is not a member"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_game_uses_launch_defaults() {
        let state = GameState::new("the usa").expect("valid nation");

        assert_eq!(state.player_nation, "United States");
        assert_eq!(state.turn, 1);
        assert_eq!(state.current_date, launch_date());
        assert_eq!(state.stats, Stats::default());
        assert!(state.has_nuclear, "launch-time nuclear powers start armed");
        assert!(!state.has_space_program);
        assert_eq!(state.owner_of("United States"), Some("United States"));
        assert_eq!(state.recent_events.len(), 1);
        assert_eq!(state.event_history.len(), 1);
        state.check_invariants().expect("fresh state is valid");
    }

    #[test]
    fn fictional_player_gets_a_home_territory() {
        let state = GameState::new("Arcadia").expect("valid nation");
        assert!(!state.has_nuclear);
        assert_eq!(state.player_territories().collect::<Vec<_>>(), vec!["Arcadia"]);
    }

    #[test]
    fn blank_player_nation_is_rejected() {
        assert!(GameState::new("   ").is_err());
    }

    #[test]
    fn recent_window_is_bounded_but_history_is_not() {
        let mut state = GameState::new("France").expect("valid nation");
        let events = (0..15)
            .map(|i| GameEvent::new(state.current_date, EventCategory::World, format!("E{i}"), ""))
            .collect();
        state.record_events(events);

        assert_eq!(state.recent_events.len(), RECENT_EVENT_WINDOW);
        assert_eq!(state.event_history.len(), 16);
        assert_eq!(
            state.recent_events.back().map(|e| e.headline.as_str()),
            Some("E14")
        );
    }

    #[test]
    fn overlapping_territory_sets_violate_invariants() {
        let mut state = GameState::new("France").expect("valid nation");
        state.neutral_territories.insert("Spain".to_string());
        assert!(state.check_invariants().is_err());
    }

    #[test]
    fn silo_rows_mark_a_territory_as_nuclear() {
        let mut state = GameState::new("France").expect("valid nation");
        assert!(!state.territory_has_nuclear_arsenal("Brazil"));
        state
            .infrastructure
            .entry("Brazil".to_string())
            .or_default()
            .insert(NUCLEAR_SILO_KEY.to_string(), 2);
        assert!(state.territory_has_nuclear_arsenal("Brazil"));
        assert!(state.territory_has_nuclear_arsenal("Pakistan"));
    }
}
