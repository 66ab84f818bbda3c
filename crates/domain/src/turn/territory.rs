//! Territory & map update resolution.
//!
//! Updates are applied in order. For territory updates, only the last update
//! targeting a given territory in one turn takes effect.

use std::collections::HashMap;

use crate::entities::MapEntity;
use crate::game_state::GameState;
use crate::turn::result::MapUpdate;
use crate::value_objects::canonical_nation;
use crate::EntityId;

/// What the map updates did, fed into the penalty and flag rules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TerritoryOutcome {
    /// Territories the player newly gained this turn
    pub annexed_by_player: Vec<String>,
    /// True if any of those territories came with a nuclear arsenal
    pub annexed_nuclear: bool,
    /// Territories transferred between other nations
    pub transferred: Vec<String>,
    pub dissolved: Vec<String>,
    pub entities_built: usize,
    pub entities_removed: usize,
}

impl TerritoryOutcome {
    pub fn annexation_occurred(&self) -> bool {
        !self.annexed_by_player.is_empty()
    }
}

/// Applies `updates` to the state's territory sets and map entities.
pub fn resolve_map_updates(state: &mut GameState, updates: &[MapUpdate]) -> TerritoryOutcome {
    let mut outcome = TerritoryOutcome::default();

    // Index of the final update per canonical territory
    let mut last_write: HashMap<String, usize> = HashMap::new();
    for (index, update) in updates.iter().enumerate() {
        if let Some(territory) = update.territory().and_then(canonical_nation) {
            last_write.insert(territory, index);
        }
    }

    for (index, update) in updates.iter().enumerate() {
        match update {
            MapUpdate::Dissolve { territory } => {
                let Some(territory) = canonical_nation(territory) else {
                    continue;
                };
                if last_write.get(&territory) != Some(&index) {
                    continue;
                }
                dissolve(state, territory, &mut outcome);
            }
            MapUpdate::Annex {
                territory,
                new_owner,
            } => {
                let Some(territory) = canonical_nation(territory) else {
                    continue;
                };
                if last_write.get(&territory) != Some(&index) {
                    continue;
                }
                let new_owner = new_owner
                    .as_deref()
                    .and_then(canonical_nation)
                    .unwrap_or_else(|| state.player_nation.clone());
                annex(state, territory, new_owner, &mut outcome);
            }
            MapUpdate::BuildEntity {
                kind,
                raw_kind,
                position,
                label,
                owner,
            } => {
                let label = match label.as_deref().map(str::trim) {
                    Some(text) if !text.is_empty() && !text.eq_ignore_ascii_case(raw_kind.trim()) => {
                        text.to_string()
                    }
                    _ => kind.default_label().to_string(),
                };
                let owner = owner
                    .as_deref()
                    .and_then(canonical_nation)
                    .unwrap_or_else(|| state.player_nation.clone());
                state.map_entities.push(MapEntity {
                    id: EntityId::new(),
                    kind: *kind,
                    position: *position,
                    label,
                    owner,
                });
                outcome.entities_built += 1;
            }
            MapUpdate::RemoveEntity { selector } => {
                outcome.entities_removed += remove_entities(state, selector);
            }
        }
    }

    outcome
}

fn dissolve(state: &mut GameState, territory: String, outcome: &mut TerritoryOutcome) {
    state.territory_owners.remove(&territory);
    if state.neutral_territories.insert(territory.clone()) {
        outcome.dissolved.push(territory);
    }
}

fn annex(state: &mut GameState, territory: String, new_owner: String, outcome: &mut TerritoryOutcome) {
    state.neutral_territories.remove(&territory);

    let previous = state.territory_owners.get(&territory).cloned();
    if previous.as_deref() == Some(new_owner.as_str()) {
        return;
    }

    if new_owner == state.player_nation {
        if state.territory_has_nuclear_arsenal(&territory) {
            outcome.annexed_nuclear = true;
        }
        outcome.annexed_by_player.push(territory.clone());
    } else {
        outcome.transferred.push(territory.clone());
    }
    state.territory_owners.insert(territory, new_owner);
}

/// Removes entities by exact id or case-insensitive label substring.
fn remove_entities(state: &mut GameState, selector: &str) -> usize {
    let selector = selector.trim();
    if selector.is_empty() {
        return 0;
    }
    let by_id = selector.parse::<EntityId>().ok();
    let needle = selector.to_lowercase();

    let before = state.map_entities.len();
    state.map_entities.retain(|entity| {
        let id_match = by_id == Some(entity.id);
        let label_match = entity.label.to_lowercase().contains(&needle);
        !(id_match || label_match)
    });
    before - state.map_entities.len()
}
