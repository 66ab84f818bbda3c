//! World state reducer - folds one normalized turn result into the next state.
//!
//! The sequence is fixed:
//!
//! 1. provider deltas
//! 2. auto-drift for the current turn number
//! 3. map, infrastructure and inbound message updates
//! 4. event-derived penalties
//! 5. clamp the gauges
//! 6. capability flags
//! 7. alliance instruction
//! 8. win/loss evaluation
//! 9. calendar and turn counter
//! 10. player-order and narrative events
//!
//! A terminal state is returned untouched.

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeSet;

use crate::common::{none_if_blank, truncate_chars};
use crate::entities::{Alliance, EventCategory, GameEvent};
use crate::error::DomainError;
use crate::game_state::GameState;
use crate::turn::diplomacy::{deliver_inbound, DeliveryReport};
use crate::turn::order::PlayerOrder;
use crate::turn::outcome::{evaluate_outcome, Defeat};
use crate::turn::penalties::{auto_drift, nuclear_program_succeeded, PenaltySignals};
use crate::turn::result::{
    AllianceAction, AllianceUpdate, InfrastructureUpdate, TurnResult,
};
use crate::turn::territory::{resolve_map_updates, TerritoryOutcome};
use crate::value_objects::{canonical_nation, StatDeltas};

/// Maximum length of the player-order event headline.
pub const ORDER_HEADLINE_MAX_CHARS: usize = 80;

pub const DEFAULT_ALLIANCE_NAME: &str = "Unnamed Alliance";
pub const DEFAULT_ALLIANCE_KIND: &str = "Alliance";

/// The next state plus what happened on the way there.
#[derive(Debug, Clone)]
pub struct TurnTransition {
    pub state: GameState,
    pub report: TurnReport,
}

#[derive(Debug, Clone, Default)]
pub struct TurnReport {
    /// The state was already terminal and nothing changed
    pub frozen: bool,
    /// Total deltas applied before clamping
    pub applied_deltas: StatDeltas,
    pub penalties: PenaltySignals,
    pub territory: TerritoryOutcome,
    pub inbound: DeliveryReport,
    pub nuclear_acquired: bool,
    pub space_program_started: bool,
    /// Alliance instruction that could not be applied
    pub alliance_rejected: Option<DomainError>,
    pub defeat: Option<Defeat>,
    /// Events appended this turn, player order first
    pub new_events: Vec<GameEvent>,
}

/// Applies one turn to `state`.
///
/// Events are dated with the date the turn was played, before the calendar
/// advances.
pub fn apply_turn(
    mut state: GameState,
    order: &PlayerOrder,
    result: &TurnResult,
    now: DateTime<Utc>,
) -> TurnTransition {
    if state.is_game_over() {
        return TurnTransition {
            state,
            report: TurnReport {
                frozen: true,
                ..TurnReport::default()
            },
        };
    }

    let mut report = TurnReport::default();
    let order_text = order.combined();
    let narrative = result.narrative_text();

    // 1-2
    let mut deltas = result.deltas + auto_drift(state.turn);

    // 3
    report.territory = resolve_map_updates(&mut state, &result.map_updates);
    apply_infrastructure_updates(&mut state, &result.infrastructure_updates);
    report.inbound = deliver_inbound(&mut state, &result.inbound_messages, now);

    // 4
    report.penalties = PenaltySignals::detect(
        result,
        report.territory.annexation_occurred(),
        &state.player_nation,
    );
    deltas += report.penalties.deltas();
    report.applied_deltas = deltas;

    // 5
    state.stats.apply(&deltas);
    state.stats = state.stats.clamped();

    // 6
    if result.flags.space_program == Some(true) && !state.has_space_program {
        state.has_space_program = true;
        report.space_program_started = true;
    }
    let nuclear = result.flags.nuclear_acquired == Some(true)
        || nuclear_program_succeeded(&order_text, &narrative)
        || report.territory.annexed_nuclear;
    if nuclear && !state.has_nuclear {
        state.has_nuclear = true;
        report.nuclear_acquired = true;
    }

    // 7
    if let Some(update) = &result.alliance_update {
        if let Err(err) = apply_alliance_update(&mut state, update) {
            report.alliance_rejected = Some(err);
        }
    }

    // 8
    report.defeat = evaluate_outcome(&state);
    state.game_over = report.defeat;

    // 9
    let played_on = state.current_date;
    state.current_date = result.time_increment.advance(played_on);
    state.turn = state.turn.saturating_add(1);

    // 10
    let events = turn_events(&state, played_on, order, result);
    report.new_events = events.clone();
    state.record_events(events);

    TurnTransition { state, report }
}

fn turn_events(
    state: &GameState,
    played_on: NaiveDate,
    order: &PlayerOrder,
    result: &TurnResult,
) -> Vec<GameEvent> {
    let mut events = Vec::with_capacity(result.events.len() + 1);
    let order_text = order.combined();
    if let Some(text) = none_if_blank(&order_text) {
        let headline = truncate_chars(text.lines().next().unwrap_or(text), ORDER_HEADLINE_MAX_CHARS);
        events.push(
            GameEvent::new(played_on, EventCategory::Player, headline, text)
                .with_related_nation(Some(state.player_nation.clone())),
        );
    }
    events.extend(result.events.iter().map(|item| {
        GameEvent::new(
            played_on,
            item.category,
            item.headline.clone(),
            item.description.clone(),
        )
        .with_related_nation(item.related_nation.as_deref().and_then(canonical_nation))
    }));
    events
}

/// Applies signed installation deltas. Counts floor at zero and empty rows
/// are removed.
fn apply_infrastructure_updates(state: &mut GameState, updates: &[InfrastructureUpdate]) {
    for update in updates {
        let Some(kind) = infrastructure_key(&update.kind) else {
            continue;
        };
        let nation = update
            .nation
            .as_deref()
            .and_then(canonical_nation)
            .unwrap_or_else(|| state.player_nation.clone());

        let row = state.infrastructure.entry(nation.clone()).or_default();
        let current = i64::from(row.get(&kind).copied().unwrap_or(0));
        let next = (current + i64::from(update.delta)).clamp(0, i64::from(u32::MAX));
        match u32::try_from(next) {
            Ok(0) | Err(_) => {
                row.remove(&kind);
            }
            Ok(count) => {
                row.insert(kind, count);
            }
        }
        if row.is_empty() {
            state.infrastructure.remove(&nation);
        }
    }
}

/// `"Nuclear Silo"` and `"nuclear-silo"` both become `nuclear_silo`.
fn infrastructure_key(raw: &str) -> Option<String> {
    let key = raw
        .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|part| !part.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_");
    (!key.is_empty()).then_some(key)
}

fn apply_alliance_update(state: &mut GameState, update: &AllianceUpdate) -> Result<(), DomainError> {
    let player = state.player_nation.clone();
    let existing = state.alliance.take();

    let alliance = match update.action {
        AllianceAction::Dissolve => return Ok(()),
        AllianceAction::Create => {
            let mut members = canonical_members(&update.members);
            members.insert(player.clone());
            build_alliance(
                update.name.as_deref().unwrap_or(DEFAULT_ALLIANCE_NAME),
                update.kind.as_deref().unwrap_or(DEFAULT_ALLIANCE_KIND),
                members,
                update.leader.as_deref(),
                &player,
            )
        }
        AllianceAction::Update => {
            let mut members = canonical_members(&update.members);
            if members.is_empty() {
                members.insert(player.clone());
            }
            let previous_leader = existing
                .as_ref()
                .map(|alliance| alliance.leader().to_string())
                .filter(|leader| members.contains(leader));
            build_alliance(
                update
                    .name
                    .as_deref()
                    .or(existing.as_ref().map(Alliance::name))
                    .unwrap_or(DEFAULT_ALLIANCE_NAME),
                update
                    .kind
                    .as_deref()
                    .or(existing.as_ref().map(Alliance::kind))
                    .unwrap_or(DEFAULT_ALLIANCE_KIND),
                members,
                update.leader.as_deref().or(previous_leader.as_deref()),
                &player,
            )
        }
    };

    match alliance {
        Ok(alliance) => {
            state.alliance = Some(alliance);
            Ok(())
        }
        Err(err) => {
            state.alliance = existing;
            Err(err)
        }
    }
}

fn canonical_members(raw: &[String]) -> BTreeSet<String> {
    raw.iter().filter_map(|name| canonical_nation(name)).collect()
}

/// Leader defaults to the player and is added to the members when missing.
fn build_alliance(
    name: &str,
    kind: &str,
    mut members: BTreeSet<String>,
    leader: Option<&str>,
    player: &str,
) -> Result<Alliance, DomainError> {
    let leader = leader
        .and_then(canonical_nation)
        .unwrap_or_else(|| player.to_string());
    members.insert(leader.clone());
    let name = none_if_blank(name).unwrap_or(DEFAULT_ALLIANCE_NAME);
    Alliance::new(name, kind, members, leader)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{EntityKind, Position};
    use crate::game_state::{NUCLEAR_SILO_KEY, RECENT_EVENT_WINDOW};
    use crate::turn::result::{InboundMessage, MapUpdate, NarrativeItem, TurnFlags};
    use crate::value_objects::{StatKind, Stats, TimeIncrement};
    use std::collections::BTreeMap;

    fn state(player: &str) -> GameState {
        GameState::new(player).expect("valid nation")
    }

    fn order(text: &str) -> PlayerOrder {
        PlayerOrder::new(text)
    }

    fn event(category: EventCategory, headline: &str, description: &str) -> NarrativeItem {
        NarrativeItem {
            category,
            headline: headline.into(),
            description: description.into(),
            related_nation: None,
        }
    }

    fn annex(territory: &str) -> MapUpdate {
        MapUpdate::Annex {
            territory: territory.into(),
            new_owner: None,
        }
    }

    fn alliance_update(action: AllianceAction, members: &[&str], leader: Option<&str>) -> AllianceUpdate {
        AllianceUpdate {
            action,
            name: Some("Northern Pact".into()),
            kind: Some("Military Alliance".into()),
            members: members.iter().map(|m| m.to_string()).collect(),
            leader: leader.map(String::from),
        }
    }

    #[test]
    fn extreme_deltas_are_clamped() {
        let result = TurnResult {
            deltas: StatDeltas {
                tension: 500,
                economy: -500,
                military: i32::MAX,
                popularity: i32::MIN,
                corruption: 3,
            },
            ..TurnResult::fallback()
        };
        let next = apply_turn(state("Germany"), &order("Gamble everything"), &result, Utc::now());

        assert!(next.state.stats.is_within_bounds());
        assert_eq!(next.state.stats.tension, 100);
        assert_eq!(next.state.stats.economy, 0);
        assert_eq!(next.state.stats.military, 100);
    }

    #[test]
    fn fallback_result_still_advances_exactly_one_turn() {
        let start = state("France");
        let next = apply_turn(start.clone(), &order("Hold steady"), &TurnResult::fallback(), Utc::now());

        assert_eq!(next.state.turn, start.turn + 1);
        assert_eq!(next.state.current_date, TimeIncrement::Month.advance(start.current_date));
        assert_eq!(next.report.new_events.len(), 2);
        assert_eq!(next.report.new_events[0].category, EventCategory::Player);
        assert_eq!(next.report.new_events[1].headline, crate::turn::FALLBACK_HEADLINE);
        // only drift on odd turn 1
        assert_eq!(next.state.stats.tension, start.stats.tension + 1);
        assert_eq!(next.state.stats.economy, start.stats.economy);
    }

    #[test]
    fn even_turns_erode_economy_and_popularity() {
        let mut start = state("France");
        start.turn = 2;
        let next = apply_turn(start.clone(), &order(""), &TurnResult::fallback(), Utc::now());

        assert_eq!(next.state.stats.economy, start.stats.economy - 5);
        assert_eq!(next.state.stats.popularity, start.stats.popularity - 5);
        assert_eq!(next.state.turn, 3);
        assert_eq!(next.report.new_events.len(), 1, "blank order adds no player event");
    }

    #[test]
    fn triple_zero_gauges_collapse_the_state() {
        let mut start = state("France");
        start.stats = Stats {
            economy: 0,
            military: 0,
            popularity: 0,
            ..Stats::default()
        };
        let next = apply_turn(start, &order("Pray"), &TurnResult::fallback(), Utc::now());

        assert!(next.state.is_game_over());
        assert_eq!(next.report.defeat, Some(Defeat::SystemicCollapse));
        assert_eq!(
            next.state.game_over_reason(),
            Some(Defeat::SystemicCollapse.message())
        );
        assert_eq!(next.state.owner_of("France"), Some("France"));
    }

    #[test]
    fn dissolving_the_only_homeland_ends_the_game() {
        let mut start = state("Arcadia");
        start.territory_owners = BTreeMap::from([("Arcadia".to_string(), "Arcadia".to_string())]);
        let result = TurnResult {
            map_updates: vec![MapUpdate::Dissolve {
                territory: "Arcadia".into(),
            }],
            ..TurnResult::fallback()
        };

        let next = apply_turn(start, &order("Hold the line"), &result, Utc::now());

        assert!(next.state.territory_owners.is_empty());
        assert!(next.state.is_game_over());
        assert_eq!(
            next.state.game_over_reason(),
            Some(Defeat::NationDissolved.message())
        );
        next.state.check_invariants().expect("terminal state is consistent");
    }

    #[test]
    fn terminal_state_is_frozen() {
        let mut start = state("France");
        start.game_over = Some(Defeat::SystemicCollapse);
        let result = TurnResult {
            deltas: StatDeltas::zero().with(StatKind::Economy, 30),
            ..TurnResult::fallback()
        };

        let next = apply_turn(start.clone(), &order("Recover"), &result, Utc::now());

        assert!(next.report.frozen);
        assert_eq!(next.state, start);
    }

    #[test]
    fn spoofed_inbound_message_is_dropped() {
        let result = TurnResult {
            inbound_messages: vec![
                InboundMessage {
                    sender: "France".into(),
                    text: "We, France, declare war on ourselves".into(),
                    targets: vec![],
                },
                InboundMessage {
                    sender: "Germany".into(),
                    text: "Let us talk".into(),
                    targets: vec![],
                },
            ],
            ..TurnResult::fallback()
        };
        let next = apply_turn(state("France"), &order("Wait"), &result, Utc::now());

        assert_eq!(next.state.chat_history.len(), 1);
        assert_eq!(next.state.chat_history[0].sender_nation, "Germany");
        assert_eq!(next.report.inbound.rejected.len(), 1);
    }

    #[test]
    fn annexing_a_nuclear_power_arms_the_player_for_good() {
        let result = TurnResult {
            map_updates: vec![annex("Pakistan")],
            ..TurnResult::fallback()
        };
        let first = apply_turn(state("Egypt"), &order("Annex Pakistan"), &result, Utc::now());
        assert!(first.state.has_nuclear);
        assert!(first.report.nuclear_acquired);
        assert_eq!(first.report.applied_deltas.tension, 1 + 50);

        let second = apply_turn(
            first.state,
            &order("Disarm publicly"),
            &TurnResult {
                flags: TurnFlags {
                    nuclear_acquired: Some(false),
                    space_program: None,
                },
                ..TurnResult::fallback()
            },
            Utc::now(),
        );
        assert!(second.state.has_nuclear);
    }

    #[test]
    fn annexing_a_plain_territory_leaves_nuclear_status_alone() {
        let start = state("Egypt");
        let owned = start.territory_owners.len();
        let result = TurnResult {
            map_updates: vec![annex("Greenland")],
            ..TurnResult::fallback()
        };

        let next = apply_turn(start, &order("Buy Greenland"), &result, Utc::now());

        assert_eq!(next.state.territory_owners.len(), owned + 1);
        assert!(!next.state.has_nuclear);
    }

    #[test]
    fn successful_weapons_program_sets_nuclear() {
        let result = TurnResult {
            events: vec![event(
                EventCategory::Crisis,
                "Test detonation",
                "The program succeeded beyond expectations",
            )],
            ..TurnResult::default()
        };
        let next = apply_turn(
            state("Brazil"),
            &PlayerOrder::new("").with_queued(vec!["Start a nuclear weapons program".into()]),
            &result,
            Utc::now(),
        );
        assert!(next.state.has_nuclear);
    }

    #[test]
    fn space_program_flag_never_reverts() {
        let on = TurnResult {
            flags: TurnFlags {
                space_program: Some(true),
                nuclear_acquired: None,
            },
            ..TurnResult::fallback()
        };
        let off = TurnResult {
            flags: TurnFlags {
                space_program: Some(false),
                nuclear_acquired: None,
            },
            ..TurnResult::fallback()
        };
        let first = apply_turn(state("India"), &order("Launch"), &on, Utc::now());
        let second = apply_turn(first.state, &order("Cut budgets"), &off, Utc::now());
        assert!(second.state.has_space_program);
        assert!(!second.report.space_program_started);
    }

    #[test]
    fn war_events_apply_penalties_and_date_events_before_advance() {
        let start = state("Poland");
        let date = start.current_date;
        let result = TurnResult {
            time_increment: TimeIncrement::Year,
            events: vec![event(
                EventCategory::War,
                "Invasion",
                "Enemy forces attack; cities bombed with heavy casualties",
            )],
            ..TurnResult::default()
        };

        let next = apply_turn(start.clone(), &order("Mobilize"), &result, Utc::now());

        assert_eq!(next.state.stats.tension, start.stats.tension + 1 + 50);
        assert_eq!(next.state.stats.economy, start.stats.economy - 20);
        assert_eq!(next.state.stats.military, start.stats.military - 15 - 5);
        assert!(next.report.new_events.iter().all(|e| e.date == date));
        assert_eq!(next.state.current_date, TimeIncrement::Year.advance(date));
    }

    #[test]
    fn infrastructure_counts_floor_at_zero() {
        let result = TurnResult {
            infrastructure_updates: vec![
                InfrastructureUpdate {
                    nation: None,
                    kind: "Nuclear Silo".into(),
                    delta: 2,
                },
                InfrastructureUpdate {
                    nation: Some("the usa".into()),
                    kind: "air-base".into(),
                    delta: -3,
                },
                InfrastructureUpdate {
                    nation: Some("Brazil".into()),
                    kind: "naval base".into(),
                    delta: 1,
                },
                InfrastructureUpdate {
                    nation: Some("Brazil".into()),
                    kind: "naval_base".into(),
                    delta: -4,
                },
            ],
            ..TurnResult::fallback()
        };
        let next = apply_turn(state("Turkey"), &order("Build"), &result, Utc::now());

        assert_eq!(next.state.installation_count("Turkey", NUCLEAR_SILO_KEY), 2);
        assert!(!next.state.infrastructure.contains_key("United States"));
        assert!(!next.state.infrastructure.contains_key("Brazil"));
    }

    #[test]
    fn created_alliance_always_includes_player_and_leader() {
        let result = TurnResult {
            alliance_update: Some(alliance_update(
                AllianceAction::Create,
                &["germany", "Italy"],
                Some("Spain"),
            )),
            ..TurnResult::fallback()
        };
        let next = apply_turn(state("France"), &order("Form a pact"), &result, Utc::now());

        let alliance = next.state.alliance.expect("alliance created");
        assert_eq!(alliance.leader(), "Spain");
        for member in ["France", "Germany", "Italy", "Spain"] {
            assert!(alliance.is_member(member), "{member} should be a member");
        }
    }

    #[test]
    fn alliance_update_without_members_keeps_player_alone() {
        let created = apply_turn(
            state("France"),
            &order("Form a pact"),
            &TurnResult {
                alliance_update: Some(alliance_update(AllianceAction::Create, &["Germany"], None)),
                ..TurnResult::fallback()
            },
            Utc::now(),
        );
        let updated = apply_turn(
            created.state,
            &order("Reshape the pact"),
            &TurnResult {
                alliance_update: Some(AllianceUpdate {
                    name: None,
                    ..alliance_update(AllianceAction::Update, &[], None)
                }),
                ..TurnResult::fallback()
            },
            Utc::now(),
        );

        let alliance = updated.state.alliance.clone().expect("alliance kept");
        assert_eq!(alliance.name(), "Northern Pact");
        assert_eq!(alliance.members().len(), 1);
        assert_eq!(alliance.leader(), "France");

        let dissolved = apply_turn(
            updated.state,
            &order("Leave"),
            &TurnResult {
                alliance_update: Some(alliance_update(AllianceAction::Dissolve, &[], None)),
                ..TurnResult::fallback()
            },
            Utc::now(),
        );
        assert!(dissolved.state.alliance.is_none());
    }

    #[test]
    fn long_games_keep_invariants() {
        let mut current = state("Japan");
        for turn in 0..25 {
            let result = TurnResult {
                deltas: StatDeltas::zero().with(StatKind::Military, if turn % 3 == 0 { 7 } else { -4 }),
                map_updates: vec![MapUpdate::BuildEntity {
                    kind: EntityKind::RadarStation,
                    raw_kind: "radar_station".into(),
                    position: Position::new(35.0, 139.0),
                    label: None,
                    owner: None,
                }],
                ..TurnResult::fallback()
            };
            let before = current.turn;
            let next = apply_turn(current, &order("Carry on"), &result, Utc::now());
            current = next.state;
            if !current.is_game_over() {
                assert_eq!(current.turn, before + 1);
            }
            current.check_invariants().expect("invariants hold");
        }
        assert!(current.recent_events.len() <= RECENT_EVENT_WINDOW);
    }
}
