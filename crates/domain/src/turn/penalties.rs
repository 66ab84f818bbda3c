//! Auto-drift and event-derived penalties.
//!
//! Structured effect fields from the provider win; the keyword lists below
//! are the fallback for providers that only write prose.

use crate::common::contains_any_ignore_case;
use crate::turn::result::{NarrativeItem, TurnEffects, TurnResult};
use crate::value_objects::{StatDeltas, StatKind};

pub const ANNEXATION_TENSION: i32 = 50;
pub const WAR_ECONOMY_PENALTY: i32 = -20;
pub const WAR_POPULARITY_PENALTY: i32 = -20;
pub const BOMBARDMENT_MILITARY_PENALTY: i32 = -15;
pub const CASUALTY_MILITARY_PENALTY: i32 = -5;
pub const NUCLEAR_STRIKE_MILITARY_PENALTY: i32 = -70;

pub const ATTACK_KEYWORDS: &[&str] = &[
    "attack",
    "invade",
    "invasion",
    "invaded",
    "incursion",
    "assault",
    "offensive",
];

pub const BOMBARDMENT_KEYWORDS: &[&str] = &[
    "bomb",
    "airstrike",
    "air strike",
    "shelling",
    "shelled",
    "missile strike",
];

pub const LOSS_KEYWORDS: &[&str] = &["casualt", "losses", "killed", "fatalities", "destroyed"];

/// Only counted when the event concerns the player's nation.
pub const NUCLEAR_STRIKE_KEYWORDS: &[&str] = &[
    "nuclear strike",
    "nuclear attack",
    "nuclear detonation",
    "nuked",
    "mushroom cloud",
];

/// Order phrases that ask for a weapons program.
pub const NUCLEAR_PROGRAM_KEYWORDS: &[&str] = &[
    "nuclear weapon",
    "nuclear program",
    "nuclear bomb",
    "nuclear arsenal",
    "nuclear warhead",
    "atomic bomb",
    "nukes",
];

/// Narrative phrases that report the program worked.
pub const SUCCESS_KEYWORDS: &[&str] = &[
    "success",
    "succeeded",
    "operational",
    "completed",
    "test detonation",
    "acquired",
];

/// Per-turn drift independent of the provider.
///
/// Tension and corruption creep up every turn; economy and popularity erode
/// on even turns.
pub fn auto_drift(turn: u32) -> StatDeltas {
    let drift = StatDeltas::zero()
        .with(StatKind::Tension, 1)
        .with(StatKind::Corruption, 1);
    if turn % 2 == 0 {
        drift
            .with(StatKind::Economy, -5)
            .with(StatKind::Popularity, -5)
    } else {
        drift
    }
}

/// Which penalty conditions fired this turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PenaltySignals {
    pub annexation: bool,
    pub war: bool,
    /// A war-type event co-occurs with attack/invasion language
    pub attacked: bool,
    pub bombarded: bool,
    pub casualties: bool,
    pub nuclear_strike_received: bool,
}

impl PenaltySignals {
    pub fn detect(
        result: &TurnResult,
        annexation_occurred: bool,
        player_nation: &str,
    ) -> Self {
        let TurnEffects {
            attacked,
            bombarded,
            casualties,
            nuclear_strike_received,
        } = result.effects;
        let text = result.narrative_text();
        let war = result.has_war_event();

        let attacked = attacked.unwrap_or_else(|| {
            result
                .events
                .iter()
                .filter(|event| event.category.is_war())
                .any(|event| contains_any_ignore_case(&event.text(), ATTACK_KEYWORDS))
        });

        Self {
            annexation: annexation_occurred,
            war,
            attacked,
            bombarded: bombarded
                .unwrap_or_else(|| contains_any_ignore_case(&text, BOMBARDMENT_KEYWORDS)),
            casualties: casualties
                .unwrap_or_else(|| contains_any_ignore_case(&text, LOSS_KEYWORDS)),
            nuclear_strike_received: nuclear_strike_received.unwrap_or_else(|| {
                result
                    .events
                    .iter()
                    .any(|event| concerns(event, player_nation)
                        && contains_any_ignore_case(&event.text(), NUCLEAR_STRIKE_KEYWORDS))
            }),
        }
    }

    pub fn deltas(&self) -> StatDeltas {
        let mut deltas = StatDeltas::zero();
        if self.annexation || (self.war && self.attacked) {
            deltas = deltas.with(StatKind::Tension, ANNEXATION_TENSION);
        }
        if self.war {
            deltas = deltas
                .with(StatKind::Economy, WAR_ECONOMY_PENALTY)
                .with(StatKind::Popularity, WAR_POPULARITY_PENALTY);
        }
        if self.bombarded {
            deltas = deltas.with(StatKind::Military, BOMBARDMENT_MILITARY_PENALTY);
        }
        if self.casualties {
            deltas = deltas.with(StatKind::Military, CASUALTY_MILITARY_PENALTY);
        }
        if self.nuclear_strike_received {
            deltas = deltas.with(StatKind::Military, NUCLEAR_STRIKE_MILITARY_PENALTY);
        }
        deltas
    }
}

fn concerns(event: &NarrativeItem, player_nation: &str) -> bool {
    event.related_nation.as_deref() == Some(player_nation)
        || event
            .text()
            .to_lowercase()
            .contains(&player_nation.to_lowercase())
}

/// True when the order asked for nuclear weapons and the narrative reports success.
pub fn nuclear_program_succeeded(order: &str, narrative_text: &str) -> bool {
    contains_any_ignore_case(order, NUCLEAR_PROGRAM_KEYWORDS)
        && contains_any_ignore_case(narrative_text, SUCCESS_KEYWORDS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::EventCategory;

    fn item(category: EventCategory, headline: &str, description: &str) -> NarrativeItem {
        NarrativeItem {
            category,
            headline: headline.into(),
            description: description.into(),
            related_nation: None,
        }
    }

    fn result_with(events: Vec<NarrativeItem>) -> TurnResult {
        TurnResult {
            events,
            ..TurnResult::default()
        }
    }

    #[test]
    fn drift_erodes_economy_only_on_even_turns() {
        let odd = auto_drift(3);
        assert_eq!((odd.tension, odd.corruption, odd.economy, odd.popularity), (1, 1, 0, 0));

        let even = auto_drift(4);
        assert_eq!(
            (even.tension, even.corruption, even.economy, even.popularity),
            (1, 1, -5, -5)
        );
    }

    #[test]
    fn war_with_invasion_language_raises_tension_and_hurts_economy() {
        let result = result_with(vec![item(
            EventCategory::War,
            "Border clash",
            "Troops INVADED the northern province",
        )]);
        let deltas = PenaltySignals::detect(&result, false, "France").deltas();

        assert_eq!(deltas.tension, ANNEXATION_TENSION);
        assert_eq!(deltas.economy, WAR_ECONOMY_PENALTY);
        assert_eq!(deltas.popularity, WAR_POPULARITY_PENALTY);
    }

    #[test]
    fn attack_language_outside_war_events_does_not_raise_tension() {
        let result = result_with(vec![item(
            EventCategory::World,
            "Cyber attack on banks",
            "Markets wobble",
        )]);
        let signals = PenaltySignals::detect(&result, false, "France");
        assert!(!signals.attacked);
        assert_eq!(signals.deltas().tension, 0);
    }

    #[test]
    fn annexation_alone_raises_tension() {
        let deltas = PenaltySignals::detect(&TurnResult::fallback(), true, "France").deltas();
        assert_eq!(deltas.tension, ANNEXATION_TENSION);
        assert_eq!(deltas.economy, 0);
    }

    #[test]
    fn military_penalties_stack() {
        let result = result_with(vec![
            item(EventCategory::Crisis, "Capital bombed", "Heavy casualties reported"),
            item(
                EventCategory::Crisis,
                "Nuclear strike",
                "A nuclear strike devastates a France naval port",
            ),
        ]);
        let deltas = PenaltySignals::detect(&result, false, "France").deltas();
        assert_eq!(
            deltas.military,
            BOMBARDMENT_MILITARY_PENALTY + CASUALTY_MILITARY_PENALTY + NUCLEAR_STRIKE_MILITARY_PENALTY
        );
    }

    #[test]
    fn nuclear_strike_elsewhere_is_not_received() {
        let result = result_with(vec![item(
            EventCategory::War,
            "Nuclear strike",
            "A nuclear strike hits a remote atoll",
        )]);
        assert!(!PenaltySignals::detect(&result, false, "France").nuclear_strike_received);
    }

    #[test]
    fn structured_effects_override_keywords() {
        let mut result = result_with(vec![item(
            EventCategory::Crisis,
            "Bombing campaign",
            "Factories bombed",
        )]);
        result.effects.bombarded = Some(false);
        result.effects.casualties = Some(true);

        let signals = PenaltySignals::detect(&result, false, "France");
        assert!(!signals.bombarded, "explicit false beats the keyword");
        assert!(signals.casualties, "explicit true needs no keyword");
    }

    #[test]
    fn nuclear_program_needs_request_and_success() {
        assert!(nuclear_program_succeeded(
            "Begin a secret nuclear weapons program",
            "Scientists report the test detonation was a success"
        ));
        assert!(!nuclear_program_succeeded("Build schools", "The program was a success"));
        assert!(!nuclear_program_succeeded("Develop nukes", "The program stalls"));
    }
}
