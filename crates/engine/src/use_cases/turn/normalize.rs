//! Response normalizer.
//!
//! Turns untrusted provider text into a [`TurnResult`]. Nothing here fails:
//! missing or malformed fields get defaults, and text with no usable JSON at
//! all yields [`TurnResult::fallback`].

use serde_json::{Map, Value};

use statecraft_domain::turn::{
    AllianceAction, AllianceUpdate, InfrastructureUpdate, TurnEffects, TurnFlags,
};
use statecraft_domain::{
    DiplomaticReply, EntityKind, EventCategory, InboundMessage, MapUpdate, NarrativeItem,
    Position, StatDeltas, StatKind, TimeIncrement, TurnResult,
};

pub const PLACEHOLDER_HEADLINE: &str = "Developing Situation";
pub const PLACEHOLDER_DESCRIPTION: &str = "Details remain unclear.";

const INCREMENT_KEYS: &[&str] = &["timeIncrement", "time_increment", "increment"];
const EVENT_KEYS: &[&str] = &["events", "narrative", "news"];
const DELTA_KEYS: &[&str] = &["statChanges", "stat_changes", "deltas", "stats"];
const SPACE_KEYS: &[&str] = &["spaceProgram", "space_program", "hasSpaceProgram"];
const NUCLEAR_KEYS: &[&str] = &["nuclearAcquired", "nuclear_acquired", "hasNuclear"];
const MAP_KEYS: &[&str] = &["mapUpdates", "map_updates"];
const INFRASTRUCTURE_KEYS: &[&str] =
    &["infrastructureUpdates", "infrastructure_updates", "infrastructure"];
const INBOUND_KEYS: &[&str] = &[
    "incomingMessages",
    "incoming_messages",
    "inboundMessages",
    "inbound_messages",
    "messages",
];
const ALLIANCE_KEYS: &[&str] = &["allianceUpdate", "alliance_update", "alliance"];
const SECTION_KEYS: &[&str] = &["flags", "effects"];

/// Whether `object` carries at least one turn section. Anything else, such
/// as an inner event picked up from a truncated response, is not a turn.
fn is_turn_object(object: &Map<String, Value>) -> bool {
    [
        INCREMENT_KEYS,
        EVENT_KEYS,
        DELTA_KEYS,
        SPACE_KEYS,
        NUCLEAR_KEYS,
        MAP_KEYS,
        INFRASTRUCTURE_KEYS,
        INBOUND_KEYS,
        ALLIANCE_KEYS,
        SECTION_KEYS,
    ]
    .iter()
    .any(|keys| field(object, keys).is_some())
}

/// Normalizes a raw turn response.
pub fn normalize(raw: &str) -> TurnResult {
    let Some(root) = extract_json(raw) else {
        tracing::warn!(
            length = raw.len(),
            "No JSON found in provider response, using fallback turn"
        );
        return TurnResult::fallback();
    };

    let object = match root {
        Value::Object(object) => object,
        Value::Array(items) => {
            tracing::debug!("Provider returned a bare array, treating it as the event list");
            let mut object = Map::new();
            object.insert("events".to_string(), Value::Array(items));
            object
        }
        _ => return TurnResult::fallback(),
    };
    if !is_turn_object(&object) {
        tracing::warn!("Provider JSON has no turn sections, using fallback turn");
        return TurnResult::fallback();
    }

    let result = TurnResult {
        time_increment: time_increment(&object),
        events: array(&object, EVENT_KEYS)
            .iter()
            .filter_map(narrative_item)
            .collect(),
        deltas: deltas(&object),
        flags: flags(&object),
        effects: effects(&object),
        map_updates: array(&object, MAP_KEYS)
            .iter()
            .filter_map(map_update)
            .collect(),
        infrastructure_updates: array(&object, INFRASTRUCTURE_KEYS)
            .iter()
            .filter_map(infrastructure_update)
            .collect(),
        inbound_messages: array(&object, INBOUND_KEYS)
            .iter()
            .filter_map(inbound_message)
            .collect(),
        alliance_update: field(&object, ALLIANCE_KEYS)
            .and_then(Value::as_object)
            .and_then(alliance_update),
    };

    tracing::debug!(
        events = result.events.len(),
        map_updates = result.map_updates.len(),
        inbound = result.inbound_messages.len(),
        increment = %result.time_increment,
        "Normalized provider response"
    );
    result
}

/// Normalizes a diplomacy response into replies. Unusable text yields none.
pub fn normalize_replies(raw: &str) -> Vec<DiplomaticReply> {
    let items = match extract_json(raw) {
        Some(Value::Array(items)) => items,
        Some(Value::Object(object)) => array(&object, &["replies", "responses", "messages"]).to_vec(),
        _ => {
            tracing::warn!("No replies found in diplomacy response");
            return Vec::new();
        }
    };

    items
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|item| {
            let sender = string(item, &["sender", "from", "nation"])?;
            let text = string(item, &["text", "message", "reply", "content"])?;
            Some(DiplomaticReply { sender, text })
        })
        .collect()
}

// =============================================================================
// JSON extraction
// =============================================================================

/// Finds the first balanced `{...}` or `[...]` span that parses as JSON.
///
/// A span that is balanced but not valid JSON is skipped and the scan resumes
/// one character after its opening delimiter.
pub fn extract_json(raw: &str) -> Option<Value> {
    let bytes = raw.as_bytes();
    let mut start = 0;
    while start < bytes.len() {
        let offset = bytes[start..].iter().position(|b| *b == b'{' || *b == b'[')?;
        let open = start + offset;
        if let Some(close) = balanced_end(bytes, open) {
            if let Ok(value) = serde_json::from_str::<Value>(&raw[open..=close]) {
                return Some(value);
            }
        }
        start = open + 1;
    }
    None
}

/// Index of the delimiter closing the one at `open`, if the span balances.
fn balanced_end(bytes: &[u8], open: usize) -> Option<usize> {
    let mut expected: Vec<u8> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (index, byte) in bytes.iter().enumerate().skip(open) {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => expected.push(b'}'),
            b'[' => expected.push(b']'),
            b'}' | b']' => {
                if expected.pop() != Some(*byte) {
                    return None;
                }
                if expected.is_empty() {
                    return Some(index);
                }
            }
            _ => {}
        }
    }
    None
}

// =============================================================================
// Field access and coercion
// =============================================================================

fn field<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .find_map(|key| object.get(*key))
        .filter(|value| !value.is_null())
}

fn array<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> &'a [Value] {
    field(object, keys)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Trimmed, non-empty string value. Numbers are accepted as text.
fn string(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    let text = match field(object, keys)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Integer coercion: numbers are rounded, numeric strings parsed, anything
/// else is 0.
fn coerce_int(value: &Value) -> i32 {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match number {
        Some(n) if n.is_finite() => n.round().clamp(i32::MIN as f64, i32::MAX as f64) as i32,
        _ => 0,
    }
}

fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|n| n != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn bool_field(object: &Map<String, Value>, keys: &[&str]) -> Option<bool> {
    field(object, keys).and_then(coerce_bool)
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// Lowercases and folds separators so `build-entity`, `Build Entity` and
/// `buildEntity` compare equal.
fn fold_key(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

// =============================================================================
// Section parsers
// =============================================================================

fn time_increment(object: &Map<String, Value>) -> TimeIncrement {
    let Some(raw) = string(object, INCREMENT_KEYS) else {
        return TimeIncrement::default();
    };
    raw.parse().unwrap_or_else(|_| {
        tracing::debug!(increment = %raw, "Unknown time increment, defaulting to a month");
        TimeIncrement::default()
    })
}

fn narrative_item(value: &Value) -> Option<NarrativeItem> {
    match value {
        Value::Object(item) => {
            let category = string(item, &["category", "type", "kind"])
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(EventCategory::World);
            Some(NarrativeItem {
                category,
                headline: string(item, &["headline", "title"])
                    .unwrap_or_else(|| PLACEHOLDER_HEADLINE.to_string()),
                description: string(item, &["description", "text", "body", "details"])
                    .unwrap_or_else(|| PLACEHOLDER_DESCRIPTION.to_string()),
                related_nation: string(
                    item,
                    &["relatedNation", "related_nation", "nation", "country"],
                ),
            })
        }
        Value::String(text) if !text.trim().is_empty() => Some(NarrativeItem {
            category: EventCategory::World,
            headline: PLACEHOLDER_HEADLINE.to_string(),
            description: text.trim().to_string(),
            related_nation: None,
        }),
        _ => None,
    }
}

fn deltas(object: &Map<String, Value>) -> StatDeltas {
    let Some(section) = field(object, DELTA_KEYS)
        .and_then(Value::as_object)
    else {
        return StatDeltas::zero();
    };

    section
        .iter()
        .filter_map(|(key, value)| Some((key.parse::<StatKind>().ok()?, coerce_int(value))))
        .fold(StatDeltas::zero(), |acc, (kind, amount)| acc.with(kind, amount))
}

fn flags(object: &Map<String, Value>) -> TurnFlags {
    let nested = field(object, &["flags"]).and_then(Value::as_object);
    let lookup = |keys: &[&str]| {
        bool_field(object, keys).or_else(|| nested.and_then(|flags| bool_field(flags, keys)))
    };
    TurnFlags {
        space_program: lookup(SPACE_KEYS),
        nuclear_acquired: lookup(NUCLEAR_KEYS),
    }
}

fn effects(object: &Map<String, Value>) -> TurnEffects {
    let Some(section) = field(object, &["effects"]).and_then(Value::as_object) else {
        return TurnEffects::default();
    };
    TurnEffects {
        attacked: bool_field(section, &["attacked"]),
        bombarded: bool_field(section, &["bombarded"]),
        casualties: bool_field(section, &["casualties"]),
        nuclear_strike_received: bool_field(
            section,
            &["nuclearStrikeReceived", "nuclear_strike_received"],
        ),
    }
}

fn map_update(value: &Value) -> Option<MapUpdate> {
    let item = value.as_object()?;
    let action = string(item, &["action", "type"])?;
    let territory = || string(item, &["target", "territory", "nation", "country"]);

    let update = match fold_key(&action).as_str() {
        "dissolve" | "dissolution" | "collapse" => MapUpdate::Dissolve {
            territory: territory()?,
        },
        "annex" | "annexation" | "annexe" | "conquer" | "occupy" => MapUpdate::Annex {
            territory: territory()?,
            new_owner: string(item, &["newOwner", "new_owner", "owner"]),
        },
        "build" | "buildentity" | "addentity" | "construct" => {
            let raw_kind = string(item, &["entityType", "entity_type", "kind"]).unwrap_or_default();
            MapUpdate::BuildEntity {
                kind: raw_kind.parse().unwrap_or(EntityKind::Other),
                raw_kind,
                position: position(item),
                label: string(item, &["label", "name"]),
                owner: string(item, &["owner", "nation"]),
            }
        }
        "remove" | "removeentity" | "destroy" | "destroyentity" => MapUpdate::RemoveEntity {
            selector: string(item, &["entityId", "entity_id", "id", "label", "target"])?,
        },
        _ => {
            tracing::debug!(action = %action, "Dropping unknown map update action");
            return None;
        }
    };
    Some(update)
}

fn position(item: &Map<String, Value>) -> Position {
    let source = field(item, &["position", "location", "coordinates"])
        .and_then(Value::as_object)
        .unwrap_or(item);
    let coordinate = |keys: &[&str]| {
        field(source, keys)
            .and_then(|value| match value {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            })
            .unwrap_or(0.0)
    };
    Position::new(
        coordinate(&["lat", "latitude"]),
        coordinate(&["lng", "lon", "longitude"]),
    )
}

fn infrastructure_update(value: &Value) -> Option<InfrastructureUpdate> {
    let item = value.as_object()?;
    let kind = string(item, &["type", "kind", "infrastructure"])?;
    let delta = field(item, &["delta", "change", "count"])
        .map(coerce_int)
        .unwrap_or(0);
    if delta == 0 {
        return None;
    }
    Some(InfrastructureUpdate {
        nation: string(item, &["nation", "country", "owner"]),
        kind,
        delta,
    })
}

fn inbound_message(value: &Value) -> Option<InboundMessage> {
    let item = value.as_object()?;
    let text = string(item, &["text", "message", "content"])?;
    Some(InboundMessage {
        sender: string(item, &["sender", "from", "nation"]).unwrap_or_default(),
        text,
        targets: string_list(field(item, &["targets", "to", "recipients"])),
    })
}

fn alliance_update(item: &Map<String, Value>) -> Option<AllianceUpdate> {
    let action = match fold_key(&string(item, &["action"])?).as_str() {
        "create" | "form" | "found" => AllianceAction::Create,
        "update" | "modify" | "expand" => AllianceAction::Update,
        "dissolve" | "disband" | "leave" => AllianceAction::Dissolve,
        other => {
            tracing::debug!(action = %other, "Dropping unknown alliance action");
            return None;
        }
    };
    Some(AllianceUpdate {
        action,
        name: string(item, &["name"]),
        kind: string(item, &["type", "kind"]),
        members: string_list(field(item, &["members"])),
        leader: string(item, &["leader"]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use statecraft_domain::turn::FALLBACK_HEADLINE;

    #[test]
    fn prose_and_code_fences_around_json_are_ignored() {
        let raw = r#"Sure! Here is the turn:
```json
{"timeIncrement": "year", "events": [{"category": "economy", "headline": "Boom", "description": "Markets {rally}"}]}
```
Hope that helps."#;

        let result = normalize(raw);

        assert_eq!(result.time_increment, TimeIncrement::Year);
        assert_eq!(result.events.len(), 1);
        assert_eq!(result.events[0].category, EventCategory::Economy);
        assert_eq!(result.events[0].description, "Markets {rally}");
    }

    #[test]
    fn escaped_quotes_and_braces_inside_strings_do_not_break_the_scan() {
        let raw = r#"{"events": [{"headline": "He said \"}\" loudly", "description": "ok"}]}"#;
        let result = normalize(raw);
        assert_eq!(result.events[0].headline, "He said \"}\" loudly");
    }

    #[test]
    fn invalid_candidate_is_skipped_for_a_later_one() {
        let raw = r#"notes {not json} then {"events": [{"headline": "Real"}]}"#;
        let result = normalize(raw);
        assert_eq!(result.events[0].headline, "Real");
        assert_eq!(result.events[0].description, PLACEHOLDER_DESCRIPTION);
    }

    #[test]
    fn truncated_text_falls_back() {
        let result = normalize(r#"{"events": [{"headline": "Cut off"#);
        assert_eq!(result, TurnResult::fallback());
        assert_eq!(result.events[0].headline, FALLBACK_HEADLINE);
    }

    #[test]
    fn response_cut_off_after_a_complete_event_falls_back() {
        let result = normalize(
            r#"{"timeIncrement": "month", "events": [{"category": "war", "headline": "Border clash", "description": "Shots fired"}, {"category": "economy", "headline": "Markets"#,
        );
        assert_eq!(result, TurnResult::fallback());
        assert_eq!(result.events.len(), 1);
        assert_eq!(result.deltas, StatDeltas::zero());
    }

    #[test]
    fn objects_without_turn_sections_fall_back() {
        assert_eq!(normalize("{}"), TurnResult::fallback());
        assert_eq!(
            normalize(r#"Sure! {"headline": "Lonely event", "category": "world"}"#),
            TurnResult::fallback()
        );
        // a quiet turn with an explicit empty event list is still a turn
        assert!(normalize(r#"{"events": []}"#).events.is_empty());
    }

    #[test]
    fn top_level_array_is_the_event_list() {
        let result = normalize(r#"[{"category": "war", "headline": "Clash"}, "A rumour"]"#);

        assert_eq!(result.events.len(), 2);
        assert_eq!(result.events[0].category, EventCategory::War);
        assert_eq!(result.events[1].headline, PLACEHOLDER_HEADLINE);
        assert_eq!(result.time_increment, TimeIncrement::Month);
    }

    #[test]
    fn numbers_are_coerced_and_unknown_values_defaulted() {
        let raw = r#"{
            "time_increment": "fortnight",
            "events": [{"category": "gossip", "headline": "  "}],
            "stat_changes": {"economy": "+5", "Military": -3.6, "tension": true, "luck": 9}
        }"#;

        let result = normalize(raw);

        assert_eq!(result.time_increment, TimeIncrement::Month);
        assert_eq!(result.events[0].category, EventCategory::World);
        assert_eq!(result.events[0].headline, PLACEHOLDER_HEADLINE);
        assert_eq!(result.deltas.economy, 5);
        assert_eq!(result.deltas.military, -4);
        assert_eq!(result.deltas.tension, 0);
    }

    #[test]
    fn flags_and_effects_accept_loose_booleans() {
        let raw = r#"{
            "flags": {"spaceProgram": "yes"},
            "nuclear_acquired": 0,
            "effects": {"attacked": 1, "nuclearStrikeReceived": "false"}
        }"#;

        let result = normalize(raw);

        assert_eq!(result.flags.space_program, Some(true));
        assert_eq!(result.flags.nuclear_acquired, Some(false));
        assert_eq!(result.effects.attacked, Some(true));
        assert_eq!(result.effects.nuclear_strike_received, Some(false));
        assert_eq!(result.effects.bombarded, None);
    }

    #[test]
    fn map_updates_keep_order_and_drop_unknown_actions() {
        let raw = r#"{"mapUpdates": [
            {"action": "dissolve", "target": "Spain"},
            {"action": "teleport", "target": "Peru"},
            {"action": "annexation", "target": "Belgium"},
            {"action": "build-entity", "entityType": "airfield", "lat": "48.1", "lng": 11.5},
            {"action": "remove", "label": "Old Base"}
        ]}"#;

        let result = normalize(raw);

        assert_eq!(result.map_updates.len(), 4);
        assert_eq!(
            result.map_updates[1],
            MapUpdate::Annex {
                territory: "Belgium".into(),
                new_owner: None
            }
        );
        match &result.map_updates[2] {
            MapUpdate::BuildEntity {
                kind, raw_kind, position, ..
            } => {
                assert_eq!(*kind, EntityKind::AirBase);
                assert_eq!(raw_kind, "airfield");
                assert_eq!(*position, Position::new(48.1, 11.5));
            }
            other => panic!("expected a build update, got {other:?}"),
        }
    }

    #[test]
    fn messages_without_text_are_dropped() {
        let raw = r#"{"incomingMessages": [
            {"sender": "France", "text": "", "targets": ["Germany"]},
            {"sender": "Japan", "text": "Hello", "targets": "Korea, India"}
        ]}"#;

        let result = normalize(raw);

        assert_eq!(result.inbound_messages.len(), 1);
        assert_eq!(result.inbound_messages[0].targets, vec!["Korea", "India"]);
    }

    #[test]
    fn alliance_update_is_parsed_and_unknown_actions_dropped() {
        let create = normalize(
            r#"{"allianceUpdate": {"action": "form", "name": "Northern Pact", "members": ["Norway"], "leader": "Norway"}}"#,
        );
        let update = create.alliance_update.expect("alliance update");
        assert_eq!(update.action, AllianceAction::Create);
        assert_eq!(update.name.as_deref(), Some("Northern Pact"));
        assert_eq!(update.kind, None);

        let unknown = normalize(r#"{"allianceUpdate": {"action": "ponder"}}"#);
        assert!(unknown.alliance_update.is_none());
    }

    #[test]
    fn infrastructure_rows_need_a_type_and_a_change() {
        let raw = r#"{"infrastructureUpdates": [
            {"nation": "India", "type": "Nuclear Silo", "delta": "2"},
            {"nation": "India", "type": "Radar", "delta": 0},
            {"nation": "India", "delta": 4}
        ]}"#;

        let result = normalize(raw);

        assert_eq!(result.infrastructure_updates.len(), 1);
        assert_eq!(result.infrastructure_updates[0].delta, 2);
    }

    #[test]
    fn replies_accept_wrapped_or_bare_lists() {
        let wrapped = normalize_replies(
            r#"{"replies": [{"sender": "Canada", "text": "Agreed."}, {"sender": "Mexico", "text": " "}]}"#,
        );
        assert_eq!(
            wrapped,
            vec![DiplomaticReply {
                sender: "Canada".into(),
                text: "Agreed.".into()
            }]
        );

        let bare = normalize_replies(r#"[{"from": "Chile", "message": "No."}]"#);
        assert_eq!(bare.len(), 1);

        assert!(normalize_replies("the ambassador declined to comment").is_empty());
    }
}
