//! Nation names and the playable roster.
//!
//! Generator output spells nations loosely ("USA", "the uk", "Russian Federation").
//! Every name is passed through [`canonical_nation`] before it is stored, so
//! sets of nations compare reliably across turns.

/// Playable nations, in canonical spelling.
pub const PLAYABLE_NATIONS: &[&str] = &[
    "United States",
    "China",
    "Russia",
    "United Kingdom",
    "France",
    "Germany",
    "Japan",
    "India",
    "Brazil",
    "Canada",
    "Australia",
    "Italy",
    "Spain",
    "Mexico",
    "South Korea",
    "North Korea",
    "Indonesia",
    "Turkey",
    "Saudi Arabia",
    "Iran",
    "Israel",
    "Egypt",
    "Nigeria",
    "South Africa",
    "Argentina",
    "Pakistan",
    "Ukraine",
    "Poland",
    "Sweden",
    "Norway",
    "Vietnam",
    "Taiwan",
];

/// Non-state actors allowed to send diplomatic messages.
pub const SUPRANATIONAL_ACTORS: &[&str] = &[
    "United Nations",
    "NATO",
    "European Union",
    "African Union",
];

/// Nations that already hold a nuclear arsenal at launch.
pub const NUCLEAR_POWERS: &[&str] = &[
    "United States",
    "Russia",
    "China",
    "United Kingdom",
    "France",
    "India",
    "Pakistan",
    "Israel",
    "North Korea",
];

/// Lowercase alias -> canonical name.
const ALIASES: &[(&str, &str)] = &[
    ("usa", "United States"),
    ("us", "United States"),
    ("u.s.", "United States"),
    ("u.s.a.", "United States"),
    ("united states of america", "United States"),
    ("america", "United States"),
    ("uk", "United Kingdom"),
    ("u.k.", "United Kingdom"),
    ("britain", "United Kingdom"),
    ("great britain", "United Kingdom"),
    ("england", "United Kingdom"),
    ("russian federation", "Russia"),
    ("prc", "China"),
    ("people's republic of china", "China"),
    ("republic of korea", "South Korea"),
    ("rok", "South Korea"),
    ("dprk", "North Korea"),
    ("democratic people's republic of korea", "North Korea"),
    ("turkiye", "Turkey"),
    ("türkiye", "Turkey"),
    ("ksa", "Saudi Arabia"),
    ("persia", "Iran"),
    ("un", "United Nations"),
    ("u.n.", "United Nations"),
    ("eu", "European Union"),
    ("au", "African Union"),
    ("north atlantic treaty organization", "NATO"),
];

/// Returns the canonical spelling of a nation or actor name.
///
/// Known names (roster, supranational actors and aliases) are matched
/// case-insensitively and a leading "the " is ignored. Unknown names are kept,
/// trimmed and with internal whitespace collapsed, so fictional nations
/// survive unchanged. Blank input yields `None`.
///
/// # Examples
///
/// ```
/// use statecraft_domain::value_objects::canonical_nation;
///
/// assert_eq!(canonical_nation("  the USA ").as_deref(), Some("United States"));
/// assert_eq!(canonical_nation("russia").as_deref(), Some("Russia"));
/// assert_eq!(canonical_nation("Arcadia").as_deref(), Some("Arcadia"));
/// assert_eq!(canonical_nation("   "), None);
/// ```
pub fn canonical_nation(raw: &str) -> Option<String> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return None;
    }

    let lowered = collapsed.to_lowercase();
    let key = lowered.strip_prefix("the ").unwrap_or(lowered.as_str());

    if let Some((_, canonical)) = ALIASES.iter().find(|(alias, _)| *alias == key) {
        return Some((*canonical).to_string());
    }

    PLAYABLE_NATIONS
        .iter()
        .chain(SUPRANATIONAL_ACTORS.iter())
        .find(|known| known.to_lowercase() == key)
        .map(|known| (*known).to_string())
        .or(Some(collapsed))
}

/// True for names on the static playable roster (canonical spelling expected).
pub fn is_playable_nation(name: &str) -> bool {
    PLAYABLE_NATIONS.contains(&name)
}

/// True for the fixed set of supranational actors (canonical spelling expected).
pub fn is_supranational_actor(name: &str) -> bool {
    SUPRANATIONAL_ACTORS.contains(&name)
}

/// True for nations that held nuclear weapons at launch (canonical spelling expected).
pub fn is_known_nuclear_power(name: &str) -> bool {
    NUCLEAR_POWERS.contains(&name)
}
