//! Stat gauges - the five national indicators every turn mutates.
//!
//! Provides type safety for stat references instead of passing loose integers
//! around, and owns the clamping rule that keeps every gauge in `[0, 100]`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign};
use std::str::FromStr;

/// Lowest value a gauge may hold.
pub const STAT_MIN: i32 = 0;
/// Highest value a gauge may hold.
pub const STAT_MAX: i32 = 100;

/// The five national gauges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatKind {
    /// International tension - high is dangerous
    Tension,
    /// Economic health
    Economy,
    /// Military strength
    Military,
    /// Domestic popularity of the government
    Popularity,
    /// Corruption - high is dangerous
    Corruption,
}

impl StatKind {
    pub const ALL: [StatKind; 5] = [
        Self::Tension,
        Self::Economy,
        Self::Military,
        Self::Popularity,
        Self::Corruption,
    ];

    /// Returns the lowercase wire name (e.g., "tension").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tension => "tension",
            Self::Economy => "economy",
            Self::Military => "military",
            Self::Popularity => "popularity",
            Self::Corruption => "corruption",
        }
    }

    /// Returns the capitalized display name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Tension => "Tension",
            Self::Economy => "Economy",
            Self::Military => "Military",
            Self::Popularity => "Popularity",
            Self::Corruption => "Corruption",
        }
    }
}

impl fmt::Display for StatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for StatKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tension" => Ok(Self::Tension),
            "economy" => Ok(Self::Economy),
            "military" => Ok(Self::Military),
            "popularity" => Ok(Self::Popularity),
            "corruption" => Ok(Self::Corruption),
            _ => Err(()),
        }
    }
}

/// Current gauge values.
///
/// # Invariants
///
/// After every turn all five values are within `[STAT_MIN, STAT_MAX]`; the
/// reducer calls [`Stats::clamped`] once all deltas are summed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub tension: i32,
    pub economy: i32,
    pub military: i32,
    pub popularity: i32,
    pub corruption: i32,
}

impl Default for Stats {
    /// Launch values for a fresh game.
    fn default() -> Self {
        Self {
            tension: 20,
            economy: 60,
            military: 50,
            popularity: 60,
            corruption: 15,
        }
    }
}

impl Stats {
    pub fn get(&self, kind: StatKind) -> i32 {
        match kind {
            StatKind::Tension => self.tension,
            StatKind::Economy => self.economy,
            StatKind::Military => self.military,
            StatKind::Popularity => self.popularity,
            StatKind::Corruption => self.corruption,
        }
    }

    fn get_mut(&mut self, kind: StatKind) -> &mut i32 {
        match kind {
            StatKind::Tension => &mut self.tension,
            StatKind::Economy => &mut self.economy,
            StatKind::Military => &mut self.military,
            StatKind::Popularity => &mut self.popularity,
            StatKind::Corruption => &mut self.corruption,
        }
    }

    /// Adds deltas without clamping. Saturates instead of overflowing.
    pub fn apply(&mut self, deltas: &StatDeltas) {
        for kind in StatKind::ALL {
            let value = self.get_mut(kind);
            *value = value.saturating_add(deltas.get(kind));
        }
    }

    /// Returns a copy with every gauge clamped to `[STAT_MIN, STAT_MAX]`.
    pub fn clamped(self) -> Self {
        Self {
            tension: self.tension.clamp(STAT_MIN, STAT_MAX),
            economy: self.economy.clamp(STAT_MIN, STAT_MAX),
            military: self.military.clamp(STAT_MIN, STAT_MAX),
            popularity: self.popularity.clamp(STAT_MIN, STAT_MAX),
            corruption: self.corruption.clamp(STAT_MIN, STAT_MAX),
        }
    }

    pub fn is_within_bounds(&self) -> bool {
        StatKind::ALL
            .iter()
            .all(|kind| (STAT_MIN..=STAT_MAX).contains(&self.get(*kind)))
    }
}

/// Signed per-turn changes to the gauges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatDeltas {
    pub tension: i32,
    pub economy: i32,
    pub military: i32,
    pub popularity: i32,
    pub corruption: i32,
}

impl StatDeltas {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::zero()
    }

    pub fn get(&self, kind: StatKind) -> i32 {
        match kind {
            StatKind::Tension => self.tension,
            StatKind::Economy => self.economy,
            StatKind::Military => self.military,
            StatKind::Popularity => self.popularity,
            StatKind::Corruption => self.corruption,
        }
    }

    /// Returns a copy with one gauge changed by `amount`.
    pub fn with(mut self, kind: StatKind, amount: i32) -> Self {
        let slot = match kind {
            StatKind::Tension => &mut self.tension,
            StatKind::Economy => &mut self.economy,
            StatKind::Military => &mut self.military,
            StatKind::Popularity => &mut self.popularity,
            StatKind::Corruption => &mut self.corruption,
        };
        *slot = slot.saturating_add(amount);
        self
    }
}

impl Add for StatDeltas {
    type Output = StatDeltas;

    fn add(self, rhs: StatDeltas) -> StatDeltas {
        StatKind::ALL
            .iter()
            .fold(self, |acc, kind| acc.with(*kind, rhs.get(*kind)))
    }
}

impl AddAssign for StatDeltas {
    fn add_assign(&mut self, rhs: StatDeltas) {
        *self = *self + rhs;
    }
}
