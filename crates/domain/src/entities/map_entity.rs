//! MapEntity - a military installation placed on the world map

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::EntityId;

/// Installation types the map knows how to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    MilitaryBase,
    NavalBase,
    AirBase,
    MissileSilo,
    NuclearSilo,
    SpaceCenter,
    RadarStation,
    /// Anything the generator invents that we do not recognise
    #[serde(other)]
    Other,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MilitaryBase => "military_base",
            Self::NavalBase => "naval_base",
            Self::AirBase => "air_base",
            Self::MissileSilo => "missile_silo",
            Self::NuclearSilo => "nuclear_silo",
            Self::SpaceCenter => "space_center",
            Self::RadarStation => "radar_station",
            Self::Other => "other",
        }
    }

    /// Label used when the generator omits one.
    pub fn default_label(&self) -> &'static str {
        match self {
            Self::MilitaryBase => "Military Base",
            Self::NavalBase => "Naval Base",
            Self::AirBase => "Air Base",
            Self::MissileSilo => "Missile Silo",
            Self::NuclearSilo => "Nuclear Silo",
            Self::SpaceCenter => "Space Center",
            Self::RadarStation => "Radar Station",
            Self::Other => "Installation",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = ();

    /// Lenient: accepts snake_case, kebab-case, spaces and common synonyms.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s
            .trim()
            .to_ascii_lowercase()
            .replace(['-', ' '], "_");
        match key.as_str() {
            "military_base" | "base" | "army_base" | "garrison" => Ok(Self::MilitaryBase),
            "naval_base" | "navy_base" | "port" | "harbor" => Ok(Self::NavalBase),
            "air_base" | "airbase" | "airfield" => Ok(Self::AirBase),
            "missile_silo" | "missile_base" | "missile" => Ok(Self::MissileSilo),
            "nuclear_silo" | "nuclear" | "nuclear_site" | "nuke_silo" => Ok(Self::NuclearSilo),
            "space_center" | "space_centre" | "spaceport" | "launch_site" => Ok(Self::SpaceCenter),
            "radar_station" | "radar" => Ok(Self::RadarStation),
            _ => Err(()),
        }
    }
}

/// Latitude / longitude in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lng: f64,
}

impl Position {
    /// Builds a position, clamping to valid coordinate ranges and mapping
    /// non-finite input to zero.
    pub fn new(lat: f64, lng: f64) -> Self {
        let finite = |v: f64| if v.is_finite() { v } else { 0.0 };
        Self {
            lat: finite(lat).clamp(-90.0, 90.0),
            lng: finite(lng).clamp(-180.0, 180.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapEntity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub position: Position,
    pub label: String,
    /// Canonical name of the owning nation
    pub owner: String,
}
