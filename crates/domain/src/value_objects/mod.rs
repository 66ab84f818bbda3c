//! Value objects - Immutable objects defined by their attributes

mod calendar;
mod nation;
mod stat;

pub use calendar::{launch_date, TimeIncrement};

pub use nation::{
    canonical_nation, is_known_nuclear_power, is_playable_nation, is_supranational_actor,
    NUCLEAR_POWERS, PLAYABLE_NATIONS, SUPRANATIONAL_ACTORS,
};

pub use stat::{StatDeltas, StatKind, Stats, STAT_MAX, STAT_MIN};
