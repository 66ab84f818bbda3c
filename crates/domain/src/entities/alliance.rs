//! Alliance entity - the player's bloc
//!
//! # Invariants
//!
//! - `name` is non-blank
//! - `members` is non-empty and holds canonical nation names
//! - `leader` is always one of `members`
//!
//! Deserialization goes through the same validation as [`Alliance::new`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::DomainError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "AllianceRecord", into = "AllianceRecord")]
pub struct Alliance {
    name: String,
    kind: String,
    members: BTreeSet<String>,
    leader: String,
}

impl Alliance {
    /// Create a validated alliance.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the name is blank, the member set is
    /// empty, or the leader is not a member.
    pub fn new(
        name: impl Into<String>,
        kind: impl Into<String>,
        members: BTreeSet<String>,
        leader: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let name = name.into().trim().to_string();
        let leader = leader.into();

        if name.is_empty() {
            return Err(DomainError::validation("Alliance name cannot be empty"));
        }
        if members.is_empty() {
            return Err(DomainError::validation("Alliance must have at least one member"));
        }
        if !members.contains(&leader) {
            return Err(DomainError::validation(format!(
                "Alliance leader '{leader}' is not a member"
            )));
        }

        Ok(Self {
            name,
            kind: kind.into(),
            members,
            leader,
        })
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type label, e.g. "Military Alliance" or "Trade Bloc".
    #[inline]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    #[inline]
    pub fn members(&self) -> &BTreeSet<String> {
        &self.members
    }

    #[inline]
    pub fn leader(&self) -> &str {
        &self.leader
    }

    pub fn is_member(&self, nation: &str) -> bool {
        self.members.contains(nation)
    }
}

/// Wire shape used for (de)serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AllianceRecord {
    name: String,
    kind: String,
    members: BTreeSet<String>,
    leader: String,
}

impl TryFrom<AllianceRecord> for Alliance {
    type Error = DomainError;

    fn try_from(record: AllianceRecord) -> Result<Self, Self::Error> {
        Alliance::new(record.name, record.kind, record.members, record.leader)
    }
}

impl From<Alliance> for AllianceRecord {
    fn from(alliance: Alliance) -> Self {
        Self {
            name: alliance.name,
            kind: alliance.kind,
            members: alliance.members,
            leader: alliance.leader,
        }
    }
}
