//! Calendar advance for turns.
//!
//! A turn covers a day, a month or a year of game time, as requested by the
//! narrative provider. Month arithmetic clamps to the end of the month, so
//! January 31st plus one month is the last day of February.

use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DomainError;

/// Date every new game starts on.
pub fn launch_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or_default()
}

/// How far one turn moves the calendar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeIncrement {
    Day,
    #[default]
    Month,
    Year,
}

impl TimeIncrement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Month => "month",
            Self::Year => "year",
        }
    }

    /// Returns `date` moved forward by this increment.
    ///
    /// Dates at the end of chrono's range are returned unchanged rather than
    /// panicking.
    pub fn advance(&self, date: NaiveDate) -> NaiveDate {
        let advanced = match self {
            Self::Day => date.checked_add_days(Days::new(1)),
            Self::Month => date.checked_add_months(Months::new(1)),
            Self::Year => date.checked_add_months(Months::new(12)),
        };
        advanced.unwrap_or(date)
    }
}

impl fmt::Display for TimeIncrement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TimeIncrement {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" | "days" | "daily" | "1 day" => Ok(Self::Day),
            "month" | "months" | "monthly" | "1 month" => Ok(Self::Month),
            "year" | "years" | "yearly" | "annual" | "1 year" => Ok(Self::Year),
            other => Err(DomainError::parse(format!("unknown time increment '{other}'"))),
        }
    }
}
