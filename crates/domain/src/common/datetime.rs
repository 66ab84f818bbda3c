//! Game-date parsing utilities.
//!
//! Saved games store the calendar date as text. Loading accepts both the
//! plain `YYYY-MM-DD` form written by this crate and full RFC3339 timestamps
//! written by older saves or external tools.

use chrono::{DateTime, NaiveDate};

const GAME_DATE_FORMAT: &str = "%Y-%m-%d";

/// Formats a game date as `YYYY-MM-DD`.
pub fn format_game_date(date: NaiveDate) -> String {
    date.format(GAME_DATE_FORMAT).to_string()
}

/// Parses a stored game date.
///
/// # Examples
///
/// ```
/// use statecraft_domain::common::parse_game_date;
/// use chrono::Datelike;
///
/// let date = parse_game_date("2025-03-01").unwrap();
/// assert_eq!(date.month(), 3);
///
/// let date = parse_game_date("2025-03-01T00:00:00Z").unwrap();
/// assert_eq!(date.day(), 1);
/// ```
///
/// # Errors
///
/// Returns `chrono::ParseError` if the string is neither a plain date nor RFC3339.
pub fn parse_game_date(s: &str) -> Result<NaiveDate, chrono::ParseError> {
    let trimmed = s.trim();
    NaiveDate::parse_from_str(trimmed, GAME_DATE_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc3339(trimmed).map(|dt| dt.date_naive()))
}

/// Parses a stored game date, falling back to `default` when malformed.
pub fn parse_game_date_or(s: &str, default: NaiveDate) -> NaiveDate {
    parse_game_date(s).unwrap_or(default)
}
