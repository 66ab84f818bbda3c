//! String helpers for untrusted generator text.

/// Converts a blank (empty or whitespace-only) string to `None`, otherwise
/// returns the trimmed value.
///
/// # Examples
///
/// ```
/// use statecraft_domain::common::none_if_blank;
///
/// assert_eq!(none_if_blank("  Arcadia "), Some("Arcadia"));
/// assert_eq!(none_if_blank("   "), None);
/// ```
pub fn none_if_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

/// Returns true if `haystack` contains any of `needles`, ignoring case.
///
/// Needles are expected in lowercase.
pub fn contains_any_ignore_case(haystack: &str, needles: &[&str]) -> bool {
    let lowered = haystack.to_lowercase();
    needles.iter().any(|needle| lowered.contains(needle))
}

/// Truncates to at most `max_chars` characters, appending an ellipsis when cut.
///
/// Operates on chars, never splitting a multi-byte code point.
pub fn truncate_chars(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    let mut truncated: String = value.chars().take(max_chars.saturating_sub(1)).collect();
    truncated.push('…');
    truncated
}
