//! Duration extraction from free-text instructions
//!
//! Scans instruction text for hour, minute and second mentions and sums
//! them into a countdown length. Each unit category is matched
//! independently and only its first occurrence counts.

use regex::Regex;
use std::sync::LazyLock;

/// Optional range tail after the leading numeral ("2-3", "2 à 3", "2 to 3")
///
/// Numerals are whole ASCII integers: a decimal such as "1,5 heure" is read
/// from its last integer part only.
const RANGE_TAIL: &str = r"(?:\s*(?:-|–|à|to|ou|or)\s*[0-9]+)?";

/// Hour mentions: "3 heures", "1 hour", "2h", "1 hr", "1h30"
///
/// Group 2 holds the minutes of the compact "1h30" form when nothing but a
/// word boundary follows them.
static HOURS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)([0-9]+){RANGE_TAIL}\s*(?:heures?|hours?|hrs?|h)(?:([0-9]{{1,2}})\b|[0-9]|\b)"
    ))
    .unwrap()
});

/// Minute mentions: "10 minutes", "5 min", "20mn"
static MINUTES_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)([0-9]+){RANGE_TAIL}\s*(?:minutes?|mins?|mn)\b"
    ))
    .unwrap()
});

/// Second mentions: "30 secondes", "45 sec", "10s"
static SECONDS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)([0-9]+){RANGE_TAIL}\s*(?:secondes?|seconds?|secs?|s)\b"
    ))
    .unwrap()
});

/// Value of the first match of `pattern` in `text`, if any
fn first_quantity(pattern: &Regex, text: &str) -> Option<u32> {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())
}

/// Extract a countdown length in seconds from instruction text
///
/// Returns `None` when no hour, minute or second mention is found. A total
/// of zero is not a usable countdown and is also reported as `None`.
///
/// ```
/// use cookalong::duration::parse_duration;
///
/// assert_eq!(parse_duration("Mijoter à feu doux pendant 3 heures"), Some(10800));
/// assert_eq!(parse_duration("Cuire 2-3 minutes"), Some(120));
/// assert_eq!(parse_duration("Dressage final"), None);
/// ```
pub fn parse_duration(text: &str) -> Option<u32> {
    let hour_caps = HOURS_PATTERN.captures(text);
    let hours = hour_caps
        .as_ref()
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok());
    // "1h30" carries its minutes without a unit
    let compact_minutes = hour_caps
        .as_ref()
        .and_then(|caps| caps.get(2))
        .and_then(|m| m.as_str().parse::<u32>().ok());
    let minutes = first_quantity(&MINUTES_PATTERN, text).or(compact_minutes);
    let seconds = first_quantity(&SECONDS_PATTERN, text);

    if hours.is_none() && minutes.is_none() && seconds.is_none() {
        return None;
    }

    let total = hours
        .unwrap_or(0)
        .saturating_mul(3600)
        .saturating_add(minutes.unwrap_or(0).saturating_mul(60))
        .saturating_add(seconds.unwrap_or(0));

    (total > 0).then_some(total)
}

/// Render seconds as `mm:ss`, or `h:mm:ss` from one hour upwards
pub fn format_clock(seconds: u32) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}
