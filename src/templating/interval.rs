//! Compact time intervals such as `9d3h` or `2w`.
//!
//! An interval is a run of `<integer><unit>` pairs with units `w`, `d`, `h`,
//! `m` and `s`, optionally followed by a bare integer counted as seconds. The
//! parts are summed, so `1h30m` and `90m` are equal.

use chrono::TimeDelta;

/// Parse an interval, returning `None` for empty or malformed input.
///
/// ```
/// use chrono::TimeDelta;
/// use release_docs::templating::interval::parse_interval;
///
/// assert_eq!(parse_interval("9d3h"), Some(TimeDelta::hours(9 * 24 + 3)));
/// assert_eq!(parse_interval("1m30"), Some(TimeDelta::seconds(90)));
/// assert_eq!(parse_interval("3 days"), None);
/// ```
pub fn parse_interval(text: &str) -> Option<TimeDelta> {
    if text.is_empty() {
        return None;
    }

    let mut total: i64 = 0;
    let mut digits = String::new();
    for c in text.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }

        let unit: i64 = match c {
            'w' => 7 * 24 * 3600,
            'd' => 24 * 3600,
            'h' => 3600,
            'm' => 60,
            's' => 1,
            _ => return None,
        };
        if digits.is_empty() {
            return None;
        }
        let amount: i64 = digits.parse().ok()?;
        total = total.checked_add(amount.checked_mul(unit)?)?;
        digits.clear();
    }

    if !digits.is_empty() {
        total = total.checked_add(digits.parse().ok()?)?;
    }

    TimeDelta::try_seconds(total)
}
