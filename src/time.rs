//! Media duration parsing and timestamp formatting.

use std::fmt::Write;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Utc};

const DATE_UNITS: [(char, u64); 2] = [('W', 604_800), ('D', 86_400)];
const TIME_UNITS: [(char, u64); 3] = [('H', 3_600), ('M', 60), ('S', 1)];

/// Parse an ISO-8601 duration such as `PT1H2M3S` or `P1DT4M` into seconds.
///
/// Only the designators upstream emits are accepted. Years and months have
/// no fixed length and are rejected, as are fractions.
pub fn parse_duration(value: &str) -> Option<u64> {
    let rest = value.trim().strip_prefix('P')?;

    let (date, time) = match rest.split_once('T') {
        Some((date, time)) => {
            if time.is_empty() {
                return None;
            }
            (date, Some(time))
        }
        None => (rest, None),
    };

    if date.is_empty() && time.is_none() {
        return None;
    }

    let mut total = sum_components(date, &DATE_UNITS)?;
    if let Some(time) = time {
        total = total.checked_add(sum_components(time, &TIME_UNITS)?)?;
    }

    Some(total)
}

fn sum_components(input: &str, units: &[(char, u64)]) -> Option<u64> {
    let mut total: u64 = 0;
    let mut number = String::new();
    let mut next_unit = 0;

    for c in input.chars() {
        if c.is_ascii_digit() {
            number.push(c);
            continue;
        }

        // Designators must appear once each and in order.
        let offset = units[next_unit..].iter().position(|(unit, _)| *unit == c)?;
        let (_, seconds) = units[next_unit + offset];
        next_unit += offset + 1;

        if number.is_empty() {
            return None;
        }
        let amount: u64 = number.parse().ok()?;
        total = total.checked_add(amount.checked_mul(seconds)?)?;
        number.clear();
    }

    if !number.is_empty() {
        return None;
    }

    Some(total)
}

/// `MM:SS` below an hour, `H:MM:SS` from there on.
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

/// Format with a strftime pattern, falling back to RFC 3339 if the pattern
/// cannot be rendered.
pub fn format_timestamp(ts: &DateTime<Utc>, pattern: &str) -> String {
    let mut out = String::new();
    if write!(out, "{}", ts.format(pattern)).is_err() {
        return ts.to_rfc3339();
    }
    out
}

pub fn is_valid_pattern(pattern: &str) -> bool {
    !StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error))
}

/// IMF-fixdate, as used by `Last-Modified`.
pub fn http_date(ts: &DateTime<Utc>) -> String {
    ts.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
