//! Flexible date parsing shared by all parser adapters
//!
//! Job boards print dates in many shapes: `25.12.2023`, `3 days ago`,
//! `12/25/2023`, `2024-01-01`, `March 5, 2024`. [`parse_flexible_date`]
//! tries these in a fixed priority order and never fails: when nothing
//! matches it returns the current time, so one bad date never drops an item.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Parses a free-text date, falling back to the current time
///
/// # Priority order
///
/// 1. Contains `.`: `day.month.year` with a 4-digit or 2-digit year
///    (2-digit years below 50 map to the 2000s, others to the 1900s)
/// 2. Contains `ago`: `<N> <unit> ago` for seconds, minutes, hours and days
/// 3. Contains `/`: `first/second/year`, day-first only when `first > 12`
/// 4. Generic calendar formats (RFC 3339, RFC 2822, ISO dates, month names)
/// 5. The current time
///
/// Calendar dates are interpreted as UTC midnight.
pub fn parse_flexible_date(input: Option<&str>) -> DateTime<Utc> {
    parse_flexible_date_at(input, Utc::now())
}

/// Same as [`parse_flexible_date`] with an explicit reference time
pub fn parse_flexible_date_at(input: Option<&str>, now: DateTime<Utc>) -> DateTime<Utc> {
    let text = match input.map(str::trim) {
        Some(t) if !t.is_empty() => t,
        _ => return now,
    };

    let specific = if text.contains('.') {
        parse_dotted(text)
    } else if text.to_lowercase().contains("ago") {
        parse_relative(text, now)
    } else if text.contains('/') {
        parse_slashed(text)
    } else {
        None
    };

    specific
        .or_else(|| parse_generic(text))
        .unwrap_or_else(|| {
            tracing::debug!("Unparsable date '{}', using current time", text);
            now
        })
}

/// `25.12.2023` or `25.12.23`, possibly embedded in other words
fn parse_dotted(text: &str) -> Option<DateTime<Utc>> {
    text.split_whitespace().find_map(|token| {
        let token = token.trim_matches(|c: char| !c.is_ascii_digit());
        let parts: Vec<&str> = token.split('.').collect();
        if parts.len() != 3 {
            return None;
        }
        let day: u32 = parts[0].parse().ok()?;
        let month: u32 = parts[1].parse().ok()?;
        let year = parse_year(parts[2])?;
        utc_midnight(year, month, day)
    })
}

/// `<N> <unit> ago`
fn parse_relative(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let lower = text.to_lowercase();
    let words: Vec<&str> = lower.split_whitespace().collect();
    let ago = words.iter().position(|w| w.trim_end_matches('.') == "ago")?;
    if ago < 2 {
        return None;
    }

    let amount: i64 = match words[ago - 2] {
        "a" | "an" => 1,
        n => n.parse().ok()?,
    };

    let unit = match words[ago - 1].trim_end_matches(',') {
        "second" | "seconds" => Duration::seconds(1),
        "minute" | "minutes" => Duration::minutes(1),
        "hour" | "hours" => Duration::hours(1),
        "day" | "days" => Duration::days(1),
        _ => return None,
    };

    let amount = i32::try_from(amount).ok()?;
    now.checked_sub_signed(unit.checked_mul(amount)?)
}

/// `first/second/year`, preferring month/day when ambiguous
fn parse_slashed(text: &str) -> Option<DateTime<Utc>> {
    text.split_whitespace().find_map(|token| {
        let token = token.trim_matches(|c: char| !c.is_ascii_digit());
        let parts: Vec<&str> = token.split('/').collect();
        if parts.len() != 3 {
            return None;
        }
        let first: u32 = parts[0].parse().ok()?;
        let second: u32 = parts[1].parse().ok()?;
        let year = parse_year(parts[2])?;

        let (day, month) = if first > 12 {
            (first, second)
        } else {
            (second, first)
        };
        utc_midnight(year, month, day)
    })
}

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%b %d %Y",
    "%d %B %Y",
    "%d %b %Y",
];

fn parse_generic(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    DATE_FORMATS.iter().find_map(|format| {
        NaiveDate::parse_from_str(text, format)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| Utc.from_utc_datetime(&naive))
    })
}

fn parse_year(raw: &str) -> Option<i32> {
    let year: i32 = raw.parse().ok()?;
    match raw.len() {
        4 => Some(year),
        2 if year < 50 => Some(2000 + year),
        2 => Some(1900 + year),
        _ => None,
    }
}

fn utc_midnight(year: i32, month: u32, day: u32) -> Option<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}
