//! Date helpers for package freshness.

use std::sync::LazyLock;

use chrono::{DateTime, Local, NaiveDate, TimeZone};
use regex::Regex;

/// Threshold used by `rinse outdated` when the configured value is unusable.
pub const DEFAULT_OUTDATED_DAYS: i64 = 180;

static TIME_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)([dmy])$").expect("time value regex is valid"));

/// Convert `Nd`, `Nm` or `Ny` into days (30-day months, 365-day years).
pub fn parse_time_value(value: &str) -> i64 {
    let Some(caps) = TIME_VALUE.captures(value.trim()) else {
        return DEFAULT_OUTDATED_DAYS;
    };
    let Ok(n) = caps[1].parse::<i64>() else {
        return DEFAULT_OUTDATED_DAYS;
    };
    let days = match &caps[2] {
        "d" => Some(n),
        "m" => n.checked_mul(30),
        "y" => n.checked_mul(365),
        _ => None,
    };
    days.unwrap_or(DEFAULT_OUTDATED_DAYS)
}

pub fn is_time_value(value: &str) -> bool {
    TIME_VALUE.is_match(value)
}

/// Parse a build date as printed by pacman.
///
/// Accepts `DD Month YYYY` and `YYYY-MM-DD`, optionally preceded by a weekday
/// and followed by anything (time of day, zone).
pub fn parse_build_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    parse_date_prefix(raw).or_else(|| {
        let (first, rest) = raw.split_once(char::is_whitespace)?;
        if first.chars().all(|c| c.is_alphabetic() || c == ',') {
            parse_date_prefix(rest.trim_start())
        } else {
            None
        }
    })
}

fn parse_date_prefix(s: &str) -> Option<NaiveDate> {
    ["%d %B %Y", "%Y-%m-%d"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_and_remainder(s, fmt).ok())
        .map(|(date, _)| date)
}

/// Local calendar date of a Unix timestamp.
pub fn date_from_timestamp(secs: i64) -> Option<NaiveDate> {
    date_from_timestamp_in(secs, &Local)
}

fn date_from_timestamp_in<Tz: TimeZone>(secs: i64, zone: &Tz) -> Option<NaiveDate> {
    DateTime::from_timestamp(secs, 0).map(|utc| utc.with_timezone(zone).date_naive())
}

/// `DD Month YYYY`, the format shown next to "Last updated".
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d %B %Y").to_string()
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Describe how long ago `date` was, relative to `today`.
pub fn humanize_age(date: NaiveDate, today: NaiveDate) -> String {
    let days = (today - date).num_days().max(0);
    match days {
        0 => "today".to_string(),
        1 => "1 day ago".to_string(),
        d if d < 30 => format!("{} days ago", d),
        d if d < 365 => format!("{} months ago", d / 30),
        d => format!("{} years ago", d / 365),
    }
}
