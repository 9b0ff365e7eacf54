//! Cleaning helpers for the raw CSV exports
//!
//! Every parser returns `None` for values it cannot read so the importer can
//! drop the row and count it.

use chrono::NaiveDate;
use regex::Regex;

use crate::{Method, WeightClass};

/// Seconds in one scheduled round
pub const ROUND_SECONDS: f64 = 300.0;

/// Collapse runs of whitespace and trim
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Key used to match names, events and bouts across files
pub fn normalize_name(s: &str) -> String {
    collapse_whitespace(s).to_lowercase()
}

/// Parse `M:SS` into seconds
pub fn parse_clock(s: &str) -> Option<f64> {
    let (minutes, seconds) = s.trim().split_once(':')?;
    let minutes: f64 = minutes.trim().parse().ok()?;
    let seconds: f64 = seconds.trim().parse().ok()?;
    Some(minutes * 60.0 + seconds)
}

/// Parse `"X of Y"` into (landed, attempted)
pub fn split_of(s: &str) -> Option<(f64, f64)> {
    let (landed, attempted) = s.split_once(" of ")?;
    Some((landed.trim().parse().ok()?, attempted.trim().parse().ok()?))
}

/// Parse a plain numeric cell such as `KD` or `REV.`
pub fn parse_count(s: &str) -> Option<f64> {
    s.trim().parse().ok()
}

/// Parse `Round 2` (or a bare `2`)
pub fn parse_round(s: &str) -> Option<u32> {
    let s = s.trim();
    let digits = s.strip_prefix("Round").unwrap_or(s).trim();
    digits.parse().ok()
}

/// Total elapsed time: finished round clock plus the full rounds before it
pub fn bout_duration(round: u32, clock: Option<f64>) -> f64 {
    match clock {
        Some(seconds) => seconds + (round.saturating_sub(1)) as f64 * ROUND_SECONDS,
        None => round as f64 * ROUND_SECONDS,
    }
}

/// Height such as `5' 11"` in inches
pub fn parse_height(s: &str) -> Option<f64> {
    let pattern = Regex::new(r#"^\s*(\d+)'\s*(\d+)"?\s*$"#).ok()?;
    let caps = pattern.captures(s)?;
    let feet: f64 = caps.get(1)?.as_str().parse().ok()?;
    let inches: f64 = caps.get(2)?.as_str().parse().ok()?;
    Some(feet * 12.0 + inches)
}

/// Reach such as `72"` in inches
pub fn parse_reach(s: &str) -> Option<f64> {
    s.trim().trim_end_matches('"').trim().parse().ok()
}

/// Weight such as `155 lbs.` in pounds
pub fn parse_weight(s: &str) -> Option<f64> {
    s.split_whitespace().next()?.parse().ok()
}

/// Dates appear as `March 11, 2023` (events) or `Jul 19, 1987` (fighters)
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = collapse_whitespace(s);
    ["%B %d, %Y", "%b %d, %Y", "%Y-%m-%d"]
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(&s, format).ok())
}

/// Map a raw method onto a bucket; DQs, doctor stoppages and anything
/// unrecognised yield `None`
pub fn parse_method(s: &str) -> Option<Method> {
    let method = normalize_name(s);
    if method.contains("decision") {
        Some(Method::Decision)
    } else if method == "ko/tko" {
        Some(Method::KoTko)
    } else if method == "submission" {
        Some(Method::Submission)
    } else {
        None
    }
}

/// Division named by a result's weight class column, accepting regular,
/// title and interim title bouts
pub fn parse_bout_class(s: &str) -> Option<WeightClass> {
    let s = collapse_whitespace(s);
    let division = s.strip_suffix(" Bout")?;
    let division = division
        .strip_prefix("UFC Interim ")
        .or_else(|| division.strip_prefix("UFC "))
        .map(|d| d.strip_suffix(" Title"))
        .unwrap_or(Some(division))?;
    WeightClass::from_code(division)
}

/// Split `A vs. B` into two trimmed names
pub fn split_bout(s: &str) -> Option<(String, String)> {
    let (a, b) = s.split_once(" vs. ")?;
    let (a, b) = (collapse_whitespace(a), collapse_whitespace(b));
    if a.is_empty() || b.is_empty() {
        return None;
    }
    Some((a, b))
}

/// Mean and sample standard deviation
pub fn mean_and_std(values: &[f64]) -> Option<(f64, f64)> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some((mean, variance.sqrt()))
}
