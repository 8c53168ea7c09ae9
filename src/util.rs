// Utility helpers for parsing, hashing and number formatting.
//
// This module centralizes the "dirty" CSV text handling (dates in half a
// dozen spellings, years buried in free text) so the rest of the code can
// assume typed values.
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use num_format::{Locale, ToFormattedString};
use once_cell::sync::Lazy;
use regex::Regex;

static YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b((?:19|20)\d{2})\b").expect("valid regex"));

/// Full timestamp layouts tried after RFC 3339, in order.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    // Austin Animal Center exports, e.g. `05/08/2019 10:15:00 AM`.
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

/// Parse an event date from a raw CSV value.
///
/// Tries, in order: an ISO-like parse (including the shelter's own
/// `MM/DD/YYYY hh:mm:ss AM` layout), a `YYYY-M` month-only parse, an
/// `M-YYYY` month-only parse, and finally `Month YYYY`. Month-only values
/// resolve to midnight on the first of the month.
pub fn parse_event_date(s: Option<&str>) -> Option<NaiveDateTime> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    parse_iso_like(s)
        .or_else(|| parse_year_month(s))
        .or_else(|| parse_month_year(s))
        .or_else(|| parse_month_name_year(s))
}

fn parse_iso_like(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// `2019-5`, `2019-05`, `2019/05`.
fn parse_year_month(s: &str) -> Option<NaiveDateTime> {
    let (year, month) = split_pair(s)?;
    if year.len() != 4 || month.is_empty() || month.len() > 2 {
        return None;
    }
    first_of_month(year.parse().ok()?, month.parse().ok()?)
}

/// `5-2019`, `05/2019`.
fn parse_month_year(s: &str) -> Option<NaiveDateTime> {
    let (month, year) = split_pair(s)?;
    if year.len() != 4 || month.is_empty() || month.len() > 2 {
        return None;
    }
    first_of_month(year.parse().ok()?, month.parse().ok()?)
}

/// `May 2019`, `Sep 2021`.
fn parse_month_name_year(s: &str) -> Option<NaiveDateTime> {
    NaiveDate::parse_from_str(&format!("1 {s}"), "%d %B %Y")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

fn split_pair(s: &str) -> Option<(&str, &str)> {
    let mut parts = s.split(['-', '/']);
    let a = parts.next()?.trim();
    let b = parts.next()?.trim();
    if parts.next().is_some() {
        return None;
    }
    Some((a, b))
}

fn first_of_month(year: i32, month: u32) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(year, month, 1)?.and_hms_opt(0, 0, 0)
}

/// Find a standalone four-digit year (19xx or 20xx) anywhere in `s`.
pub fn year_from_text(s: &str) -> Option<i32> {
    YEAR_RE
        .captures(s)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Order-statistic percentile over an ascending slice: `sorted[floor(n * q)]`,
/// no interpolation. Returns 0 for an empty slice.
pub fn percentile(sorted: &[u64], q: f64) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let idx = (sorted.len() as f64 * q).floor() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

/// 31-multiplier string hash over code points (`h = h * 31 + c`, wrapping).
/// Stable across runs and platforms, unlike `std`'s hasher.
pub fn stable_hash(s: &str) -> i32 {
    s.chars()
        .fold(0i32, |h, c| h.wrapping_mul(31).wrapping_add(c as u32 as i32))
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimals with locale thousands separators, e.g. `1,234.50`.
    let neg = n.is_sign_negative() && n != 0.0;
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_val: i64 = parts.next().unwrap_or("0").parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = parts.next() {
        res.push('.');
        res.push_str(frac);
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Counts in console messages, e.g. `9,855 rows loaded`.
    n.to_formatted_string(&Locale::en)
}
