//! Date normalization and cutoff decisions.
//!
//! Municipal boards render posting dates in wildly inconsistent shapes:
//! Korean-language phrases (`2025년 9월 30일(화) 16:51:34`), separator-form
//! dates embedded in surrounding text, two-digit short forms (`24.12.31`),
//! or nothing recognizable at all. [`normalize_date`] applies an ordered rule
//! chain and yields `None` when no four-digit year is recoverable.
//!
//! A missing date never stops a run: [`should_stop`] treats `None` as
//! "keep going" so that a single malformed row cannot truncate a harvest.

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use std::sync::OnceLock;

/// Strict formats tried in order after the extraction rules.
const STRICT_FORMATS: &[&str] = &["%Y-%m-%d", "%Y.%m.%d", "%Y/%m/%d", "%m-%d-%Y", "%m.%d.%Y", "%m/%d/%Y"];

fn korean_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{4})년\s*(\d{1,2})월\s*(\d{1,2})일").unwrap())
}

fn separator_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{4})[-./](\d{1,2})[-./](\d{1,2})").unwrap())
}

fn short_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{2})\.(\d{1,2})\.(\d{1,2})$").unwrap())
}

fn four_digit_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d{4}").unwrap())
}

/// Parses heterogeneous date text into a calendar date.
///
/// Rules are applied in order until one matches:
///
/// 1. Korean phrase `YYYY년 M월 D일` anywhere in the text.
/// 2. First `YYYY-MM-DD` / `YYYY.MM.DD` / `YYYY/MM/DD` substring.
/// 3. Two-digit short form `YY.M.D`, expanded to `20YY`.
/// 4. Strict parse against a fixed format list.
/// 5. Permissive scan, accepted only when the text contains a four-digit
///    number (guards against reading unrelated digits as a date).
///
/// Returns `None` when nothing matches.
///
/// # Example
///
/// ```rust
/// use chrono::NaiveDate;
/// use gosi_core::dates::normalize_date;
///
/// assert_eq!(normalize_date("24.12.31"), NaiveDate::from_ymd_opt(2024, 12, 31));
/// assert_eq!(normalize_date("등록일: 2025년 9월 30일(화) 16:51:34"), NaiveDate::from_ymd_opt(2025, 9, 30));
/// assert_eq!(normalize_date("조회수 1234"), None);
/// ```
pub fn normalize_date(raw: &str) -> Option<NaiveDate> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }

    if let Some(caps) = korean_date_re().captures(text) {
        return ymd_from_captures(&caps);
    }

    if let Some(caps) = separator_date_re().captures(text) {
        return ymd_from_captures(&caps);
    }

    if let Some(caps) = short_date_re().captures(text) {
        let year: i32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let day: u32 = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(2000 + year, month, day);
    }

    for format in STRICT_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(date);
        }
    }

    permissive_parse(text)
}

fn ymd_from_captures(caps: &regex::Captures<'_>) -> Option<NaiveDate> {
    let year: i32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let day: u32 = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Last-resort scan: pull out up to three numbers around a four-digit year.
///
/// Only runs when the text contains a four-digit number, so strings like
/// "조회 187" can never be misread as dates.
fn permissive_parse(text: &str) -> Option<NaiveDate> {
    if !four_digit_re().is_match(text) {
        return None;
    }

    static NUMS: OnceLock<Regex> = OnceLock::new();
    let nums = NUMS.get_or_init(|| Regex::new(r"\d+").unwrap());

    let numbers: Vec<&str> = nums.find_iter(text).map(|m| m.as_str()).collect();
    let year_idx = numbers.iter().position(|n| n.len() == 4)?;
    let year: i32 = numbers[year_idx].parse().ok()?;
    if !(1900..=2100).contains(&year) {
        return None;
    }

    let month: u32 = numbers.get(year_idx + 1)?.parse().ok()?;
    let day: u32 = numbers.get(year_idx + 2)?.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// The boundary below which announcements are not collected.
///
/// Supplied once at engine construction and immutable for the run. A date
/// threshold wins over a year threshold when the caller sets both (the CLI
/// enforces that ordering).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CutoffThreshold {
    /// Stop once announcements are strictly earlier than this date.
    Date(NaiveDate),
    /// Stop once announcements fall in a strictly earlier year.
    Year(i32),
}

/// Decides whether harvesting should stop at the given raw date text.
///
/// Returns `false` when the text yields no recognizable date; a run is never
/// blocked on missing data. Invoked twice per announcement: once against the
/// list-page date (cheap, possibly imprecise) and once against the
/// detail-page date (authoritative). Either signal halts the whole run.
pub fn should_stop(date_text: &str, threshold: CutoffThreshold) -> bool {
    let Some(date) = normalize_date(date_text) else {
        return false;
    };

    match threshold {
        CutoffThreshold::Date(limit) => date < limit,
        CutoffThreshold::Year(year) => date.year() < year,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[rstest]
    #[case("2025-09-10", 2025, 9, 10)]
    #[case("2025.09.10", 2025, 9, 10)]
    #[case("2025/9/1", 2025, 9, 1)]
    #[case("24.12.31", 2024, 12, 31)]
    #[case("2025년 9월 30일(화) 16:51:34", 2025, 9, 30)]
    #[case("공고일 2025년1월2일", 2025, 1, 2)]
    #[case("작성일: 2024-01-05 14:22", 2024, 1, 5)]
    #[case("12-31-2024", 2024, 12, 31)]
    fn test_normalize_known_shapes(#[case] raw: &str, #[case] y: i32, #[case] m: u32, #[case] day: u32) {
        assert_eq!(normalize_date(raw), Some(d(y, m, day)));
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("조회수 187")]
    #[case("no date here")]
    #[case("13.45")]
    fn test_normalize_unparseable(#[case] raw: &str) {
        assert_eq!(normalize_date(raw), None);
    }

    #[test]
    fn test_permissive_requires_four_digit_year() {
        // Three small numbers, no 4-digit year: must not be read as a date.
        assert_eq!(normalize_date("item 12 34 56"), None);
    }

    #[test]
    fn test_permissive_rejects_absurd_years() {
        assert_eq!(normalize_date("ref 9999 1 1"), None);
    }

    #[test]
    fn test_should_stop_by_year() {
        assert!(should_stop("2024-12-20", CutoffThreshold::Year(2025)));
        assert!(!should_stop("2025-01-05", CutoffThreshold::Year(2025)));
        assert!(!should_stop("2025-01-10", CutoffThreshold::Year(2025)));
    }

    #[test]
    fn test_should_stop_by_date() {
        let limit = CutoffThreshold::Date(d(2025, 3, 1));
        assert!(should_stop("2025-02-28", limit));
        assert!(!should_stop("2025-03-01", limit));
        assert!(!should_stop("2025-03-02", limit));
    }

    #[test]
    fn test_should_stop_absent_never_stops() {
        assert!(!should_stop("", CutoffThreshold::Year(2025)));
        assert!(!should_stop("garbage", CutoffThreshold::Date(d(2099, 1, 1))));
    }
}
