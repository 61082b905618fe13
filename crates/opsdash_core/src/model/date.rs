//! Calendar helpers shared by records, filters and metrics.
//!
//! All dates are civil dates without time zone (`YYYY-MM-DD`).

use chrono::{Datelike, Days, NaiveDate, Weekday};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Canonical textual date format used by storage and CSV.
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

static ISO_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid iso date regex"));

/// Parses a strict `YYYY-MM-DD` date.
///
/// Unlike `NaiveDate::parse_from_str`, single-digit month/day forms are
/// rejected so text round-trips exactly.
pub fn parse_iso_date(value: &str) -> Result<NaiveDate, String> {
    if !ISO_DATE_RE.is_match(value) {
        return Err(format!("invalid date `{value}`; expected YYYY-MM-DD"));
    }
    NaiveDate::parse_from_str(value, ISO_DATE_FORMAT)
        .map_err(|err| format!("invalid date `{value}`: {err}"))
}

/// Parses an optional date cell; blank text maps to `None`.
pub fn parse_optional_iso_date(value: &str) -> Result<Option<NaiveDate>, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    parse_iso_date(trimmed).map(Some)
}

/// Formats a date as `YYYY-MM-DD`.
pub fn format_iso_date(date: NaiveDate) -> String {
    date.format(ISO_DATE_FORMAT).to_string()
}

/// Shifts a date by a signed number of days. Returns `None` on calendar overflow.
pub fn shift_days(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    if days >= 0 {
        date.checked_add_days(Days::new(days.unsigned_abs()))
    } else {
        date.checked_sub_days(Days::new(days.unsigned_abs()))
    }
}

/// Inclusive civil date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Creates a range, returning `None` when `end < start`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        if end < start {
            return None;
        }
        Some(Self { start, end })
    }

    /// Returns whether `date` falls inside the range (inclusive).
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Returns whether an optionally-bounded window overlaps this range.
    ///
    /// Missing bounds are treated as open-ended.
    pub fn overlaps(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> bool {
        let starts_before_end = start.map_or(true, |value| value <= self.end);
        let ends_after_start = end.map_or(true, |value| value >= self.start);
        starts_before_end && ends_after_start
    }

    /// Intersection with another range, if any.
    pub fn intersect(&self, other: &DateRange) -> Option<DateRange> {
        DateRange::new(self.start.max(other.start), self.end.min(other.end))
    }

    /// Number of calendar days in the range (inclusive).
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Whole calendar month; `None` for an invalid year/month.
    pub fn month(year: i32, month: u32) -> Option<Self> {
        let start = NaiveDate::from_ymd_opt(year, month, 1)?;
        let end = start
            .checked_add_months(chrono::Months::new(1))?
            .pred_opt()?;
        Some(Self { start, end })
    }

    /// January 1st of `as_of`'s year through `as_of`.
    pub fn year_to_date(as_of: NaiveDate) -> Self {
        let start = NaiveDate::from_ymd_opt(as_of.year(), 1, 1).unwrap_or(as_of);
        Self { start, end: as_of }
    }

    /// Number of Monday–Friday days in the range (inclusive).
    pub fn weekdays(&self) -> i64 {
        let total = self.days();
        let full_weeks = total / 7;
        let mut count = full_weeks * 5;
        let mut cursor = shift_days(self.start, full_weeks * 7);
        while let Some(day) = cursor {
            if day > self.end {
                break;
            }
            if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
                count += 1;
            }
            cursor = day.succ_opt();
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_iso_date, parse_optional_iso_date, DateRange};
    use chrono::NaiveDate;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn strict_parse_rejects_short_forms() {
        assert!(parse_iso_date("2024-1-05").is_err());
        assert!(parse_iso_date("05/01/2024").is_err());
        assert!(parse_iso_date("2024-02-30").is_err());
        assert_eq!(parse_iso_date("2024-02-29").unwrap(), day(2024, 2, 29));
    }

    #[test]
    fn blank_optional_date_is_none() {
        assert_eq!(parse_optional_iso_date("  ").unwrap(), None);
    }

    #[test]
    fn weekdays_counts_two_full_weeks() {
        // 2024-07-01 is a Monday.
        let range = DateRange::new(day(2024, 7, 1), day(2024, 7, 14)).unwrap();
        assert_eq!(range.days(), 14);
        assert_eq!(range.weekdays(), 10);
    }

    #[test]
    fn weekdays_handles_partial_week() {
        let range = DateRange::new(day(2024, 7, 5), day(2024, 7, 8)).unwrap();
        assert_eq!(range.weekdays(), 2);
    }

    #[test]
    fn year_to_date_starts_on_january_first() {
        let range = DateRange::year_to_date(day(2024, 6, 30));
        assert_eq!(range.start, day(2024, 1, 1));
        assert_eq!(range.days(), 182);
    }

    #[test]
    fn month_covers_leap_february() {
        let february = DateRange::month(2024, 2).unwrap();
        assert_eq!(february.end, day(2024, 2, 29));
        assert_eq!(DateRange::month(2024, 12).unwrap().days(), 31);
        assert_eq!(DateRange::month(2024, 13), None);
    }

    #[test]
    fn overlap_treats_missing_bounds_as_open() {
        let range = DateRange::new(day(2024, 1, 1), day(2024, 1, 31)).unwrap();
        assert!(range.overlaps(None, None));
        assert!(range.overlaps(Some(day(2023, 6, 1)), None));
        assert!(!range.overlaps(Some(day(2024, 2, 1)), None));
        assert!(!range.overlaps(None, Some(day(2023, 12, 31))));
    }
}
