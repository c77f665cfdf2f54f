//! Closed calendar-day ranges and the inclusive overlap predicate.
//!
//! All booking and hold arithmetic works on whole days: a range
//! `[start, end]` covers both endpoints, and two ranges overlap iff
//! `a.start <= b.end && b.start <= a.end`.

use std::fmt;

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::BookingError;

/// Closed range of calendar days `[start, end]`.
///
/// Construction through [`DateRange::new`] guarantees `start <= end`.
/// Ranges read back from storage are not re-validated; a malformed one
/// simply never overlaps anything (see [`DateRange::overlaps`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    /// First day covered.
    pub start: NaiveDate,
    /// Last day covered.
    pub end: NaiveDate,
}

impl DateRange {
    /// Creates a validated range.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::InvalidArgument`] when `end < start`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, BookingError> {
        if end < start {
            return Err(BookingError::InvalidArgument(format!(
                "range end {end} is before start {start}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Parses two `YYYY-MM-DD` strings into a validated range.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::InvalidArgument`] if either date does not
    /// parse or the range is inverted.
    pub fn parse(from: &str, to: &str) -> Result<Self, BookingError> {
        Self::new(parse_day(from)?, parse_day(to)?)
    }

    /// Derives the span of `months` consecutive calendar months starting
    /// at `start_month` (`YYYY-MM`).
    ///
    /// The range runs from the first day of the start month to the last
    /// day of the `(start + months - 1)`th month.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::InvalidArgument`] when `months` is zero or
    /// the month string is malformed.
    pub fn from_months(start_month: &str, months: u32) -> Result<Self, BookingError> {
        let start = parse_month(start_month)?;
        Self::months_from(start, months)
    }

    /// Like [`DateRange::from_months`] but starting from an already parsed
    /// first-of-month date.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::InvalidArgument`] when `months` is zero,
    /// `start` is not the first day of a month, or the end overflows the
    /// calendar.
    pub fn months_from(start: NaiveDate, months: u32) -> Result<Self, BookingError> {
        if months == 0 {
            return Err(BookingError::InvalidArgument(
                "month count must be at least 1".to_string(),
            ));
        }
        if start.day() != 1 {
            return Err(BookingError::InvalidArgument(format!(
                "monthly range must start on the first day of a month, got {start}"
            )));
        }
        let end = start
            .checked_add_months(Months::new(months))
            .and_then(|next| next.pred_opt())
            .ok_or_else(|| {
                BookingError::InvalidArgument(format!(
                    "{months} months from {start} is out of range"
                ))
            })?;
        Ok(Self { start, end })
    }

    /// Returns the number of whole months this range spans if it is
    /// aligned to month boundaries, otherwise `None`.
    #[must_use]
    pub fn whole_months(&self) -> Option<u32> {
        if self.start.day() != 1 || self.end < self.start {
            return None;
        }
        let span = (self.end.year() - self.start.year()) * 12
            + i32::try_from(self.end.month()).ok()?
            - i32::try_from(self.start.month()).ok()?
            + 1;
        let months = u32::try_from(span).ok()?;
        let aligned = Self::months_from(self.start, months).ok()?;
        (aligned.end == self.end).then_some(months)
    }

    /// Inclusive overlap test. A malformed range (`end < start`) never
    /// overlaps.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        if self.end < self.start || other.end < other.start {
            return false;
        }
        self.start <= other.end && other.start <= self.end
    }

    /// Number of days covered, counting both ends.
    #[must_use]
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Parses a `YYYY-MM-DD` day.
///
/// # Errors
///
/// Returns [`BookingError::InvalidArgument`] on malformed input.
pub fn parse_day(value: &str) -> Result<NaiveDate, BookingError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| BookingError::InvalidArgument(format!("invalid date: {value:?}")))
}

/// Parses a `YYYY-MM` month into the first day of that month.
///
/// # Errors
///
/// Returns [`BookingError::InvalidArgument`] on malformed input.
pub fn parse_month(value: &str) -> Result<NaiveDate, BookingError> {
    NaiveDate::parse_from_str(&format!("{}-01", value.trim()), "%Y-%m-%d")
        .map_err(|_| BookingError::InvalidArgument(format!("invalid month: {value:?}")))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        let Some(date) = NaiveDate::from_ymd_opt(y, m, d) else {
            panic!("valid date");
        };
        date
    }

    fn range(a: NaiveDate, b: NaiveDate) -> DateRange {
        DateRange { start: a, end: b }
    }

    #[test]
    fn overlap_is_inclusive_at_both_ends() {
        let a = range(day(2024, 5, 1), day(2024, 5, 5));
        assert!(a.overlaps(&range(day(2024, 5, 5), day(2024, 5, 9))));
        assert!(a.overlaps(&range(day(2024, 4, 20), day(2024, 5, 1))));
        assert!(a.overlaps(&range(day(2024, 5, 3), day(2024, 5, 4))));
        assert!(!a.overlaps(&range(day(2024, 5, 6), day(2024, 5, 9))));
        assert!(!a.overlaps(&range(day(2024, 4, 1), day(2024, 4, 30))));
    }

    #[test]
    fn malformed_range_never_overlaps() {
        let bad = range(day(2024, 5, 9), day(2024, 5, 1));
        let wide = range(day(2024, 1, 1), day(2024, 12, 31));
        assert!(!bad.overlaps(&wide));
        assert!(!wide.overlaps(&bad));
    }

    #[test]
    fn new_rejects_inverted_range() {
        let result = DateRange::new(day(2024, 5, 2), day(2024, 5, 1));
        assert!(matches!(result, Err(BookingError::InvalidArgument(_))));
        assert!(DateRange::new(day(2024, 5, 1), day(2024, 5, 1)).is_ok());
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(DateRange::parse("2024-05-01", "not-a-date").is_err());
        assert!(DateRange::parse("2024-02-30", "2024-03-01").is_err());
        let Ok(parsed) = DateRange::parse("2024-05-01", "2024-05-05") else {
            panic!("valid range");
        };
        assert_eq!(parsed.days(), 5);
    }

    #[test]
    fn monthly_range_covers_whole_months() {
        let Ok(r) = DateRange::from_months("2024-03", 2) else {
            panic!("valid months");
        };
        assert_eq!(r.start, day(2024, 3, 1));
        assert_eq!(r.end, day(2024, 4, 30));

        let Ok(leap) = DateRange::from_months("2024-02", 1) else {
            panic!("valid months");
        };
        assert_eq!(leap.end, day(2024, 2, 29));

        let Ok(wrap) = DateRange::from_months("2024-11", 3) else {
            panic!("valid months");
        };
        assert_eq!(wrap.end, day(2025, 1, 31));
    }

    #[test]
    fn monthly_range_rejects_zero_and_bad_month() {
        assert!(DateRange::from_months("2024-03", 0).is_err());
        assert!(DateRange::from_months("2024-13", 1).is_err());
        assert!(DateRange::from_months("", 1).is_err());
    }

    #[test]
    fn whole_months_detects_alignment() {
        let Ok(r) = DateRange::from_months("2024-11", 3) else {
            panic!("valid months");
        };
        assert_eq!(r.whole_months(), Some(3));
        assert_eq!(range(day(2024, 3, 1), day(2024, 3, 30)).whole_months(), None);
        assert_eq!(range(day(2024, 3, 2), day(2024, 3, 31)).whole_months(), None);
    }
}
