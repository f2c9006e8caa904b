//! Booking window policy and calendar-day normalization.
//!
//! Every date the engine stores or compares is a UTC calendar day
//! ([`NaiveDate`]). [`normalize_date`] is the single entry point that turns
//! client input into that form, for reads and writes alike.

use chrono::{DateTime, Days, Months, NaiveDate, Utc};
use serde::Serialize;

/// Allowed range of booking days, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BookingWindow {
    /// First bookable day (tomorrow)
    pub start: NaiveDate,
    /// Last bookable day (`start` + one calendar month)
    pub end: NaiveDate,
}

impl BookingWindow {
    /// Compute the window relative to `now`.
    ///
    /// `start = start_of_day(now) + 1 day`, `end = start + 1 month`. Month
    /// arithmetic clamps to the last day of the target month.
    #[must_use]
    pub fn from_now(now: DateTime<Utc>) -> Self {
        let today = now.date_naive();
        let start = today.checked_add_days(Days::new(1)).unwrap_or(NaiveDate::MAX);
        let end = start.checked_add_months(Months::new(1)).unwrap_or(NaiveDate::MAX);
        Self { start, end }
    }

    /// Whether `date` lies inside the window.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Check `date` against the window.
    ///
    /// # Errors
    ///
    /// Returns [`OutOfRange`] describing the window when `date` is outside it.
    pub fn check(&self, date: NaiveDate) -> Result<NaiveDate, OutOfRange> {
        if self.contains(date) {
            Ok(date)
        } else {
            Err(OutOfRange {
                date,
                start: self.start,
                end: self.end,
            })
        }
    }
}

/// A date outside the booking window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutOfRange {
    /// Requested day
    pub date: NaiveDate,
    /// First bookable day
    pub start: NaiveDate,
    /// Last bookable day
    pub end: NaiveDate,
}

/// Normalize client date input to a UTC calendar day.
///
/// Accepts a plain ISO date (`2025-01-02`) or an RFC 3339 timestamp
/// (`2025-01-02T10:30:00+07:00`), which is converted to UTC before the
/// time of day is dropped.
///
/// Returns `None` when the input is neither.
#[must_use]
pub fn normalize_date(input: &str) -> Option<NaiveDate> {
    let input = input.trim();
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Some(date);
    }
    DateTime::parse_from_rfc3339(input)
        .ok()
        .map(|timestamp| timestamp.with_timezone(&Utc).date_naive())
}
