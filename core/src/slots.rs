//! Hour slots and the slot validator.
//!
//! A slot is one hour of a court's day. Clients name slots with `HH:00`
//! labels; the engine works with [`Hour`] values and ordered [`HourSet`]s.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Last bookable hour of a day.
pub const LAST_HOUR: u8 = 23;

/// One bookable hour of a day, `0..=23`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Hour(u8);

/// Ordered set of hours.
pub type HourSet = BTreeSet<Hour>;

impl Hour {
    /// Create an hour, rejecting values outside `0..=23`.
    ///
    /// # Errors
    ///
    /// Returns [`SlotError::Invalid`] when `value > 23`.
    pub fn new(value: u8) -> Result<Self, SlotError> {
        if value > LAST_HOUR {
            return Err(SlotError::Invalid(format!(
                "hour {value} is outside 00:00-23:00"
            )));
        }
        Ok(Self(value))
    }

    /// Raw hour value.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// `HH:00` label.
    #[must_use]
    pub fn label(self) -> String {
        format!("{:02}:00", self.0)
    }

    /// Parse a timetable label.
    ///
    /// Accepts `HH:00` (the canonical label) and bare `H`/`HH` integers.
    ///
    /// # Errors
    ///
    /// Returns [`SlotError::Invalid`] for anything else, including labels
    /// with non-zero minutes.
    pub fn parse_label(label: &str) -> Result<Self, SlotError> {
        let trimmed = label.trim();
        let hour_part = match trimmed.split_once(':') {
            Some((hour, "00")) => hour,
            Some(_) => {
                return Err(SlotError::Invalid(format!(
                    "time slot {label:?} must start on the hour (HH:00)"
                )));
            }
            None => trimmed,
        };

        if hour_part.is_empty()
            || hour_part.len() > 2
            || !hour_part.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(SlotError::Invalid(format!(
                "time slot {label:?} is not an HH:00 label"
            )));
        }

        let value: u8 = hour_part
            .parse()
            .map_err(|_| SlotError::Invalid(format!("time slot {label:?} is not an HH:00 label")))?;
        Self::new(value)
    }
}

impl TryFrom<u8> for Hour {
    type Error = SlotError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Hour> for u8 {
    fn from(hour: Hour) -> Self {
        hour.0
    }
}

impl FromStr for Hour {
    type Err = SlotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_label(s)
    }
}

impl fmt::Display for Hour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:00", self.0)
    }
}

/// Slot parsing and validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlotError {
    /// Malformed request: empty, duplicated, or out-of-domain hours
    #[error("invalid time slots: {0}")]
    Invalid(String),

    /// Some requested hours are already reserved
    #[error("time slots already reserved: {}", format_hours(.conflicting_hours))]
    Conflict {
        /// Requested hours that are taken, ascending
        conflicting_hours: Vec<Hour>,
    },
}

fn format_hours(hours: &[Hour]) -> String {
    hours
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a list of timetable labels, keeping request order.
///
/// # Errors
///
/// Returns the first label that does not parse.
pub fn parse_timetables<S: AsRef<str>>(labels: &[S]) -> Result<Vec<Hour>, SlotError> {
    labels.iter().map(|label| Hour::parse_label(label.as_ref())).collect()
}

/// Check the request shape alone: non-empty and free of duplicates.
///
/// Runs before any storage access.
///
/// # Errors
///
/// Returns [`SlotError::Invalid`] for an empty list or a repeated hour.
pub fn check_requested(requested: &[Hour]) -> Result<HourSet, SlotError> {
    if requested.is_empty() {
        return Err(SlotError::Invalid(
            "at least one time slot must be selected".to_string(),
        ));
    }

    let mut set = HourSet::new();
    for hour in requested {
        if !set.insert(*hour) {
            return Err(SlotError::Invalid(format!("time slot {hour} is listed twice")));
        }
    }
    Ok(set)
}

/// Validate requested hours against the hours already reserved.
///
/// On success returns the requested hours as an ordered set; these become
/// the reservation rows to insert.
///
/// # Errors
///
/// - [`SlotError::Invalid`] when the request is empty or repeats an hour
/// - [`SlotError::Conflict`] listing every requested hour that is taken
pub fn validate(requested: &[Hour], reserved: &HourSet) -> Result<HourSet, SlotError> {
    let requested = check_requested(requested)?;

    let conflicting_hours: Vec<Hour> = requested.intersection(reserved).copied().collect();
    if !conflicting_hours.is_empty() {
        return Err(SlotError::Conflict { conflicting_hours });
    }

    Ok(requested)
}
