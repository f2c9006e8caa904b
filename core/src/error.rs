//! Error taxonomy for the booking engine.
//!
//! [`StoreError`] is what persistence backends return; [`BookingError`] is
//! what services return to callers. Only [`BookingError::Transient`] may be
//! retried with the same payload.

use crate::slots::{Hour, SlotError};
use crate::types::{CourtId, OrderId};
use crate::window::OutOfRange;
use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

/// A single invalid input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Field name as it appears in the request
    pub field: String,
    /// Human-readable message
    pub message: String,
}

impl FieldError {
    /// Create a field error.
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Errors surfaced by the booking and payment services.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BookingError {
    /// Malformed input
    #[error("validation failed: {}", summarize(.0))]
    Validation(Vec<FieldError>),

    /// Requested day is outside the booking window
    #[error("date {date} is outside the booking window {start}..={end}")]
    OutOfRange {
        /// Requested day
        date: NaiveDate,
        /// First bookable day
        start: NaiveDate,
        /// Last bookable day
        end: NaiveDate,
    },

    /// Court does not exist
    #[error("court {0} does not exist")]
    CourtNotFound(CourtId),

    /// Order does not exist
    #[error("order {0} does not exist")]
    OrderNotFound(OrderId),

    /// Some requested hours are already booked
    #[error("time slots already reserved: {conflicting_hours:?}")]
    SlotConflict {
        /// Taken hours, ascending
        conflicting_hours: Vec<Hour>,
    },

    /// Storage was unavailable or timed out; safe to retry
    #[error("temporary failure: {0}")]
    Transient(String),

    /// Unexpected failure
    #[error("internal error: {0}")]
    Internal(String),
}

impl BookingError {
    /// Whether the caller may retry with the same request.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Stable label for logs and metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::OutOfRange { .. } => "out_of_range",
            Self::CourtNotFound(_) => "court_not_found",
            Self::OrderNotFound(_) => "order_not_found",
            Self::SlotConflict { .. } => "slot_conflict",
            Self::Transient(_) => "transient",
            Self::Internal(_) => "internal",
        }
    }

    /// Shorthand for a single-field validation error.
    #[must_use]
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(vec![FieldError::new(field, message)])
    }
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<OutOfRange> for BookingError {
    fn from(err: OutOfRange) -> Self {
        Self::OutOfRange {
            date: err.date,
            start: err.start,
            end: err.end,
        }
    }
}

impl From<SlotError> for BookingError {
    fn from(err: SlotError) -> Self {
        match err {
            SlotError::Invalid(message) => Self::invalid("timetables", message),
            SlotError::Conflict { conflicting_hours } => Self::SlotConflict { conflicting_hours },
        }
    }
}

/// Errors returned by storage backends.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The operation exceeded its time budget
    #[error("storage operation timed out")]
    Timeout,

    /// Connection could not be established or was lost
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// A reservation for the same (court, date, hour) already exists
    #[error("reservation uniqueness violated: {0}")]
    UniqueViolation(String),

    /// Any other database failure
    #[error("database error: {0}")]
    Database(String),

    /// Stored data could not be mapped to domain types
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

impl From<StoreError> for BookingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Timeout | StoreError::Unavailable(_) => Self::Transient(err.to_string()),
            // Callers that can name the clashing hours map this themselves.
            StoreError::UniqueViolation(_) => Self::SlotConflict {
                conflicting_hours: Vec::new(),
            },
            StoreError::Database(_) | StoreError::Corrupt(_) => Self::Internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_errors_are_retryable() {
        assert!(BookingError::Transient("pool timed out".into()).is_retryable());
        assert!(!BookingError::SlotConflict { conflicting_hours: vec![] }.is_retryable());
        assert!(!BookingError::Internal("boom".into()).is_retryable());
        assert!(!BookingError::CourtNotFound(CourtId::new(1)).is_retryable());
    }

    #[test]
    fn store_errors_map_to_the_right_kind() {
        assert!(BookingError::from(StoreError::Timeout).is_retryable());
        assert!(BookingError::from(StoreError::Unavailable("refused".into())).is_retryable());
        assert!(matches!(
            BookingError::from(StoreError::Database("syntax".into())),
            BookingError::Internal(_)
        ));
        assert!(matches!(
            BookingError::from(StoreError::UniqueViolation("dup".into())),
            BookingError::SlotConflict { .. }
        ));
    }

    #[test]
    fn slot_errors_become_field_errors() {
        let err = BookingError::from(SlotError::Invalid("at least one".into()));
        assert_eq!(err, BookingError::invalid("timetables", "at least one"));
    }
}
