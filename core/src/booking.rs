//! Availability resolution and the booking transaction.

use crate::environment::Clock;
use crate::error::{BookingError, FieldError, StoreError};
use crate::filter::CourtFilter;
use crate::slots::{self, Hour, HourSet, SlotError};
use crate::store::{self, BookingStore, BookingTransaction, DEFAULT_OPERATION_TIMEOUT};
use crate::types::{
    Court, CourtId, CourtWithLocation, NewOrder, NotificationKind, Order, Payment, Reservation,
};
use crate::window::BookingWindow;
use chrono::NaiveDate;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use validator::ValidateEmail;

/// A booking submission after transport decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingRequest {
    /// Court to book
    pub court_id: CourtId,
    /// Contact email
    pub email: String,
    /// Calendar day (UTC)
    pub date: NaiveDate,
    /// Requested hours in request order (duplicates are rejected)
    pub hours: Vec<Hour>,
}

/// A committed booking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookedOrder {
    /// The order row
    pub order: Order,
    /// One reservation per booked hour, ascending
    pub reservations: Vec<Reservation>,
    /// The pending payment created with the order
    pub payment: Payment,
}

impl BookedOrder {
    /// Booked hours, ascending.
    #[must_use]
    pub fn hours(&self) -> Vec<Hour> {
        self.reservations.iter().map(|r| r.hour).collect()
    }
}

/// Resolves availability and books slots against a [`BookingStore`].
pub struct BookingService<S, C> {
    store: Arc<S>,
    clock: Arc<C>,
    operation_timeout: Duration,
}

impl<S, C> Clone for BookingService<S, C> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
            operation_timeout: self.operation_timeout,
        }
    }
}

impl<S, C> BookingService<S, C>
where
    S: BookingStore,
    C: Clock,
{
    /// Create a service over a store handle and a clock.
    #[must_use]
    pub const fn new(store: Arc<S>, clock: Arc<C>) -> Self {
        Self {
            store,
            clock,
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }

    /// Override the per-operation storage budget.
    #[must_use]
    pub const fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    /// The booking window as of now.
    #[must_use]
    pub fn window(&self) -> BookingWindow {
        BookingWindow::from_now(self.clock.now())
    }

    /// Reservation rows for the court on the day, ordered by hour.
    ///
    /// A day without orders yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Transient`] or [`BookingError::Internal`] when
    /// the store fails.
    #[tracing::instrument(skip(self))]
    pub async fn reservations(
        &self,
        court_id: CourtId,
        date: NaiveDate,
    ) -> Result<Vec<Reservation>, BookingError> {
        let reservations = self
            .bounded(self.store.reservations_for(court_id, date))
            .await?;
        tracing::debug!(count = reservations.len(), "Resolved reservations");
        Ok(reservations)
    }

    /// Hours already reserved for the court on the day.
    ///
    /// # Errors
    ///
    /// Same as [`BookingService::reservations`].
    pub async fn availability(
        &self,
        court_id: CourtId,
        date: NaiveDate,
    ) -> Result<HourSet, BookingError> {
        let reservations = self.reservations(court_id, date).await?;
        Ok(reservations.into_iter().map(|r| r.hour).collect())
    }

    /// A court with its location.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::CourtNotFound`] when the court does not
    /// exist, otherwise the store failure.
    pub async fn court(&self, court_id: CourtId) -> Result<CourtWithLocation, BookingError> {
        self.bounded(self.store.find_court(court_id))
            .await?
            .ok_or(BookingError::CourtNotFound(court_id))
    }

    /// Courts matching every predicate of `filter`, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Transient`] or [`BookingError::Internal`] when
    /// the store fails.
    #[tracing::instrument(skip(self))]
    pub async fn search_courts(&self, filter: &CourtFilter) -> Result<Vec<Court>, BookingError> {
        Ok(self.bounded(self.store.search_courts(filter)).await?)
    }

    /// Check that the store answers.
    ///
    /// # Errors
    ///
    /// Returns the store failure mapped to a [`BookingError`].
    pub async fn ping(&self) -> Result<(), BookingError> {
        Ok(self.bounded(self.store.ping()).await?)
    }

    /// Book hours on a court as one atomic unit.
    ///
    /// Creates the order, one reservation per hour, a pending payment and a
    /// `payment_pending` outbox task, or nothing at all.
    ///
    /// # Errors
    ///
    /// - [`BookingError::Validation`] for a bad email or hour list (no storage access)
    /// - [`BookingError::OutOfRange`] when the day is outside the booking window
    /// - [`BookingError::CourtNotFound`] when the court does not exist
    /// - [`BookingError::SlotConflict`] when any hour is already taken
    /// - [`BookingError::Transient`] when storage is unavailable or slow
    /// - [`BookingError::Internal`] for anything else
    #[tracing::instrument(
        skip(self, request),
        fields(court_id = %request.court_id, date = %request.date, slots = request.hours.len())
    )]
    pub async fn book(&self, request: BookingRequest) -> Result<BookedOrder, BookingError> {
        let started = Instant::now();
        let result = self.try_book(request).await;

        let outcome = match &result {
            Ok(_) => "created",
            Err(err) => err.kind(),
        };
        metrics::counter!("courtside_bookings_total", "outcome" => outcome).increment(1);
        metrics::histogram!("courtside_booking_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        match &result {
            Ok(booked) => tracing::info!(
                order_id = %booked.order.id,
                duration = booked.order.duration,
                total = %booked.order.total,
                "Booking created"
            ),
            Err(BookingError::Internal(message)) => {
                tracing::error!(error = %message, "Booking failed");
            }
            Err(err) => tracing::info!(outcome, error = %err, "Booking rejected"),
        }

        result
    }

    async fn try_book(&self, request: BookingRequest) -> Result<BookedOrder, BookingError> {
        check_request_shape(&request)?;

        let date = self.window().check(request.date)?;

        let court = self
            .bounded(self.store.find_court(request.court_id))
            .await?
            .ok_or(BookingError::CourtNotFound(request.court_id))?
            .court;

        let mut tx = self.bounded(self.store.begin(court.id, date)).await?;

        // Re-resolved under the (court, date) lock; the read path is advisory only.
        let reserved = self.bounded(tx.reserved_hours()).await?;
        let hours = slots::validate(&request.hours, &reserved)?;

        let duration = u32::try_from(hours.len())
            .map_err(|_| BookingError::Internal("too many hours in one order".to_string()))?;
        let total = court
            .price_per_hour
            .checked_mul(u64::from(duration))
            .ok_or_else(|| BookingError::Internal("order total overflows".to_string()))?;

        let new_order = NewOrder {
            court_id: court.id,
            email: request.email.trim().to_string(),
            date,
            duration,
            total,
        };

        let written = match self.write_booking(&mut tx, &new_order, &hours).await {
            Ok(written) => written,
            Err(err) => {
                drop(tx);
                return Err(self.write_failure(err, court.id, date, &hours).await);
            }
        };

        if let Err(err) = self.bounded(tx.commit()).await {
            return Err(self.write_failure(err, court.id, date, &hours).await);
        }

        Ok(written)
    }

    async fn write_booking(
        &self,
        tx: &mut S::Transaction,
        new_order: &NewOrder,
        hours: &HourSet,
    ) -> Result<BookedOrder, StoreError> {
        let order = self.bounded(tx.insert_order(new_order)).await?;
        let reservations = self.bounded(tx.insert_reservations(&order, hours)).await?;
        let payment = self.bounded(tx.insert_payment(&order)).await?;
        self.bounded(tx.enqueue_notification(order.id, NotificationKind::PaymentPending))
            .await?;

        Ok(BookedOrder {
            order,
            reservations,
            payment,
        })
    }

    /// Map a failed write. A uniqueness violation means another booking won
    /// the race; report the hours it took.
    async fn write_failure(
        &self,
        err: StoreError,
        court_id: CourtId,
        date: NaiveDate,
        requested: &HourSet,
    ) -> BookingError {
        let StoreError::UniqueViolation(detail) = err else {
            return err.into();
        };

        tracing::warn!(%detail, "Reservation uniqueness constraint rejected the booking");

        let taken = match self.availability(court_id, date).await {
            Ok(taken) => taken,
            Err(read_err) => {
                tracing::warn!(error = %read_err, "Could not re-read reservations after conflict");
                HourSet::new()
            }
        };
        let mut conflicting_hours: Vec<Hour> = requested.intersection(&taken).copied().collect();
        if conflicting_hours.is_empty() {
            conflicting_hours = requested.iter().copied().collect();
        }

        BookingError::SlotConflict { conflicting_hours }
    }

    async fn bounded<T>(
        &self,
        operation: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        store::bounded(self.operation_timeout, operation).await
    }
}

/// Validate everything that does not need storage, collecting field errors.
fn check_request_shape(request: &BookingRequest) -> Result<(), BookingError> {
    let mut errors = Vec::new();

    if !request.email.trim().validate_email() {
        errors.push(FieldError::new("email", "must be a valid email address"));
    }

    match slots::check_requested(&request.hours) {
        Ok(_) => {}
        Err(SlotError::Invalid(message)) => errors.push(FieldError::new("timetables", message)),
        Err(other) => return Err(other.into()),
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(BookingError::Validation(errors))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn request(email: &str, hours: &[u8]) -> BookingRequest {
        BookingRequest {
            court_id: CourtId::new(1),
            email: email.to_string(),
            date: NaiveDate::MIN,
            hours: hours.iter().filter_map(|h| Hour::new(*h).ok()).collect(),
        }
    }

    #[test]
    fn shape_check_collects_every_field_error() {
        let Err(BookingError::Validation(errors)) = check_request_shape(&request("nope", &[]))
        else {
            panic!("expected validation error");
        };
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["email", "timetables"]);
    }

    #[test]
    fn shape_check_accepts_a_well_formed_request() {
        assert_eq!(check_request_shape(&request("player@example.com", &[10, 11])), Ok(()));
    }

    #[test]
    fn shape_check_rejects_duplicates() {
        assert!(matches!(
            check_request_shape(&request("player@example.com", &[10, 10])),
            Err(BookingError::Validation(_))
        ));
    }
}
