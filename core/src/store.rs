//! Storage traits.
//!
//! The engine never holds a connection of its own: services receive a store
//! handle at construction and reach persistence only through these traits.
//!
//! # Transactions
//!
//! [`BookingStore::begin`] returns a [`BookingTransaction`] scoped to one
//! (court, date). Implementations must serialize transactions with the same
//! scope (row lock, advisory lock, or mutex) and must discard every write of
//! a transaction that is dropped without [`BookingTransaction::commit`].
//! They must also reject a second reservation for the same
//! (court, date, hour) with [`StoreError::UniqueViolation`], whatever the
//! isolation level.

use crate::error::StoreError;
use crate::filter::CourtFilter;
use crate::slots::HourSet;
use crate::types::{
    Court, CourtId, CourtWithLocation, NewOrder, NotificationId, NotificationKind,
    NotificationTask, Order, OrderDetails, OrderId, Payment, Reservation,
};
use chrono::{DateTime, NaiveDate, Utc};
use std::future::Future;
use std::time::Duration;

/// Default budget for a single storage operation.
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(5);

/// Read access to courts and locations.
pub trait CourtCatalog: Send + Sync {
    /// Load a court with its location.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    fn find_court(
        &self,
        court_id: CourtId,
    ) -> impl Future<Output = Result<Option<CourtWithLocation>, StoreError>> + Send;

    /// Courts matching every predicate of the filter, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    fn search_courts(
        &self,
        filter: &CourtFilter,
    ) -> impl Future<Output = Result<Vec<Court>, StoreError>> + Send;
}

/// Orders and reservations.
pub trait BookingStore: CourtCatalog {
    /// Transaction type returned by [`BookingStore::begin`].
    type Transaction: BookingTransaction;

    /// Reservations of every order for the court on the day, ordered by hour.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    fn reservations_for(
        &self,
        court_id: CourtId,
        date: NaiveDate,
    ) -> impl Future<Output = Result<Vec<Reservation>, StoreError>> + Send;

    /// Open a write transaction holding the (court, date) lock.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the transaction or lock cannot be acquired.
    fn begin(
        &self,
        court_id: CourtId,
        date: NaiveDate,
    ) -> impl Future<Output = Result<Self::Transaction, StoreError>> + Send;

    /// Order joined with its hours, court and location.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    fn order_details(
        &self,
        order_id: OrderId,
    ) -> impl Future<Output = Result<Option<OrderDetails>, StoreError>> + Send;

    /// Mark the order's payment settled and enqueue a
    /// [`NotificationKind::PaymentConfirmed`] task, atomically.
    ///
    /// Settling an already settled payment changes nothing and returns
    /// [`SettleOutcome::AlreadySettled`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the update fails.
    fn settle_payment(
        &self,
        order_id: OrderId,
    ) -> impl Future<Output = Result<SettleOutcome, StoreError>> + Send;

    /// Cheap connectivity check for readiness.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store is unreachable.
    fn ping(&self) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Result of [`BookingStore::settle_payment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleOutcome {
    /// Payment moved from pending to settled
    Settled,
    /// Payment was already settled
    AlreadySettled,
    /// No payment row exists for the order
    Missing,
}

/// Writes of one booking, applied atomically on commit.
///
/// All operations apply to the (court, date) the transaction was opened for.
pub trait BookingTransaction: Send + Sized {
    /// Hours already reserved for the scoped court and day.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    fn reserved_hours(&mut self) -> impl Future<Output = Result<HourSet, StoreError>> + Send;

    /// Insert the order row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the insert fails.
    fn insert_order(
        &mut self,
        order: &NewOrder,
    ) -> impl Future<Output = Result<Order, StoreError>> + Send;

    /// Insert one reservation per hour for the order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UniqueViolation`] if any hour is already taken,
    /// or another [`StoreError`] if the insert fails.
    fn insert_reservations(
        &mut self,
        order: &Order,
        hours: &HourSet,
    ) -> impl Future<Output = Result<Vec<Reservation>, StoreError>> + Send;

    /// Insert the pending payment for the order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the insert fails.
    fn insert_payment(
        &mut self,
        order: &Order,
    ) -> impl Future<Output = Result<Payment, StoreError>> + Send;

    /// Queue a notification to be delivered after commit.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the insert fails.
    fn enqueue_notification(
        &mut self,
        order_id: OrderId,
        kind: NotificationKind,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Commit every write.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the commit fails; nothing is persisted then.
    fn commit(self) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Notification outbox.
pub trait OutboxStore: Send + Sync {
    /// Claim up to `limit` pending tasks whose `available_at <= now`.
    ///
    /// Claimed tasks are hidden from other claimers until `lease_until`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    fn claim_due(
        &self,
        now: DateTime<Utc>,
        lease_until: DateTime<Utc>,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<NotificationTask>, StoreError>> + Send;

    /// Mark a task delivered.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the update fails.
    fn mark_delivered(
        &self,
        id: NotificationId,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Record a failed attempt and reschedule the task.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the update fails.
    fn mark_retry(
        &self,
        id: NotificationId,
        available_at: DateTime<Utc>,
        error: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Record a final failed attempt; the task is not retried again.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the update fails.
    fn mark_failed(
        &self,
        id: NotificationId,
        error: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Run a storage future under a time budget.
///
/// # Errors
///
/// Returns [`StoreError::Timeout`] when the budget is exhausted, otherwise the
/// future's own result.
pub async fn bounded<T>(
    limit: Duration,
    operation: impl Future<Output = Result<T, StoreError>>,
) -> Result<T, StoreError> {
    tokio::time::timeout(limit, operation)
        .await
        .map_err(|_| StoreError::Timeout)?
}
