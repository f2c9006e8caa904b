//! In-memory implementation of every Courtside store trait.
//!
//! Behaves like the `PostgreSQL` store where tests can observe it:
//! - `begin` serializes transactions per (court, date) with an async mutex
//! - writes are buffered and applied on `commit`; dropping a transaction
//!   discards them
//! - `commit` rejects a reservation whose (court, date, hour) is taken
//!
//! Faults can be injected to exercise error paths.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Poisoned locks only happen after a test already panicked

use chrono::{DateTime, NaiveDate, Utc};
use courtside_core::filter::CourtFilter;
use courtside_core::slots::HourSet;
use courtside_core::store::{
    BookingStore, BookingTransaction, CourtCatalog, OutboxStore, SettleOutcome,
};
use courtside_core::{
    Court, CourtId, CourtSize, CourtType, CourtWithLocation, Location, LocationId, Money,
    NewOrder, NotificationId, NotificationKind, NotificationTask, Order, OrderDetails, OrderId,
    Payment, PaymentId, PaymentStatus, Reservation, ReservationId, StoreError,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::OwnedMutexGuard;

/// Delivery state of an outbox row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutboxStatus {
    /// Waiting for (another) delivery attempt
    Pending,
    /// Delivered
    Delivered,
    /// Gave up after the final attempt
    Failed,
}

/// Snapshot of an outbox row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboxEntry {
    /// Task as handed to the worker
    pub task: NotificationTask,
    /// Current state
    pub status: OutboxStatus,
    /// Earliest time the row may be claimed
    pub available_at: DateTime<Utc>,
    /// Error from the latest failed attempt
    pub last_error: Option<String>,
}

#[derive(Default)]
struct Tables {
    locations: BTreeMap<LocationId, Location>,
    courts: BTreeMap<CourtId, Court>,
    orders: BTreeMap<OrderId, Order>,
    reservations: Vec<Reservation>,
    payments: BTreeMap<OrderId, Payment>,
    outbox: BTreeMap<NotificationId, OutboxEntry>,
}

impl Tables {
    fn taken_hours(&self, court_id: CourtId, date: NaiveDate) -> Vec<Reservation> {
        let mut taken: Vec<Reservation> = self
            .reservations
            .iter()
            .filter(|r| {
                self.orders
                    .get(&r.order_id)
                    .is_some_and(|o| o.court_id == court_id && o.date == date)
            })
            .copied()
            .collect();
        taken.sort_by_key(|r| (r.hour, r.id));
        taken
    }
}

#[derive(Default)]
struct Faults {
    unavailable: AtomicBool,
    fail_reservation_inserts: AtomicBool,
    skip_slot_locks: AtomicBool,
    delay: Mutex<Option<Duration>>,
}

#[derive(Default)]
struct Inner {
    tables: Mutex<Tables>,
    slot_locks: Mutex<HashMap<(CourtId, NaiveDate), Arc<tokio::sync::Mutex<()>>>>,
    next_id: AtomicI64,
    faults: Faults,
}

/// In-memory store for fast, deterministic tests.
///
/// Clones share state.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<Inner>,
}

impl InMemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> i64 {
        self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn with_tables<R>(&self, f: impl FnOnce(&mut Tables) -> R) -> R {
        f(&mut self.inner.tables.lock().unwrap())
    }

    /// Simulated latency and availability, applied before every operation.
    async fn enter(&self) -> Result<(), StoreError> {
        let delay = *self.inner.faults.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.inner.faults.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection refused".to_string()));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Seeding
    // ------------------------------------------------------------------

    /// Insert a location.
    pub fn add_location(&self, name: &str, city: &str) -> Location {
        let now = Utc::now();
        let location = Location {
            id: LocationId::new(self.next_id()),
            name: name.to_string(),
            description: format!("{name} sports centre"),
            address: "1 Main Street".to_string(),
            city: city.to_string(),
            state: "CA".to_string(),
            latitude: 0.0,
            longitude: 0.0,
            created_at: now,
            updated_at: now,
        };
        self.with_tables(|t| t.locations.insert(location.id, location.clone()));
        location
    }

    /// Insert a court at an existing location.
    pub fn add_court(
        &self,
        location_id: LocationId,
        name: &str,
        size: CourtSize,
        court_type: CourtType,
        price_per_hour: Money,
    ) -> Court {
        let now = Utc::now();
        let court = Court {
            id: CourtId::new(self.next_id()),
            location_id,
            name: name.to_string(),
            description: String::new(),
            size,
            court_type,
            price_per_hour,
            image: format!("https://images.test/{}.jpg", name.to_lowercase()),
            created_at: now,
            updated_at: now,
        };
        self.with_tables(|t| t.courts.insert(court.id, court.clone()));
        court
    }

    /// Insert a full-size indoor court at a fresh location.
    pub fn add_court_at_new_location(&self, price_per_hour: Money) -> Court {
        let location = self.add_location("Riverside", "Springfield");
        self.add_court(
            location.id,
            "Centre",
            CourtSize::FullCourt,
            CourtType::Indoor,
            price_per_hour,
        )
    }

    // ------------------------------------------------------------------
    // Fault injection
    // ------------------------------------------------------------------

    /// Make every operation fail with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.faults.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make `insert_reservations` fail with a database error.
    pub fn fail_reservation_inserts(&self, fail: bool) {
        self.inner
            .faults
            .fail_reservation_inserts
            .store(fail, Ordering::SeqCst);
    }

    /// Let `begin` skip the (court, date) lock so only the commit-time
    /// uniqueness check stands between racing bookings.
    pub fn skip_slot_locks(&self, skip: bool) {
        self.inner.faults.skip_slot_locks.store(skip, Ordering::SeqCst);
    }

    /// Sleep before every operation.
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.inner.faults.delay.lock().unwrap() = delay;
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    /// Every committed order, by id.
    #[must_use]
    pub fn orders(&self) -> Vec<Order> {
        self.with_tables(|t| t.orders.values().cloned().collect())
    }

    /// Every committed reservation, in insertion order.
    #[must_use]
    pub fn reservations(&self) -> Vec<Reservation> {
        self.with_tables(|t| t.reservations.clone())
    }

    /// Payment for an order.
    #[must_use]
    pub fn payment(&self, order_id: OrderId) -> Option<Payment> {
        self.with_tables(|t| t.payments.get(&order_id).cloned())
    }

    /// Every outbox row, by id.
    #[must_use]
    pub fn outbox(&self) -> Vec<OutboxEntry> {
        self.with_tables(|t| t.outbox.values().cloned().collect())
    }

    fn slot_lock(&self, court_id: CourtId, date: NaiveDate) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.inner.slot_locks.lock().unwrap();
        Arc::clone(locks.entry((court_id, date)).or_default())
    }

    fn new_outbox_entry(&self, order_id: OrderId, kind: NotificationKind) -> OutboxEntry {
        OutboxEntry {
            task: NotificationTask {
                id: NotificationId::new(self.next_id()),
                order_id,
                kind,
                attempts: 0,
            },
            status: OutboxStatus::Pending,
            available_at: DateTime::<Utc>::MIN_UTC,
            last_error: None,
        }
    }
}

impl CourtCatalog for InMemoryStore {
    async fn find_court(&self, court_id: CourtId) -> Result<Option<CourtWithLocation>, StoreError> {
        self.enter().await?;
        Ok(self.with_tables(|t| {
            let court = t.courts.get(&court_id)?.clone();
            let location = t.locations.get(&court.location_id)?.clone();
            Some(CourtWithLocation { court, location })
        }))
    }

    async fn search_courts(&self, filter: &CourtFilter) -> Result<Vec<Court>, StoreError> {
        self.enter().await?;
        Ok(self.with_tables(|t| {
            t.courts
                .values()
                .filter(|c| filter.matches(c))
                .cloned()
                .collect()
        }))
    }
}

impl BookingStore for InMemoryStore {
    type Transaction = InMemoryTransaction;

    async fn reservations_for(
        &self,
        court_id: CourtId,
        date: NaiveDate,
    ) -> Result<Vec<Reservation>, StoreError> {
        self.enter().await?;
        Ok(self.with_tables(|t| t.taken_hours(court_id, date)))
    }

    async fn begin(
        &self,
        court_id: CourtId,
        date: NaiveDate,
    ) -> Result<InMemoryTransaction, StoreError> {
        self.enter().await?;
        let guard = if self.inner.faults.skip_slot_locks.load(Ordering::SeqCst) {
            None
        } else {
            Some(self.slot_lock(court_id, date).lock_owned().await)
        };
        Ok(InMemoryTransaction {
            store: self.clone(),
            court_id,
            date,
            _guard: guard,
            order: None,
            reservations: Vec::new(),
            payment: None,
            outbox: Vec::new(),
        })
    }

    async fn order_details(&self, order_id: OrderId) -> Result<Option<OrderDetails>, StoreError> {
        self.enter().await?;
        Ok(self.with_tables(|t| {
            let order = t.orders.get(&order_id)?.clone();
            let court = t.courts.get(&order.court_id)?.clone();
            let location = t.locations.get(&court.location_id)?.clone();
            let mut hours: Vec<_> = t
                .reservations
                .iter()
                .filter(|r| r.order_id == order_id)
                .map(|r| r.hour)
                .collect();
            hours.sort();
            Some(OrderDetails {
                order,
                hours,
                court,
                location,
            })
        }))
    }

    async fn settle_payment(&self, order_id: OrderId) -> Result<SettleOutcome, StoreError> {
        self.enter().await?;
        let entry = self.new_outbox_entry(order_id, NotificationKind::PaymentConfirmed);
        Ok(self.with_tables(|t| {
            let Some(payment) = t.payments.get_mut(&order_id) else {
                return SettleOutcome::Missing;
            };
            if payment.status == PaymentStatus::Settled {
                return SettleOutcome::AlreadySettled;
            }
            payment.status = PaymentStatus::Settled;
            t.outbox.insert(entry.task.id, entry);
            SettleOutcome::Settled
        }))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.enter().await
    }
}

/// Buffered writes of one booking.
pub struct InMemoryTransaction {
    store: InMemoryStore,
    court_id: CourtId,
    date: NaiveDate,
    _guard: Option<OwnedMutexGuard<()>>,
    order: Option<Order>,
    reservations: Vec<Reservation>,
    payment: Option<Payment>,
    outbox: Vec<OutboxEntry>,
}

impl BookingTransaction for InMemoryTransaction {
    async fn reserved_hours(&mut self) -> Result<HourSet, StoreError> {
        self.store.enter().await?;
        let (court_id, date) = (self.court_id, self.date);
        Ok(self.store.with_tables(|t| {
            t.taken_hours(court_id, date)
                .into_iter()
                .map(|r| r.hour)
                .collect()
        }))
    }

    async fn insert_order(&mut self, order: &NewOrder) -> Result<Order, StoreError> {
        self.store.enter().await?;
        let now = Utc::now();
        let order = Order {
            id: OrderId::new(self.store.next_id()),
            court_id: order.court_id,
            email: order.email.clone(),
            date: order.date,
            duration: order.duration,
            total: order.total,
            created_at: now,
            updated_at: now,
        };
        self.order = Some(order.clone());
        Ok(order)
    }

    async fn insert_reservations(
        &mut self,
        order: &Order,
        hours: &HourSet,
    ) -> Result<Vec<Reservation>, StoreError> {
        self.store.enter().await?;
        if self
            .store
            .inner
            .faults
            .fail_reservation_inserts
            .load(Ordering::SeqCst)
        {
            return Err(StoreError::Database("injected reservation failure".to_string()));
        }
        let inserted: Vec<Reservation> = hours
            .iter()
            .map(|hour| Reservation {
                id: ReservationId::new(self.store.next_id()),
                order_id: order.id,
                hour: *hour,
            })
            .collect();
        self.reservations.extend(inserted.iter().copied());
        Ok(inserted)
    }

    async fn insert_payment(&mut self, order: &Order) -> Result<Payment, StoreError> {
        self.store.enter().await?;
        let payment = Payment {
            id: PaymentId::new(self.store.next_id()),
            order_id: order.id,
            amount: order.total,
            status: PaymentStatus::Pending,
        };
        self.payment = Some(payment.clone());
        Ok(payment)
    }

    async fn enqueue_notification(
        &mut self,
        order_id: OrderId,
        kind: NotificationKind,
    ) -> Result<(), StoreError> {
        self.store.enter().await?;
        let entry = self.store.new_outbox_entry(order_id, kind);
        self.outbox.push(entry);
        Ok(())
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.store.enter().await?;
        let Self {
            store,
            court_id,
            date,
            _guard,
            order,
            reservations,
            payment,
            outbox,
        } = self;

        store.with_tables(|t| {
            let taken: HourSet = t
                .taken_hours(court_id, date)
                .into_iter()
                .map(|r| r.hour)
                .collect();
            if let Some(clash) = reservations.iter().find(|r| taken.contains(&r.hour)) {
                return Err(StoreError::UniqueViolation(format!(
                    "reservation for court {court_id} on {date} at {} already exists",
                    clash.hour
                )));
            }

            if let Some(order) = order {
                t.orders.insert(order.id, order);
            }
            t.reservations.extend(reservations);
            if let Some(payment) = payment {
                t.payments.insert(payment.order_id, payment);
            }
            for entry in outbox {
                t.outbox.insert(entry.task.id, entry);
            }
            Ok(())
        })
    }
}

impl OutboxStore for InMemoryStore {
    async fn claim_due(
        &self,
        now: DateTime<Utc>,
        lease_until: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<NotificationTask>, StoreError> {
        self.enter().await?;
        Ok(self.with_tables(|t| {
            let mut due: Vec<&mut OutboxEntry> = t
                .outbox
                .values_mut()
                .filter(|e| e.status == OutboxStatus::Pending && e.available_at <= now)
                .collect();
            due.sort_by_key(|e| (e.available_at, e.task.id));
            due.into_iter()
                .take(usize::try_from(limit).unwrap_or(usize::MAX))
                .map(|e| {
                    e.available_at = lease_until;
                    e.task.attempts += 1;
                    e.task.clone()
                })
                .collect()
        }))
    }

    async fn mark_delivered(&self, id: NotificationId) -> Result<(), StoreError> {
        self.enter().await?;
        self.with_tables(|t| {
            if let Some(entry) = t.outbox.get_mut(&id) {
                entry.status = OutboxStatus::Delivered;
                entry.last_error = None;
            }
        });
        Ok(())
    }

    async fn mark_retry(
        &self,
        id: NotificationId,
        available_at: DateTime<Utc>,
        error: &str,
    ) -> Result<(), StoreError> {
        self.enter().await?;
        self.with_tables(|t| {
            if let Some(entry) = t.outbox.get_mut(&id) {
                entry.available_at = available_at;
                entry.last_error = Some(error.to_string());
            }
        });
        Ok(())
    }

    async fn mark_failed(&self, id: NotificationId, error: &str) -> Result<(), StoreError> {
        self.enter().await?;
        self.with_tables(|t| {
            if let Some(entry) = t.outbox.get_mut(&id) {
                entry.status = OutboxStatus::Failed;
                entry.last_error = Some(error.to_string());
            }
        });
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use courtside_core::Hour;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 10).expect("valid date")
    }

    fn new_order(court: &Court) -> NewOrder {
        NewOrder {
            court_id: court.id,
            email: "player@example.com".to_string(),
            date: date(),
            duration: 1,
            total: court.price_per_hour,
        }
    }

    fn hours(values: &[u8]) -> HourSet {
        values.iter().map(|h| Hour::new(*h).expect("valid hour")).collect()
    }

    #[tokio::test]
    async fn dropped_transaction_leaves_no_trace() {
        let store = InMemoryStore::new();
        let court = store.add_court_at_new_location(Money::from_cents(2500));

        let mut tx = store.begin(court.id, date()).await.unwrap();
        let order = tx.insert_order(&new_order(&court)).await.unwrap();
        tx.insert_reservations(&order, &hours(&[10])).await.unwrap();
        drop(tx);

        assert!(store.orders().is_empty());
        assert!(store.reservations().is_empty());
    }

    #[tokio::test]
    async fn commit_rejects_taken_hours() {
        let store = InMemoryStore::new();
        store.skip_slot_locks(true);
        let court = store.add_court_at_new_location(Money::from_cents(2500));

        let mut first = store.begin(court.id, date()).await.unwrap();
        let mut second = store.begin(court.id, date()).await.unwrap();

        let order = first.insert_order(&new_order(&court)).await.unwrap();
        first.insert_reservations(&order, &hours(&[10])).await.unwrap();
        let order = second.insert_order(&new_order(&court)).await.unwrap();
        second.insert_reservations(&order, &hours(&[10])).await.unwrap();

        tokio_test::assert_ok!(first.commit().await);
        let err = tokio_test::assert_err!(second.commit().await);
        assert!(matches!(err, StoreError::UniqueViolation(_)));
        assert_eq!(store.orders().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transactions_for_the_same_day_are_serialized() {
        let store = InMemoryStore::new();
        let court = store.add_court_at_new_location(Money::from_cents(2500));

        let held = store.begin(court.id, date()).await.unwrap();
        let waiting = tokio::time::timeout(
            Duration::from_millis(50),
            store.begin(court.id, date()),
        )
        .await;
        assert!(waiting.is_err(), "second transaction must wait for the lock");

        let other_day = date().succ_opt().expect("valid date");
        tokio_test::assert_ok!(store.begin(court.id, other_day).await);

        drop(held);
        tokio_test::assert_ok!(store.begin(court.id, date()).await);
    }

    #[tokio::test]
    async fn claimed_tasks_are_leased_and_counted() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let entry = store.new_outbox_entry(OrderId::new(1), NotificationKind::PaymentPending);
        let id = entry.task.id;
        store.with_tables(|t| t.outbox.insert(id, entry));

        let lease = now + chrono::Duration::seconds(30);
        let claimed = store.claim_due(now, lease, 10).await.unwrap();
        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].attempts, 1);

        assert!(store.claim_due(now, lease, 10).await.unwrap().is_empty());
        assert_eq!(store.claim_due(lease, lease, 10).await.unwrap().len(), 1);

        store.mark_failed(id, "gave up").await.unwrap();
        assert_eq!(store.outbox()[0].status, OutboxStatus::Failed);
    }

    #[tokio::test]
    async fn unavailable_store_fails_every_operation() {
        let store = InMemoryStore::new();
        store.set_unavailable(true);
        assert!(matches!(store.ping().await, Err(StoreError::Unavailable(_))));
        assert!(matches!(
            store.reservations_for(CourtId::new(1), date()).await,
            Err(StoreError::Unavailable(_))
        ));
    }
}
