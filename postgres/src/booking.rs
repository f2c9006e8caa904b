//! Orders, reservations and payments.

use crate::PostgresStore;
use crate::error::map_sqlx;
use crate::outbox::insert_task;
use crate::rows::{self, COURT_COLUMNS, LOCATION_COLUMNS, ORDER_COLUMNS};
use chrono::NaiveDate;
use courtside_core::slots::HourSet;
use courtside_core::store::{BookingStore, BookingTransaction, SettleOutcome};
use courtside_core::{
    CourtId, NewOrder, NotificationKind, Order, OrderDetails, OrderId, Payment, PaymentId,
    PaymentStatus, Reservation, ReservationId, StoreError,
};
use sqlx::{Postgres, Row, Transaction};

/// Advisory lock key for one court on one day.
fn slot_lock_key(court_id: CourtId, date: NaiveDate) -> String {
    format!("courtside:reservations:{court_id}:{date}")
}

impl BookingStore for PostgresStore {
    type Transaction = PgBookingTransaction;

    async fn reservations_for(
        &self,
        court_id: CourtId,
        date: NaiveDate,
    ) -> Result<Vec<Reservation>, StoreError> {
        let found = sqlx::query(
            r"
            SELECT id, order_id, hour
            FROM reservations
            WHERE court_id = $1 AND date = $2
            ORDER BY hour
            ",
        )
        .bind(court_id.get())
        .bind(date)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;

        found
            .iter()
            .map(|row| {
                Ok::<_, StoreError>(Reservation {
                    id: ReservationId::new(rows::get(row, "id")?),
                    order_id: OrderId::new(rows::get(row, "order_id")?),
                    hour: rows::hour(rows::get(row, "hour")?)?,
                })
            })
            .collect()
    }

    async fn begin(
        &self,
        court_id: CourtId,
        date: NaiveDate,
    ) -> Result<PgBookingTransaction, StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;

        // Released automatically on commit or rollback.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(slot_lock_key(court_id, date))
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;

        tracing::trace!(%court_id, %date, "Acquired reservation lock");

        Ok(PgBookingTransaction { tx, court_id, date })
    }

    async fn order_details(&self, order_id: OrderId) -> Result<Option<OrderDetails>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS}, {COURT_COLUMNS}, {LOCATION_COLUMNS} \
             FROM orders o \
             JOIN courts c ON c.id = o.court_id \
             JOIN locations l ON l.id = c.location_id \
             WHERE o.id = $1"
        ))
        .bind(order_id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let hours = sqlx::query("SELECT hour FROM reservations WHERE order_id = $1 ORDER BY hour")
            .bind(order_id.get())
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?
            .iter()
            .map(|r| rows::hour(rows::get(r, "hour")?))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(OrderDetails {
            order: rows::order(&row)?,
            hours,
            court: rows::court(&row)?,
            location: rows::location(&row)?,
        }))
    }

    async fn settle_payment(&self, order_id: OrderId) -> Result<SettleOutcome, StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;

        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM payments WHERE order_id = $1 FOR UPDATE")
                .bind(order_id.get())
                .fetch_optional(&mut *tx)
                .await
                .map_err(map_sqlx)?;

        let Some(status) = status else {
            return Ok(SettleOutcome::Missing);
        };
        if status.parse::<PaymentStatus>().map_err(StoreError::Corrupt)? == PaymentStatus::Settled
        {
            return Ok(SettleOutcome::AlreadySettled);
        }

        sqlx::query("UPDATE payments SET status = $2, updated_at = now() WHERE order_id = $1")
            .bind(order_id.get())
            .bind(PaymentStatus::Settled.as_str())
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;
        insert_task(&mut tx, order_id, NotificationKind::PaymentConfirmed).await?;

        tx.commit().await.map_err(map_sqlx)?;
        Ok(SettleOutcome::Settled)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(())
    }
}

/// Booking transaction holding the (court, date) advisory lock.
///
/// Dropping it without [`BookingTransaction::commit`] rolls back.
pub struct PgBookingTransaction {
    tx: Transaction<'static, Postgres>,
    court_id: CourtId,
    date: NaiveDate,
}

impl BookingTransaction for PgBookingTransaction {
    async fn reserved_hours(&mut self) -> Result<HourSet, StoreError> {
        let found: Vec<i16> = sqlx::query_scalar(
            "SELECT hour FROM reservations WHERE court_id = $1 AND date = $2",
        )
        .bind(self.court_id.get())
        .bind(self.date)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(map_sqlx)?;

        found.into_iter().map(rows::hour).collect()
    }

    async fn insert_order(&mut self, order: &NewOrder) -> Result<Order, StoreError> {
        let duration = i32::try_from(order.duration)
            .map_err(|_| StoreError::Database("order duration out of range".to_string()))?;

        let row = sqlx::query(
            r"
            INSERT INTO orders (court_id, email, date, duration, total_cents)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, created_at, updated_at
            ",
        )
        .bind(order.court_id.get())
        .bind(&order.email)
        .bind(order.date)
        .bind(duration)
        .bind(rows::cents(order.total)?)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_sqlx)?;

        Ok(Order {
            id: OrderId::new(row.try_get("id").map_err(map_sqlx)?),
            court_id: order.court_id,
            email: order.email.clone(),
            date: order.date,
            duration: order.duration,
            total: order.total,
            created_at: row.try_get("created_at").map_err(map_sqlx)?,
            updated_at: row.try_get("updated_at").map_err(map_sqlx)?,
        })
    }

    async fn insert_reservations(
        &mut self,
        order: &Order,
        hours: &HourSet,
    ) -> Result<Vec<Reservation>, StoreError> {
        let values: Vec<i16> = hours.iter().copied().map(rows::hour_to_db).collect();

        let inserted = sqlx::query(
            r"
            INSERT INTO reservations (order_id, court_id, date, hour)
            SELECT $1, $2, $3, h FROM UNNEST($4::SMALLINT[]) AS h
            RETURNING id, hour
            ",
        )
        .bind(order.id.get())
        .bind(self.court_id.get())
        .bind(self.date)
        .bind(values)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(map_sqlx)?;

        let mut reservations = inserted
            .iter()
            .map(|row| {
                Ok(Reservation {
                    id: ReservationId::new(rows::get(row, "id")?),
                    order_id: order.id,
                    hour: rows::hour(rows::get(row, "hour")?)?,
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;
        reservations.sort_by_key(|r| r.hour);
        Ok(reservations)
    }

    async fn insert_payment(&mut self, order: &Order) -> Result<Payment, StoreError> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO payments (order_id, amount_cents, status) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(order.id.get())
        .bind(rows::cents(order.total)?)
        .bind(PaymentStatus::Pending.as_str())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_sqlx)?;

        Ok(Payment {
            id: PaymentId::new(id),
            order_id: order.id,
            amount: order.total,
            status: PaymentStatus::Pending,
        })
    }

    async fn enqueue_notification(
        &mut self,
        order_id: OrderId,
        kind: NotificationKind,
    ) -> Result<(), StoreError> {
        insert_task(&mut self.tx, order_id, kind).await
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await.map_err(map_sqlx)
    }
}
