//! Notification outbox.

use crate::PostgresStore;
use crate::error::map_sqlx;
use crate::rows;
use chrono::{DateTime, Utc};
use courtside_core::store::OutboxStore;
use courtside_core::{NotificationId, NotificationKind, NotificationTask, OrderId, StoreError};
use sqlx::PgConnection;

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

impl OutboxStatus {
    /// Convert status to database string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Delivered => "delivered",
            Self::Failed => "failed",
        }
    }

    /// Parse status from database string.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Corrupt`] if the string doesn't match a known status.
    pub fn parse(s: &str) -> Result<Self, StoreError> {
        match s {
            "pending" => Ok(Self::Pending),
            "delivered" => Ok(Self::Delivered),
            "failed" => Ok(Self::Failed),
            _ => Err(StoreError::Corrupt(format!("Invalid outbox status: {s}"))),
        }
    }
}

/// A notification the worker gave up on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedNotification {
    /// The task
    pub task: NotificationTask,
    /// Error from the final attempt
    pub last_error: Option<String>,
    /// When it was last touched
    pub updated_at: DateTime<Utc>,
}

pub(crate) async fn insert_task(
    conn: &mut PgConnection,
    order_id: OrderId,
    kind: NotificationKind,
) -> Result<(), StoreError> {
    sqlx::query("INSERT INTO notification_outbox (order_id, kind) VALUES ($1, $2)")
        .bind(order_id.get())
        .bind(kind.as_str())
        .execute(conn)
        .await
        .map_err(map_sqlx)?;
    Ok(())
}

fn task(row: &sqlx::postgres::PgRow) -> Result<NotificationTask, StoreError> {
    Ok(NotificationTask {
        id: NotificationId::new(rows::get(row, "id")?),
        order_id: OrderId::new(rows::get(row, "order_id")?),
        kind: rows::get::<String>(row, "kind")?
            .parse()
            .map_err(StoreError::Corrupt)?,
        attempts: u32::try_from(rows::get::<i32>(row, "attempts")?)
            .map_err(|_| StoreError::Corrupt("negative attempt count".to_string()))?,
    })
}

impl PostgresStore {
    /// Tasks the worker gave up on, most recent first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    pub async fn failed_notifications(
        &self,
        limit: i64,
    ) -> Result<Vec<FailedNotification>, StoreError> {
        let found = sqlx::query(
            r"
            SELECT id, order_id, kind, attempts, last_error, updated_at
            FROM notification_outbox
            WHERE status = $1
            ORDER BY updated_at DESC, id DESC
            LIMIT $2
            ",
        )
        .bind(OutboxStatus::Failed.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;

        found
            .iter()
            .map(|row| {
                Ok::<_, StoreError>(FailedNotification {
                    task: task(row)?,
                    last_error: rows::get(row, "last_error")?,
                    updated_at: rows::get(row, "updated_at")?,
                })
            })
            .collect()
    }

    async fn set_status(
        &self,
        id: NotificationId,
        status: OutboxStatus,
        error: Option<&str>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r"
            UPDATE notification_outbox
            SET status = $2, last_error = $3, updated_at = now()
            WHERE id = $1
            ",
        )
        .bind(id.get())
        .bind(status.as_str())
        .bind(error)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }
}

impl OutboxStore for PostgresStore {
    async fn claim_due(
        &self,
        now: DateTime<Utc>,
        lease_until: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<NotificationTask>, StoreError> {
        // SKIP LOCKED lets several workers poll the same table.
        let claimed = sqlx::query(
            r"
            UPDATE notification_outbox
            SET available_at = $2, attempts = attempts + 1, updated_at = now()
            WHERE id IN (
                SELECT id FROM notification_outbox
                WHERE status = $4 AND available_at <= $1
                ORDER BY available_at, id
                LIMIT $3
                FOR UPDATE SKIP LOCKED
            )
            RETURNING id, order_id, kind, attempts
            ",
        )
        .bind(now)
        .bind(lease_until)
        .bind(i64::from(limit))
        .bind(OutboxStatus::Pending.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;

        let mut tasks = claimed.iter().map(task).collect::<Result<Vec<_>, _>>()?;
        tasks.sort_by_key(|t| t.id);
        Ok(tasks)
    }

    async fn mark_delivered(&self, id: NotificationId) -> Result<(), StoreError> {
        self.set_status(id, OutboxStatus::Delivered, None).await
    }

    async fn mark_retry(
        &self,
        id: NotificationId,
        available_at: DateTime<Utc>,
        error: &str,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r"
            UPDATE notification_outbox
            SET available_at = $2, last_error = $3, updated_at = now()
            WHERE id = $1
            ",
        )
        .bind(id.get())
        .bind(available_at)
        .bind(error)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn mark_failed(&self, id: NotificationId, error: &str) -> Result<(), StoreError> {
        self.set_status(id, OutboxStatus::Failed, Some(error)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_its_column_value() {
        for status in [OutboxStatus::Pending, OutboxStatus::Delivered, OutboxStatus::Failed] {
            assert_eq!(OutboxStatus::parse(status.as_str()), Ok(status));
        }
        assert!(OutboxStatus::parse("processing").is_err());
    }
}
