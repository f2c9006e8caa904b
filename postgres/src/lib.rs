//! `PostgreSQL` store for Courtside.
//!
//! Implements every store trait from `courtside-core` on a shared
//! [`PgPool`]:
//!
//! - court lookup and filtered search
//! - booking transactions serialized per (court, date) with a
//!   transaction-scoped advisory lock, backed by a unique constraint on
//!   `reservations (court_id, date, hour)`
//! - payment settlement and the notification outbox
//!
//! # Example
//!
//! ```ignore
//! use courtside_postgres::PostgresStore;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = sqlx::PgPool::connect("postgres://localhost/courtside").await?;
//!     let store = PostgresStore::new(pool);
//!     store.migrate().await?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod booking;
mod catalog;
mod error;
mod outbox;
mod rows;

pub use booking::PgBookingTransaction;
pub use outbox::{FailedNotification, OutboxStatus};

use courtside_core::StoreError;
use sqlx::PgPool;

/// Demo locations and courts.
const DEMO_SEED: &str = include_str!("../seeds/demo.sql");

/// `PostgreSQL`-backed store.
///
/// Cheap to clone; clones share the pool.
#[derive(Clone, Debug)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply pending schema migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(format!("Migration failed: {e}")))?;
        tracing::info!("Database migrations applied");
        Ok(())
    }

    /// Insert demo locations and courts unless they already exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the seed script fails.
    pub async fn seed_demo(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(DEMO_SEED)
            .execute(&self.pool)
            .await
            .map_err(error::map_sqlx)?;
        tracing::info!("Demo data seeded");
        Ok(())
    }
}
