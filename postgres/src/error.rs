//! Mapping from `sqlx` errors to [`StoreError`].

use courtside_core::StoreError;

/// `unique_violation`
const UNIQUE_VIOLATION: &str = "23505";
/// `query_canceled`, raised when `statement_timeout` fires
const QUERY_CANCELED: &str = "57014";
/// `lock_not_available`, raised when `lock_timeout` fires
const LOCK_NOT_AVAILABLE: &str = "55P03";
/// `serialization_failure`
const SERIALIZATION_FAILURE: &str = "40001";
/// `deadlock_detected`
const DEADLOCK_DETECTED: &str = "40P01";

/// Classify a driver error.
pub(crate) fn map_sqlx(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) => match db.code().as_deref() {
            Some(UNIQUE_VIOLATION) => StoreError::UniqueViolation(db.message().to_string()),
            Some(QUERY_CANCELED | LOCK_NOT_AVAILABLE) => StoreError::Timeout,
            Some(SERIALIZATION_FAILURE | DEADLOCK_DETECTED) => {
                StoreError::Unavailable(db.message().to_string())
            }
            _ => StoreError::Database(err.to_string()),
        },
        sqlx::Error::PoolTimedOut => StoreError::Timeout,
        sqlx::Error::PoolClosed | sqlx::Error::Io(_) | sqlx::Error::Tls(_) => {
            StoreError::Unavailable(err.to_string())
        }
        sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::Decode(_)
        | sqlx::Error::TypeNotFound { .. } => StoreError::Corrupt(err.to_string()),
        _ => StoreError::Database(err.to_string()),
    }
}
