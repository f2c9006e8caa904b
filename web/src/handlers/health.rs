//! Health check endpoints.
//!
//! These endpoints are used by load balancers and monitoring systems
//! to verify service health.

use crate::WebResult;
use crate::response::ApiResponse;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode};
use courtside_core::environment::Clock;
use courtside_core::store::BookingStore;
use serde_json::{Value, json};

/// Liveness: the process is up. Does not touch the store.
///
/// ```text
/// GET /health
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

/// Readiness: the store answers a ping.
///
/// ```text
/// GET /ready
/// ```
///
/// # Errors
///
/// 503 when the store is unreachable, 500 on any other failure.
pub async fn readiness<S, C>(
    State(state): State<AppState<S, C>>,
) -> WebResult<ApiResponse<Value>>
where
    S: BookingStore + 'static,
    C: Clock + 'static,
{
    state.bookings.ping().await?;
    Ok(ApiResponse::new("Service is ready", json!({ "status": "ready" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_simple_health_check() {
        let (status, body) = health_check().await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }
}
