//! Axum HTTP surface for Courtside.
//!
//! Handlers decode requests, call [`courtside_core`] services held in
//! [`AppState`], and answer with a JSON envelope:
//!
//! ```text
//! success: { "message": "...", "error": null, "data": ... }
//! failure: { "message": "...", "error": ... }
//! ```
//!
//! # Routes
//!
//! | Method | Path | |
//! |---|---|---|
//! | GET | `/api/courts/:id/reservations?date=` | reserved hours for a day |
//! | POST | `/api/courts/:id/reservations` | book hours (201) |
//! | GET | `/api/courts/:id` | court with its location |
//! | GET | `/api/search?location=&type=&size=` | filtered court list |
//! | POST | `/api/payments/callback` | payment provider callback |
//! | GET | `/health`, `/ready` | liveness, readiness |
//!
//! # Example
//!
//! ```ignore
//! use courtside_web::{router, AppState};
//!
//! let state = AppState::new(Arc::new(store), Arc::new(SystemClock));
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, router(state)).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod state;

pub use error::AppError;
pub use extractors::CorrelationId;
pub use middleware::{CORRELATION_ID_HEADER, correlation_id_layer};
pub use response::ApiResponse;
pub use state::AppState;

use axum::Router;
use axum::routing::{get, post};
use courtside_core::environment::Clock;
use courtside_core::store::BookingStore;
use handlers::{courts, health, payments, reservations};
use tower_http::trace::TraceLayer;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;

/// Build the application router.
pub fn router<S, C>(state: AppState<S, C>) -> Router
where
    S: BookingStore + 'static,
    C: Clock + 'static,
{
    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness::<S, C>))
        .route("/api/courts/:id", get(courts::get_court::<S, C>))
        .route(
            "/api/courts/:id/reservations",
            get(reservations::list_reservations::<S, C>)
                .post(reservations::create_reservation::<S, C>),
        )
        .route("/api/search", get(courts::search_courts::<S, C>))
        .route(
            "/api/payments/callback",
            post(payments::payment_callback::<S, C>),
        )
        .fallback(route_not_found)
        .layer(TraceLayer::new_for_http())
        .layer(correlation_id_layer())
        .with_state(state)
}

#[allow(clippy::unused_async)]
async fn route_not_found() -> AppError {
    AppError::new(
        http::StatusCode::NOT_FOUND,
        "Route not found",
        serde_json::json!("NOT_FOUND"),
    )
}
