//! Application state for Axum handlers.

use courtside_core::booking::BookingService;
use courtside_core::environment::Clock;
use courtside_core::payment::PaymentService;
use courtside_core::store::BookingStore;
use std::sync::Arc;
use std::time::Duration;

/// Services shared across all HTTP handlers.
///
/// Both services hold the same store handle.
pub struct AppState<S, C> {
    /// Availability, booking and court lookup
    pub bookings: BookingService<S, C>,
    /// Provider callbacks
    pub payments: PaymentService<S>,
}

impl<S, C> Clone for AppState<S, C> {
    fn clone(&self) -> Self {
        Self {
            bookings: self.bookings.clone(),
            payments: self.payments.clone(),
        }
    }
}

impl<S, C> AppState<S, C>
where
    S: BookingStore,
    C: Clock,
{
    /// Build the state over one store and clock.
    #[must_use]
    pub fn new(store: Arc<S>, clock: Arc<C>) -> Self {
        Self {
            bookings: BookingService::new(Arc::clone(&store), clock),
            payments: PaymentService::new(store),
        }
    }

    /// Override the per-operation storage budget of both services.
    #[must_use]
    pub fn with_operation_timeout(self, timeout: Duration) -> Self {
        Self {
            bookings: self.bookings.with_operation_timeout(timeout),
            payments: self.payments.with_operation_timeout(timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courtside_core::environment::SystemClock;

    struct NoStore;

    #[test]
    fn test_state_is_clone_without_clone_store() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState<NoStore, SystemClock>>();
    }
}
