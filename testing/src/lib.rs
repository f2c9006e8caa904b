//! # Courtside Testing
//!
//! Test doubles for the Courtside booking engine.
//!
//! This crate provides:
//! - [`FixedClock`]: deterministic, manually advanced time
//! - [`InMemoryStore`]: a complete store with per-(court, date) locking,
//!   uniqueness checks at commit, and fault injection
//! - [`RecordingNotifier`] and [`StubPaymentDispatcher`]: capture outbound
//!   side effects instead of sending them
//! - [`properties`]: proptest strategies for domain values
//!
//! ## Example
//!
//! ```ignore
//! use courtside_testing::{test_clock, InMemoryStore};
//! use courtside_core::booking::BookingService;
//!
//! #[tokio::test]
//! async fn books_an_hour() {
//!     let store = Arc::new(InMemoryStore::new());
//!     let court = store.add_court_at_new_location(Money::from_cents(2500));
//!     let service = BookingService::new(store.clone(), Arc::new(test_clock()));
//!     // ...
//! }
//! ```

mod memory;
mod notify;

pub use memory::{InMemoryStore, InMemoryTransaction, OutboxEntry, OutboxStatus};
pub use notify::{RecordingNotifier, SentNotification, StubPaymentDispatcher};

use chrono::{DateTime, Utc};
use courtside_core::environment::Clock;

/// Mock implementations of environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use std::sync::{Arc, Mutex, PoisonError};

    /// Clock that only moves when told to.
    ///
    /// Clones share the same time, so a test can keep a handle and advance
    /// the clock a service already owns.
    ///
    /// # Example
    ///
    /// ```
    /// use courtside_testing::mocks::FixedClock;
    /// use courtside_core::environment::Clock;
    /// use chrono::{Duration, Utc};
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let before = clock.now();
    /// assert_eq!(before, clock.now());
    ///
    /// clock.advance(Duration::minutes(5));
    /// assert_eq!(clock.now() - before, Duration::minutes(5));
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: Arc<Mutex<DateTime<Utc>>>,
    }

    impl FixedClock {
        /// Create a clock stopped at the given time
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(Mutex::new(time)),
            }
        }

        /// Jump to an absolute time
        pub fn set(&self, time: DateTime<Utc>) {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner) = time;
        }

        /// Move forward by `delta`
        pub fn advance(&self, delta: chrono::Duration) {
            let mut time = self.time.lock().unwrap_or_else(PoisonError::into_inner);
            *time += delta;
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use courtside_core::slots::{Hour, LAST_HOUR};
    use proptest::prelude::*;

    /// Any valid hour of the day.
    pub fn hour() -> impl Strategy<Value = Hour> {
        (0..=LAST_HOUR).prop_filter_map("valid hour", |h| Hour::new(h).ok())
    }

    /// A non-empty list of distinct hours in random order.
    pub fn distinct_hours(max_len: usize) -> impl Strategy<Value = Vec<Hour>> {
        proptest::collection::btree_set(hour(), 1..=max_len)
            .prop_map(|set| set.into_iter().collect::<Vec<_>>())
            .prop_shuffle()
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, test_clock};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
    }

    #[test]
    fn clones_share_time() {
        let clock = test_clock();
        let handle = clock.clone();
        handle.advance(chrono::Duration::hours(3));
        assert_eq!(clock.now(), handle.now());
        assert_eq!(clock.now().to_rfc3339(), "2025-01-01T03:00:00+00:00");
    }
}
