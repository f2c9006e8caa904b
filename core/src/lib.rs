//! # Courtside Core
//!
//! Domain types and the slot-booking engine for the Courtside court
//! reservation service.
//!
//! ## Core Concepts
//!
//! - **Booking window**: the range of days a new order may target, computed
//!   from an injected [`environment::Clock`]
//! - **Slot**: one bookable [`slots::Hour`] for a court on a calendar day
//! - **Order**: a single booking submission grouping one or more reservations
//! - **Store**: persistence is reached only through the traits in [`store`],
//!   so the engine runs unchanged against `PostgreSQL` or the in-memory store
//!   used in tests
//!
//! ## Booking Flow
//!
//! ```text
//! request ─▶ shape check ─▶ window check ─▶ load court
//!                                             │
//!                        ┌────────────────────┘
//!                        ▼
//!        begin(court, date)  ← per-(court, date) lock
//!                        │
//!          reserved hours ─▶ slot validation ─▶ insert order,
//!                                               reservations, payment,
//!                                               outbox task ─▶ commit
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use courtside_core::booking::{BookingRequest, BookingService};
//!
//! let service = BookingService::new(store, clock);
//! let booked = service.book(BookingRequest {
//!     court_id,
//!     email: "player@example.com".to_string(),
//!     date,
//!     hours: vec![Hour::new(10)?, Hour::new(11)?],
//! }).await?;
//! assert_eq!(booked.order.duration, 2);
//! ```

#![forbid(unsafe_code)]

pub mod booking;
pub mod error;
pub mod filter;
pub mod notify;
pub mod payment;
pub mod slots;
pub mod store;
pub mod types;
pub mod window;

// Re-export commonly used types
pub use chrono::{DateTime, NaiveDate, Utc};
pub use error::{BookingError, FieldError, StoreError};
pub use slots::{Hour, HourSet};
pub use types::*;

/// Environment module - injected dependencies that are not storage.
///
/// Time is the only ambient input the engine reads, and it is always
/// reached through [`environment::Clock`] so tests can pin "now".
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use courtside_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let _now = clock.now();
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
