//! # Courtside Runtime
//!
//! Background machinery around the booking engine:
//!
//! - [`outbox`]: delivers queued notifications after commit
//! - [`retry`]: exponential backoff shared by the outbox and start-up code
//! - [`metrics`]: Prometheus recorder and series descriptions
//!
//! ## Example
//!
//! ```ignore
//! use courtside_runtime::outbox::{OutboxConfig, OutboxWorker};
//!
//! let worker = OutboxWorker::new(store, dispatcher, notifier, clock, OutboxConfig::default());
//! tokio::spawn(async move { worker.run(shutdown_signal()).await });
//! ```

#![forbid(unsafe_code)]

pub mod metrics;
pub mod outbox;
pub mod retry;

pub use outbox::{BatchReport, OutboxConfig, OutboxWorker};
pub use retry::RetryPolicy;
