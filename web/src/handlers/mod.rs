//! HTTP request handlers.
//!
//! Handlers are generic over the store and clock so the same router serves
//! `PostgreSQL` in production and the in-memory store in tests.

pub mod courts;
pub mod health;
pub mod payments;
pub mod reservations;

pub use health::health_check;
