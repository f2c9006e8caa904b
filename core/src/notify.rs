//! Outbound side effects: payment links and customer notifications.
//!
//! Both run from the notification outbox after the booking transaction has
//! committed, never inside it. A slow provider therefore cannot hold the
//! (court, date) lock.

use crate::types::OrderDetails;
use std::future::Future;
use thiserror::Error;

/// A hosted checkout page for an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentLink {
    /// Checkout URL the customer is sent to
    pub url: String,
}

/// Failure reported by a dispatcher or notifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The provider may accept the same request later
    #[error("provider temporarily unavailable: {0}")]
    Transient(String),

    /// The provider rejected the request; retrying will not help
    #[error("provider rejected request: {0}")]
    Rejected(String),
}

impl DispatchError {
    /// Whether the outbox should schedule another attempt.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Payment provider integration.
///
/// Implementations wrap a hosted checkout service (Midtrans Snap, Stripe
/// Checkout, ...). Creating a link for the same order twice must be safe.
pub trait PaymentDispatcher: Send + Sync {
    /// Create a checkout link charging `details.order.total`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] if the provider call fails.
    fn create_payment_link(
        &self,
        details: &OrderDetails,
    ) -> impl Future<Output = Result<PaymentLink, DispatchError>> + Send;
}

/// Customer notifications (email, SMS, ...).
pub trait Notifier: Send + Sync {
    /// Tell the customer the booking is held and how to pay for it.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] if delivery fails.
    fn send_payment_pending(
        &self,
        details: &OrderDetails,
        link: &PaymentLink,
    ) -> impl Future<Output = Result<(), DispatchError>> + Send;

    /// Tell the customer the payment settled and the booking is confirmed.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] if delivery fails.
    fn send_payment_confirmed(
        &self,
        details: &OrderDetails,
    ) -> impl Future<Output = Result<(), DispatchError>> + Send;
}
