//! Provider adapters wired into the outbox worker.
//!
//! The checkout link points at a hosted payment page keyed by order id;
//! customer messages are written to the log until a mail transport is
//! configured.

use courtside_core::notify::{DispatchError, Notifier, PaymentDispatcher, PaymentLink};
use courtside_core::OrderDetails;

/// Builds `{base}/orders/{order_id}` checkout links.
#[derive(Debug, Clone)]
pub struct CheckoutLinkDispatcher {
    base_url: String,
}

impl CheckoutLinkDispatcher {
    /// Dispatcher for the checkout page at `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url }
    }
}

impl PaymentDispatcher for CheckoutLinkDispatcher {
    async fn create_payment_link(&self, details: &OrderDetails) -> Result<PaymentLink, DispatchError> {
        if self.base_url.is_empty() {
            return Err(DispatchError::Rejected("checkout base URL is not configured".to_string()));
        }
        Ok(PaymentLink {
            url: format!("{}/orders/{}", self.base_url, details.order.id),
        })
    }
}

/// Writes customer notifications to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingNotifier;

impl Notifier for LoggingNotifier {
    async fn send_payment_pending(
        &self,
        details: &OrderDetails,
        link: &PaymentLink,
    ) -> Result<(), DispatchError> {
        let hours: Vec<String> = details.hours.iter().map(|h| h.label()).collect();
        tracing::info!(
            order_id = %details.order.id,
            email = %details.order.email,
            court = %details.court.name,
            location = %details.location.name,
            date = %details.order.date,
            hours = ?hours,
            total = %details.order.total,
            url = %link.url,
            "Payment pending notification"
        );
        Ok(())
    }

    async fn send_payment_confirmed(&self, details: &OrderDetails) -> Result<(), DispatchError> {
        tracing::info!(
            order_id = %details.order.id,
            email = %details.order.email,
            court = %details.court.name,
            date = %details.order.date,
            "Payment confirmed notification"
        );
        Ok(())
    }
}
