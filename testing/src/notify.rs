//! Recording doubles for outbound side effects.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)]

use courtside_core::notify::{DispatchError, Notifier, PaymentDispatcher, PaymentLink};
use courtside_core::{NotificationKind, OrderDetails, OrderId};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A notification the [`RecordingNotifier`] accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentNotification {
    /// Which message
    pub kind: NotificationKind,
    /// Order it was about
    pub order_id: OrderId,
    /// Recipient
    pub email: String,
    /// Checkout link, for payment-pending messages
    pub link: Option<String>,
}

/// Notifier that records messages instead of sending them.
///
/// Queued failures are returned, oldest first, before anything is recorded.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<SentNotification>>>,
    failures: Arc<Mutex<VecDeque<DispatchError>>>,
}

impl RecordingNotifier {
    /// Create a notifier with nothing recorded
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next call with `error`.
    pub fn fail_next(&self, error: DispatchError) {
        self.failures.lock().unwrap().push_back(error);
    }

    /// Messages accepted so far.
    #[must_use]
    pub fn sent(&self) -> Vec<SentNotification> {
        self.sent.lock().unwrap().clone()
    }

    fn record(
        &self,
        kind: NotificationKind,
        details: &OrderDetails,
        link: Option<&PaymentLink>,
    ) -> Result<(), DispatchError> {
        if let Some(error) = self.failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        self.sent.lock().unwrap().push(SentNotification {
            kind,
            order_id: details.order.id,
            email: details.order.email.clone(),
            link: link.map(|l| l.url.clone()),
        });
        Ok(())
    }
}

impl Notifier for RecordingNotifier {
    async fn send_payment_pending(
        &self,
        details: &OrderDetails,
        link: &PaymentLink,
    ) -> Result<(), DispatchError> {
        self.record(NotificationKind::PaymentPending, details, Some(link))
    }

    async fn send_payment_confirmed(&self, details: &OrderDetails) -> Result<(), DispatchError> {
        self.record(NotificationKind::PaymentConfirmed, details, None)
    }
}

/// Payment dispatcher returning predictable checkout links.
#[derive(Debug, Clone, Default)]
pub struct StubPaymentDispatcher {
    requested: Arc<Mutex<Vec<OrderId>>>,
    failures: Arc<Mutex<VecDeque<DispatchError>>>,
    delay: Arc<Mutex<Option<Duration>>>,
}

impl StubPaymentDispatcher {
    /// Create a dispatcher with no queued failures
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Link the stub hands out for an order.
    #[must_use]
    pub fn link_for(order_id: OrderId) -> String {
        format!("https://checkout.test/orders/{order_id}")
    }

    /// Fail the next call with `error`.
    pub fn fail_next(&self, error: DispatchError) {
        self.failures.lock().unwrap().push_back(error);
    }

    /// Sleep for `delay` before answering each request.
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().unwrap() = delay;
    }

    /// Orders a link was requested for, including failed requests.
    #[must_use]
    pub fn requested(&self) -> Vec<OrderId> {
        self.requested.lock().unwrap().clone()
    }
}

impl PaymentDispatcher for StubPaymentDispatcher {
    async fn create_payment_link(&self, details: &OrderDetails) -> Result<PaymentLink, DispatchError> {
        self.requested.lock().unwrap().push(details.order.id);
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = self.failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        Ok(PaymentLink {
            url: Self::link_for(details.order.id),
        })
    }
}
