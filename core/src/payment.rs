//! Payment provider callbacks.
//!
//! Only a `settlement` status changes anything: the order's total must match
//! the reported gross amount, then the payment is marked settled and a
//! confirmation notification is queued in the same store transaction.

use crate::error::BookingError;
use crate::store::{self, BookingStore, SettleOutcome, DEFAULT_OPERATION_TIMEOUT};
use crate::types::{Money, OrderId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Transaction status reported by the payment provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Card payment captured
    Capture,
    /// Funds settled
    Settlement,
    /// Waiting for the customer
    Pending,
    /// Rejected by the provider
    Deny,
    /// Cancelled by the merchant
    Cancel,
    /// Checkout expired
    Expire,
    /// Unexpected provider failure
    Failure,
    /// Fully refunded
    Refund,
    /// Partially refunded
    PartialRefund,
    /// Authorized, not yet captured
    Authorize,
}

impl TransactionStatus {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Capture => "capture",
            Self::Settlement => "settlement",
            Self::Pending => "pending",
            Self::Deny => "deny",
            Self::Cancel => "cancel",
            Self::Expire => "expire",
            Self::Failure => "failure",
            Self::Refund => "refund",
            Self::PartialRefund => "partial_refund",
            Self::Authorize => "authorize",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "capture" => Ok(Self::Capture),
            "settlement" => Ok(Self::Settlement),
            "pending" => Ok(Self::Pending),
            "deny" => Ok(Self::Deny),
            "cancel" => Ok(Self::Cancel),
            "expire" => Ok(Self::Expire),
            "failure" => Ok(Self::Failure),
            "refund" => Ok(Self::Refund),
            "partial_refund" => Ok(Self::PartialRefund),
            "authorize" => Ok(Self::Authorize),
            other => Err(format!("unknown transaction status: {other}")),
        }
    }
}

/// A decoded provider callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentCallback {
    /// Order the payment belongs to
    pub order_id: OrderId,
    /// Reported status
    pub transaction_status: TransactionStatus,
    /// Reported amount
    pub gross_amount: Money,
}

/// What a callback did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// Status other than settlement; acknowledged without changes
    Ignored(TransactionStatus),
    /// No such order
    UnknownOrder,
    /// Reported amount differs from the order total
    AmountMismatch {
        /// Order total
        expected: Money,
        /// Amount in the callback
        reported: Money,
    },
    /// Payment moved to settled
    Settled,
    /// Payment was already settled; nothing changed
    AlreadySettled,
}

impl CallbackOutcome {
    /// Whether the provider should see a success response.
    #[must_use]
    pub const fn is_acknowledged(&self) -> bool {
        matches!(
            self,
            Self::Ignored(_) | Self::Settled | Self::AlreadySettled
        )
    }

    /// Stable label for logs and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ignored(_) => "ignored",
            Self::UnknownOrder => "unknown_order",
            Self::AmountMismatch { .. } => "amount_mismatch",
            Self::Settled => "settled",
            Self::AlreadySettled => "already_settled",
        }
    }
}

/// Applies provider callbacks to stored payments.
pub struct PaymentService<S> {
    store: Arc<S>,
    operation_timeout: Duration,
}

impl<S> Clone for PaymentService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            operation_timeout: self.operation_timeout,
        }
    }
}

impl<S: BookingStore> PaymentService<S> {
    /// Create a service over a store handle.
    #[must_use]
    pub const fn new(store: Arc<S>) -> Self {
        Self {
            store,
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }

    /// Override the per-operation storage budget.
    #[must_use]
    pub const fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    /// Apply a callback.
    ///
    /// Replaying a settlement callback is harmless: the second call returns
    /// [`CallbackOutcome::AlreadySettled`] and queues nothing.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Transient`] or [`BookingError::Internal`] when
    /// the store fails.
    #[tracing::instrument(
        skip(self, callback),
        fields(order_id = %callback.order_id, status = %callback.transaction_status)
    )]
    pub async fn handle_callback(
        &self,
        callback: &PaymentCallback,
    ) -> Result<CallbackOutcome, BookingError> {
        let outcome = self.apply(callback).await?;

        match outcome {
            CallbackOutcome::Settled => {
                metrics::counter!("courtside_payments_settled_total").increment(1);
                tracing::info!("Payment settled");
            }
            CallbackOutcome::AmountMismatch { expected, reported } => {
                tracing::warn!(%expected, %reported, "Callback amount does not match order total");
            }
            CallbackOutcome::UnknownOrder => tracing::warn!("Callback for unknown order"),
            other => tracing::debug!(outcome = other.as_str(), "Callback acknowledged"),
        }

        Ok(outcome)
    }

    async fn apply(&self, callback: &PaymentCallback) -> Result<CallbackOutcome, BookingError> {
        if callback.transaction_status != TransactionStatus::Settlement {
            return Ok(CallbackOutcome::Ignored(callback.transaction_status));
        }

        let details = store::bounded(
            self.operation_timeout,
            self.store.order_details(callback.order_id),
        )
        .await?;
        let Some(details) = details else {
            return Ok(CallbackOutcome::UnknownOrder);
        };

        if details.order.total != callback.gross_amount {
            return Ok(CallbackOutcome::AmountMismatch {
                expected: details.order.total,
                reported: callback.gross_amount,
            });
        }

        let settled = store::bounded(
            self.operation_timeout,
            self.store.settle_payment(callback.order_id),
        )
        .await?;

        Ok(match settled {
            SettleOutcome::Settled => CallbackOutcome::Settled,
            SettleOutcome::AlreadySettled => CallbackOutcome::AlreadySettled,
            SettleOutcome::Missing => CallbackOutcome::UnknownOrder,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_parse_from_provider_strings() {
        assert_eq!("settlement".parse(), Ok(TransactionStatus::Settlement));
        assert_eq!("partial_refund".parse(), Ok(TransactionStatus::PartialRefund));
        assert!("settled".parse::<TransactionStatus>().is_err());
    }

    #[test]
    fn only_success_outcomes_are_acknowledged() {
        assert!(CallbackOutcome::Ignored(TransactionStatus::Pending).is_acknowledged());
        assert!(CallbackOutcome::Settled.is_acknowledged());
        assert!(CallbackOutcome::AlreadySettled.is_acknowledged());
        assert!(!CallbackOutcome::UnknownOrder.is_acknowledged());
        assert!(
            !CallbackOutcome::AmountMismatch {
                expected: Money::from_cents(2500),
                reported: Money::from_cents(2000),
            }
            .is_acknowledged()
        );
    }
}
