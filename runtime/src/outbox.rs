//! Notification outbox worker.
//!
//! Bookings and settlements only queue notification tasks inside their
//! transaction. This worker claims due tasks after commit and performs the
//! outbound calls: a payment link plus a "payment pending" message for new
//! orders, a confirmation message for settled payments.
//!
//! Delivery is at-least-once. A transient failure reschedules the task with
//! exponential backoff; a rejection or the final allowed attempt marks it
//! failed.

use chrono::{DateTime, Utc};
use courtside_core::environment::Clock;
use courtside_core::notify::{DispatchError, Notifier, PaymentDispatcher};
use courtside_core::store::{self, BookingStore, OutboxStore, DEFAULT_OPERATION_TIMEOUT};
use courtside_core::{NotificationKind, NotificationTask, OrderId, StoreError};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::retry::RetryPolicy;

/// Worker settings.
#[derive(Debug, Clone)]
pub struct OutboxConfig {
    /// Sleep between polls when the outbox is drained
    pub poll_interval: Duration,
    /// Maximum tasks claimed per poll
    pub batch_size: u32,
    /// How long a claimed task stays hidden from other workers
    pub lease: Duration,
    /// Budget for each store call
    pub operation_timeout: Duration,
    /// Redelivery schedule
    pub retry: RetryPolicy,
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            batch_size: 32,
            lease: Duration::from_secs(60),
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }
}

/// Why a single delivery failed.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Provider call failed
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// Reading the order failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The order the task refers to no longer exists
    #[error("order {0} not found")]
    OrderMissing(OrderId),
}

impl DeliveryError {
    /// Whether the task should be attempted again.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Dispatch(err) => err.is_retryable(),
            Self::Store(_) => true,
            Self::OrderMissing(_) => false,
        }
    }
}

/// Counts for one processed batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Tasks claimed
    pub claimed: usize,
    /// Tasks delivered
    pub delivered: usize,
    /// Tasks rescheduled
    pub retried: usize,
    /// Tasks given up on
    pub failed: usize,
}

/// Polls the outbox and delivers notifications.
pub struct OutboxWorker<S, D, N, C> {
    store: Arc<S>,
    dispatcher: Arc<D>,
    notifier: Arc<N>,
    clock: Arc<C>,
    config: OutboxConfig,
}

impl<S, D, N, C> OutboxWorker<S, D, N, C>
where
    S: BookingStore + OutboxStore,
    D: PaymentDispatcher,
    N: Notifier,
    C: Clock,
{
    /// Create a worker.
    #[must_use]
    pub const fn new(
        store: Arc<S>,
        dispatcher: Arc<D>,
        notifier: Arc<N>,
        clock: Arc<C>,
        config: OutboxConfig,
    ) -> Self {
        Self {
            store,
            dispatcher,
            notifier,
            clock,
            config,
        }
    }

    /// Poll until `shutdown` resolves.
    ///
    /// A full batch is followed immediately by another poll; otherwise the
    /// worker sleeps for the poll interval. A batch in progress is finished
    /// before shutdown is observed.
    pub async fn run(&self, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);
        tracing::info!(
            poll_interval_ms = self.config.poll_interval.as_millis(),
            batch_size = self.config.batch_size,
            "Outbox worker started"
        );

        loop {
            let pause = match self.process_batch().await {
                Ok(report) if report.claimed >= self.batch_len() => Duration::ZERO,
                Ok(_) => self.config.poll_interval,
                Err(err) => {
                    tracing::warn!(error = %err, "Outbox poll failed");
                    self.config.poll_interval
                }
            };

            tokio::select! {
                biased;
                () = &mut shutdown => break,
                () = tokio::time::sleep(pause) => {}
            }
        }

        tracing::info!("Outbox worker stopped");
    }

    /// Claim and deliver one batch of due tasks.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if claiming or recording a result fails. Tasks
    /// left unrecorded become claimable again when their lease expires.
    pub async fn process_batch(&self) -> Result<BatchReport, StoreError> {
        let started = Instant::now();
        let now = self.clock.now();
        let lease_until = after(now, self.config.lease);

        let tasks = self
            .bounded(self.store.claim_due(now, lease_until, self.config.batch_size))
            .await?;

        let mut report = BatchReport {
            claimed: tasks.len(),
            ..BatchReport::default()
        };

        for task in tasks {
            match self.deliver(&task).await {
                Ok(()) => {
                    self.bounded(self.store.mark_delivered(task.id)).await?;
                    report.delivered += 1;
                    record(task.kind, "delivered");
                    tracing::debug!(task_id = %task.id, kind = task.kind.as_str(), "Notification delivered");
                }
                Err(err) if err.is_retryable() && self.config.retry.should_retry(task.attempts) => {
                    let delay = self.config.retry.delay_for_attempt(task.attempts);
                    let available_at = after(self.clock.now(), delay);
                    self.bounded(self.store.mark_retry(task.id, available_at, &err.to_string()))
                        .await?;
                    report.retried += 1;
                    record(task.kind, "retried");
                    tracing::warn!(
                        task_id = %task.id,
                        attempts = task.attempts,
                        delay_ms = delay.as_millis(),
                        error = %err,
                        "Notification delivery failed, will retry"
                    );
                }
                Err(err) => {
                    self.bounded(self.store.mark_failed(task.id, &err.to_string()))
                        .await?;
                    report.failed += 1;
                    record(task.kind, "failed");
                    tracing::error!(
                        task_id = %task.id,
                        order_id = %task.order_id,
                        attempts = task.attempts,
                        error = %err,
                        "Notification delivery failed permanently"
                    );
                }
            }
        }

        metrics::histogram!("courtside_outbox_batch_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        Ok(report)
    }

    async fn deliver(&self, task: &NotificationTask) -> Result<(), DeliveryError> {
        let details = self
            .bounded(self.store.order_details(task.order_id))
            .await?
            .ok_or(DeliveryError::OrderMissing(task.order_id))?;

        match task.kind {
            NotificationKind::PaymentPending => {
                let link = self
                    .within_budget(self.dispatcher.create_payment_link(&details))
                    .await?;
                self.within_budget(self.notifier.send_payment_pending(&details, &link))
                    .await?;
            }
            NotificationKind::PaymentConfirmed => {
                self.within_budget(self.notifier.send_payment_confirmed(&details))
                    .await?;
            }
        }
        Ok(())
    }

    /// Provider calls get the same budget as store calls; expiry is retryable.
    async fn within_budget<T>(
        &self,
        call: impl Future<Output = Result<T, DispatchError>>,
    ) -> Result<T, DispatchError> {
        let budget = self.config.operation_timeout;
        tokio::time::timeout(budget, call).await.unwrap_or_else(|_| {
            Err(DispatchError::Transient(format!(
                "provider did not answer within {}ms",
                budget.as_millis()
            )))
        })
    }

    fn batch_len(&self) -> usize {
        usize::try_from(self.config.batch_size).unwrap_or(usize::MAX)
    }

    async fn bounded<T>(
        &self,
        operation: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        store::bounded(self.config.operation_timeout, operation).await
    }
}

fn after(now: DateTime<Utc>, delay: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(delay)
        .ok()
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn record(kind: NotificationKind, outcome: &'static str) {
    metrics::counter!(
        "courtside_notifications_total",
        "kind" => kind.as_str(),
        "outcome" => outcome
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_permanent_failures_skip_retry() {
        assert!(DeliveryError::Dispatch(DispatchError::Transient("503".into())).is_retryable());
        assert!(DeliveryError::Store(StoreError::Timeout).is_retryable());
        assert!(!DeliveryError::Dispatch(DispatchError::Rejected("bad email".into())).is_retryable());
        assert!(!DeliveryError::OrderMissing(OrderId::new(1)).is_retryable());
    }

    #[test]
    fn after_saturates_instead_of_overflowing() {
        assert_eq!(after(DateTime::<Utc>::MAX_UTC, Duration::from_secs(1)), DateTime::<Utc>::MAX_UTC);
    }
}
