//! Payment callback tests against the in-memory store.

#![allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect

use courtside_core::booking::{BookedOrder, BookingRequest, BookingService};
use courtside_core::payment::{CallbackOutcome, PaymentCallback, PaymentService, TransactionStatus};
use courtside_core::{Hour, Money, NaiveDate, NotificationKind, OrderId, PaymentStatus};
use courtside_testing::{test_clock, InMemoryStore};
use std::sync::Arc;

async fn booked_order(store: &Arc<InMemoryStore>) -> BookedOrder {
    let court = store.add_court_at_new_location(Money::from_cents(2500));
    let service = BookingService::new(Arc::clone(store), Arc::new(test_clock()));
    service
        .book(BookingRequest {
            court_id: court.id,
            email: "player@example.com".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 1, 10).expect("valid date"),
            hours: vec![Hour::new(18).unwrap(), Hour::new(19).unwrap()],
        })
        .await
        .unwrap()
}

fn callback(order_id: OrderId, status: TransactionStatus, cents: u64) -> PaymentCallback {
    PaymentCallback {
        order_id,
        transaction_status: status,
        gross_amount: Money::from_cents(cents),
    }
}

fn confirmations(store: &InMemoryStore) -> usize {
    store
        .outbox()
        .iter()
        .filter(|e| e.task.kind == NotificationKind::PaymentConfirmed)
        .count()
}

#[tokio::test]
async fn matching_settlement_settles_once() {
    let store = Arc::new(InMemoryStore::new());
    let booked = booked_order(&store).await;
    let payments = PaymentService::new(Arc::clone(&store));
    let settle = callback(booked.order.id, TransactionStatus::Settlement, 5000);

    assert_eq!(payments.handle_callback(&settle).await.unwrap(), CallbackOutcome::Settled);
    assert_eq!(
        store.payment(booked.order.id).unwrap().status,
        PaymentStatus::Settled
    );
    assert_eq!(confirmations(&store), 1);

    assert_eq!(
        payments.handle_callback(&settle).await.unwrap(),
        CallbackOutcome::AlreadySettled
    );
    assert_eq!(confirmations(&store), 1);
}

#[tokio::test]
async fn amount_mismatch_leaves_payment_pending() {
    let store = Arc::new(InMemoryStore::new());
    let booked = booked_order(&store).await;
    let payments = PaymentService::new(Arc::clone(&store));

    let outcome = payments
        .handle_callback(&callback(booked.order.id, TransactionStatus::Settlement, 2500))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        CallbackOutcome::AmountMismatch {
            expected: Money::from_cents(5000),
            reported: Money::from_cents(2500),
        }
    );
    assert!(!outcome.is_acknowledged());
    assert_eq!(
        store.payment(booked.order.id).unwrap().status,
        PaymentStatus::Pending
    );
    assert_eq!(confirmations(&store), 0);
}

#[tokio::test]
async fn non_settlement_statuses_are_acknowledged_without_changes() {
    let store = Arc::new(InMemoryStore::new());
    let booked = booked_order(&store).await;
    let payments = PaymentService::new(Arc::clone(&store));

    for status in [
        TransactionStatus::Pending,
        TransactionStatus::Capture,
        TransactionStatus::Expire,
        TransactionStatus::Refund,
    ] {
        let outcome = payments
            .handle_callback(&callback(booked.order.id, status, 5000))
            .await
            .unwrap();
        assert_eq!(outcome, CallbackOutcome::Ignored(status));
        assert!(outcome.is_acknowledged());
    }
    assert_eq!(
        store.payment(booked.order.id).unwrap().status,
        PaymentStatus::Pending
    );
}

#[tokio::test]
async fn unknown_order_is_reported() {
    let store = Arc::new(InMemoryStore::new());
    let payments = PaymentService::new(Arc::clone(&store));

    let outcome = payments
        .handle_callback(&callback(OrderId::new(404), TransactionStatus::Settlement, 5000))
        .await
        .unwrap();
    assert_eq!(outcome, CallbackOutcome::UnknownOrder);
}
