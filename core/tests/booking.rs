//! Booking engine tests against the in-memory store.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use courtside_core::booking::{BookingRequest, BookingService};
use courtside_core::filter::CourtFilter;
use courtside_core::{
    BookingError, Court, CourtId, CourtSize, CourtType, Hour, Money, NaiveDate, NotificationKind,
    PaymentStatus,
};
use courtside_testing::{test_clock, FixedClock, InMemoryStore, OutboxStatus};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn hours(values: &[u8]) -> Vec<Hour> {
    values.iter().map(|h| Hour::new(*h).expect("valid hour")).collect()
}

fn setup(price_cents: u64) -> (Arc<InMemoryStore>, Court, BookingService<InMemoryStore, FixedClock>) {
    let store = Arc::new(InMemoryStore::new());
    let court = store.add_court_at_new_location(Money::from_cents(price_cents));
    let service = BookingService::new(Arc::clone(&store), Arc::new(test_clock()));
    (store, court, service)
}

fn request(court: &Court, date: NaiveDate, values: &[u8]) -> BookingRequest {
    BookingRequest {
        court_id: court.id,
        email: "player@example.com".to_string(),
        date,
        hours: hours(values),
    }
}

#[tokio::test]
async fn booking_two_hours_creates_order_reservations_payment_and_outbox_task() {
    let (store, court, service) = setup(2500);

    let booked = service.book(request(&court, day(2025, 1, 10), &[11, 10])).await.unwrap();

    assert_eq!(booked.order.duration, 2);
    assert_eq!(booked.order.total, Money::from_cents(5000));
    assert_eq!(booked.hours(), hours(&[10, 11]));
    assert_eq!(booked.payment.amount, Money::from_cents(5000));
    assert_eq!(booked.payment.status, PaymentStatus::Pending);

    assert_eq!(store.orders().len(), 1);
    assert_eq!(store.reservations().len(), 2);
    let outbox = store.outbox();
    assert_eq!(outbox.len(), 1);
    assert_eq!(outbox[0].task.kind, NotificationKind::PaymentPending);
    assert_eq!(outbox[0].task.order_id, booked.order.id);
    assert_eq!(outbox[0].status, OutboxStatus::Pending);

    let taken = service.availability(court.id, day(2025, 1, 10)).await.unwrap();
    assert_eq!(taken.into_iter().collect::<Vec<_>>(), hours(&[10, 11]));
}

#[tokio::test]
async fn overlapping_booking_reports_only_the_taken_hours() {
    let (store, court, service) = setup(2500);
    let date = day(2025, 1, 10);
    service.book(request(&court, date, &[10, 11])).await.unwrap();

    let err = service.book(request(&court, date, &[11, 12])).await.unwrap_err();

    assert_eq!(
        err,
        BookingError::SlotConflict {
            conflicting_hours: hours(&[11])
        }
    );
    assert_eq!(store.orders().len(), 1);
    assert_eq!(store.reservations().len(), 2);
}

#[tokio::test]
async fn same_hours_on_another_day_or_court_do_not_conflict() {
    let (store, court, service) = setup(2500);
    let other = store.add_court(
        court.location_id,
        "Annex",
        court.size,
        court.court_type,
        Money::from_cents(3000),
    );

    service.book(request(&court, day(2025, 1, 10), &[10])).await.unwrap();
    service.book(request(&court, day(2025, 1, 11), &[10])).await.unwrap();
    let booked = service.book(request(&other, day(2025, 1, 10), &[10])).await.unwrap();

    assert_eq!(booked.order.total, Money::from_cents(3000));
    assert_eq!(store.orders().len(), 3);
}

#[tokio::test]
async fn empty_timetables_is_a_validation_error_without_writes() {
    let (store, court, service) = setup(2500);

    let err = service.book(request(&court, day(2025, 1, 10), &[])).await.unwrap_err();

    let BookingError::Validation(fields) = err else {
        panic!("expected validation error, got {err:?}");
    };
    assert_eq!(fields[0].field, "timetables");
    assert!(store.orders().is_empty());
    assert!(store.outbox().is_empty());
}

#[tokio::test]
async fn malformed_email_is_rejected() {
    let (_, court, service) = setup(2500);
    let mut bad = request(&court, day(2025, 1, 10), &[10]);
    bad.email = "not-an-email".to_string();

    let err = service.book(bad).await.unwrap_err();
    assert!(matches!(err, BookingError::Validation(ref f) if f[0].field == "email"));
}

#[tokio::test]
async fn window_boundaries_are_inclusive() {
    let (_, court, service) = setup(2500);

    // now = 2025-01-01T00:00Z: window is 2025-01-02 ..= 2025-02-02
    for date in [day(2025, 1, 1), day(2024, 12, 31), day(2025, 2, 3)] {
        let err = service.book(request(&court, date, &[10])).await.unwrap_err();
        assert!(
            matches!(err, BookingError::OutOfRange { .. }),
            "{date} should be out of range"
        );
    }

    service.book(request(&court, day(2025, 1, 2), &[10])).await.unwrap();
    service.book(request(&court, day(2025, 2, 2), &[10])).await.unwrap();
}

#[tokio::test]
async fn unknown_court_is_not_found() {
    let (_, court, service) = setup(2500);
    let mut missing = request(&court, day(2025, 1, 10), &[10]);
    missing.court_id = CourtId::new(9_999);

    let err = service.book(missing).await.unwrap_err();
    assert_eq!(err, BookingError::CourtNotFound(CourtId::new(9_999)));
}

#[tokio::test]
async fn court_lookup_and_search_apply_every_predicate() {
    let (store, court, service) = setup(2500);
    let location = store.add_location("Harbour", "Capital City");
    let outdoor = store.add_court(
        location.id,
        "Quay",
        CourtSize::HalfCourt,
        CourtType::Outdoor,
        Money::from_cents(2000),
    );

    let found = service.court(court.id).await.unwrap();
    assert_eq!(found.court, court);
    assert_eq!(found.location.id, court.location_id);

    let all = service.search_courts(&CourtFilter::new()).await.unwrap();
    assert_eq!(all.iter().map(|c| c.id).collect::<Vec<_>>(), vec![court.id, outdoor.id]);

    let filtered = service
        .search_courts(
            &CourtFilter::new()
                .location(Some(location.id))
                .court_type(Some(CourtType::Outdoor)),
        )
        .await
        .unwrap();
    assert_eq!(filtered, vec![outdoor.clone()]);

    let none = service
        .search_courts(
            &CourtFilter::new()
                .location(Some(location.id))
                .size(Some(CourtSize::FullCourt)),
        )
        .await
        .unwrap();
    assert!(none.is_empty());

    let missing = CourtId::new(9_999);
    assert_eq!(
        service.court(missing).await.unwrap_err(),
        BookingError::CourtNotFound(missing)
    );
}

#[tokio::test]
async fn failed_reservation_insert_rolls_back_the_order() {
    let (store, court, service) = setup(2500);
    store.fail_reservation_inserts(true);

    let err = service.book(request(&court, day(2025, 1, 10), &[10, 11])).await.unwrap_err();

    assert!(matches!(err, BookingError::Internal(_)));
    assert!(store.orders().is_empty());
    assert!(store.reservations().is_empty());
    assert!(store.outbox().is_empty());

    store.fail_reservation_inserts(false);
    service.book(request(&court, day(2025, 1, 10), &[10, 11])).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn slow_store_surfaces_as_retryable() {
    let (store, court, service) = setup(2500);
    let service = service.with_operation_timeout(Duration::from_millis(100));
    store.set_delay(Some(Duration::from_secs(10)));

    let err = service.book(request(&court, day(2025, 1, 10), &[10])).await.unwrap_err();

    assert!(err.is_retryable(), "got {err:?}");
    assert!(store.orders().is_empty());
}

#[tokio::test]
async fn unavailable_store_surfaces_as_retryable() {
    let (store, court, service) = setup(2500);
    store.set_unavailable(true);

    let err = service.availability(court.id, day(2025, 1, 10)).await.unwrap_err();
    assert!(matches!(err, BookingError::Transient(_)));
}

#[tokio::test]
async fn reads_are_repeatable() {
    let (_, court, service) = setup(2500);
    let date = day(2025, 1, 10);
    service.book(request(&court, date, &[8, 9])).await.unwrap();

    let first = service.reservations(court.id, date).await.unwrap();
    let second = service.reservations(court.id, date).await.unwrap();
    assert_eq!(first, second);
    assert!(service.reservations(court.id, day(2025, 1, 11)).await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn uniqueness_backstop_names_the_contested_hour() {
    let (store, court, service) = setup(2500);
    store.skip_slot_locks(true);
    store.set_delay(Some(Duration::from_millis(5)));
    let date = day(2025, 1, 10);

    let (a, b) = tokio::join!(
        service.book(request(&court, date, &[9, 10])),
        service.book(request(&court, date, &[10, 11])),
    );

    let outcomes = [a, b];
    let successes = outcomes.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);
    let conflict = outcomes.into_iter().find_map(Result::err).unwrap();
    assert_eq!(
        conflict,
        BookingError::SlotConflict {
            conflicting_hours: hours(&[10])
        }
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_bookings_never_share_an_hour() {
    let (store, court, service) = setup(2500);
    let date = day(2025, 1, 10);

    let mut handles = Vec::new();
    for i in 0..24u8 {
        let service = service.clone();
        let req = request(&court, date, &[i % 12, (i % 12) + 1]);
        handles.push(tokio::spawn(async move { service.book(req).await }));
    }

    let mut booked_hours = HashSet::new();
    for handle in handles {
        match handle.await.unwrap() {
            Ok(booked) => {
                for hour in booked.hours() {
                    assert!(booked_hours.insert(hour), "hour {hour} booked twice");
                }
            }
            Err(BookingError::SlotConflict { conflicting_hours }) => {
                assert!(!conflicting_hours.is_empty());
            }
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    let stored = store.reservations();
    let unique: HashSet<Hour> = stored.iter().map(|r| r.hour).collect();
    assert_eq!(unique.len(), stored.len());
    assert_eq!(unique, booked_hours);
}

mod properties {
    use super::*;
    use courtside_testing::properties::distinct_hours;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn booked_hours_become_unavailable(requested in distinct_hours(6), again in distinct_hours(4)) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();

            runtime.block_on(async {
                let (_, court, service) = setup(1000);
                let date = day(2025, 1, 15);
                let first = BookingRequest { hours: requested.clone(), ..request(&court, date, &[]) };
                let booked = service.book(first).await.unwrap();
                prop_assert_eq!(booked.order.total, Money::from_cents(1000 * requested.len() as u64));

                let taken = service.availability(court.id, date).await.unwrap();
                prop_assert_eq!(taken.len(), requested.len());

                let overlap: Vec<Hour> = {
                    let mut o: Vec<Hour> = again.iter().filter(|h| taken.contains(h)).copied().collect();
                    o.sort();
                    o
                };
                let second = BookingRequest { hours: again.clone(), ..request(&court, date, &[]) };
                match service.book(second).await {
                    Ok(_) => prop_assert!(overlap.is_empty()),
                    Err(BookingError::SlotConflict { conflicting_hours }) => {
                        prop_assert_eq!(conflicting_hours, overlap);
                    }
                    Err(other) => prop_assert!(false, "unexpected error: {:?}", other),
                }
                Ok(())
            })?;
        }
    }
}
