//! Integration tests for creating and returning rentals

use chrono::{DateTime, Duration, TimeZone, Utc};

use stockhire_core::{CreateRentalRequest, RentalStatus, ReturnRentalRequest};
use stockhire_engine::{Clock, ErrorKind};

mod common;

use common::{return_request, setup};

// =============================================================================
// Create
// =============================================================================

#[tokio::test]
async fn test_create_reserves_stock_and_snapshots_fee() {
    let h = setup().await;
    let tent = h.add_stock("Dome Tent", 10, 500).await;

    let rental = h.rent("2024-01-10", &[(tent.id.as_str(), 3)]).await;

    assert_eq!(rental.status, RentalStatus::Rented);
    assert_eq!(rental.customer_id, h.customer.id);
    assert_eq!(rental.rented_on, common::start_time());
    assert_eq!(rental.returned_on, None);
    assert_eq!(rental.processed_by, "desk-1");
    assert_eq!(rental.items.len(), 1);
    assert_eq!(rental.items[0].qty, 3);
    assert_eq!(rental.items[0].daily_late_fee_snapshot, 500);
    assert_eq!(h.quantity(&tent.id).await, 7);

    let stored = h.engine.get_rental(&rental.id).await.unwrap();
    assert_eq!(stored, rental);
}

#[tokio::test]
async fn test_failing_line_leaves_everything_untouched() {
    let h = setup().await;
    let tent = h.add_stock("Dome Tent", 10, 500).await;
    let stove = h.add_stock("Camping Stove", 1, 250).await;

    let err = h
        .engine
        .create_rental(&h.rent_request("2024-01-10", &[(tent.id.as_str(), 2), (stove.id.as_str(), 5)]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientStock);

    let err = h
        .engine
        .create_rental(&h.rent_request("2024-01-10", &[(tent.id.as_str(), 2), ("no-such-stock", 1)]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(err.to_string().contains("no-such-stock"));

    let err = h
        .engine
        .create_rental(&common::rent_request("no-such-customer", "2024-01-10", &[(tent.id.as_str(), 1)]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    assert_eq!(h.quantity(&tent.id).await, 10);
    assert_eq!(h.quantity(&stove.id).await, 1);

    let page = h.engine.list_rentals(&Default::default()).await.unwrap();
    assert_eq!(page.total, 0);
}

#[tokio::test]
async fn test_repeated_lines_are_checked_together() {
    let h = setup().await;
    let chair = h.add_stock("Folding Chair", 10, 50).await;

    let err = h
        .engine
        .create_rental(&h.rent_request("2024-01-10", &[(chair.id.as_str(), 6), (chair.id.as_str(), 6)]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientStock);
    assert_eq!(h.quantity(&chair.id).await, 10);

    let rental = h.rent("2024-01-10", &[(chair.id.as_str(), 4), (chair.id.as_str(), 5)]).await;
    assert_eq!(rental.items.len(), 2);
    assert_eq!(rental.total_qty(), 9);
    assert_eq!(h.quantity(&chair.id).await, 1);
}

#[tokio::test]
async fn test_invalid_requests_never_reach_the_store() {
    let h = setup().await;
    let tent = h.add_stock("Dome Tent", 10, 500).await;

    let cases = [
        h.rent_request("2024-01-10", &[]),
        h.rent_request("2024-01-10", &[(tent.id.as_str(), 0)]),
        h.rent_request("2024-01-10", &[(tent.id.as_str(), -2)]),
        h.rent_request("10/01/2024", &[(tent.id.as_str(), 1)]),
        h.rent_request("2024-01-10", &[("   ", 1)]),
        CreateRentalRequest {
            paid_amount: -1,
            ..h.rent_request("2024-01-10", &[(tent.id.as_str(), 1)])
        },
        CreateRentalRequest {
            processed_by: " ".to_string(),
            ..h.rent_request("2024-01-10", &[(tent.id.as_str(), 1)])
        },
    ];

    for request in &cases {
        let err = h.engine.create_rental(request).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput, "{:?}", request);
    }

    assert_eq!(h.quantity(&tent.id).await, 10);
}

#[tokio::test]
async fn test_unknown_fields_are_rejected() {
    let body = r#"{
        "customer_id": "c-1",
        "deadline_date": "2024-01-10",
        "items": [{"stock_id": "s-1", "qty": 1}],
        "processed_by": "desk-1",
        "discount": 100
    }"#;
    assert!(CreateRentalRequest::from_json(body).is_err());

    let body = r#"{"rental_id": "r-1", "refund": true}"#;
    assert!(ReturnRentalRequest::from_json(body).is_err());

    let body = r#"{"rental_id": "r-1", "paid_on_return": 200, "note": "scuffed"}"#;
    let request = ReturnRentalRequest::from_json(body).unwrap();
    assert_eq!(request.paid_on_return, Some(200));
}

// =============================================================================
// Return
// =============================================================================

#[tokio::test]
async fn test_late_return_charges_per_calendar_day() {
    let h = setup().await;
    let tent = h.add_stock("Dome Tent", 5, 500).await;
    let rental = h.rent("2024-01-10", &[(tent.id.as_str(), 2)]).await;

    h.clock.set(Utc.with_ymd_and_hms(2024, 1, 13, 10, 30, 0).unwrap());
    let settlement = h
        .engine
        .return_rental(&return_request(&rental.id, None))
        .await
        .unwrap();

    assert_eq!(settlement.late_days, 3);
    assert_eq!(settlement.total_fees, 3000);
    assert_eq!(settlement.paid_amount, 0);
    assert_eq!(settlement.balance_due, 3000);

    let history = h.engine.get_history(&rental.id).await.unwrap().unwrap();
    assert_eq!(history.late_days, 3);
    assert_eq!(history.total_fees, 3000);
    assert_eq!(history.items[0].fee, 3000);
    assert_eq!(history.items[0].name, "Dome Tent");
    assert_eq!(history.deadline_date.to_string(), "2024-01-10");
}

#[tokio::test]
async fn test_on_time_return_is_free() {
    let h = setup().await;
    let tent = h.add_stock("Dome Tent", 5, 500).await;
    let rental = h.rent("2024-01-10", &[(tent.id.as_str(), 2)]).await;

    // Late in the evening of the deadline still counts as that day.
    h.clock.set(Utc.with_ymd_and_hms(2024, 1, 10, 23, 59, 0).unwrap());
    let settlement = h
        .engine
        .return_rental(&return_request(&rental.id, Some(0)))
        .await
        .unwrap();

    assert_eq!(settlement.late_days, 0);
    assert_eq!(settlement.total_fees, 0);
    assert_eq!(settlement.balance_due, 0);
}

#[tokio::test]
async fn test_payments_accumulate_and_balance_never_negative() {
    let h = setup().await;
    let tent = h.add_stock("Dome Tent", 5, 500).await;

    let mut request = h.rent_request("2024-01-10", &[(tent.id.as_str(), 2)]);
    request.paid_amount = 1000;
    let first = h.engine.create_rental(&request).await.unwrap();
    let second = h.engine.create_rental(&request).await.unwrap();

    h.clock.set(Utc.with_ymd_and_hms(2024, 1, 13, 12, 0, 0).unwrap());

    let settlement = h
        .engine
        .return_rental(&return_request(&first.id, Some(500)))
        .await
        .unwrap();
    assert_eq!(settlement.paid_amount, 1500);
    assert_eq!(settlement.balance_due, 1500);

    let settlement = h
        .engine
        .return_rental(&return_request(&second.id, Some(5000)))
        .await
        .unwrap();
    assert_eq!(settlement.paid_amount, 6000);
    assert_eq!(settlement.balance_due, 0);

    let rental = h.engine.get_rental(&first.id).await.unwrap();
    assert_eq!(rental.status, RentalStatus::Returned);
    assert_eq!(rental.paid_amount, 1500);
    assert_eq!(rental.returned_on, Some(h.clock.now()));
}

#[tokio::test]
async fn test_returning_restores_exactly_what_was_reserved() {
    let h = setup().await;
    let tent = h.add_stock("Dome Tent", 10, 500).await;

    let first = h.rent("2024-01-10", &[(tent.id.as_str(), 3)]).await;
    let second = h.rent("2024-01-12", &[(tent.id.as_str(), 4)]).await;
    assert_eq!(h.quantity(&tent.id).await, 3);

    h.engine
        .return_rental(&return_request(&first.id, None))
        .await
        .unwrap();
    assert_eq!(h.quantity(&tent.id).await, 6);

    h.engine
        .return_rental(&return_request(&second.id, None))
        .await
        .unwrap();
    assert_eq!(h.quantity(&tent.id).await, 10);
}

#[tokio::test]
async fn test_second_return_is_rejected_without_side_effects() {
    let h = setup().await;
    let tent = h.add_stock("Dome Tent", 10, 500).await;
    let rental = h.rent("2024-01-10", &[(tent.id.as_str(), 3)]).await;

    h.engine
        .return_rental(&return_request(&rental.id, None))
        .await
        .unwrap();
    let history = h.engine.get_history(&rental.id).await.unwrap().unwrap();

    h.clock.advance(Duration::days(5));
    let err = h
        .engine
        .return_rental(&return_request(&rental.id, Some(100)))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::AlreadyReturned);
    assert_eq!(h.quantity(&tent.id).await, 10);
    assert_eq!(
        h.engine.db().rentals().history_count(&rental.id).await.unwrap(),
        1
    );
    assert_eq!(h.engine.get_history(&rental.id).await.unwrap(), Some(history));
    assert_eq!(h.engine.get_rental(&rental.id).await.unwrap().paid_amount, 0);
}

#[tokio::test]
async fn test_unknown_rental_and_bad_payment_are_rejected() {
    let h = setup().await;
    let tent = h.add_stock("Dome Tent", 10, 500).await;
    let rental = h.rent("2024-01-10", &[(tent.id.as_str(), 1)]).await;

    let err = h
        .engine
        .return_rental(&return_request("no-such-rental", None))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = h
        .engine
        .return_rental(&return_request(&rental.id, Some(-5)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    assert!(h.engine.get_rental(&rental.id).await.unwrap().is_open());
    assert_eq!(h.quantity(&tent.id).await, 9);
}

// =============================================================================
// Snapshots
// =============================================================================

#[tokio::test]
async fn test_fee_change_after_create_does_not_apply() {
    let h = setup().await;
    let tent = h.add_stock("Dome Tent", 10, 500).await;
    let rental = h.rent("2024-01-10", &[(tent.id.as_str(), 2)]).await;

    h.engine.catalog().set_late_fee(tent.id.as_str(), 900).await.unwrap();

    let stored = h.engine.get_rental(&rental.id).await.unwrap();
    assert_eq!(stored.items[0].daily_late_fee_snapshot, 500);

    h.clock.set(Utc.with_ymd_and_hms(2024, 1, 12, 8, 0, 0).unwrap());
    let settlement = h
        .engine
        .return_rental(&return_request(&rental.id, None))
        .await
        .unwrap();
    assert_eq!(settlement.late_days, 2);
    assert_eq!(settlement.total_fees, 2 * 2 * 500);

    // New rentals pick up the new rate.
    let next = h.rent("2024-01-20", &[(tent.id.as_str(), 1)]).await;
    assert_eq!(next.items[0].daily_late_fee_snapshot, 900);
}

#[tokio::test]
async fn test_history_keeps_customer_as_returned() {
    let h = setup().await;
    let tent = h.add_stock("Dome Tent", 10, 500).await;
    let rental = h.rent("2024-01-10", &[(tent.id.as_str(), 1)]).await;

    h.engine
        .return_rental(&ReturnRentalRequest {
            rental_id: rental.id.clone(),
            paid_on_return: None,
            note: Some("  pole bent  ".to_string()),
        })
        .await
        .unwrap();

    let mut renamed = h.customer.clone();
    renamed.name = "Augusta Ada King".to_string();
    h.engine.db().customers().update(&renamed).await.unwrap();

    let history = h.engine.get_history(&rental.id).await.unwrap().unwrap();
    assert_eq!(history.customer.name, "Ada Lovelace");
    assert_eq!(history.customer.phone, "+44555010101");
    assert_eq!(history.customer.national_id.as_deref(), Some("AL-1815"));
    assert_eq!(history.processed_by, "desk-1");
    assert_eq!(history.note.as_deref(), Some("pole bent"));
    assert_eq!(history.rented_on, rental.rented_on);
}

#[tokio::test]
async fn test_stock_writes_are_stamped_with_the_engine_clock() {
    let h = setup().await;
    let tent = h.add_stock("Dome Tent", 10, 500).await;

    let rental = h.rent("2024-01-10", &[(tent.id.as_str(), 2)]).await;
    assert_eq!(stock_updated_at(&h, &tent.id).await, common::start_time());

    h.clock.set(Utc.with_ymd_and_hms(2024, 1, 9, 17, 30, 0).unwrap());
    h.engine
        .return_rental(&return_request(&rental.id, None))
        .await
        .unwrap();
    assert_eq!(stock_updated_at(&h, &tent.id).await, h.clock.now());

    h.clock.advance(Duration::days(2));
    h.engine.catalog().set_late_fee(&tent.id, 650).await.unwrap();
    assert_eq!(stock_updated_at(&h, &tent.id).await, h.clock.now());

    h.clock.advance(Duration::hours(3));
    let adjusted = h.engine.catalog().adjust_stock(&tent.id, 5).await.unwrap();
    assert_eq!(adjusted.updated_at, h.clock.now());
}

async fn stock_updated_at(h: &common::Harness, stock_id: &str) -> DateTime<Utc> {
    h.engine.catalog().stock_item(stock_id).await.unwrap().updated_at
}
