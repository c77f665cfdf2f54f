//! End-to-end walk through the booking lifecycle on the in-memory store.

#![allow(clippy::panic)]

mod common;

use common::{Harness, range};
use market_booking::clock::Clock;
use market_booking::domain::{
    BookingKind, BookingPeriod, BookingStatus, LockStatus, NotificationKind, PaymentStatus,
    SlotCapability, SlotId, UserId, UserProfile,
};
use market_booking::error::BookingError;
use market_booking::service::PeriodRequest;
use market_booking::store::DocumentStore;

#[tokio::test]
async fn hold_confirm_approve_and_pay() {
    let h = Harness::new();
    let market = h.market(&[("S1", SlotCapability::Both)]).await;
    let alice = UserId::from("alice");
    let bob = UserId::from("bob");
    let s1 = SlotId::from("S1");
    h.profile(&alice, "Alice Tan").await;

    let Ok(hold) = h
        .service
        .hold_slot(&alice, market.id, s1.clone(), range("2024-05-01", "2024-05-05"))
        .await
    else {
        panic!("alice holds S1");
    };
    assert_eq!(hold.expires_at - h.clock.now(), chrono::Duration::minutes(10));

    let blocked = h
        .service
        .hold_slot(&bob, market.id, s1.clone(), range("2024-05-03", "2024-05-04"))
        .await;
    assert!(matches!(blocked, Err(BookingError::Conflict(_))));

    let Ok(booking) = h
        .service
        .confirm_booking(&alice, &hold.lock_id, BookingKind::Daily, None)
        .await
    else {
        panic!("alice confirms within the window");
    };
    assert_eq!(booking.status, BookingStatus::Pending);
    assert_eq!(booking.payment_status, PaymentStatus::None);
    assert_eq!(booking.contact.name, "Alice Tan");
    assert_eq!(booking.price.daily, Some(150));

    let Ok(mut tx) = h.store.begin().await else {
        panic!("begin");
    };
    let Ok(Some(lock)) = tx.lock(&hold.lock_id).await else {
        panic!("lock still recorded");
    };
    assert_eq!(lock.status, LockStatus::Consumed);
    drop(tx);

    let Ok(owner_inbox) = h.service.notifications(&h.owner).await else {
        panic!("owner inbox");
    };
    assert!(owner_inbox.iter().any(|n| n.kind == NotificationKind::BookingCreated));
    let Ok(alice_inbox) = h.service.notifications(&alice).await else {
        panic!("alice inbox");
    };
    assert!(alice_inbox.iter().any(|n| n.kind == NotificationKind::BookingSubmitted));

    let Ok(approved) = h
        .service
        .update_booking_status(&h.owner, booking.id, BookingStatus::Approved)
        .await
    else {
        panic!("owner approves");
    };
    assert_eq!(approved.status, BookingStatus::Approved);
    assert_eq!(approved.payment_status, PaymentStatus::Waiting);

    let Ok(with_slip) = h
        .service
        .upload_payment_evidence(&alice, booking.id, "receipts/slip.png", vec![0x89, 0x50, 0x4e])
        .await
    else {
        panic!("alice uploads a slip");
    };
    assert_eq!(with_slip.payment_status, PaymentStatus::Waiting);
    let Some(evidence) = with_slip.payment_evidence.as_ref() else {
        panic!("evidence attached");
    };
    assert!(evidence.storage_path.ends_with("_slip.png"));
    assert!(h.blobs.get(&evidence.storage_path).await.is_some());

    let Ok(paid) = h
        .service
        .update_payment_status(&h.owner, booking.id, PaymentStatus::Paid)
        .await
    else {
        panic!("owner records payment");
    };
    assert_eq!(paid.status, BookingStatus::Approved);
    assert_eq!(paid.payment_status, PaymentStatus::Paid);

    let Ok(alice_inbox) = h.service.notifications(&alice).await else {
        panic!("alice inbox");
    };
    let status_changes = alice_inbox
        .iter()
        .filter(|n| n.kind == NotificationKind::BookingStatusChanged)
        .count();
    assert_eq!(status_changes, 3);
    let Ok(owner_inbox) = h.service.notifications(&h.owner).await else {
        panic!("owner inbox");
    };
    assert!(owner_inbox.iter().any(|n| n.kind == NotificationKind::PaymentSlipUploaded));
}

#[tokio::test]
async fn paid_payment_forces_pending_booking_to_approved() {
    let h = Harness::new();
    let market = h.market(&[("S1", SlotCapability::Daily)]).await;
    let alice = UserId::from("alice");
    let period = PeriodRequest::Daily {
        from: Some("2024-07-10".to_string()),
        to: Some("2024-07-12".to_string()),
    };
    let Ok(booking) = h
        .service
        .create_booking_direct(&alice, market.id, SlotId::from("S1"), &period)
        .await
    else {
        panic!("direct booking");
    };
    assert_eq!(booking.status, BookingStatus::Pending);

    let Ok(paid) = h
        .service
        .update_payment_status(&h.owner, booking.id, PaymentStatus::Paid)
        .await
    else {
        panic!("payment recorded on pending booking");
    };
    assert_eq!(paid.status, BookingStatus::Approved);
    assert_eq!(paid.payment_status, PaymentStatus::Paid);
}

#[tokio::test]
async fn rejected_payment_rejects_booking_and_frees_the_slot() {
    let h = Harness::new();
    let market = h.market(&[("S1", SlotCapability::Both)]).await;
    let alice = UserId::from("alice");
    let s1 = SlotId::from("S1");
    let period = PeriodRequest::Daily {
        from: Some("2024-08-01".to_string()),
        to: Some("2024-08-03".to_string()),
    };
    let Ok(booking) = h
        .service
        .create_booking_direct(&alice, market.id, s1.clone(), &period)
        .await
    else {
        panic!("direct booking");
    };
    let Ok(_) = h
        .service
        .update_booking_status(&h.owner, booking.id, BookingStatus::Approved)
        .await
    else {
        panic!("approve");
    };
    let Ok(rejected) = h
        .service
        .update_payment_status(&h.owner, booking.id, PaymentStatus::Rejected)
        .await
    else {
        panic!("reject payment");
    };
    assert_eq!(rejected.status, BookingStatus::Rejected);

    let again = h
        .service
        .update_booking_status(&h.owner, booking.id, BookingStatus::Approved)
        .await;
    assert!(matches!(again, Err(BookingError::InvalidTransition { .. })));

    let taken = h
        .service
        .has_conflict(market.id, &s1, &range("2024-08-02", "2024-08-02"))
        .await;
    assert_eq!(taken.ok(), Some(false));
}

#[tokio::test]
async fn monthly_booking_spans_whole_months() {
    let h = Harness::new();
    let market = h.market(&[("M1", SlotCapability::Monthly)]).await;
    let alice = UserId::from("alice");
    let m1 = SlotId::from("M1");
    let period = PeriodRequest::Monthly {
        start_month: Some("2024-03".to_string()),
        months: Some(2),
    };
    let Ok(booking) = h
        .service
        .create_booking_direct(&alice, market.id, m1.clone(), &period)
        .await
    else {
        panic!("monthly booking");
    };
    let expected = range("2024-03-01", "2024-04-30");
    assert_eq!(booking.range(), expected);
    assert!(matches!(booking.period, BookingPeriod::Monthly { months: 2, .. }));
    assert_eq!(booking.price.monthly, Some(3000));

    let last_day = h
        .service
        .has_conflict(market.id, &m1, &range("2024-04-30", "2024-05-02"))
        .await;
    assert_eq!(last_day.ok(), Some(true));
    let after = h
        .service
        .has_conflict(market.id, &m1, &range("2024-05-01", "2024-05-31"))
        .await;
    assert_eq!(after.ok(), Some(false));

    let daily = PeriodRequest::Daily {
        from: Some("2024-06-01".to_string()),
        to: Some("2024-06-02".to_string()),
    };
    let unsupported = h
        .service
        .create_booking_direct(&alice, market.id, m1, &daily)
        .await;
    assert!(matches!(unsupported, Err(BookingError::InvalidArgument(_))));
}

#[tokio::test]
async fn requester_cancels_and_both_parties_are_told() {
    let h = Harness::new();
    let market = h.market(&[("S1", SlotCapability::Both)]).await;
    let alice = UserId::from("alice");
    let Ok(hold) = h
        .service
        .hold_slot(&alice, market.id, SlotId::from("S1"), range("2024-09-01", "2024-09-01"))
        .await
    else {
        panic!("hold");
    };
    let Ok(booking) = h
        .service
        .confirm_booking(&alice, &hold.lock_id, BookingKind::Daily, None)
        .await
    else {
        panic!("confirm");
    };

    let stranger = h.service.cancel_booking(&UserId::from("eve"), booking.id).await;
    assert!(matches!(stranger, Err(BookingError::PermissionDenied(_))));

    let Ok(cancelled) = h.service.cancel_booking(&alice, booking.id).await else {
        panic!("requester cancels");
    };
    assert_eq!(cancelled.status, BookingStatus::Cancelled);
    assert!(!cancelled.is_active());

    let Ok(owner_inbox) = h.service.notifications(&h.owner).await else {
        panic!("owner inbox");
    };
    assert!(owner_inbox.iter().any(|n| {
        n.kind == NotificationKind::BookingStatusChanged
            && n.data.get("status").and_then(|s| s.as_str()) == Some("cancelled")
    }));

    let Ok(alice_inbox) = h.service.notifications(&alice).await else {
        panic!("alice inbox");
    };
    assert!(alice_inbox.iter().any(|n| {
        n.kind == NotificationKind::BookingStatusChanged
            && n.data.get("status").and_then(|s| s.as_str()) == Some("cancelled")
    }));
}

#[tokio::test]
async fn booking_keeps_contact_and_price_after_profile_and_layout_edits() {
    let h = Harness::new();
    let market = h.market(&[("S1", SlotCapability::Both)]).await;
    let alice = UserId::from("alice");
    h.profile(&alice, "Alice Tan").await;

    let Ok(hold) = h
        .service
        .hold_slot(&alice, market.id, SlotId::from("S1"), range("2024-05-01", "2024-05-05"))
        .await
    else {
        panic!("alice holds S1");
    };
    let Ok(booking) = h
        .service
        .confirm_booking(&alice, &hold.lock_id, BookingKind::Daily, None)
        .await
    else {
        panic!("alice confirms");
    };

    let moved = UserProfile {
        name: "Alice Lim".to_string(),
        phone: "555-0199".to_string(),
        address: "7 Harbour Road".to_string(),
    };
    let Ok(_) = h.service.save_profile(&alice, moved).await else {
        panic!("profile updated");
    };
    let mut layout = market.layout.clone();
    for slot in &mut layout {
        slot.price_daily = Some(999);
        slot.price_monthly = Some(9999);
    }
    let Ok(_) = h.service.replace_layout(&h.owner, market.id, layout).await else {
        panic!("layout repriced");
    };

    let Ok(stored) = h.service.booking(&alice, booking.id).await else {
        panic!("booking readable by its requester");
    };
    assert_eq!(stored.contact.name, "Alice Tan");
    assert_eq!(stored.contact.phone, "555-0100");
    assert_eq!(stored.contact.address, "1 Quay Street");
    assert_eq!(stored.price.daily, Some(150));
    assert_eq!(stored.price.monthly, Some(3000));
}
