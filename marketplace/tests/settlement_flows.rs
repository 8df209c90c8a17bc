//! Marketplace operations end to end against the in-process ledger.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use ticketchain_core::environment::Clock;
use ticketchain_core::mirror::{EntityType, FactState};
use ticketchain_core::model::{ListingStatus, TicketStatus};
use ticketchain_core::settlement::MinterScope;
use ticketchain_core::{
    Address, Bps, ErrorKind, EventId, ListingId, MarketError, SeatId, TicketId, Wei,
};
use ticketchain_ledger::{InMemoryLedger, LedgerError};
use ticketchain_marketplace::{Marketplace, MarketplaceError};
use ticketchain_runtime::{RetryPolicy, TransactionExecutor};
use ticketchain_testing::fixtures::{
    artist, buyer, buyer2, event_draft, genesis, marketplace as operator, organizer, owner,
    platform,
};
use ticketchain_testing::{FlakyLedger, RecordingMirror, test_clock};

struct Harness {
    marketplace: Arc<Marketplace>,
    ledger: Arc<InMemoryLedger>,
    mirror: RecordingMirror,
}

fn harness() -> Harness {
    let ledger = Arc::new(InMemoryLedger::with_clock(genesis(), Arc::new(test_clock())));
    let mirror = RecordingMirror::new();
    let executor = TransactionExecutor::new(ledger.clone(), RetryPolicy::default());
    Harness {
        marketplace: Arc::new(Marketplace::new(executor, Arc::new(mirror.clone()))),
        ledger,
        mirror,
    }
}

/// Event 1 with seat A1 minted to `buyer`, approved for the marketplace.
async fn minted(marketplace: &Marketplace) -> (EventId, TicketId) {
    let event_id = marketplace
        .create_event(organizer(), event_draft())
        .await
        .unwrap();
    let ticket_id = marketplace
        .mint_ticket(organizer(), event_id, buyer(), SeatId::from("A1"), None)
        .await
        .unwrap();
    marketplace
        .approve(buyer(), ticket_id, Some(operator()))
        .await
        .unwrap();
    (event_id, ticket_id)
}

/// As [`minted`], then listed at `price`.
async fn listed(marketplace: &Marketplace, price: Wei) -> (TicketId, ListingId) {
    let (_, ticket_id) = minted(marketplace).await;
    let listing_id = marketplace
        .create_listing(buyer(), ticket_id, price)
        .await
        .unwrap();
    (ticket_id, listing_id)
}

fn rejection(error: &MarketplaceError) -> &MarketError {
    error.rejection().unwrap()
}

#[tokio::test]
async fn test_resale_scenario_distributes_funds() {
    let h = harness();
    h.ledger.fund(buyer2(), Wei::new(110)).await;
    let (ticket_id, listing_id) = listed(&h.marketplace, Wei::new(110)).await;

    let settlement = h
        .marketplace
        .purchase_listing(buyer2(), listing_id, Wei::new(110))
        .await
        .unwrap();

    assert_eq!(settlement.royalty, Wei::new(5));
    assert_eq!(settlement.platform_cut, Wei::new(2));
    assert_eq!(settlement.seller_proceeds, Wei::new(103));
    assert_eq!(h.marketplace.balance(artist()).await.unwrap(), Wei::new(5));
    assert_eq!(h.marketplace.balance(platform()).await.unwrap(), Wei::new(2));
    assert_eq!(h.marketplace.balance(buyer()).await.unwrap(), Wei::new(103));
    assert_eq!(h.marketplace.balance(buyer2()).await.unwrap(), Wei::ZERO);

    let ticket = h.marketplace.ticket(ticket_id).await.unwrap().unwrap();
    assert_eq!(ticket.owner, buyer2());
    let listing = h.marketplace.listing(listing_id).await.unwrap().unwrap();
    assert_eq!(listing.status, ListingStatus::Sold);
    assert!(h.marketplace.active_listings().await.unwrap().is_empty());
    assert_eq!(
        h.marketplace.tickets_by_owner(buyer2()).await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn test_listing_price_cap_is_inclusive() {
    let h = harness();
    let (_, ticket_id) = minted(&h.marketplace).await;

    let error = h
        .marketplace
        .create_listing(buyer(), ticket_id, Wei::new(111))
        .await
        .unwrap_err();
    assert_eq!(
        rejection(&error),
        &MarketError::PriceExceedsCap {
            price: Wei::new(111),
            cap: Wei::new(110)
        }
    );

    let listing_id = h
        .marketplace
        .create_listing(buyer(), ticket_id, Wei::new(110))
        .await
        .unwrap();
    assert_eq!(h.marketplace.active_listings().await.unwrap(), vec![listing_id]);
}

#[tokio::test]
async fn test_cancelled_listing_cannot_be_purchased() {
    let h = harness();
    h.ledger.fund(buyer2(), Wei::new(500)).await;
    let (_, listing_id) = listed(&h.marketplace, Wei::new(100)).await;

    h.marketplace
        .cancel_listing(buyer(), listing_id)
        .await
        .unwrap();
    let error = h
        .marketplace
        .purchase_listing(buyer2(), listing_id, Wei::new(100))
        .await
        .unwrap_err();

    assert_eq!(
        rejection(&error),
        &MarketError::ListingNotActive { listing_id }
    );
    assert_eq!(error.kind(), ErrorKind::StateConflict);
    assert_eq!(h.marketplace.balance(buyer2()).await.unwrap(), Wei::new(500));
}

#[tokio::test]
async fn test_only_the_seller_may_cancel() {
    let h = harness();
    let (_, listing_id) = listed(&h.marketplace, Wei::new(100)).await;

    let error = h
        .marketplace
        .cancel_listing(buyer2(), listing_id)
        .await
        .unwrap_err();

    assert_eq!(rejection(&error), &MarketError::NotTheSeller { listing_id });
    assert_eq!(error.kind(), ErrorKind::Authorization);
}

#[tokio::test]
async fn test_double_purchase_only_first_succeeds() {
    let h = harness();
    h.ledger.fund(buyer2(), Wei::new(500)).await;
    let (_, listing_id) = listed(&h.marketplace, Wei::new(100)).await;

    h.marketplace
        .purchase_listing(buyer2(), listing_id, Wei::new(100))
        .await
        .unwrap();
    let error = h
        .marketplace
        .purchase_listing(buyer2(), listing_id, Wei::new(100))
        .await
        .unwrap_err();

    assert_eq!(
        rejection(&error),
        &MarketError::ListingNotActive { listing_id }
    );
    assert_eq!(h.marketplace.balance(buyer2()).await.unwrap(), Wei::new(400));
}

#[tokio::test]
async fn test_concurrent_purchases_have_one_winner() {
    let h = harness();
    let rival = Address::from_low_u64(8);
    h.ledger.fund(buyer2(), Wei::new(100)).await;
    h.ledger.fund(rival, Wei::new(100)).await;
    let (ticket_id, listing_id) = listed(&h.marketplace, Wei::new(100)).await;

    let first = Arc::clone(&h.marketplace);
    let second = Arc::clone(&h.marketplace);
    let (a, b) = tokio::join!(
        async move { first.purchase_listing(buyer2(), listing_id, Wei::new(100)).await },
        async move { second.purchase_listing(rival, listing_id, Wei::new(100)).await },
    );

    let (winner, loser) = match (a, b) {
        (Ok(_), Err(error)) => (buyer2(), error),
        (Err(error), Ok(_)) => (rival, error),
        other => unreachable!("exactly one purchase must win, got {other:?}"),
    };
    assert_eq!(
        rejection(&loser),
        &MarketError::ListingNotActive { listing_id }
    );
    let ticket = h.marketplace.ticket(ticket_id).await.unwrap().unwrap();
    assert_eq!(ticket.owner, winner);
}

#[tokio::test]
async fn test_concurrent_mints_of_one_seat_have_one_winner() {
    let h = harness();
    let event_id = h
        .marketplace
        .create_event(organizer(), event_draft())
        .await
        .unwrap();

    let (a, b) = tokio::join!(
        h.marketplace
            .mint_ticket(organizer(), event_id, buyer(), SeatId::from("B7"), None),
        h.marketplace
            .mint_ticket(organizer(), event_id, buyer2(), SeatId::from("B7"), None),
    );

    assert_eq!(usize::from(a.is_ok()) + usize::from(b.is_ok()), 1);
    let error = a.err().or(b.err()).unwrap();
    assert_eq!(
        rejection(&error),
        &MarketError::SeatAlreadyMinted {
            event_id,
            seat_id: SeatId::from("B7")
        }
    );
    assert!(
        h.marketplace
            .is_seat_minted(event_id, SeatId::from("B7"))
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn test_preflight_rejects_without_submitting() {
    let h = harness();
    let (_, ticket_id) = minted(&h.marketplace).await;
    let blocks = h.ledger.block_number().await;

    let error = h
        .marketplace
        .create_listing(buyer(), ticket_id, Wei::ZERO)
        .await
        .unwrap_err();

    assert_eq!(error, MarketplaceError::Preflight(MarketError::InvalidPrice));
    assert_eq!(error.code(), "INVALID_PRICE");
    assert_eq!(h.ledger.block_number().await, blocks);
}

#[tokio::test]
async fn test_minter_grants_and_pause() {
    let h = harness();
    let minter = Address::from_low_u64(9);
    let event_id = h
        .marketplace
        .create_event(organizer(), event_draft())
        .await
        .unwrap();

    let error = h
        .marketplace
        .mint_ticket(minter, event_id, buyer(), SeatId::from("C1"), None)
        .await
        .unwrap_err();
    assert_eq!(
        rejection(&error),
        &MarketError::NotAuthorizedMinter { event_id }
    );

    h.marketplace
        .set_minter(organizer(), MinterScope::Event(event_id), minter, true)
        .await
        .unwrap();
    assert!(h.marketplace.is_minter(event_id, minter).await.unwrap());

    h.marketplace.pause_event(organizer(), event_id).await.unwrap();
    let error = h
        .marketplace
        .mint_ticket(minter, event_id, buyer(), SeatId::from("C1"), None)
        .await
        .unwrap_err();
    assert_eq!(rejection(&error), &MarketError::EventIsPaused { event_id });

    h.marketplace
        .unpause_event(organizer(), event_id)
        .await
        .unwrap();
    h.marketplace
        .mint_ticket(minter, event_id, buyer(), SeatId::from("C1"), None)
        .await
        .unwrap();
    let event = h.marketplace.event(event_id).await.unwrap().unwrap();
    assert_eq!(event.minted, 1);
}

#[tokio::test]
async fn test_transfer_and_finalisation() {
    let h = harness();
    let (_, ticket_id) = minted(&h.marketplace).await;

    h.marketplace
        .transfer_ticket(buyer(), ticket_id, buyer2())
        .await
        .unwrap();
    let ticket = h.marketplace.ticket(ticket_id).await.unwrap().unwrap();
    assert_eq!(ticket.owner, buyer2());

    // Approvals do not survive a transfer.
    let error = h
        .marketplace
        .create_listing(buyer2(), ticket_id, Wei::new(100))
        .await
        .unwrap_err();
    assert_eq!(
        rejection(&error),
        &MarketError::MarketplaceNotApproved { ticket_id }
    );

    h.marketplace.mark_used(organizer(), ticket_id).await.unwrap();
    let ticket = h.marketplace.ticket(ticket_id).await.unwrap().unwrap();
    assert_eq!(ticket.status, TicketStatus::Used);

    let error = h
        .marketplace
        .transfer_ticket(buyer2(), ticket_id, buyer())
        .await
        .unwrap_err();
    assert_eq!(rejection(&error), &MarketError::TicketNotActive { ticket_id });
}

#[tokio::test]
async fn test_platform_administration() {
    let h = harness();

    let error = h
        .marketplace
        .set_platform_fee(owner(), Bps::new(501))
        .await
        .unwrap_err();
    assert!(matches!(
        error,
        MarketplaceError::Preflight(MarketError::FeeTooHigh { .. })
    ));

    let error = h
        .marketplace
        .set_platform_fee(buyer(), Bps::new(100))
        .await
        .unwrap_err();
    assert_eq!(rejection(&error), &MarketError::NotOwner);

    h.marketplace
        .set_platform_fee(owner(), Bps::new(100))
        .await
        .unwrap();
    h.marketplace
        .set_marketplace_paused(owner(), true)
        .await
        .unwrap();
    let status = h.marketplace.platform_status().await.unwrap();
    assert_eq!(status.platform.fee_bps, Bps::new(100));
    assert!(status.marketplace_paused);

    let (_, ticket_id) = minted(&h.marketplace).await;
    let error = h
        .marketplace
        .create_listing(buyer(), ticket_id, Wei::new(100))
        .await
        .unwrap_err();
    assert_eq!(rejection(&error), &MarketError::MarketplacePaused);
}

#[tokio::test]
async fn test_confirmed_transitions_reach_the_mirror() {
    let h = harness();
    h.ledger.fund(buyer2(), Wei::new(110)).await;
    let (_, listing_id) = listed(&h.marketplace, Wei::new(110)).await;
    h.marketplace
        .purchase_listing(buyer2(), listing_id, Wei::new(110))
        .await
        .unwrap();

    let facts: Vec<_> = h
        .mirror
        .facts()
        .into_iter()
        .map(|fact| (fact.entity_type, fact.entity_id, fact.new_state))
        .collect();
    assert_eq!(
        facts,
        vec![
            (EntityType::Event, 1, FactState::Created),
            (EntityType::Ticket, 1, FactState::Minted),
            (EntityType::Listing, 1, FactState::Active),
            (EntityType::Ticket, 1, FactState::Transferred),
            (EntityType::Listing, 1, FactState::Sold),
        ]
    );
    assert!(
        h.mirror
            .facts()
            .iter()
            .all(|fact| fact.timestamp == test_clock().now())
    );
}

#[tokio::test]
async fn test_mirror_failure_does_not_fail_the_operation() {
    let h = harness();
    h.mirror.set_unavailable(true);

    let event_id = h
        .marketplace
        .create_event(organizer(), event_draft())
        .await
        .unwrap();

    assert!(h.marketplace.event(event_id).await.unwrap().is_some());
    assert!(h.mirror.facts().is_empty());
}

#[tokio::test]
async fn test_rejections_publish_nothing() {
    let h = harness();
    let _ = h
        .marketplace
        .pause_event(organizer(), EventId::new(42))
        .await
        .unwrap_err();
    assert!(h.mirror.facts().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_purchase_with_lost_response_settles_once() {
    let inner = InMemoryLedger::with_clock(genesis(), Arc::new(test_clock()));
    inner.fund(buyer2(), Wei::new(110)).await;
    let ledger = Arc::new(FlakyLedger::new(inner));
    let marketplace = Marketplace::new(
        TransactionExecutor::new(ledger.clone(), RetryPolicy::default()),
        Arc::new(RecordingMirror::new()),
    );
    let (_, listing_id) = listed(&marketplace, Wei::new(110)).await;
    let blocks = ledger.inner().block_number().await;

    ledger.lose_next_response(LedgerError::Network("connection reset".into()));
    let settlement = marketplace
        .purchase_listing(buyer2(), listing_id, Wei::new(110))
        .await
        .unwrap();

    assert_eq!(settlement.seller_proceeds, Wei::new(103));
    assert_eq!(marketplace.balance(buyer()).await.unwrap(), Wei::new(103));
    assert_eq!(marketplace.balance(buyer2()).await.unwrap(), Wei::ZERO);
    assert_eq!(ledger.inner().block_number().await, blocks + 1);
}
