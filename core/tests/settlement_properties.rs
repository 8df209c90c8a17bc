//! Property tests for settlement arithmetic and state transitions.

#![allow(clippy::unwrap_used)]

use proptest::prelude::*;
use ticketchain_core::environment::Clock;
use ticketchain_core::model::{EventDraft, ListingStatus, PlatformConfig};
use ticketchain_core::reducer::Reducer;
use ticketchain_core::settlement::{
    Applied, CallContext, CallOutput, Genesis, LedgerCall, SettlementReducer, SettlementState,
    split_price,
};
use ticketchain_core::{Bps, EventId, Fingerprint, ListingId, MarketError, SeatId, TicketId, Wei};
use ticketchain_testing::fixtures::{artist, buyer, buyer2, marketplace, organizer, owner, platform};
use ticketchain_testing::mocks::test_clock;
use ticketchain_testing::properties::{amount, fee_bps, markup_bps, royalty_bps};

fn apply(
    state: &mut SettlementState,
    caller: ticketchain_core::Address,
    call: LedgerCall,
) -> Result<Applied, MarketError> {
    let ctx = CallContext {
        caller,
        at: test_clock().now(),
    };
    SettlementReducer.reduce(state, call, &ctx)
}

/// Deploys, creates one event and lists its first ticket (held by `buyer`) at `price`.
fn listed(royalty: Bps, markup: Bps, fee: Bps, issue_price: Wei, price: Wei) -> SettlementState {
    let mut state = SettlementState::genesis(Genesis {
        owner: owner(),
        marketplace: marketplace(),
        platform: PlatformConfig {
            fee_bps: fee,
            address: platform(),
        },
    });
    let draft = EventDraft {
        fingerprint: Fingerprint::from_bytes([7; 32]),
        max_supply: 100,
        royalty_bps: royalty,
        max_resale_markup_bps: markup,
        artist: artist(),
        issue_price,
    };
    apply(&mut state, organizer(), LedgerCall::CreateEvent(draft)).unwrap();
    apply(
        &mut state,
        organizer(),
        LedgerCall::MintTicket {
            event_id: EventId::new(1),
            to: buyer(),
            seat_id: SeatId::from("A1"),
            metadata: None,
        },
    )
    .unwrap();
    apply(
        &mut state,
        buyer(),
        LedgerCall::Approve {
            ticket_id: TicketId::new(1),
            operator: Some(marketplace()),
        },
    )
    .unwrap();
    apply(
        &mut state,
        buyer(),
        LedgerCall::CreateListing {
            ticket_id: TicketId::new(1),
            price,
        },
    )
    .unwrap();
    state
}

/// Issue price, and a listing price at or below its resale cap.
fn priced_listing() -> impl Strategy<Value = (Bps, Wei, Wei)> {
    (markup_bps(), 1u128..1_000_000_000_000_000_000_000_000).prop_flat_map(|(markup, issue)| {
        let cap = issue + markup.share_of(Wei::new(issue)).get();
        (Just(markup), Just(Wei::new(issue)), (1..=cap).prop_map(Wei::new))
    })
}

proptest! {
    #[test]
    fn prop_split_is_exhaustive(price in amount(), royalty in royalty_bps(), fee in fee_bps()) {
        let (royalty_share, platform_cut, proceeds) = split_price(price, royalty, fee);

        prop_assert_eq!(
            royalty_share.get() + platform_cut.get() + proceeds.get(),
            price.get()
        );
        prop_assert_eq!(royalty_share, royalty.share_of(price));
        prop_assert_eq!(platform_cut, fee.share_of(price));
        prop_assert!(proceeds >= Wei::ZERO);
    }

    #[test]
    fn prop_purchase_conserves_funds(
        (markup, issue_price, price) in priced_listing(),
        royalty in royalty_bps(),
        fee in fee_bps(),
        overpay in 0u128..1_000_000,
    ) {
        let mut state = listed(royalty, markup, fee, issue_price, price);
        let payment = Wei::new(price.get() + overpay);
        state.fund(buyer2(), payment);
        let total_before = state.total_balance();

        let applied = apply(
            &mut state,
            buyer2(),
            LedgerCall::PurchaseListing { listing_id: ListingId::new(1), payment },
        )
        .unwrap();

        let CallOutput::Purchased(settlement) = applied.output else {
            return Err(TestCaseError::fail("purchase produced no settlement"));
        };
        prop_assert_eq!(state.total_balance(), total_before);
        prop_assert_eq!(settlement.disbursed(), price);
        prop_assert_eq!(settlement.disbursed().saturating_add(settlement.refund), payment);
        prop_assert_eq!(state.balance(artist()), settlement.royalty);
        prop_assert_eq!(state.balance(platform()), settlement.platform_cut);
        prop_assert_eq!(state.balance(buyer()), settlement.seller_proceeds);
        prop_assert_eq!(state.balance(buyer2()), Wei::new(overpay));
        prop_assert_eq!(state.ticket(TicketId::new(1)).unwrap().owner, buyer2());
        prop_assert_eq!(state.approval(TicketId::new(1)), None);
    }

    #[test]
    fn prop_listing_above_cap_is_rejected(
        markup in markup_bps(),
        issue in 1u128..1_000_000_000_000,
        excess in 1u128..1_000_000,
    ) {
        let issue_price = Wei::new(issue);
        let mut state = listed(Bps::new(0), markup, Bps::new(0), issue_price, issue_price);
        apply(&mut state, buyer(), LedgerCall::CancelListing { listing_id: ListingId::new(1) })
            .unwrap();

        let cap = issue_price.saturating_add(markup.share_of(issue_price));
        let price = Wei::new(cap.get() + excess);
        let result = apply(
            &mut state,
            buyer(),
            LedgerCall::CreateListing { ticket_id: TicketId::new(1), price },
        );

        prop_assert_eq!(result, Err(MarketError::PriceExceedsCap { price, cap }));
        prop_assert_eq!(state.active_listing_for(TicketId::new(1)), None);
    }

    #[test]
    fn prop_underpayment_leaves_state_untouched(
        (markup, issue_price, price) in priced_listing(),
        shortfall in 1u128..1_000,
    ) {
        prop_assume!(price.get() > shortfall);
        let mut state = listed(Bps::new(500), markup, Bps::new(250), issue_price, price);
        state.fund(buyer2(), price);
        let payment = Wei::new(price.get() - shortfall);

        let result = apply(
            &mut state,
            buyer2(),
            LedgerCall::PurchaseListing { listing_id: ListingId::new(1), payment },
        );

        prop_assert_eq!(result, Err(MarketError::InsufficientPayment { price, payment }));
        prop_assert_eq!(state.balance(buyer2()), price);
        prop_assert_eq!(state.balance(buyer()), Wei::ZERO);
        prop_assert_eq!(
            state.listing(ListingId::new(1)).unwrap().status,
            ListingStatus::Active
        );
        prop_assert_eq!(state.ticket(TicketId::new(1)).unwrap().owner, buyer());
    }

    #[test]
    fn prop_each_seat_mints_once(seats in prop::collection::vec("[A-D][1-9]", 1..20)) {
        let mut state = listed(Bps::new(0), Bps::new(0), Bps::new(0), Wei::new(1), Wei::new(1));
        let event_id = EventId::new(1);
        let mut minted = std::collections::HashSet::from([SeatId::from("A1")]);

        for seat in seats {
            let seat_id = SeatId::new(seat);
            let result = apply(
                &mut state,
                organizer(),
                LedgerCall::MintTicket {
                    event_id,
                    to: buyer2(),
                    seat_id: seat_id.clone(),
                    metadata: None,
                },
            );
            if minted.insert(seat_id.clone()) {
                prop_assert!(result.is_ok());
            } else {
                prop_assert_eq!(result, Err(MarketError::SeatAlreadyMinted { event_id, seat_id }));
            }
        }
        prop_assert_eq!(
            state.event(event_id).unwrap().minted,
            u64::try_from(minted.len()).unwrap()
        );
    }
}
