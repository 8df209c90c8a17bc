//! The settlement reducer: evaluates one call against ledger state.
//!
//! Each handler runs every check against an immutable view first and only then
//! mutates, so a rejected call leaves the state exactly as it found it.

use crate::error::MarketError;
use crate::model::{
    Event, EventDraft, Listing, ListingStatus, PlatformConfig, Settlement, Ticket, TicketStatus,
};
use crate::reducer::Reducer;
use crate::settlement::call::{CallOutput, LedgerCall, LedgerLog, MinterScope, PaymentReason};
use crate::settlement::rules;
use crate::settlement::state::SettlementState;
use crate::types::{Address, Bps, EventId, ListingId, SeatId, TicketId, Wei};
use chrono::{DateTime, Utc};
use smallvec::{SmallVec, smallvec};

/// Logs emitted by one call.
pub type Logs = SmallVec<[LedgerLog; 4]>;

/// Who is calling, and when the ledger evaluates the call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallContext {
    /// Signing account
    pub caller: Address,
    /// Ledger time of evaluation
    pub at: DateTime<Utc>,
}

/// Result of a successful call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Applied {
    /// Return value
    pub output: CallOutput,
    /// Emitted logs, in order
    pub logs: Logs,
}

impl Applied {
    fn new(output: CallOutput, logs: Logs) -> Self {
        Self { output, logs }
    }

    fn empty(logs: Logs) -> Self {
        Self::new(CallOutput::Empty, logs)
    }
}

/// Reducer for [`LedgerCall`]s over [`SettlementState`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SettlementReducer;

impl Reducer for SettlementReducer {
    type State = SettlementState;
    type Action = LedgerCall;
    type Environment = CallContext;
    type Output = Applied;
    type Error = MarketError;

    fn reduce(
        &self,
        state: &mut SettlementState,
        action: LedgerCall,
        env: &CallContext,
    ) -> Result<Applied, MarketError> {
        rules::validate_call(&action)?;

        let caller = env.caller;
        match action {
            LedgerCall::CreateEvent(draft) => Ok(create_event(state, caller, draft, env.at)),
            LedgerCall::SetMinter {
                scope,
                minter,
                enabled,
            } => set_minter(state, caller, scope, minter, enabled),
            LedgerCall::MintTicket {
                event_id,
                to,
                seat_id,
                metadata,
            } => mint_ticket(state, caller, event_id, to, seat_id, metadata, env.at),
            LedgerCall::Approve {
                ticket_id,
                operator,
            } => approve(state, caller, ticket_id, operator),
            LedgerCall::TransferTicket { ticket_id, to } => {
                transfer_ticket(state, caller, ticket_id, to)
            }
            LedgerCall::CreateListing { ticket_id, price } => {
                create_listing(state, caller, ticket_id, price, env.at)
            }
            LedgerCall::PurchaseListing {
                listing_id,
                payment,
            } => purchase_listing(state, caller, listing_id, payment),
            LedgerCall::CancelListing { listing_id } => cancel_listing(state, caller, listing_id),
            LedgerCall::PauseEvent { event_id } => set_event_paused(state, caller, event_id, true),
            LedgerCall::UnpauseEvent { event_id } => {
                set_event_paused(state, caller, event_id, false)
            }
            LedgerCall::SetTransfersPaused { paused } => {
                require_owner(state, caller)?;
                state.transfers_paused = paused;
                Ok(Applied::empty(smallvec![LedgerLog::TransfersPauseChanged {
                    paused
                }]))
            }
            LedgerCall::SetMarketplacePaused { paused } => {
                require_owner(state, caller)?;
                state.marketplace_paused = paused;
                Ok(Applied::empty(smallvec![
                    LedgerLog::MarketplacePauseChanged { paused }
                ]))
            }
            LedgerCall::SetPlatformFee { fee_bps } => set_platform_fee(state, caller, fee_bps),
            LedgerCall::SetPlatformAddress { address } => {
                require_owner(state, caller)?;
                state.platform = PlatformConfig {
                    address,
                    ..state.platform
                };
                Ok(Applied::empty(smallvec![
                    LedgerLog::PlatformAddressUpdated { address }
                ]))
            }
            LedgerCall::MarkUsed { ticket_id } => {
                finalise_ticket(state, caller, ticket_id, TicketStatus::Used)
            }
            LedgerCall::RevokeTicket { ticket_id } => {
                finalise_ticket(state, caller, ticket_id, TicketStatus::Revoked)
            }
        }
    }
}

fn require_owner(state: &SettlementState, caller: Address) -> Result<(), MarketError> {
    if rules::is_owner(state, caller) {
        Ok(())
    } else {
        Err(MarketError::NotOwner)
    }
}

fn require_event(state: &SettlementState, event_id: EventId) -> Result<&Event, MarketError> {
    state
        .event(event_id)
        .ok_or(MarketError::EventDoesNotExist { event_id })
}

fn require_ticket(state: &SettlementState, ticket_id: TicketId) -> Result<&Ticket, MarketError> {
    state
        .ticket(ticket_id)
        .ok_or(MarketError::TicketDoesNotExist { ticket_id })
}

fn require_unlisted(state: &SettlementState, ticket_id: TicketId) -> Result<(), MarketError> {
    match state.active_listing_for(ticket_id) {
        Some(_) => Err(MarketError::TicketListed { ticket_id }),
        None => Ok(()),
    }
}

fn create_event(
    state: &mut SettlementState,
    organizer: Address,
    draft: EventDraft,
    at: DateTime<Utc>,
) -> Applied {
    let event_id = EventId::new(state.next_event_id);
    state.next_event_id += 1;

    let log = LedgerLog::EventCreated {
        event_id,
        organizer,
        fingerprint: draft.fingerprint,
        max_supply: draft.max_supply,
        royalty_bps: draft.royalty_bps,
        max_resale_markup_bps: draft.max_resale_markup_bps,
        artist: draft.artist,
        issue_price: draft.issue_price,
    };

    state.events.insert(
        event_id,
        Event {
            id: event_id,
            organizer,
            fingerprint: draft.fingerprint,
            max_supply: draft.max_supply,
            royalty_bps: draft.royalty_bps,
            max_resale_markup_bps: draft.max_resale_markup_bps,
            artist: draft.artist,
            issue_price: draft.issue_price,
            minted: 0,
            paused: false,
            created_at: at,
        },
    );

    Applied::new(CallOutput::EventCreated(event_id), smallvec![log])
}

fn set_minter(
    state: &mut SettlementState,
    caller: Address,
    scope: MinterScope,
    minter: Address,
    enabled: bool,
) -> Result<Applied, MarketError> {
    rules::authorize_minter_admin(state, scope, caller)?;

    let key = (scope, minter);
    if state.minters.contains(&key) == enabled {
        return Ok(Applied::empty(SmallVec::new()));
    }
    if enabled {
        state.minters.insert(key);
    } else {
        state.minters.remove(&key);
    }

    Ok(Applied::empty(smallvec![LedgerLog::MinterUpdated {
        scope,
        minter,
        enabled
    }]))
}

fn mint_ticket(
    state: &mut SettlementState,
    caller: Address,
    event_id: EventId,
    to: Address,
    seat_id: SeatId,
    metadata: Option<String>,
    at: DateTime<Utc>,
) -> Result<Applied, MarketError> {
    let event = require_event(state, event_id)?;
    if !rules::can_mint(state, event, caller) {
        return Err(MarketError::NotAuthorizedMinter { event_id });
    }
    if event.paused {
        return Err(MarketError::EventIsPaused { event_id });
    }
    if state.is_seat_minted(event_id, &seat_id) {
        return Err(MarketError::SeatAlreadyMinted { event_id, seat_id });
    }
    if event.is_sold_out() {
        return Err(MarketError::MaxSupplyReached { event_id });
    }

    let ticket_id = TicketId::new(state.next_ticket_id);
    state.next_ticket_id += 1;
    state.seats.insert((event_id, seat_id.clone()));
    if let Some(event) = state.events.get_mut(&event_id) {
        event.minted += 1;
    }

    let log = LedgerLog::TicketMinted {
        ticket_id,
        event_id,
        seat_id: seat_id.clone(),
        owner: to,
    };
    state.tickets.insert(
        ticket_id,
        Ticket {
            id: ticket_id,
            event_id,
            seat_id,
            owner: to,
            metadata,
            status: TicketStatus::Owned,
            minted_at: at,
        },
    );

    Ok(Applied::new(CallOutput::TicketMinted(ticket_id), smallvec![log]))
}

fn approve(
    state: &mut SettlementState,
    caller: Address,
    ticket_id: TicketId,
    operator: Option<Address>,
) -> Result<Applied, MarketError> {
    let ticket = require_ticket(state, ticket_id)?;
    if ticket.owner != caller {
        return Err(MarketError::NotTokenOwner { ticket_id });
    }
    if !ticket.is_active() {
        return Err(MarketError::TicketNotActive { ticket_id });
    }
    // A listed ticket keeps its marketplace approval until the listing closes.
    if operator != Some(state.marketplace) {
        require_unlisted(state, ticket_id)?;
    }

    match operator {
        Some(operator) => state.approvals.insert(ticket_id, operator),
        None => state.approvals.remove(&ticket_id),
    };

    Ok(Applied::empty(smallvec![LedgerLog::Approval {
        ticket_id,
        owner: caller,
        operator
    }]))
}

/// Moves ownership and clears the approval. Callers have already validated.
fn move_ticket(state: &mut SettlementState, ticket_id: TicketId, to: Address) -> Option<LedgerLog> {
    let ticket = state.tickets.get_mut(&ticket_id)?;
    let from = ticket.owner;
    ticket.owner = to;
    let event_id = ticket.event_id;
    state.approvals.remove(&ticket_id);
    Some(LedgerLog::TicketTransferred {
        ticket_id,
        event_id,
        from,
        to,
    })
}

fn transfer_ticket(
    state: &mut SettlementState,
    caller: Address,
    ticket_id: TicketId,
    to: Address,
) -> Result<Applied, MarketError> {
    if state.transfers_paused {
        return Err(MarketError::TransfersPaused);
    }
    let ticket = require_ticket(state, ticket_id)?;
    if !ticket.is_active() {
        return Err(MarketError::TicketNotActive { ticket_id });
    }
    if ticket.owner != caller && state.approval(ticket_id) != Some(caller) {
        return Err(MarketError::NotApprovedForTransfer { ticket_id });
    }
    require_unlisted(state, ticket_id)?;

    let logs = move_ticket(state, ticket_id, to).into_iter().collect();
    Ok(Applied::empty(logs))
}

fn create_listing(
    state: &mut SettlementState,
    seller: Address,
    ticket_id: TicketId,
    price: Wei,
    at: DateTime<Utc>,
) -> Result<Applied, MarketError> {
    if state.marketplace_paused {
        return Err(MarketError::MarketplacePaused);
    }
    let ticket = require_ticket(state, ticket_id)?;
    if !ticket.is_active() {
        return Err(MarketError::TicketNotActive { ticket_id });
    }
    require_unlisted(state, ticket_id)?;
    if ticket.owner != seller {
        return Err(MarketError::NotTokenOwner { ticket_id });
    }
    if state.approval(ticket_id) != Some(state.marketplace) {
        return Err(MarketError::MarketplaceNotApproved { ticket_id });
    }
    let event_id = ticket.event_id;
    let cap = require_event(state, event_id)?.resale_cap();
    if price > cap {
        return Err(MarketError::PriceExceedsCap { price, cap });
    }

    let listing_id = ListingId::new(state.next_listing_id);
    state.next_listing_id += 1;
    state.listings.insert(
        listing_id,
        Listing {
            id: listing_id,
            ticket_id,
            event_id,
            seller,
            price,
            status: ListingStatus::Active,
            created_at: at,
        },
    );
    state.active_listing_by_ticket.insert(ticket_id, listing_id);

    Ok(Applied::new(
        CallOutput::ListingCreated(listing_id),
        smallvec![LedgerLog::ListingCreated {
            listing_id,
            ticket_id,
            event_id,
            seller,
            price
        }],
    ))
}

/// Splits `price` into royalty, platform cut and seller proceeds, flooring each cut.
#[must_use]
pub fn split_price(price: Wei, royalty_bps: Bps, fee_bps: Bps) -> (Wei, Wei, Wei) {
    let royalty = royalty_bps.share_of(price);
    let platform_cut = fee_bps.share_of(price);
    let seller_proceeds = price.saturating_sub(royalty).saturating_sub(platform_cut);
    (royalty, platform_cut, seller_proceeds)
}

fn purchase_listing(
    state: &mut SettlementState,
    buyer: Address,
    listing_id: ListingId,
    payment: Wei,
) -> Result<Applied, MarketError> {
    if state.marketplace_paused {
        return Err(MarketError::MarketplacePaused);
    }
    let listing = state
        .listing(listing_id)
        .filter(|listing| listing.is_active())
        .ok_or(MarketError::ListingNotActive { listing_id })?;
    if listing.seller == buyer {
        return Err(MarketError::CannotBuyOwnListing);
    }
    rules::require_payment(listing.price, payment)?;
    let balance = state.balance(buyer);
    if balance < payment {
        return Err(MarketError::InsufficientFunds {
            account: buyer,
            balance,
            required: payment,
        });
    }
    let event = require_event(state, listing.event_id)?;

    let (royalty, platform_cut, seller_proceeds) =
        split_price(listing.price, event.royalty_bps, state.platform.fee_bps);
    let settlement = Settlement {
        listing_id,
        ticket_id: listing.ticket_id,
        buyer,
        seller: listing.seller,
        price: listing.price,
        royalty,
        platform_cut,
        seller_proceeds,
        refund: payment.saturating_sub(listing.price),
        artist: event.artist,
        platform: state.platform.address,
    };
    let event_id = listing.event_id;

    // Escrow, transfer, disburse, refund, close.
    state.debit(buyer, payment);

    let mut logs = Logs::new();
    logs.extend(move_ticket(state, settlement.ticket_id, buyer));

    let payouts = [
        (settlement.artist, royalty, PaymentReason::Royalty),
        (settlement.platform, platform_cut, PaymentReason::PlatformFee),
        (settlement.seller, seller_proceeds, PaymentReason::SellerProceeds),
        (buyer, settlement.refund, PaymentReason::Refund),
    ];
    for (to, amount, reason) in payouts {
        if amount.is_zero() {
            continue;
        }
        state.credit(to, amount);
        logs.push(LedgerLog::Payment { to, amount, reason });
    }

    if let Some(listing) = state.listings.get_mut(&listing_id) {
        listing.status = ListingStatus::Sold;
    }
    state.active_listing_by_ticket.remove(&settlement.ticket_id);
    logs.push(LedgerLog::ListingSold {
        listing_id,
        ticket_id: settlement.ticket_id,
        event_id,
        buyer,
        seller: settlement.seller,
        price: settlement.price,
    });

    Ok(Applied::new(CallOutput::Purchased(settlement), logs))
}

fn cancel_listing(
    state: &mut SettlementState,
    caller: Address,
    listing_id: ListingId,
) -> Result<Applied, MarketError> {
    let listing = state
        .listing(listing_id)
        .ok_or(MarketError::ListingNotActive { listing_id })?;
    if listing.seller != caller {
        return Err(MarketError::NotTheSeller { listing_id });
    }
    if !listing.is_active() {
        return Err(MarketError::ListingNotActive { listing_id });
    }
    let ticket_id = listing.ticket_id;
    let event_id = listing.event_id;

    if let Some(listing) = state.listings.get_mut(&listing_id) {
        listing.status = ListingStatus::Cancelled;
    }
    state.active_listing_by_ticket.remove(&ticket_id);

    Ok(Applied::empty(smallvec![LedgerLog::ListingCancelled {
        listing_id,
        ticket_id,
        event_id
    }]))
}

fn set_event_paused(
    state: &mut SettlementState,
    caller: Address,
    event_id: EventId,
    paused: bool,
) -> Result<Applied, MarketError> {
    let event = require_event(state, event_id)?;
    if !rules::is_event_authority(state, event, caller) {
        return Err(MarketError::NotEventAuthority { event_id });
    }

    if let Some(event) = state.events.get_mut(&event_id) {
        event.paused = paused;
    }
    let log = if paused {
        LedgerLog::EventPaused { event_id }
    } else {
        LedgerLog::EventUnpaused { event_id }
    };
    Ok(Applied::empty(smallvec![log]))
}

fn set_platform_fee(
    state: &mut SettlementState,
    caller: Address,
    fee_bps: Bps,
) -> Result<Applied, MarketError> {
    require_owner(state, caller)?;
    state.platform = PlatformConfig {
        fee_bps,
        ..state.platform
    };
    Ok(Applied::empty(smallvec![LedgerLog::PlatformFeeUpdated {
        fee_bps
    }]))
}

fn finalise_ticket(
    state: &mut SettlementState,
    caller: Address,
    ticket_id: TicketId,
    status: TicketStatus,
) -> Result<Applied, MarketError> {
    let ticket = require_ticket(state, ticket_id)?;
    let event_id = ticket.event_id;
    let event = require_event(state, event_id)?;
    if !rules::can_mint(state, event, caller) {
        return Err(MarketError::NotEventAuthority { event_id });
    }
    if !ticket.is_active() {
        return Err(MarketError::TicketNotActive { ticket_id });
    }
    require_unlisted(state, ticket_id)?;

    if let Some(ticket) = state.tickets.get_mut(&ticket_id) {
        ticket.status = status;
    }
    state.approvals.remove(&ticket_id);

    let log = if status == TicketStatus::Used {
        LedgerLog::TicketUsed {
            ticket_id,
            event_id,
        }
    } else {
        LedgerLog::TicketRevoked {
            ticket_id,
            event_id,
        }
    };
    Ok(Applied::empty(smallvec![log]))
}
