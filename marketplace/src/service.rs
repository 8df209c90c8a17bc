//! The marketplace service: typed settlement operations over the ledger.
//!
//! Every write follows the same path:
//! 1. Run the stateless argument checks locally
//! 2. Submit through the [`TransactionExecutor`] and wait for confirmation
//! 3. Publish the resulting transition facts to the mirror
//! 4. Return the typed output
//!
//! Reads go through the executor's retry loop but are advisory: the ledger alone
//! decides conflicts, so a read followed by a write may still be rejected.

use crate::error::MarketplaceError;
use std::sync::Arc;
use ticketchain_core::mirror::{MirrorSink, TransitionFact};
use ticketchain_core::model::{EventDraft, PlatformStatus, Settlement};
use ticketchain_core::settlement::{
    CallOutput, LedgerCall, LedgerQuery, MinterScope, QueryResponse, rules,
};
use ticketchain_core::{
    Address, Bps, Event, EventId, Listing, ListingId, SeatId, Ticket, TicketId, Wei,
};
use ticketchain_ledger::Receipt;
use ticketchain_runtime::TransactionExecutor;

/// Settlement operations for events, tickets and listings.
///
/// Cheap to share: hold it in an `Arc` and call it from any number of tasks.
pub struct Marketplace {
    executor: TransactionExecutor,
    mirror: Arc<dyn MirrorSink>,
}

impl Marketplace {
    /// Create a service over an executor, publishing facts to `mirror`.
    #[must_use]
    pub fn new(executor: TransactionExecutor, mirror: Arc<dyn MirrorSink>) -> Self {
        Self { executor, mirror }
    }

    /// The executor every call goes through
    #[must_use]
    pub const fn executor(&self) -> &TransactionExecutor {
        &self.executor
    }

    // ========== Events ==========

    /// Register an event organised by `organizer`.
    ///
    /// # Errors
    ///
    /// Validation errors for the draft; infrastructure errors from the ledger.
    pub async fn create_event(
        &self,
        organizer: Address,
        draft: EventDraft,
    ) -> Result<EventId, MarketplaceError> {
        match self.submit(organizer, LedgerCall::CreateEvent(draft)).await? {
            CallOutput::EventCreated(event_id) => Ok(event_id),
            other => Err(MarketplaceError::unexpected("create_event", other)),
        }
    }

    /// Suspend minting for an event.
    ///
    /// # Errors
    ///
    /// `EVENT_DOES_NOT_EXIST`, `NOT_EVENT_AUTHORITY`, or infrastructure errors.
    pub async fn pause_event(
        &self,
        caller: Address,
        event_id: EventId,
    ) -> Result<(), MarketplaceError> {
        self.submit_empty(caller, LedgerCall::PauseEvent { event_id })
            .await
    }

    /// Resume minting for an event.
    ///
    /// # Errors
    ///
    /// `EVENT_DOES_NOT_EXIST`, `NOT_EVENT_AUTHORITY`, or infrastructure errors.
    pub async fn unpause_event(
        &self,
        caller: Address,
        event_id: EventId,
    ) -> Result<(), MarketplaceError> {
        self.submit_empty(caller, LedgerCall::UnpauseEvent { event_id })
            .await
    }

    // ========== Tickets ==========

    /// Grant or revoke minting rights, for one event or globally.
    ///
    /// # Errors
    ///
    /// `INVALID_ADDRESS`, `NOT_OWNER`, `NOT_EVENT_AUTHORITY`, or infrastructure errors.
    pub async fn set_minter(
        &self,
        caller: Address,
        scope: MinterScope,
        minter: Address,
        enabled: bool,
    ) -> Result<(), MarketplaceError> {
        self.submit_empty(
            caller,
            LedgerCall::SetMinter {
                scope,
                minter,
                enabled,
            },
        )
        .await
    }

    /// Mint the ticket for `seat_id` to `to`.
    ///
    /// # Errors
    ///
    /// `SEAT_ALREADY_MINTED` if the seat is taken (also when a concurrent mint won),
    /// `MAX_SUPPLY_REACHED`, `EVENT_IS_PAUSED`, `NOT_AUTHORIZED_MINTER`, validation or
    /// infrastructure errors.
    pub async fn mint_ticket(
        &self,
        minter: Address,
        event_id: EventId,
        to: Address,
        seat_id: SeatId,
        metadata: Option<String>,
    ) -> Result<TicketId, MarketplaceError> {
        let call = LedgerCall::MintTicket {
            event_id,
            to,
            seat_id,
            metadata,
        };
        match self.submit(minter, call).await? {
            CallOutput::TicketMinted(ticket_id) => Ok(ticket_id),
            other => Err(MarketplaceError::unexpected("mint_ticket", other)),
        }
    }

    /// Set (or clear, with `None`) the approved operator of a ticket.
    ///
    /// # Errors
    ///
    /// `NOT_TOKEN_OWNER`, `TICKET_NOT_ACTIVE`, `TICKET_LISTED`, or infrastructure errors.
    pub async fn approve(
        &self,
        owner: Address,
        ticket_id: TicketId,
        operator: Option<Address>,
    ) -> Result<(), MarketplaceError> {
        self.submit_empty(
            owner,
            LedgerCall::Approve {
                ticket_id,
                operator,
            },
        )
        .await
    }

    /// Move a ticket outside the marketplace.
    ///
    /// # Errors
    ///
    /// `TRANSFERS_PAUSED`, `NOT_APPROVED_FOR_TRANSFER`, `TICKET_LISTED`, or
    /// infrastructure errors.
    pub async fn transfer_ticket(
        &self,
        caller: Address,
        ticket_id: TicketId,
        to: Address,
    ) -> Result<(), MarketplaceError> {
        self.submit_empty(caller, LedgerCall::TransferTicket { ticket_id, to })
            .await
    }

    /// Redeem a ticket at the venue.
    ///
    /// # Errors
    ///
    /// `NOT_EVENT_AUTHORITY`, `TICKET_NOT_ACTIVE`, `TICKET_LISTED`, or infrastructure
    /// errors.
    pub async fn mark_used(
        &self,
        caller: Address,
        ticket_id: TicketId,
    ) -> Result<(), MarketplaceError> {
        self.submit_empty(caller, LedgerCall::MarkUsed { ticket_id })
            .await
    }

    /// Cancel a ticket.
    ///
    /// # Errors
    ///
    /// `NOT_EVENT_AUTHORITY`, `TICKET_NOT_ACTIVE`, `TICKET_LISTED`, or infrastructure
    /// errors.
    pub async fn revoke_ticket(
        &self,
        caller: Address,
        ticket_id: TicketId,
    ) -> Result<(), MarketplaceError> {
        self.submit_empty(caller, LedgerCall::RevokeTicket { ticket_id })
            .await
    }

    /// Engage or release the direct-transfer switch (contract owner only).
    ///
    /// # Errors
    ///
    /// `NOT_OWNER` or infrastructure errors.
    pub async fn set_transfers_paused(
        &self,
        caller: Address,
        paused: bool,
    ) -> Result<(), MarketplaceError> {
        self.submit_empty(caller, LedgerCall::SetTransfersPaused { paused })
            .await
    }

    // ========== Listings ==========

    /// List a ticket for resale. The marketplace must already be approved for it.
    ///
    /// # Errors
    ///
    /// `PRICE_EXCEEDS_CAP`, `MARKETPLACE_NOT_APPROVED`, `NOT_TOKEN_OWNER`,
    /// `TICKET_LISTED`, `MARKETPLACE_PAUSED`, validation or infrastructure errors.
    pub async fn create_listing(
        &self,
        seller: Address,
        ticket_id: TicketId,
        price: Wei,
    ) -> Result<ListingId, MarketplaceError> {
        match self
            .submit(seller, LedgerCall::CreateListing { ticket_id, price })
            .await?
        {
            CallOutput::ListingCreated(listing_id) => Ok(listing_id),
            other => Err(MarketplaceError::unexpected("create_listing", other)),
        }
    }

    /// Buy a listing, paying at least its price. Any excess is refunded.
    ///
    /// # Errors
    ///
    /// `LISTING_NOT_ACTIVE` if it was cancelled or already sold (also when a concurrent
    /// purchase won), `CANNOT_BUY_OWN_LISTING`, `INSUFFICIENT_PAYMENT`,
    /// `INSUFFICIENT_FUNDS`, `MARKETPLACE_PAUSED`, or infrastructure errors.
    pub async fn purchase_listing(
        &self,
        buyer: Address,
        listing_id: ListingId,
        payment: Wei,
    ) -> Result<Settlement, MarketplaceError> {
        match self
            .submit(
                buyer,
                LedgerCall::PurchaseListing {
                    listing_id,
                    payment,
                },
            )
            .await?
        {
            CallOutput::Purchased(settlement) => Ok(settlement),
            other => Err(MarketplaceError::unexpected("purchase_listing", other)),
        }
    }

    /// Withdraw an active listing.
    ///
    /// # Errors
    ///
    /// `NOT_THE_SELLER`, `LISTING_NOT_ACTIVE`, or infrastructure errors.
    pub async fn cancel_listing(
        &self,
        seller: Address,
        listing_id: ListingId,
    ) -> Result<(), MarketplaceError> {
        self.submit_empty(seller, LedgerCall::CancelListing { listing_id })
            .await
    }

    // ========== Platform ==========

    /// Engage or release the marketplace-wide pause (contract owner only).
    ///
    /// # Errors
    ///
    /// `NOT_OWNER` or infrastructure errors.
    pub async fn set_marketplace_paused(
        &self,
        caller: Address,
        paused: bool,
    ) -> Result<(), MarketplaceError> {
        self.submit_empty(caller, LedgerCall::SetMarketplacePaused { paused })
            .await
    }

    /// Change the platform fee (contract owner only, at most 500 bps).
    ///
    /// # Errors
    ///
    /// `FEE_TOO_HIGH`, `NOT_OWNER`, or infrastructure errors.
    pub async fn set_platform_fee(
        &self,
        caller: Address,
        fee_bps: Bps,
    ) -> Result<(), MarketplaceError> {
        self.submit_empty(caller, LedgerCall::SetPlatformFee { fee_bps })
            .await
    }

    /// Change the platform payout account (contract owner only).
    ///
    /// # Errors
    ///
    /// `INVALID_ADDRESS`, `NOT_OWNER`, or infrastructure errors.
    pub async fn set_platform_address(
        &self,
        caller: Address,
        address: Address,
    ) -> Result<(), MarketplaceError> {
        self.submit_empty(caller, LedgerCall::SetPlatformAddress { address })
            .await
    }

    // ========== Reads ==========

    /// Event by id.
    ///
    /// # Errors
    ///
    /// Infrastructure errors.
    pub async fn event(&self, event_id: EventId) -> Result<Option<Event>, MarketplaceError> {
        match self.read(LedgerQuery::Event { event_id }).await? {
            QueryResponse::Event(event) => Ok(event),
            other => Err(MarketplaceError::unexpected("event", other)),
        }
    }

    /// Ticket by id.
    ///
    /// # Errors
    ///
    /// Infrastructure errors.
    pub async fn ticket(&self, ticket_id: TicketId) -> Result<Option<Ticket>, MarketplaceError> {
        match self.read(LedgerQuery::Ticket { ticket_id }).await? {
            QueryResponse::Ticket(ticket) => Ok(ticket),
            other => Err(MarketplaceError::unexpected("ticket", other)),
        }
    }

    /// Listing by id.
    ///
    /// # Errors
    ///
    /// Infrastructure errors.
    pub async fn listing(
        &self,
        listing_id: ListingId,
    ) -> Result<Option<Listing>, MarketplaceError> {
        match self.read(LedgerQuery::Listing { listing_id }).await? {
            QueryResponse::Listing(listing) => Ok(listing),
            other => Err(MarketplaceError::unexpected("listing", other)),
        }
    }

    /// Whether a seat of an event has been minted.
    ///
    /// # Errors
    ///
    /// Infrastructure errors.
    pub async fn is_seat_minted(
        &self,
        event_id: EventId,
        seat_id: SeatId,
    ) -> Result<bool, MarketplaceError> {
        self.flag("is_seat_minted", LedgerQuery::IsSeatMinted { event_id, seat_id })
            .await
    }

    /// Whether `account` holds a minter grant for the event (or a global one).
    ///
    /// # Errors
    ///
    /// Infrastructure errors.
    pub async fn is_minter(
        &self,
        event_id: EventId,
        account: Address,
    ) -> Result<bool, MarketplaceError> {
        self.flag("is_minter", LedgerQuery::IsMinter { event_id, account })
            .await
    }

    /// Ids of every active listing.
    ///
    /// # Errors
    ///
    /// Infrastructure errors.
    pub async fn active_listings(&self) -> Result<Vec<ListingId>, MarketplaceError> {
        match self.read(LedgerQuery::ActiveListings).await? {
            QueryResponse::ListingIds(ids) => Ok(ids),
            other => Err(MarketplaceError::unexpected("active_listings", other)),
        }
    }

    /// Every listing a seller ever created.
    ///
    /// # Errors
    ///
    /// Infrastructure errors.
    pub async fn listings_by_seller(
        &self,
        seller: Address,
    ) -> Result<Vec<Listing>, MarketplaceError> {
        match self.read(LedgerQuery::ListingsBySeller { seller }).await? {
            QueryResponse::Listings(listings) => Ok(listings),
            other => Err(MarketplaceError::unexpected("listings_by_seller", other)),
        }
    }

    /// Tickets currently held by `owner`.
    ///
    /// # Errors
    ///
    /// Infrastructure errors.
    pub async fn tickets_by_owner(&self, owner: Address) -> Result<Vec<Ticket>, MarketplaceError> {
        match self.read(LedgerQuery::TicketsByOwner { owner }).await? {
            QueryResponse::Tickets(tickets) => Ok(tickets),
            other => Err(MarketplaceError::unexpected("tickets_by_owner", other)),
        }
    }

    /// Native balance of an account.
    ///
    /// # Errors
    ///
    /// Infrastructure errors.
    pub async fn balance(&self, account: Address) -> Result<Wei, MarketplaceError> {
        match self.read(LedgerQuery::Balance { account }).await? {
            QueryResponse::Balance(balance) => Ok(balance),
            other => Err(MarketplaceError::unexpected("balance", other)),
        }
    }

    /// Platform fee, payout account and pause switches.
    ///
    /// # Errors
    ///
    /// Infrastructure errors.
    pub async fn platform_status(&self) -> Result<PlatformStatus, MarketplaceError> {
        match self.read(LedgerQuery::Platform).await? {
            QueryResponse::Platform(status) => Ok(status),
            other => Err(MarketplaceError::unexpected("platform_status", other)),
        }
    }

    /// Chain identity of the connected ledger.
    ///
    /// # Errors
    ///
    /// Infrastructure errors.
    pub async fn chain_id(&self) -> Result<u64, MarketplaceError> {
        Ok(self.executor.chain_id().await?)
    }

    // ========== Internals ==========

    async fn submit(
        &self,
        caller: Address,
        call: LedgerCall,
    ) -> Result<CallOutput, MarketplaceError> {
        rules::validate_call(&call).map_err(MarketplaceError::Preflight)?;
        let operation = call.name();
        let executed = self.executor.execute(caller, call).await?;
        self.publish(operation, &executed.receipt).await;
        Ok(executed.receipt.output)
    }

    async fn submit_empty(&self, caller: Address, call: LedgerCall) -> Result<(), MarketplaceError> {
        let operation = call.name();
        match self.submit(caller, call).await? {
            CallOutput::Empty => Ok(()),
            other => Err(MarketplaceError::unexpected(operation, other)),
        }
    }

    /// Mirror delivery is best effort: failures are logged and never fail the operation.
    async fn publish(&self, operation: &'static str, receipt: &Receipt) {
        for fact in TransitionFact::from_logs(&receipt.logs, receipt.timestamp) {
            let (entity_type, entity_id) = (fact.entity_type, fact.entity_id);
            if let Err(error) = self.mirror.publish(fact).await {
                tracing::warn!(
                    operation,
                    tx_hash = %receipt.tx_hash,
                    ?entity_type,
                    entity_id,
                    code = error.code(),
                    error = %error,
                    "Mirror delivery failed"
                );
            }
        }
    }

    async fn read(&self, query: LedgerQuery) -> Result<QueryResponse, MarketplaceError> {
        Ok(self.executor.query(query).await?)
    }

    async fn flag(
        &self,
        operation: &'static str,
        query: LedgerQuery,
    ) -> Result<bool, MarketplaceError> {
        match self.read(query).await? {
            QueryResponse::Flag(flag) => Ok(flag),
            other => Err(MarketplaceError::unexpected(operation, other)),
        }
    }
}
