//! State-mutating calls, their outputs, and the logs they emit.

use crate::model::{EventDraft, Settlement};
use crate::types::{Address, Bps, EventId, Fingerprint, ListingId, SeatId, TicketId, Wei};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Who a minter grant applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "event_id", rename_all = "snake_case")]
pub enum MinterScope {
    /// Every event (contract owner only)
    Global,
    /// A single event (its organizer or the contract owner)
    Event(EventId),
}

/// The deployed contract a call is routed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Contract {
    /// Events and pause switches
    EventRegistry,
    /// Tickets, minters, approvals and transfers
    #[serde(rename = "TicketNFT")]
    TicketNft,
    /// Listings, purchases and platform configuration
    #[serde(rename = "SimpleMarketplace")]
    Marketplace,
}

impl fmt::Display for Contract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::EventRegistry => "EventRegistry",
            Self::TicketNft => "TicketNFT",
            Self::Marketplace => "SimpleMarketplace",
        })
    }
}

/// A state-mutating ledger call. The caller is supplied separately by the signer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum LedgerCall {
    /// Register a new event with the caller as organizer
    CreateEvent(EventDraft),
    /// Grant or revoke minting rights
    SetMinter {
        /// Grant scope
        scope: MinterScope,
        /// Minter account
        minter: Address,
        /// Grant (true) or revoke (false)
        enabled: bool,
    },
    /// Mint a ticket for a seat
    MintTicket {
        /// Event
        event_id: EventId,
        /// First holder
        to: Address,
        /// Seat, unique within the event
        seat_id: SeatId,
        /// Optional metadata pointer
        metadata: Option<String>,
    },
    /// Set or clear the single approved operator of a ticket
    Approve {
        /// Ticket
        ticket_id: TicketId,
        /// New operator, `None` clears the approval
        operator: Option<Address>,
    },
    /// Move a ticket directly, outside the marketplace
    TransferTicket {
        /// Ticket
        ticket_id: TicketId,
        /// New holder
        to: Address,
    },
    /// Offer a ticket for resale
    CreateListing {
        /// Ticket
        ticket_id: TicketId,
        /// Asking price
        price: Wei,
    },
    /// Buy a listed ticket
    PurchaseListing {
        /// Listing
        listing_id: ListingId,
        /// Attached payment, at least the price
        payment: Wei,
    },
    /// Withdraw an active listing
    CancelListing {
        /// Listing
        listing_id: ListingId,
    },
    /// Suspend minting for an event
    PauseEvent {
        /// Event
        event_id: EventId,
    },
    /// Resume minting for an event
    UnpauseEvent {
        /// Event
        event_id: EventId,
    },
    /// Engage or release the direct-transfer switch
    SetTransfersPaused {
        /// New switch position
        paused: bool,
    },
    /// Engage or release the marketplace switch
    SetMarketplacePaused {
        /// New switch position
        paused: bool,
    },
    /// Change the platform fee
    SetPlatformFee {
        /// New fee
        fee_bps: Bps,
    },
    /// Change the platform payout account
    SetPlatformAddress {
        /// New account
        address: Address,
    },
    /// Redeem a ticket
    MarkUsed {
        /// Ticket
        ticket_id: TicketId,
    },
    /// Cancel a ticket
    RevokeTicket {
        /// Ticket
        ticket_id: TicketId,
    },
}

impl LedgerCall {
    /// Contract that evaluates this call.
    #[must_use]
    pub const fn target(&self) -> Contract {
        match self {
            Self::CreateEvent(_) | Self::PauseEvent { .. } | Self::UnpauseEvent { .. } => {
                Contract::EventRegistry
            }
            Self::SetMinter { .. }
            | Self::MintTicket { .. }
            | Self::Approve { .. }
            | Self::TransferTicket { .. }
            | Self::SetTransfersPaused { .. }
            | Self::MarkUsed { .. }
            | Self::RevokeTicket { .. } => Contract::TicketNft,
            Self::CreateListing { .. }
            | Self::PurchaseListing { .. }
            | Self::CancelListing { .. }
            | Self::SetMarketplacePaused { .. }
            | Self::SetPlatformFee { .. }
            | Self::SetPlatformAddress { .. } => Contract::Marketplace,
        }
    }

    /// Method name, for logs and metrics labels.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::CreateEvent(_) => "create_event",
            Self::SetMinter { .. } => "set_minter",
            Self::MintTicket { .. } => "mint_ticket",
            Self::Approve { .. } => "approve",
            Self::TransferTicket { .. } => "transfer_ticket",
            Self::CreateListing { .. } => "create_listing",
            Self::PurchaseListing { .. } => "purchase_listing",
            Self::CancelListing { .. } => "cancel_listing",
            Self::PauseEvent { .. } => "pause_event",
            Self::UnpauseEvent { .. } => "unpause_event",
            Self::SetTransfersPaused { .. } => "set_transfers_paused",
            Self::SetMarketplacePaused { .. } => "set_marketplace_paused",
            Self::SetPlatformFee { .. } => "set_platform_fee",
            Self::SetPlatformAddress { .. } => "set_platform_address",
            Self::MarkUsed { .. } => "mark_used",
            Self::RevokeTicket { .. } => "revoke_ticket",
        }
    }
}

/// Value returned by a successful call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CallOutput {
    /// New event id
    EventCreated(EventId),
    /// New ticket id
    TicketMinted(TicketId),
    /// New listing id
    ListingCreated(ListingId),
    /// Fund distribution of a purchase
    Purchased(Settlement),
    /// Call returns nothing
    Empty,
}

/// Why funds moved during a purchase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentReason {
    /// Artist royalty
    Royalty,
    /// Platform fee
    PlatformFee,
    /// Seller proceeds
    SellerProceeds,
    /// Overpayment returned to the buyer
    Refund,
}

/// Log record emitted by a successful call, in emission order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "log", rename_all = "snake_case")]
pub enum LedgerLog {
    /// Event registered
    EventCreated {
        /// Event
        event_id: EventId,
        /// Organizer
        organizer: Address,
        /// Fingerprint
        fingerprint: Fingerprint,
        /// Supply ceiling
        max_supply: u64,
        /// Royalty
        royalty_bps: Bps,
        /// Markup ceiling
        max_resale_markup_bps: Bps,
        /// Artist
        artist: Address,
        /// Issue price
        issue_price: Wei,
    },
    /// Event paused
    EventPaused {
        /// Event
        event_id: EventId,
    },
    /// Event unpaused
    EventUnpaused {
        /// Event
        event_id: EventId,
    },
    /// Minter grant changed
    MinterUpdated {
        /// Scope
        scope: MinterScope,
        /// Minter
        minter: Address,
        /// New value
        enabled: bool,
    },
    /// Ticket minted
    TicketMinted {
        /// Ticket
        ticket_id: TicketId,
        /// Event
        event_id: EventId,
        /// Seat
        seat_id: SeatId,
        /// First holder
        owner: Address,
    },
    /// Ticket approval changed
    Approval {
        /// Ticket
        ticket_id: TicketId,
        /// Holder
        owner: Address,
        /// New operator
        operator: Option<Address>,
    },
    /// Ticket changed hands
    TicketTransferred {
        /// Ticket
        ticket_id: TicketId,
        /// Event
        event_id: EventId,
        /// Previous holder
        from: Address,
        /// New holder
        to: Address,
    },
    /// Ticket redeemed
    TicketUsed {
        /// Ticket
        ticket_id: TicketId,
        /// Event
        event_id: EventId,
    },
    /// Ticket revoked
    TicketRevoked {
        /// Ticket
        ticket_id: TicketId,
        /// Event
        event_id: EventId,
    },
    /// Listing opened
    ListingCreated {
        /// Listing
        listing_id: ListingId,
        /// Ticket
        ticket_id: TicketId,
        /// Event
        event_id: EventId,
        /// Seller
        seller: Address,
        /// Price
        price: Wei,
    },
    /// Listing purchased
    ListingSold {
        /// Listing
        listing_id: ListingId,
        /// Ticket
        ticket_id: TicketId,
        /// Event
        event_id: EventId,
        /// Buyer
        buyer: Address,
        /// Seller
        seller: Address,
        /// Price
        price: Wei,
    },
    /// Listing withdrawn
    ListingCancelled {
        /// Listing
        listing_id: ListingId,
        /// Ticket
        ticket_id: TicketId,
        /// Event
        event_id: EventId,
    },
    /// Funds paid out during a purchase
    Payment {
        /// Recipient
        to: Address,
        /// Amount
        amount: Wei,
        /// Purpose
        reason: PaymentReason,
    },
    /// Direct-transfer switch changed
    TransfersPauseChanged {
        /// New position
        paused: bool,
    },
    /// Marketplace switch changed
    MarketplacePauseChanged {
        /// New position
        paused: bool,
    },
    /// Platform fee changed
    PlatformFeeUpdated {
        /// New fee
        fee_bps: Bps,
    },
    /// Platform payout account changed
    PlatformAddressUpdated {
        /// New account
        address: Address,
    },
}
