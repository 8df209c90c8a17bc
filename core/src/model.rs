//! Ledger entities: events, tickets and resale listings.

use crate::types::{Address, Bps, EventId, Fingerprint, ListingId, SeatId, TicketId, Wei};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Highest royalty an event may charge on resale.
pub const MAX_ROYALTY_BPS: Bps = Bps::new(1_000);

/// Highest resale markup an event may allow.
pub const MAX_RESALE_MARKUP_BPS: Bps = Bps::new(10_000);

/// Highest platform fee the marketplace may charge.
pub const MAX_PLATFORM_FEE_BPS: Bps = Bps::new(500);

/// Parameters an organizer supplies when creating an event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDraft {
    /// Fingerprint of the off-ledger event description
    pub fingerprint: Fingerprint,
    /// Total number of tickets that may ever be minted
    pub max_supply: u64,
    /// Royalty paid to the artist on every resale
    pub royalty_bps: Bps,
    /// Markup over the issue price a resale may charge
    pub max_resale_markup_bps: Bps,
    /// Royalty payout account
    pub artist: Address,
    /// Original issue price, the base of the resale cap
    pub issue_price: Wei,
}

/// An event as recorded on the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Event id
    pub id: EventId,
    /// Creating account
    pub organizer: Address,
    /// Fingerprint of the off-ledger description
    pub fingerprint: Fingerprint,
    /// Supply ceiling
    pub max_supply: u64,
    /// Resale royalty
    pub royalty_bps: Bps,
    /// Resale markup ceiling
    pub max_resale_markup_bps: Bps,
    /// Royalty payout account
    pub artist: Address,
    /// Original issue price
    pub issue_price: Wei,
    /// Tickets minted so far
    pub minted: u64,
    /// Whether minting is suspended
    pub paused: bool,
    /// Ledger time of creation
    pub created_at: DateTime<Utc>,
}

impl Event {
    /// Highest price a ticket of this event may be listed at.
    ///
    /// `floor(issue_price * (10_000 + markup) / 10_000)`, never below the issue price.
    #[must_use]
    pub const fn resale_cap(&self) -> Wei {
        self.issue_price
            .saturating_add(self.max_resale_markup_bps.share_of(self.issue_price))
    }

    /// Whether every ticket has been minted.
    #[must_use]
    pub const fn is_sold_out(&self) -> bool {
        self.minted >= self.max_supply
    }
}

/// Ticket lifecycle status. Listing is derived, not stored here.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    /// Held and transferable
    Owned,
    /// Redeemed at the venue
    Used,
    /// Cancelled by an event authority
    Revoked,
}

/// A minted ticket.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Ticket id
    pub id: TicketId,
    /// Event the ticket admits to
    pub event_id: EventId,
    /// Seat within the event
    pub seat_id: SeatId,
    /// Current holder
    pub owner: Address,
    /// Optional metadata pointer
    pub metadata: Option<String>,
    /// Lifecycle status
    pub status: TicketStatus,
    /// Ledger time of minting
    pub minted_at: DateTime<Utc>,
}

impl Ticket {
    /// Whether the ticket can still change hands.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == TicketStatus::Owned
    }
}

/// Listing lifecycle status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    /// Open for purchase
    Active,
    /// Purchased (terminal)
    Sold,
    /// Withdrawn by the seller (terminal)
    Cancelled,
}

/// A fixed-price resale offer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    /// Listing id
    pub id: ListingId,
    /// Ticket on offer
    pub ticket_id: TicketId,
    /// Event of the ticket
    pub event_id: EventId,
    /// Listing creator
    pub seller: Address,
    /// Asking price
    pub price: Wei,
    /// Lifecycle status
    pub status: ListingStatus,
    /// Ledger time of creation
    pub created_at: DateTime<Utc>,
}

impl Listing {
    /// Whether the listing can still be purchased or cancelled.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == ListingStatus::Active
    }
}

/// Marketplace fee configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Fee charged on every sale
    pub fee_bps: Bps,
    /// Fee payout account
    pub address: Address,
}

/// Marketplace-wide switches and fee configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformStatus {
    /// Fee configuration
    pub platform: PlatformConfig,
    /// Account the ledger treats as the marketplace operator
    pub marketplace: Address,
    /// Whether listing and purchase are suspended
    pub marketplace_paused: bool,
    /// Whether direct transfers are suspended
    pub transfers_paused: bool,
}

/// Fund distribution of one completed purchase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    /// Purchased listing
    pub listing_id: ListingId,
    /// Ticket that changed hands
    pub ticket_id: TicketId,
    /// New owner
    pub buyer: Address,
    /// Previous owner
    pub seller: Address,
    /// Listing price
    pub price: Wei,
    /// Royalty paid to the artist
    pub royalty: Wei,
    /// Fee paid to the platform
    pub platform_cut: Wei,
    /// Remainder paid to the seller
    pub seller_proceeds: Wei,
    /// Overpayment returned to the buyer
    pub refund: Wei,
    /// Royalty recipient
    pub artist: Address,
    /// Fee recipient
    pub platform: Address,
}

impl Settlement {
    /// Sum of all disbursements, which always equals the price.
    #[must_use]
    pub const fn disbursed(&self) -> Wei {
        self.royalty
            .saturating_add(self.platform_cut)
            .saturating_add(self.seller_proceeds)
    }
}
