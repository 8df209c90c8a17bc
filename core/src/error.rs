//! Application-level rejections raised by the settlement rules.
//!
//! Every variant is a deterministic outcome of evaluating a call against ledger state,
//! so none of them is ever retried. They travel over the wire tagged with their stable
//! machine code, which lets a remote ledger hand back the exact rejection it produced.

use crate::types::{Address, Bps, EventId, ListingId, SeatId, TicketId, Wei};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse classification of a [`MarketError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed or out-of-range input
    Validation,
    /// Caller lacks the required role over the entity
    Authorization,
    /// Input is well formed but conflicts with current ledger state
    StateConflict,
    /// Ledger or transport failure
    Infrastructure,
}

/// A rejection produced by the settlement rules.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketError {
    // ----- validation -----
    /// Event fingerprint is all zero
    #[error("Invalid fingerprint")]
    InvalidFingerprint,

    /// Event max supply is zero
    #[error("Invalid supply")]
    InvalidSupply,

    /// Royalty rate above 1000 bps
    #[error("Royalty too high: {royalty_bps} exceeds 1000 bps")]
    RoyaltyTooHigh {
        /// Requested royalty
        royalty_bps: Bps,
    },

    /// Resale markup above 10000 bps
    #[error("Markup too high: {markup_bps} exceeds 10000 bps")]
    MarkupTooHigh {
        /// Requested markup
        markup_bps: Bps,
    },

    /// Platform fee above 500 bps
    #[error("Fee too high: {fee_bps} exceeds 500 bps")]
    FeeTooHigh {
        /// Requested fee
        fee_bps: Bps,
    },

    /// The zero address was supplied where an account is required
    #[error("Invalid address")]
    InvalidAddress,

    /// Seat identifier is empty
    #[error("Invalid seat")]
    InvalidSeat,

    /// Listing price is zero
    #[error("Price must be greater than zero")]
    InvalidPrice,

    /// Listing price above the event's resale cap
    #[error("Price {price} exceeds resale cap {cap}")]
    PriceExceedsCap {
        /// Requested price
        price: Wei,
        /// Event resale cap
        cap: Wei,
    },

    /// Payment below the listing price
    #[error("Insufficient payment: price is {price}, got {payment}")]
    InsufficientPayment {
        /// Listing price
        price: Wei,
        /// Attached payment
        payment: Wei,
    },

    /// Buyer is the listing's seller
    #[error("Cannot buy own listing")]
    CannotBuyOwnListing,

    // ----- authorization -----
    /// Caller is not the contract owner
    #[error("Caller is not the contract owner")]
    NotOwner,

    /// Caller is neither the event organizer nor the contract owner
    #[error("Caller is not an authority for event {event_id}")]
    NotEventAuthority {
        /// Event in question
        event_id: EventId,
    },

    /// Caller may not mint for the event
    #[error("Not authorized to mint for event {event_id}")]
    NotAuthorizedMinter {
        /// Event in question
        event_id: EventId,
    },

    /// Caller does not own the ticket
    #[error("Not token owner of ticket {ticket_id}")]
    NotTokenOwner {
        /// Ticket in question
        ticket_id: TicketId,
    },

    /// Caller is neither the owner nor the approved operator of the ticket
    #[error("Not approved to transfer ticket {ticket_id}")]
    NotApprovedForTransfer {
        /// Ticket in question
        ticket_id: TicketId,
    },

    /// The marketplace holds no approval for the ticket
    #[error("Marketplace not approved for ticket {ticket_id}")]
    MarketplaceNotApproved {
        /// Ticket in question
        ticket_id: TicketId,
    },

    /// Caller did not create the listing
    #[error("Not the seller of listing {listing_id}")]
    NotTheSeller {
        /// Listing in question
        listing_id: ListingId,
    },

    // ----- state conflict -----
    /// No event with this id
    #[error("Event {event_id} does not exist")]
    EventDoesNotExist {
        /// Requested event
        event_id: EventId,
    },

    /// Event is paused
    #[error("Event {event_id} is paused")]
    EventIsPaused {
        /// Paused event
        event_id: EventId,
    },

    /// Seat has already been minted for the event
    #[error("Seat {seat_id} already minted for event {event_id}")]
    SeatAlreadyMinted {
        /// Event
        event_id: EventId,
        /// Seat
        seat_id: SeatId,
    },

    /// Every ticket of the event has been minted
    #[error("Max supply reached for event {event_id}")]
    MaxSupplyReached {
        /// Sold-out event
        event_id: EventId,
    },

    /// No ticket with this id
    #[error("Ticket {ticket_id} does not exist")]
    TicketDoesNotExist {
        /// Requested ticket
        ticket_id: TicketId,
    },

    /// Ticket has been used or revoked
    #[error("Ticket {ticket_id} is not active")]
    TicketNotActive {
        /// Finalised ticket
        ticket_id: TicketId,
    },

    /// Ticket has an active listing
    #[error("Ticket {ticket_id} is listed")]
    TicketListed {
        /// Listed ticket
        ticket_id: TicketId,
    },

    /// Listing does not exist or is no longer active
    #[error("Listing {listing_id} is not active")]
    ListingNotActive {
        /// Requested listing
        listing_id: ListingId,
    },

    /// Marketplace is paused
    #[error("Marketplace paused")]
    MarketplacePaused,

    /// Direct transfers are paused
    #[error("Transfers paused")]
    TransfersPaused,

    /// Buyer's ledger balance does not cover the payment
    #[error("Insufficient funds: {account} holds {balance}, needs {required}")]
    InsufficientFunds {
        /// Paying account
        account: Address,
        /// Current balance
        balance: Wei,
        /// Amount required
        required: Wei,
    },
}

impl MarketError {
    /// Stable machine-readable code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidFingerprint => "INVALID_FINGERPRINT",
            Self::InvalidSupply => "INVALID_SUPPLY",
            Self::RoyaltyTooHigh { .. } => "ROYALTY_TOO_HIGH",
            Self::MarkupTooHigh { .. } => "MARKUP_TOO_HIGH",
            Self::FeeTooHigh { .. } => "FEE_TOO_HIGH",
            Self::InvalidAddress => "INVALID_ADDRESS",
            Self::InvalidSeat => "INVALID_SEAT",
            Self::InvalidPrice => "INVALID_PRICE",
            Self::PriceExceedsCap { .. } => "PRICE_EXCEEDS_CAP",
            Self::InsufficientPayment { .. } => "INSUFFICIENT_PAYMENT",
            Self::CannotBuyOwnListing => "CANNOT_BUY_OWN_LISTING",
            Self::NotOwner => "NOT_OWNER",
            Self::NotEventAuthority { .. } => "NOT_EVENT_AUTHORITY",
            Self::NotAuthorizedMinter { .. } => "NOT_AUTHORIZED_MINTER",
            Self::NotTokenOwner { .. } => "NOT_TOKEN_OWNER",
            Self::NotApprovedForTransfer { .. } => "NOT_APPROVED_FOR_TRANSFER",
            Self::MarketplaceNotApproved { .. } => "MARKETPLACE_NOT_APPROVED",
            Self::NotTheSeller { .. } => "NOT_THE_SELLER",
            Self::EventDoesNotExist { .. } => "EVENT_DOES_NOT_EXIST",
            Self::EventIsPaused { .. } => "EVENT_IS_PAUSED",
            Self::SeatAlreadyMinted { .. } => "SEAT_ALREADY_MINTED",
            Self::MaxSupplyReached { .. } => "MAX_SUPPLY_REACHED",
            Self::TicketDoesNotExist { .. } => "TICKET_DOES_NOT_EXIST",
            Self::TicketNotActive { .. } => "TICKET_NOT_ACTIVE",
            Self::TicketListed { .. } => "TICKET_LISTED",
            Self::ListingNotActive { .. } => "LISTING_NOT_ACTIVE",
            Self::MarketplacePaused => "MARKETPLACE_PAUSED",
            Self::TransfersPaused => "TRANSFERS_PAUSED",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
        }
    }

    /// Which part of the taxonomy this rejection belongs to.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidFingerprint
            | Self::InvalidSupply
            | Self::RoyaltyTooHigh { .. }
            | Self::MarkupTooHigh { .. }
            | Self::FeeTooHigh { .. }
            | Self::InvalidAddress
            | Self::InvalidSeat
            | Self::InvalidPrice
            | Self::PriceExceedsCap { .. }
            | Self::InsufficientPayment { .. }
            | Self::CannotBuyOwnListing => ErrorKind::Validation,
            Self::NotOwner
            | Self::NotEventAuthority { .. }
            | Self::NotAuthorizedMinter { .. }
            | Self::NotTokenOwner { .. }
            | Self::NotApprovedForTransfer { .. }
            | Self::MarketplaceNotApproved { .. }
            | Self::NotTheSeller { .. } => ErrorKind::Authorization,
            Self::EventDoesNotExist { .. }
            | Self::EventIsPaused { .. }
            | Self::SeatAlreadyMinted { .. }
            | Self::MaxSupplyReached { .. }
            | Self::TicketDoesNotExist { .. }
            | Self::TicketNotActive { .. }
            | Self::TicketListed { .. }
            | Self::ListingNotActive { .. }
            | Self::MarketplacePaused
            | Self::TransfersPaused
            | Self::InsufficientFunds { .. } => ErrorKind::StateConflict,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_tag_matches_code() {
        let errors = [
            MarketError::InvalidSupply,
            MarketError::SeatAlreadyMinted {
                event_id: EventId::new(1),
                seat_id: SeatId::new("A1"),
            },
            MarketError::PriceExceedsCap {
                price: Wei::new(111),
                cap: Wei::new(110),
            },
            MarketError::ListingNotActive {
                listing_id: ListingId::new(3),
            },
        ];

        for error in errors {
            let json = serde_json::to_value(&error).unwrap();
            assert_eq!(json["code"], error.code());
            let back: MarketError = serde_json::from_value(json).unwrap();
            assert_eq!(back, error);
        }
    }

    #[test]
    fn test_kind_classification() {
        assert_eq!(MarketError::InvalidFingerprint.kind(), ErrorKind::Validation);
        assert_eq!(MarketError::NotOwner.kind(), ErrorKind::Authorization);
        assert_eq!(MarketError::TransfersPaused.kind(), ErrorKind::StateConflict);
    }

    #[test]
    fn test_human_message() {
        assert_eq!(MarketError::TransfersPaused.to_string(), "Transfers paused");
        assert_eq!(
            MarketError::FeeTooHigh {
                fee_bps: Bps::new(501)
            }
            .to_string(),
            "Fee too high: 501 bps exceeds 500 bps"
        );
    }
}
