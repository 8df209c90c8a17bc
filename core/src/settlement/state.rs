//! Ledger-side state of the three contracts and the read queries over it.

use crate::model::{Event, Listing, PlatformConfig, PlatformStatus, Ticket};
use crate::settlement::call::MinterScope;
use crate::types::{Address, EventId, ListingId, SeatId, TicketId, Wei};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Deployment parameters of a fresh ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genesis {
    /// Contract owner
    pub owner: Address,
    /// Account the marketplace contract acts as
    pub marketplace: Address,
    /// Initial fee configuration
    pub platform: PlatformConfig,
}

/// Read-only question about ledger state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "query", rename_all = "snake_case")]
pub enum LedgerQuery {
    /// Fetch one event
    Event {
        /// Event
        event_id: EventId,
    },
    /// Fetch one ticket
    Ticket {
        /// Ticket
        ticket_id: TicketId,
    },
    /// Fetch one listing
    Listing {
        /// Listing
        listing_id: ListingId,
    },
    /// Whether a seat has been minted
    IsSeatMinted {
        /// Event
        event_id: EventId,
        /// Seat
        seat_id: SeatId,
    },
    /// Whether an account may mint for an event
    IsMinter {
        /// Event
        event_id: EventId,
        /// Account
        account: Address,
    },
    /// Ids of every active listing, ascending
    ActiveListings,
    /// Every listing ever created by a seller, ascending
    ListingsBySeller {
        /// Seller
        seller: Address,
    },
    /// Every ticket currently held by an account, ascending
    TicketsByOwner {
        /// Holder
        owner: Address,
    },
    /// Native balance of an account
    Balance {
        /// Account
        account: Address,
    },
    /// Fee configuration and pause switches
    Platform,
}

/// Answer to a [`LedgerQuery`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum QueryResponse {
    /// Event lookup
    Event(Option<Event>),
    /// Ticket lookup
    Ticket(Option<Ticket>),
    /// Listing lookup
    Listing(Option<Listing>),
    /// Yes/no answer
    Flag(bool),
    /// Listing id set
    ListingIds(Vec<ListingId>),
    /// Listing set
    Listings(Vec<Listing>),
    /// Ticket set
    Tickets(Vec<Ticket>),
    /// Balance
    Balance(Wei),
    /// Platform status
    Platform(PlatformStatus),
}

/// Complete state of the event registry, ticket and marketplace contracts.
///
/// Mutated only by [`SettlementReducer`](super::SettlementReducer); every other access is
/// read-only.
#[derive(Clone, Debug)]
pub struct SettlementState {
    pub(crate) owner: Address,
    pub(crate) marketplace: Address,
    pub(crate) platform: PlatformConfig,
    pub(crate) marketplace_paused: bool,
    pub(crate) transfers_paused: bool,
    pub(crate) events: BTreeMap<EventId, Event>,
    pub(crate) minters: HashSet<(MinterScope, Address)>,
    pub(crate) tickets: BTreeMap<TicketId, Ticket>,
    pub(crate) seats: HashSet<(EventId, SeatId)>,
    pub(crate) approvals: HashMap<TicketId, Address>,
    pub(crate) listings: BTreeMap<ListingId, Listing>,
    pub(crate) active_listing_by_ticket: HashMap<TicketId, ListingId>,
    pub(crate) balances: HashMap<Address, Wei>,
    pub(crate) next_event_id: u64,
    pub(crate) next_ticket_id: u64,
    pub(crate) next_listing_id: u64,
}

impl SettlementState {
    /// Fresh deployment.
    #[must_use]
    pub fn genesis(genesis: Genesis) -> Self {
        Self {
            owner: genesis.owner,
            marketplace: genesis.marketplace,
            platform: genesis.platform,
            marketplace_paused: false,
            transfers_paused: false,
            events: BTreeMap::new(),
            minters: HashSet::new(),
            tickets: BTreeMap::new(),
            seats: HashSet::new(),
            approvals: HashMap::new(),
            listings: BTreeMap::new(),
            active_listing_by_ticket: HashMap::new(),
            balances: HashMap::new(),
            next_event_id: 1,
            next_ticket_id: 1,
            next_listing_id: 1,
        }
    }

    /// Contract owner
    #[must_use]
    pub const fn owner(&self) -> Address {
        self.owner
    }

    /// Marketplace operator account
    #[must_use]
    pub const fn marketplace(&self) -> Address {
        self.marketplace
    }

    /// Fee configuration and switches
    #[must_use]
    pub const fn platform_status(&self) -> PlatformStatus {
        PlatformStatus {
            platform: self.platform,
            marketplace: self.marketplace,
            marketplace_paused: self.marketplace_paused,
            transfers_paused: self.transfers_paused,
        }
    }

    /// Look up an event
    #[must_use]
    pub fn event(&self, id: EventId) -> Option<&Event> {
        self.events.get(&id)
    }

    /// Look up a ticket
    #[must_use]
    pub fn ticket(&self, id: TicketId) -> Option<&Ticket> {
        self.tickets.get(&id)
    }

    /// Look up a listing
    #[must_use]
    pub fn listing(&self, id: ListingId) -> Option<&Listing> {
        self.listings.get(&id)
    }

    /// Approved operator of a ticket
    #[must_use]
    pub fn approval(&self, id: TicketId) -> Option<Address> {
        self.approvals.get(&id).copied()
    }

    /// Active listing of a ticket, if any
    #[must_use]
    pub fn active_listing_for(&self, id: TicketId) -> Option<ListingId> {
        self.active_listing_by_ticket.get(&id).copied()
    }

    /// Whether the seat has ever been minted
    #[must_use]
    pub fn is_seat_minted(&self, event_id: EventId, seat_id: &SeatId) -> bool {
        self.seats.contains(&(event_id, seat_id.clone()))
    }

    /// Whether `account` holds a global or event-scoped minter grant.
    ///
    /// Owner and organizer rights are not grants and are not reported here.
    #[must_use]
    pub fn is_minter(&self, event_id: EventId, account: Address) -> bool {
        self.minters.contains(&(MinterScope::Global, account))
            || self.minters.contains(&(MinterScope::Event(event_id), account))
    }

    /// Native balance of an account
    #[must_use]
    pub fn balance(&self, account: Address) -> Wei {
        self.balances.get(&account).copied().unwrap_or_default()
    }

    /// Sum of every balance held on the ledger.
    #[must_use]
    pub fn total_balance(&self) -> Wei {
        self.balances
            .values()
            .fold(Wei::ZERO, |acc, amount| acc.saturating_add(*amount))
    }

    /// Credit native currency to an account, outside any call.
    ///
    /// Stands in for the faucet/genesis allocation of a development chain.
    pub fn fund(&mut self, account: Address, amount: Wei) {
        self.credit(account, amount);
    }

    pub(crate) fn credit(&mut self, account: Address, amount: Wei) {
        if amount.is_zero() {
            return;
        }
        let balance = self.balances.entry(account).or_default();
        *balance = balance.saturating_add(amount);
    }

    pub(crate) fn debit(&mut self, account: Address, amount: Wei) {
        let balance = self.balances.entry(account).or_default();
        *balance = balance.saturating_sub(amount);
    }

    /// Answer a read query.
    #[must_use]
    pub fn query(&self, query: &LedgerQuery) -> QueryResponse {
        match query {
            LedgerQuery::Event { event_id } => QueryResponse::Event(self.event(*event_id).cloned()),
            LedgerQuery::Ticket { ticket_id } => {
                QueryResponse::Ticket(self.ticket(*ticket_id).cloned())
            }
            LedgerQuery::Listing { listing_id } => {
                QueryResponse::Listing(self.listing(*listing_id).cloned())
            }
            LedgerQuery::IsSeatMinted { event_id, seat_id } => {
                QueryResponse::Flag(self.is_seat_minted(*event_id, seat_id))
            }
            LedgerQuery::IsMinter { event_id, account } => {
                QueryResponse::Flag(self.is_minter(*event_id, *account))
            }
            LedgerQuery::ActiveListings => QueryResponse::ListingIds(
                self.listings
                    .values()
                    .filter(|listing| listing.is_active())
                    .map(|listing| listing.id)
                    .collect(),
            ),
            LedgerQuery::ListingsBySeller { seller } => QueryResponse::Listings(
                self.listings
                    .values()
                    .filter(|listing| listing.seller == *seller)
                    .cloned()
                    .collect(),
            ),
            LedgerQuery::TicketsByOwner { owner } => QueryResponse::Tickets(
                self.tickets
                    .values()
                    .filter(|ticket| ticket.owner == *owner)
                    .cloned()
                    .collect(),
            ),
            LedgerQuery::Balance { account } => QueryResponse::Balance(self.balance(*account)),
            LedgerQuery::Platform => QueryResponse::Platform(self.platform_status()),
        }
    }
}
