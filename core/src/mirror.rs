//! Transition facts published to the read mirror.
//!
//! The mirror is a denormalized, queryable copy of ledger state maintained outside this
//! workspace. The core pushes one [`TransitionFact`] per entity transition to a
//! [`MirrorSink`]; it never reads the mirror back, so a lagging or failing mirror
//! cannot affect correctness.

use crate::settlement::LedgerLog;
use crate::types::EventId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Kind of entity a fact describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    /// An event
    Event,
    /// A ticket
    Ticket,
    /// A listing
    Listing,
}

/// State an entity moved into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactState {
    /// Event created
    Created,
    /// Event paused
    Paused,
    /// Event unpaused
    Unpaused,
    /// Ticket minted
    Minted,
    /// Ticket changed hands
    Transferred,
    /// Ticket redeemed
    Used,
    /// Ticket revoked
    Revoked,
    /// Listing opened
    Active,
    /// Listing purchased
    Sold,
    /// Listing withdrawn
    Cancelled,
}

/// One confirmed entity transition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionFact {
    /// Entity kind
    pub entity_type: EntityType,
    /// Entity id within its kind
    pub entity_id: u64,
    /// Owning event, absent for events themselves
    pub event_id: Option<EventId>,
    /// New state
    pub new_state: FactState,
    /// Confirmation time
    pub timestamp: DateTime<Utc>,
}

impl TransitionFact {
    /// Fact for a log, or `None` for logs that are not entity transitions
    /// (payments, approvals, minter grants and platform configuration).
    #[must_use]
    pub fn from_log(log: &LedgerLog, timestamp: DateTime<Utc>) -> Option<Self> {
        let (entity_type, entity_id, event_id, new_state) = match log {
            LedgerLog::EventCreated { event_id, .. } => {
                (EntityType::Event, event_id.value(), None, FactState::Created)
            }
            LedgerLog::EventPaused { event_id } => {
                (EntityType::Event, event_id.value(), None, FactState::Paused)
            }
            LedgerLog::EventUnpaused { event_id } => {
                (EntityType::Event, event_id.value(), None, FactState::Unpaused)
            }
            LedgerLog::TicketMinted {
                ticket_id, event_id, ..
            } => (
                EntityType::Ticket,
                ticket_id.value(),
                Some(*event_id),
                FactState::Minted,
            ),
            LedgerLog::TicketTransferred {
                ticket_id, event_id, ..
            } => (
                EntityType::Ticket,
                ticket_id.value(),
                Some(*event_id),
                FactState::Transferred,
            ),
            LedgerLog::TicketUsed {
                ticket_id,
                event_id,
            } => (
                EntityType::Ticket,
                ticket_id.value(),
                Some(*event_id),
                FactState::Used,
            ),
            LedgerLog::TicketRevoked {
                ticket_id,
                event_id,
            } => (
                EntityType::Ticket,
                ticket_id.value(),
                Some(*event_id),
                FactState::Revoked,
            ),
            LedgerLog::ListingCreated {
                listing_id,
                event_id,
                ..
            } => (
                EntityType::Listing,
                listing_id.value(),
                Some(*event_id),
                FactState::Active,
            ),
            LedgerLog::ListingSold {
                listing_id,
                event_id,
                ..
            } => (
                EntityType::Listing,
                listing_id.value(),
                Some(*event_id),
                FactState::Sold,
            ),
            LedgerLog::ListingCancelled {
                listing_id,
                event_id,
                ..
            } => (
                EntityType::Listing,
                listing_id.value(),
                Some(*event_id),
                FactState::Cancelled,
            ),
            LedgerLog::MinterUpdated { .. }
            | LedgerLog::Approval { .. }
            | LedgerLog::Payment { .. }
            | LedgerLog::TransfersPauseChanged { .. }
            | LedgerLog::MarketplacePauseChanged { .. }
            | LedgerLog::PlatformFeeUpdated { .. }
            | LedgerLog::PlatformAddressUpdated { .. } => return None,
        };

        Some(Self {
            entity_type,
            entity_id,
            event_id,
            new_state,
            timestamp,
        })
    }

    /// Facts for a sequence of logs, in log order.
    #[must_use]
    pub fn from_logs<'a>(
        logs: impl IntoIterator<Item = &'a LedgerLog>,
        timestamp: DateTime<Utc>,
    ) -> Vec<Self> {
        logs.into_iter()
            .filter_map(|log| Self::from_log(log, timestamp))
            .collect()
    }
}

/// Errors a mirror sink may report.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MirrorError {
    /// The mirror could not be reached
    #[error("Mirror unavailable: {0}")]
    Unavailable(String),

    /// The mirror refused the fact
    #[error("Mirror rejected fact: {0}")]
    Rejected(String),
}

impl MirrorError {
    /// Stable machine-readable code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "MIRROR_UNAVAILABLE",
            Self::Rejected(_) => "MIRROR_REJECTED",
        }
    }
}

/// Destination of transition facts.
///
/// Uses explicit `Pin<Box<dyn Future>>` returns so the trait stays dyn-compatible and
/// sinks can be held as `Arc<dyn MirrorSink>`.
pub trait MirrorSink: Send + Sync {
    /// Deliver one fact.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError`] if the fact could not be delivered. Callers log the error
    /// and carry on.
    fn publish(
        &self,
        fact: TransitionFact,
    ) -> Pin<Box<dyn Future<Output = Result<(), MirrorError>> + Send + '_>>;
}

/// Sink that drops every fact, for deployments without a mirror.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopMirror;

impl MirrorSink for NoopMirror {
    fn publish(
        &self,
        _fact: TransitionFact,
    ) -> Pin<Box<dyn Future<Output = Result<(), MirrorError>> + Send + '_>> {
        Box::pin(async { Ok(()) })
    }
}
