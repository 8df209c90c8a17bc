//! # TicketChain Core
//!
//! Domain types and the settlement state machine of the TicketChain marketplace.
//!
//! Ticket ownership, listings and funds live on an external ledger. This crate holds
//! the rules that ledger enforces, expressed as a pure reducer, plus the value types
//! and errors every other crate in the workspace speaks.
//!
//! ## Core Concepts
//!
//! - **Event**: a ticketed occasion with a supply ceiling, royalty and resale cap
//! - **Ticket**: one seat of one event, minted at most once
//! - **Listing**: a fixed-price resale offer, settled atomically on purchase
//! - **Reducer**: pure function `(State, Call, Context) → Result<(Output, Logs)>`
//! - **Transition fact**: what the read mirror learns after a confirmed change
//!
//! ## Example
//!
//! ```ignore
//! use ticketchain_core::reducer::Reducer;
//! use ticketchain_core::settlement::*;
//!
//! let mut state = SettlementState::genesis(genesis);
//! let ctx = CallContext { caller: seller, at: clock.now() };
//! let applied = SettlementReducer.reduce(
//!     &mut state,
//!     LedgerCall::CreateListing { ticket_id, price },
//!     &ctx,
//! )?;
//! ```

pub mod error;
pub mod mirror;
pub mod model;
pub mod settlement;
pub mod types;

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use error::{ErrorKind, MarketError};
pub use model::{Event, EventDraft, Listing, ListingStatus, Settlement, Ticket, TicketStatus};
pub use types::{
    Address, Bps, EventId, Fingerprint, ListingId, OperationId, SeatId, TicketId, TxHash, Wei,
};

/// Reducer module - the pure state transition abstraction
///
/// Reducers contain all business rules and are deterministic and testable. A reducer
/// either applies a call completely or rejects it and leaves the state untouched.
pub mod reducer {
    /// The Reducer trait
    ///
    /// # Type Parameters
    ///
    /// - `State`: The state this reducer operates on
    /// - `Action`: The input this reducer processes
    /// - `Environment`: Per-call context (caller, time)
    /// - `Output`: What a successful reduction yields
    /// - `Error`: Why a reduction was rejected
    ///
    /// # Example
    ///
    /// ```ignore
    /// impl Reducer for CounterReducer {
    ///     type State = u64;
    ///     type Action = u64;
    ///     type Environment = ();
    ///     type Output = u64;
    ///     type Error = Overflow;
    ///
    ///     fn reduce(&self, state: &mut u64, by: u64, _env: &()) -> Result<u64, Overflow> {
    ///         *state = state.checked_add(by).ok_or(Overflow)?;
    ///         Ok(*state)
    ///     }
    /// }
    /// ```
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The per-call context
        type Environment;

        /// Value produced by an applied action
        type Output;

        /// Rejection reason
        type Error;

        /// Reduce an action into a state change
        ///
        /// # Errors
        ///
        /// Returns `Self::Error` when the action is rejected. The state must be left
        /// exactly as it was.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> Result<Self::Output, Self::Error>;
    }
}

/// Environment module - injected dependencies
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```ignore
    /// // Test - fixed time for deterministic tests
    /// struct FixedClock { time: DateTime<Utc> }
    /// impl Clock for FixedClock {
    ///     fn now(&self) -> DateTime<Utc> {
    ///         self.time
    ///     }
    /// }
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall-clock time.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
