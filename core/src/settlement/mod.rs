//! The ticket/listing settlement state machine.
//!
//! The ledger evaluates every [`LedgerCall`] with [`SettlementReducer`]: a pure
//! `(state, call) -> Result<(output, logs)>` function. Application-side copies of
//! [`SettlementState`] are caches; the ledger's copy is the source of truth.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut state = SettlementState::genesis(genesis);
//! let ctx = CallContext { caller: organizer, at: clock.now() };
//! let applied = SettlementReducer.reduce(&mut state, LedgerCall::CreateEvent(draft), &ctx)?;
//! assert_eq!(applied.output, CallOutput::EventCreated(EventId::new(1)));
//! ```

pub mod call;
pub mod reducer;
pub mod rules;
pub mod state;

pub use call::{CallOutput, Contract, LedgerCall, LedgerLog, MinterScope, PaymentReason};
pub use reducer::{Applied, CallContext, Logs, SettlementReducer, split_price};
pub use state::{Genesis, LedgerQuery, QueryResponse, SettlementState};
