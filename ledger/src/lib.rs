//! # TicketChain Ledger
//!
//! Client abstraction over the external ledger that holds ticket ownership, listings
//! and funds.
//!
//! The [`LedgerClient`] trait exposes four capabilities: submit a state-mutating call,
//! wait for its confirmations, look up a call by operation id, and read current
//! state. The endpoint behind it is treated as unreliable, rate limited and slow to
//! confirm; callers layer retries on top (see `ticketchain-runtime`).
//!
//! ## Implementations
//!
//! - [`RpcLedger`]: JSON-RPC 2.0 over HTTP, for live deployments
//! - [`InMemoryLedger`]: deterministic in-process ledger for offline mode and tests
//!
//! Both deduplicate by [`OperationId`]: re-submitting a known operation returns the
//! original transaction (or the original rejection) instead of applying it twice.

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use ticketchain_core::settlement::{
    CallOutput, Contract, LedgerCall, LedgerQuery, Logs, QueryResponse,
};
use ticketchain_core::{Address, MarketError, OperationId, TxHash};

pub mod error;
pub mod memory;
pub mod rpc;

pub use error::LedgerError;
pub use memory::InMemoryLedger;
pub use rpc::{RpcConfig, RpcLedger};

/// Boxed future returned by every [`LedgerClient`] method.
pub type LedgerFuture<'a, T> = BoxFuture<'a, Result<T, LedgerError>>;

/// Chain id of a local development node.
pub const DEFAULT_CHAIN_ID: u64 = 31_337;

/// Deployed addresses of the three settlement contracts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractAddresses {
    /// Events and pause switches
    pub event_registry: Address,
    /// Tickets, minters, approvals and transfers
    pub ticket_nft: Address,
    /// Listings, purchases and platform configuration
    pub marketplace: Address,
}

impl ContractAddresses {
    /// Address a call to `contract` is sent to.
    #[must_use]
    pub const fn address_of(&self, contract: Contract) -> Address {
        match contract {
            Contract::EventRegistry => self.event_registry,
            Contract::TicketNft => self.ticket_nft,
            Contract::Marketplace => self.marketplace,
        }
    }
}

/// One logical state-mutating call.
///
/// The operation id is assigned once, before the first attempt, and is re-sent
/// unchanged on every retry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    /// Idempotency key
    pub operation_id: OperationId,
    /// Signing account
    pub from: Address,
    /// The call
    pub call: LedgerCall,
}

impl Submission {
    /// New submission with a fresh operation id.
    #[must_use]
    pub fn new(from: Address, call: LedgerCall) -> Self {
        Self {
            operation_id: OperationId::new(),
            from,
            call,
        }
    }
}

/// A submitted, not yet confirmed transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTransaction {
    /// Transaction hash
    pub tx_hash: TxHash,
    /// Operation the transaction carries
    pub operation_id: OperationId,
}

/// Final status of a mined transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReceiptStatus {
    /// Applied
    Success,
    /// Rejected by the settlement rules, state unchanged
    Reverted {
        /// Rejection
        reason: MarketError,
    },
}

/// Receipt of a mined transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Transaction hash
    pub tx_hash: TxHash,
    /// Operation the transaction carried
    pub operation_id: OperationId,
    /// Block that included the transaction
    pub block_number: u64,
    /// Outcome
    pub status: ReceiptStatus,
    /// Return value, [`CallOutput::Empty`] when reverted
    pub output: CallOutput,
    /// Emitted logs, empty when reverted
    pub logs: Logs,
    /// Block time
    pub timestamp: DateTime<Utc>,
}

impl Receipt {
    /// The rejection carried by a reverted receipt.
    #[must_use]
    pub const fn revert_reason(&self) -> Option<&MarketError> {
        match &self.status {
            ReceiptStatus::Success => None,
            ReceiptStatus::Reverted { reason } => Some(reason),
        }
    }
}

/// Client for the external ledger.
///
/// Methods return boxed futures so the trait stays dyn-compatible and clients can be
/// shared as `Arc<dyn LedgerClient>`.
pub trait LedgerClient: Send + Sync {
    /// Chain identity. Also used to re-establish the session after nonce contention.
    ///
    /// # Errors
    ///
    /// Transport or decoding failures.
    fn chain_id(&self) -> LedgerFuture<'_, u64>;

    /// Submit a call. A known operation id yields the original transaction.
    ///
    /// # Errors
    ///
    /// [`LedgerError::Reverted`] if the rules reject the call, [`LedgerError::ReadOnly`]
    /// without a signing credential, transport errors otherwise.
    fn submit<'a>(&'a self, submission: &'a Submission) -> LedgerFuture<'a, PendingTransaction>;

    /// Wait until a transaction has at least `confirmations` confirmations.
    ///
    /// # Errors
    ///
    /// [`LedgerError::Timeout`] if the wait expires, [`LedgerError::UnknownTransaction`]
    /// if the hash is unknown, transport errors otherwise.
    fn wait_for_confirmations<'a>(
        &'a self,
        tx_hash: &'a TxHash,
        confirmations: u32,
    ) -> LedgerFuture<'a, Receipt>;

    /// Receipt of the transaction that carried an operation, if it was mined.
    ///
    /// # Errors
    ///
    /// Transport or decoding failures.
    fn find_receipt(&self, operation_id: OperationId) -> LedgerFuture<'_, Option<Receipt>>;

    /// Read current state.
    ///
    /// # Errors
    ///
    /// Transport or decoding failures.
    fn query<'a>(&'a self, query: &'a LedgerQuery) -> LedgerFuture<'a, QueryResponse>;
}
