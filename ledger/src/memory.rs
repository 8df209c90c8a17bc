//! Deterministic in-process ledger.
//!
//! Evaluates calls with the same [`SettlementReducer`] the deployed contracts encode,
//! one at a time under a lock, which gives the per-account linearizability the real
//! ledger provides. Transaction hashes are pseudo-random but reproducible from the
//! seed, and every mined transaction counts as confirmed immediately.

use crate::{
    DEFAULT_CHAIN_ID, LedgerClient, LedgerError, LedgerFuture, PendingTransaction, Receipt,
    ReceiptStatus, Submission,
};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::collections::HashMap;
use std::sync::Arc;
use ticketchain_core::environment::{Clock, SystemClock};
use ticketchain_core::reducer::Reducer;
use ticketchain_core::settlement::{
    CallContext, CallOutput, Genesis, LedgerQuery, Logs, QueryResponse, SettlementReducer,
    SettlementState,
};
use ticketchain_core::{Address, OperationId, TxHash, Wei};
use tokio::sync::Mutex;

const DEFAULT_SEED: u64 = 0x7469_636b_6574;

struct Chain {
    state: SettlementState,
    rng: StdRng,
    block_number: u64,
    by_operation: HashMap<OperationId, TxHash>,
    receipts: HashMap<TxHash, Receipt>,
}

impl Chain {
    fn next_tx_hash(&mut self) -> TxHash {
        loop {
            let mut bytes = [0u8; 32];
            self.rng.fill_bytes(&mut bytes);
            let hash = TxHash::from_bytes(bytes);
            if !hash.is_zero() && !self.receipts.contains_key(&hash) {
                return hash;
            }
        }
    }
}

/// In-process [`LedgerClient`].
pub struct InMemoryLedger {
    chain_id: u64,
    clock: Arc<dyn Clock>,
    chain: Mutex<Chain>,
}

impl InMemoryLedger {
    /// Fresh ledger deployed with `genesis`, on the system clock.
    #[must_use]
    pub fn new(genesis: Genesis) -> Self {
        Self::with_clock(genesis, Arc::new(SystemClock))
    }

    /// Fresh ledger whose block timestamps come from `clock`.
    #[must_use]
    pub fn with_clock(genesis: Genesis, clock: Arc<dyn Clock>) -> Self {
        Self {
            chain_id: DEFAULT_CHAIN_ID,
            clock,
            chain: Mutex::new(Chain {
                state: SettlementState::genesis(genesis),
                rng: StdRng::seed_from_u64(DEFAULT_SEED),
                block_number: 0,
                by_operation: HashMap::new(),
                receipts: HashMap::new(),
            }),
        }
    }

    /// Report a different chain id
    #[must_use]
    pub const fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = chain_id;
        self
    }

    /// Reseed the transaction hash generator
    #[must_use]
    pub fn with_seed(self, seed: u64) -> Self {
        let mut chain = self.chain.into_inner();
        chain.rng = StdRng::seed_from_u64(seed);
        Self {
            chain_id: self.chain_id,
            clock: self.clock,
            chain: Mutex::new(chain),
        }
    }

    /// Credit native currency to an account, as a development faucet would.
    pub async fn fund(&self, account: Address, amount: Wei) {
        self.chain.lock().await.state.fund(account, amount);
    }

    /// Run `f` against the current state.
    pub async fn inspect<R>(&self, f: impl FnOnce(&SettlementState) -> R) -> R {
        f(&self.chain.lock().await.state)
    }

    /// Number of mined transactions, including reverted ones.
    pub async fn block_number(&self) -> u64 {
        self.chain.lock().await.block_number
    }

    async fn apply(&self, submission: &Submission) -> Result<PendingTransaction, LedgerError> {
        let mut chain = self.chain.lock().await;

        if let Some(tx_hash) = chain.by_operation.get(&submission.operation_id).copied() {
            tracing::debug!(
                operation_id = %submission.operation_id,
                tx_hash = %tx_hash,
                "Replayed operation, returning original transaction"
            );
            return match chain.receipts.get(&tx_hash).and_then(Receipt::revert_reason) {
                Some(reason) => Err(LedgerError::Reverted(reason.clone())),
                None => Ok(PendingTransaction {
                    tx_hash,
                    operation_id: submission.operation_id,
                }),
            };
        }

        let timestamp = self.clock.now();
        let ctx = CallContext {
            caller: submission.from,
            at: timestamp,
        };
        let result = SettlementReducer.reduce(&mut chain.state, submission.call.clone(), &ctx);

        let tx_hash = chain.next_tx_hash();
        chain.block_number += 1;
        let (status, output, logs) = match &result {
            Ok(applied) => (
                ReceiptStatus::Success,
                applied.output.clone(),
                applied.logs.clone(),
            ),
            Err(reason) => (
                ReceiptStatus::Reverted {
                    reason: reason.clone(),
                },
                CallOutput::Empty,
                Logs::new(),
            ),
        };
        let receipt = Receipt {
            tx_hash,
            operation_id: submission.operation_id,
            block_number: chain.block_number,
            status,
            output,
            logs,
            timestamp,
        };
        chain.by_operation.insert(submission.operation_id, tx_hash);
        chain.receipts.insert(tx_hash, receipt);

        match result {
            Ok(_) => Ok(PendingTransaction {
                tx_hash,
                operation_id: submission.operation_id,
            }),
            Err(reason) => Err(LedgerError::Reverted(reason)),
        }
    }
}

impl LedgerClient for InMemoryLedger {
    fn chain_id(&self) -> LedgerFuture<'_, u64> {
        Box::pin(async move { Ok(self.chain_id) })
    }

    fn submit<'a>(&'a self, submission: &'a Submission) -> LedgerFuture<'a, PendingTransaction> {
        Box::pin(self.apply(submission))
    }

    fn wait_for_confirmations<'a>(
        &'a self,
        tx_hash: &'a TxHash,
        _confirmations: u32,
    ) -> LedgerFuture<'a, Receipt> {
        Box::pin(async move {
            self.chain
                .lock()
                .await
                .receipts
                .get(tx_hash)
                .cloned()
                .ok_or(LedgerError::UnknownTransaction(*tx_hash))
        })
    }

    fn find_receipt(&self, operation_id: OperationId) -> LedgerFuture<'_, Option<Receipt>> {
        Box::pin(async move {
            let chain = self.chain.lock().await;
            Ok(chain
                .by_operation
                .get(&operation_id)
                .and_then(|tx_hash| chain.receipts.get(tx_hash))
                .cloned())
        })
    }

    fn query<'a>(&'a self, query: &'a LedgerQuery) -> LedgerFuture<'a, QueryResponse> {
        Box::pin(async move { Ok(self.chain.lock().await.state.query(query)) })
    }
}
