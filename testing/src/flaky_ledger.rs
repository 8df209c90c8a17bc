//! Fault-injecting ledger for executor and service tests
//!
//! [`FlakyLedger`] wraps an [`InMemoryLedger`] and fails calls according to a script,
//! counting every call it sees. Scripted faults are consumed in order, one per call of
//! the matching kind; once a queue is empty calls go straight through.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Panics only on a poisoned lock

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use ticketchain_core::settlement::{LedgerQuery, QueryResponse};
use ticketchain_core::{OperationId, TxHash};
use ticketchain_ledger::{
    InMemoryLedger, LedgerClient, LedgerError, LedgerFuture, PendingTransaction, Receipt,
    Submission,
};

/// How a scripted submit fails.
#[derive(Clone, Debug)]
enum SubmitFault {
    /// Fail without reaching the ledger
    Before(LedgerError),
    /// Apply the call, then lose the response
    After(LedgerError),
}

#[derive(Default)]
struct Script {
    submit: VecDeque<SubmitFault>,
    confirm: VecDeque<LedgerError>,
    query: VecDeque<LedgerError>,
    chain_id: VecDeque<LedgerError>,
    persistent_submit: Option<LedgerError>,
}

/// Call counters of a [`FlakyLedger`].
#[derive(Debug, Default)]
pub struct CallCounts {
    submit: AtomicUsize,
    confirm: AtomicUsize,
    find_receipt: AtomicUsize,
    query: AtomicUsize,
    chain_id: AtomicUsize,
}

impl CallCounts {
    /// Submit calls seen
    pub fn submit(&self) -> usize {
        self.submit.load(Ordering::SeqCst)
    }

    /// Confirmation waits seen
    pub fn confirm(&self) -> usize {
        self.confirm.load(Ordering::SeqCst)
    }

    /// Operation lookups seen
    pub fn find_receipt(&self) -> usize {
        self.find_receipt.load(Ordering::SeqCst)
    }

    /// Queries seen
    pub fn query(&self) -> usize {
        self.query.load(Ordering::SeqCst)
    }

    /// Chain id requests seen (session resets)
    pub fn chain_id(&self) -> usize {
        self.chain_id.load(Ordering::SeqCst)
    }
}

/// [`LedgerClient`] that injects scripted failures in front of an in-memory ledger.
///
/// # Example
///
/// ```ignore
/// let ledger = FlakyLedger::new(InMemoryLedger::new(genesis()))
///     .fail_submit(LedgerError::Timeout("slow".into()))
///     .lose_response(LedgerError::Network("reset".into()));
/// ```
pub struct FlakyLedger {
    inner: InMemoryLedger,
    script: Mutex<Script>,
    calls: CallCounts,
}

impl FlakyLedger {
    /// Wrap a ledger with an empty script
    #[must_use]
    pub fn new(inner: InMemoryLedger) -> Self {
        Self {
            inner,
            script: Mutex::new(Script::default()),
            calls: CallCounts::default(),
        }
    }

    /// Next submit fails before reaching the ledger
    #[must_use]
    pub fn fail_submit(self, error: LedgerError) -> Self {
        self.script
            .lock()
            .unwrap()
            .submit
            .push_back(SubmitFault::Before(error));
        self
    }

    /// Next submit is applied but its response is lost
    #[must_use]
    pub fn lose_response(self, error: LedgerError) -> Self {
        self.lose_next_response(error);
        self
    }

    /// As [`FlakyLedger::lose_response`], on a ledger already shared.
    pub fn lose_next_response(&self, error: LedgerError) {
        self.script
            .lock()
            .unwrap()
            .submit
            .push_back(SubmitFault::After(error));
    }

    /// Every submit fails before reaching the ledger, after scripted faults run out
    #[must_use]
    pub fn always_fail_submit(self, error: LedgerError) -> Self {
        self.script.lock().unwrap().persistent_submit = Some(error);
        self
    }

    /// Next confirmation wait fails
    #[must_use]
    pub fn fail_confirm(self, error: LedgerError) -> Self {
        self.script.lock().unwrap().confirm.push_back(error);
        self
    }

    /// Next query fails
    #[must_use]
    pub fn fail_query(self, error: LedgerError) -> Self {
        self.script.lock().unwrap().query.push_back(error);
        self
    }

    /// Next chain id request fails
    #[must_use]
    pub fn fail_chain_id(self, error: LedgerError) -> Self {
        self.script.lock().unwrap().chain_id.push_back(error);
        self
    }

    /// The wrapped ledger
    pub const fn inner(&self) -> &InMemoryLedger {
        &self.inner
    }

    /// Call counters
    pub const fn calls(&self) -> &CallCounts {
        &self.calls
    }

    fn next_submit_fault(&self) -> Option<SubmitFault> {
        let mut script = self.script.lock().unwrap();
        script.submit.pop_front().or_else(|| {
            script
                .persistent_submit
                .clone()
                .map(SubmitFault::Before)
        })
    }
}

impl LedgerClient for FlakyLedger {
    fn chain_id(&self) -> LedgerFuture<'_, u64> {
        Box::pin(async move {
            self.calls.chain_id.fetch_add(1, Ordering::SeqCst);
            let fault = self.script.lock().unwrap().chain_id.pop_front();
            match fault {
                Some(error) => Err(error),
                None => self.inner.chain_id().await,
            }
        })
    }

    fn submit<'a>(&'a self, submission: &'a Submission) -> LedgerFuture<'a, PendingTransaction> {
        Box::pin(async move {
            self.calls.submit.fetch_add(1, Ordering::SeqCst);
            match self.next_submit_fault() {
                Some(SubmitFault::Before(error)) => Err(error),
                Some(SubmitFault::After(error)) => {
                    // The ledger's verdict is discarded along with the response.
                    let _ = self.inner.submit(submission).await;
                    Err(error)
                }
                None => self.inner.submit(submission).await,
            }
        })
    }

    fn wait_for_confirmations<'a>(
        &'a self,
        tx_hash: &'a TxHash,
        confirmations: u32,
    ) -> LedgerFuture<'a, Receipt> {
        Box::pin(async move {
            self.calls.confirm.fetch_add(1, Ordering::SeqCst);
            let fault = self.script.lock().unwrap().confirm.pop_front();
            match fault {
                Some(error) => Err(error),
                None => {
                    self.inner
                        .wait_for_confirmations(tx_hash, confirmations)
                        .await
                }
            }
        })
    }

    fn find_receipt(&self, operation_id: OperationId) -> LedgerFuture<'_, Option<Receipt>> {
        Box::pin(async move {
            self.calls.find_receipt.fetch_add(1, Ordering::SeqCst);
            self.inner.find_receipt(operation_id).await
        })
    }

    fn query<'a>(&'a self, query: &'a LedgerQuery) -> LedgerFuture<'a, QueryResponse> {
        Box::pin(async move {
            self.calls.query.fetch_add(1, Ordering::SeqCst);
            let fault = self.script.lock().unwrap().query.pop_front();
            match fault {
                Some(error) => Err(error),
                None => self.inner.query(query).await,
            }
        })
    }
}
