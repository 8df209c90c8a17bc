//! Transaction executor: retries, session resets and reconciliation around a
//! [`LedgerClient`].
//!
//! # Guarantees
//!
//! - One logical operation carries one [`OperationId`], assigned before the first
//!   attempt and re-sent on every retry. The ledger deduplicates by it, so physical
//!   retries apply the call at most once.
//! - Only transient errors are retried. Rejections by the settlement rules and fatal
//!   infrastructure errors surface immediately.
//! - Success is reported only after the receipt reaches the configured number of
//!   confirmations.
//! - Before reporting an infrastructure failure, the executor looks the operation up
//!   by id, so a call that landed while its response was lost still counts as success.
//!   A read-only client is the exception: it never submitted anything.
//!
//! The executor keeps no per-call shared state and is meant to be shared behind an
//! `Arc` by concurrent callers.

use crate::error::ExecutionError;
use crate::metrics::ExecutorMetrics;
use crate::retry::{AttemptState, RetryPolicy};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use ticketchain_core::settlement::{LedgerCall, LedgerQuery, QueryResponse};
use ticketchain_core::{Address, OperationId};
use ticketchain_ledger::{LedgerClient, LedgerError, Receipt, Submission};
use tokio::time::sleep;

/// A confirmed operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Executed {
    /// Confirmed receipt
    pub receipt: Receipt,
    /// Attempts made
    pub attempts: u32,
    /// Whether the receipt was recovered by the lookup after a failed attempt
    pub reconciled: bool,
}

/// Executes ledger calls with retry/backoff and exactly-once-effective semantics.
#[derive(Clone)]
pub struct TransactionExecutor {
    ledger: Arc<dyn LedgerClient>,
    policy: RetryPolicy,
    confirmations: u32,
}

impl TransactionExecutor {
    /// Executor waiting for one confirmation.
    #[must_use]
    pub fn new(ledger: Arc<dyn LedgerClient>, policy: RetryPolicy) -> Self {
        Self {
            ledger,
            policy,
            confirmations: 1,
        }
    }

    /// Wait for `confirmations` confirmations instead of one.
    #[must_use]
    pub const fn with_confirmations(mut self, confirmations: u32) -> Self {
        self.confirmations = confirmations;
        self
    }

    /// The retry policy in force
    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// The underlying ledger client
    #[must_use]
    pub fn ledger(&self) -> &Arc<dyn LedgerClient> {
        &self.ledger
    }

    /// Submit `call` signed by `from` under a fresh operation id.
    ///
    /// # Errors
    ///
    /// See [`TransactionExecutor::submit`].
    pub async fn execute(&self, from: Address, call: LedgerCall) -> Result<Executed, ExecutionError> {
        self.submit(Submission::new(from, call)).await
    }

    /// Submit a prepared submission and wait for its confirmation.
    ///
    /// # Errors
    ///
    /// - [`ExecutionError::Rejected`] if the settlement rules refuse the call
    /// - [`ExecutionError::Fatal`] on a non-retryable infrastructure error, when the
    ///   operation is not found on the ledger afterwards
    /// - [`ExecutionError::Exhausted`] if every attempt failed transiently and the
    ///   operation is not found on the ledger afterwards
    pub async fn submit(&self, submission: Submission) -> Result<Executed, ExecutionError> {
        let operation = submission.call.name();
        let started = Instant::now();
        tracing::info!(
            operation_id = %submission.operation_id,
            operation,
            from = %submission.from,
            "Submitting ledger call"
        );

        let outcome = self
            .with_retry(operation, || self.attempt(&submission))
            .await;

        let result = match outcome {
            Ok((receipt, attempts)) => {
                tracing::info!(
                    operation_id = %submission.operation_id,
                    operation,
                    attempts,
                    tx_hash = %receipt.tx_hash,
                    block_number = receipt.block_number,
                    "Ledger call confirmed"
                );
                Ok(Executed {
                    receipt,
                    attempts,
                    reconciled: false,
                })
            }
            Err(
                failure @ (ExecutionError::Exhausted { .. }
                | ExecutionError::Fatal { .. }),
            ) if !failure.is_read_only() => {
                self.reconcile(submission.operation_id, operation, failure)
                    .await
            }
            Err(error) => Err(error),
        };

        match &result {
            Err(ExecutionError::Rejected(reason)) => {
                tracing::info!(
                    operation_id = %submission.operation_id,
                    operation,
                    code = reason.code(),
                    "Ledger call rejected"
                );
                ExecutorMetrics::record_rejection(operation, reason.code());
            }
            Err(error) => {
                tracing::error!(
                    operation_id = %submission.operation_id,
                    operation,
                    attempts = error.attempts(),
                    code = error.code(),
                    error = %error,
                    "Ledger call failed"
                );
                ExecutorMetrics::record_failure(operation, error.code());
            }
            Ok(_) => {}
        }
        ExecutorMetrics::record_duration(operation, started.elapsed());
        result
    }

    /// Read ledger state, retrying transient failures.
    ///
    /// # Errors
    ///
    /// [`ExecutionError::Exhausted`] or [`ExecutionError::Fatal`].
    pub async fn query(&self, query: LedgerQuery) -> Result<QueryResponse, ExecutionError> {
        let result = self
            .with_retry("query", || self.ledger.query(&query))
            .await
            .map(|(response, _)| response);

        if let Err(error) = &result {
            tracing::error!(
                ?query,
                attempts = error.attempts(),
                code = error.code(),
                error = %error,
                "Ledger query failed"
            );
            ExecutorMetrics::record_failure("query", error.code());
        }
        result
    }

    /// Chain identity, retrying transient failures.
    ///
    /// # Errors
    ///
    /// [`ExecutionError::Exhausted`] or [`ExecutionError::Fatal`].
    pub async fn chain_id(&self) -> Result<u64, ExecutionError> {
        self.with_retry("chain_id", || self.ledger.chain_id())
            .await
            .map(|(chain_id, _)| chain_id)
    }

    /// One physical attempt: submit, wait, turn a reverted receipt into a rejection.
    async fn attempt(&self, submission: &Submission) -> Result<Receipt, LedgerError> {
        let pending = self.ledger.submit(submission).await?;
        let receipt = self
            .ledger
            .wait_for_confirmations(&pending.tx_hash, self.confirmations)
            .await?;
        match receipt.revert_reason() {
            Some(reason) => Err(LedgerError::Reverted(reason.clone())),
            None => Ok(receipt),
        }
    }

    /// Runs `operation` until it succeeds, fails non-transiently, or runs out of
    /// attempts. Returns the value and the number of attempts made.
    async fn with_retry<T, F, Fut>(
        &self,
        operation: &'static str,
        mut attempt_fn: F,
    ) -> Result<(T, u32), ExecutionError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LedgerError>>,
    {
        let mut state: AttemptState<LedgerError> = AttemptState::first();

        loop {
            let attempt = state.attempt();
            ExecutorMetrics::record_attempt(operation);

            let error = match attempt_fn().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!(operation, attempt, "Operation succeeded after retry");
                    }
                    return Ok((value, attempt));
                }
                Err(LedgerError::Reverted(reason)) => return Err(ExecutionError::Rejected(reason)),
                Err(error) => error,
            };

            if !error.is_retryable() {
                tracing::warn!(
                    operation,
                    attempt,
                    code = error.code(),
                    error = %error,
                    "Error is not retryable, failing immediately"
                );
                return Err(ExecutionError::Fatal {
                    attempts: attempt,
                    source: error,
                });
            }

            if self.policy.is_final(attempt) {
                return Err(ExecutionError::Exhausted {
                    attempts: attempt,
                    source: error,
                });
            }

            state = state.next(error, self.policy.backoff_after(attempt));
            let backoff = state.backoff();
            if let Some(error) = state.last_error() {
                tracing::warn!(
                    operation,
                    attempt,
                    max_attempts = self.policy.max_attempts,
                    backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                    code = error.code(),
                    error = %error,
                    "Ledger call failed, retrying"
                );
                ExecutorMetrics::record_retry(operation, error.code());
            }
            sleep(backoff).await;

            if state
                .last_error()
                .is_some_and(LedgerError::is_price_contention)
            {
                self.reset_session(operation).await;
            }
        }
    }

    /// Re-establish the session after nonce or fee contention. Failure is logged only.
    async fn reset_session(&self, operation: &'static str) {
        match self.ledger.chain_id().await {
            Ok(chain_id) => {
                tracing::info!(operation, chain_id, "Ledger session reset");
                ExecutorMetrics::record_session_reset(true);
            }
            Err(error) => {
                tracing::warn!(
                    operation,
                    error = %error,
                    "Ledger session reset failed, continuing with retry"
                );
                ExecutorMetrics::record_session_reset(false);
            }
        }
    }

    /// Look the operation up after an infrastructure failure. A landed receipt wins over
    /// the failure; otherwise `failure` is returned unchanged.
    async fn reconcile(
        &self,
        operation_id: OperationId,
        operation: &'static str,
        failure: ExecutionError,
    ) -> Result<Executed, ExecutionError> {
        let attempts = failure.attempts().unwrap_or(1);
        match self.ledger.find_receipt(operation_id).await {
            Ok(Some(receipt)) => {
                if let Some(reason) = receipt.revert_reason() {
                    ExecutorMetrics::record_reconciliation("reverted");
                    return Err(ExecutionError::Rejected(reason.clone()));
                }
                tracing::info!(
                    %operation_id,
                    operation,
                    attempts,
                    code = failure.code(),
                    tx_hash = %receipt.tx_hash,
                    "Operation found on ledger despite failed attempts"
                );
                ExecutorMetrics::record_reconciliation("landed");
                Ok(Executed {
                    receipt,
                    attempts,
                    reconciled: true,
                })
            }
            Ok(None) => {
                ExecutorMetrics::record_reconciliation("absent");
                Err(failure)
            }
            Err(lookup_error) => {
                tracing::warn!(
                    %operation_id,
                    operation,
                    error = %lookup_error,
                    "Reconciliation lookup failed"
                );
                ExecutorMetrics::record_reconciliation("unavailable");
                Err(failure)
            }
        }
    }
}
