//! Executor behaviour against a fault-injecting ledger.
//!
//! Time is paused, so backoff delays are asserted exactly.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;
use ticketchain_core::settlement::{CallOutput, LedgerCall, LedgerQuery, QueryResponse};
use ticketchain_core::{EventId, ListingId, MarketError, TicketId, Wei};
use ticketchain_ledger::{InMemoryLedger, LedgerError};
use ticketchain_runtime::{ExecutionError, RetryPolicy, TransactionExecutor};
use ticketchain_testing::FlakyLedger;
use ticketchain_testing::fixtures::{event_draft, genesis, organizer};
use tokio::time::Instant;

fn flaky() -> FlakyLedger {
    FlakyLedger::new(InMemoryLedger::new(genesis()))
}

fn executor_for(ledger: &Arc<FlakyLedger>) -> TransactionExecutor {
    TransactionExecutor::new(ledger.clone(), RetryPolicy::default())
}

fn create_event() -> LedgerCall {
    LedgerCall::CreateEvent(event_draft())
}

async fn events_created(ledger: &FlakyLedger) -> usize {
    ledger
        .inner()
        .inspect(|state| {
            (1..=5)
                .filter(|id| state.event(EventId::new(*id)).is_some())
                .count()
        })
        .await
}

#[tokio::test(start_paused = true)]
async fn test_transient_failure_then_success() {
    let ledger = Arc::new(flaky().fail_submit(LedgerError::Timeout("slow".into())));
    let executor = executor_for(&ledger);
    let start = Instant::now();

    let executed = executor.execute(organizer(), create_event()).await.unwrap();

    assert_eq!(executed.attempts, 2);
    assert!(!executed.reconciled);
    assert_eq!(executed.receipt.output, CallOutput::EventCreated(EventId::new(1)));
    assert_eq!(start.elapsed(), Duration::from_millis(1000));
    assert_eq!(ledger.calls().submit(), 2);
    assert_eq!(ledger.calls().find_receipt(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_persistent_failure_exhausts_attempts() {
    let ledger = Arc::new(flaky().always_fail_submit(LedgerError::Network("refused".into())));
    let executor = executor_for(&ledger);
    let start = Instant::now();

    let error = executor
        .execute(organizer(), create_event())
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        ExecutionError::Exhausted {
            attempts: 3,
            source: LedgerError::Network(_)
        }
    ));
    assert_eq!(error.code(), "NETWORK_ERROR");
    // 1000ms + 2000ms, no delay after the final attempt
    assert_eq!(start.elapsed(), Duration::from_millis(3000));
    assert_eq!(ledger.calls().submit(), 3);
    assert_eq!(ledger.calls().find_receipt(), 1);
    assert_eq!(events_created(&ledger).await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_lost_response_is_applied_once() {
    let ledger = Arc::new(flaky().lose_response(LedgerError::Network("reset".into())));
    let executor = executor_for(&ledger);

    let executed = executor.execute(organizer(), create_event()).await.unwrap();

    assert_eq!(executed.attempts, 2);
    assert_eq!(executed.receipt.output, CallOutput::EventCreated(EventId::new(1)));
    assert_eq!(events_created(&ledger).await, 1);
    assert_eq!(ledger.inner().block_number().await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_landed_operation_is_reconciled_after_exhaustion() {
    let ledger = Arc::new(
        flaky()
            .lose_response(LedgerError::Network("reset".into()))
            .always_fail_submit(LedgerError::Server {
                status: 503,
                message: "unavailable".into(),
            }),
    );
    let executor = executor_for(&ledger);

    let executed = executor.execute(organizer(), create_event()).await.unwrap();

    assert!(executed.reconciled);
    assert_eq!(executed.attempts, 3);
    assert_eq!(executed.receipt.output, CallOutput::EventCreated(EventId::new(1)));
    assert_eq!(ledger.calls().find_receipt(), 1);
    assert_eq!(events_created(&ledger).await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_rejection_is_not_retried() {
    let ledger = Arc::new(flaky());
    let executor = executor_for(&ledger);
    let start = Instant::now();

    let error = executor
        .execute(
            organizer(),
            LedgerCall::CreateListing {
                ticket_id: TicketId::new(9),
                price: Wei::new(100),
            },
        )
        .await
        .unwrap_err();

    assert_eq!(
        error,
        ExecutionError::Rejected(MarketError::TicketDoesNotExist {
            ticket_id: TicketId::new(9)
        })
    );
    assert_eq!(ledger.calls().submit(), 1);
    assert_eq!(ledger.calls().find_receipt(), 0);
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_rejection_replayed_after_lost_response() {
    let ledger = Arc::new(flaky().lose_response(LedgerError::Timeout("slow".into())));
    let executor = executor_for(&ledger);

    let error = executor
        .execute(
            organizer(),
            LedgerCall::CancelListing {
                listing_id: ListingId::new(1),
            },
        )
        .await
        .unwrap_err();

    assert_eq!(
        error.rejection(),
        Some(&MarketError::ListingNotActive {
            listing_id: ListingId::new(1)
        })
    );
    assert_eq!(ledger.calls().submit(), 2);
    assert_eq!(ledger.inner().block_number().await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_nonce_conflict_resets_session() {
    let ledger = Arc::new(flaky().fail_submit(LedgerError::NonceConflict("nonce too low".into())));
    let executor = executor_for(&ledger);

    let executed = executor.execute(organizer(), create_event()).await.unwrap();

    assert_eq!(executed.attempts, 2);
    assert_eq!(ledger.calls().chain_id(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failed_session_reset_does_not_fail_operation() {
    let ledger = Arc::new(
        flaky()
            .fail_submit(LedgerError::Underpriced("replacement transaction underpriced".into()))
            .fail_chain_id(LedgerError::Timeout("slow".into())),
    );
    let executor = executor_for(&ledger);

    let executed = executor.execute(organizer(), create_event()).await.unwrap();

    assert_eq!(executed.attempts, 2);
    assert_eq!(ledger.calls().chain_id(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_plain_timeout_does_not_reset_session() {
    let ledger = Arc::new(flaky().fail_submit(LedgerError::Timeout("slow".into())));
    let executor = executor_for(&ledger);

    executor.execute(organizer(), create_event()).await.unwrap();

    assert_eq!(ledger.calls().chain_id(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_read_only_client_fails_immediately() {
    let ledger = Arc::new(flaky().fail_submit(LedgerError::ReadOnly));
    let executor = executor_for(&ledger);

    let error = executor
        .execute(organizer(), create_event())
        .await
        .unwrap_err();

    assert_eq!(
        error,
        ExecutionError::Fatal {
            attempts: 1,
            source: LedgerError::ReadOnly
        }
    );
    assert_eq!(ledger.calls().find_receipt(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_fatal_error_after_landing_is_reconciled() {
    let ledger = Arc::new(
        flaky().lose_response(LedgerError::InvalidResponse("truncated body".into())),
    );
    let executor = executor_for(&ledger);

    let executed = executor.execute(organizer(), create_event()).await.unwrap();

    assert!(executed.reconciled);
    assert_eq!(executed.attempts, 1);
    assert_eq!(executed.receipt.output, CallOutput::EventCreated(EventId::new(1)));
    assert_eq!(ledger.calls().submit(), 1);
    assert_eq!(ledger.calls().find_receipt(), 1);
    assert_eq!(events_created(&ledger).await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_fatal_error_before_landing_is_surfaced() {
    let ledger = Arc::new(flaky().fail_submit(LedgerError::Rpc {
        code: -32000,
        message: "unknown method".into(),
    }));
    let executor = executor_for(&ledger);

    let error = executor
        .execute(organizer(), create_event())
        .await
        .unwrap_err();

    assert!(matches!(error, ExecutionError::Fatal { attempts: 1, .. }));
    assert_eq!(error.code(), "RPC_ERROR");
    assert_eq!(ledger.calls().find_receipt(), 1);
    assert_eq!(events_created(&ledger).await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_fatal_confirmation_failure_is_reconciled() {
    let ledger = Arc::new(
        flaky().fail_confirm(LedgerError::InvalidResponse("receipt missing logs".into())),
    );
    let executor = executor_for(&ledger);

    let executed = executor.execute(organizer(), create_event()).await.unwrap();

    assert!(executed.reconciled);
    assert_eq!(ledger.calls().submit(), 1);
    assert_eq!(ledger.calls().confirm(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_confirmation_failure_resubmits_same_operation() {
    let ledger = Arc::new(flaky().fail_confirm(LedgerError::Timeout("no confirmation".into())));
    let executor = executor_for(&ledger);

    let executed = executor.execute(organizer(), create_event()).await.unwrap();

    assert_eq!(executed.attempts, 2);
    assert_eq!(ledger.calls().submit(), 2);
    assert_eq!(ledger.calls().confirm(), 2);
    assert_eq!(events_created(&ledger).await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_query_retries_transient_failures() {
    let ledger = Arc::new(flaky().fail_query(LedgerError::RateLimited("slow down".into())));
    let executor = executor_for(&ledger);

    let response = executor.query(LedgerQuery::Platform).await.unwrap();

    assert!(matches!(response, QueryResponse::Platform(_)));
    assert_eq!(ledger.calls().query(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_query_exhaustion_skips_reconciliation() {
    let ledger = Arc::new(
        flaky()
            .fail_query(LedgerError::Timeout("1".into()))
            .fail_query(LedgerError::Timeout("2".into()))
            .fail_query(LedgerError::Timeout("3".into())),
    );
    let executor = executor_for(&ledger);

    let error = executor.query(LedgerQuery::Platform).await.unwrap_err();

    assert_eq!(error.attempts(), Some(3));
    assert_eq!(error.code(), "TIMEOUT");
    assert_eq!(ledger.calls().find_receipt(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_backoff_is_capped() {
    let ledger = Arc::new(flaky().always_fail_submit(LedgerError::Network("down".into())));
    let policy = RetryPolicy::builder()
        .max_attempts(4)
        .initial_backoff(Duration::from_millis(1000))
        .backoff_factor(10.0)
        .max_backoff(Duration::from_millis(2000))
        .build();
    let executor = TransactionExecutor::new(ledger.clone(), policy);
    let start = Instant::now();

    let error = executor
        .execute(organizer(), create_event())
        .await
        .unwrap_err();

    assert_eq!(error.attempts(), Some(4));
    assert_eq!(start.elapsed(), Duration::from_millis(5000));
}

#[tokio::test(start_paused = true)]
async fn test_single_attempt_policy_never_sleeps() {
    let ledger = Arc::new(flaky().always_fail_submit(LedgerError::Network("down".into())));
    let policy = RetryPolicy::builder().max_attempts(1).build();
    let executor = TransactionExecutor::new(ledger.clone(), policy);
    let start = Instant::now();

    let error = executor
        .execute(organizer(), create_event())
        .await
        .unwrap_err();

    assert_eq!(error.attempts(), Some(1));
    assert_eq!(start.elapsed(), Duration::ZERO);
}
