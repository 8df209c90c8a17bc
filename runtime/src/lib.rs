//! # TicketChain Runtime
//!
//! Resilient execution of ledger calls.
//!
//! The ledger endpoint is slow, rate limited and occasionally drops responses. This
//! crate wraps a [`LedgerClient`](ticketchain_ledger::LedgerClient) so that every
//! logical operation is applied at most once and reported exactly once.
//!
//! ## Core Components
//!
//! - **Transaction Executor**: retries transient failures with bounded exponential
//!   backoff, resets the session after nonce contention, and reconciles by operation
//!   id once attempts run out
//! - **Retry Policy**: attempt budget and backoff schedule
//! - **Metrics**: Prometheus counters and histograms for every attempt
//!
//! ## Example
//!
//! ```ignore
//! use ticketchain_runtime::{RetryPolicy, TransactionExecutor};
//!
//! let executor = TransactionExecutor::new(ledger, RetryPolicy::default());
//! let executed = executor.execute(organizer, LedgerCall::CreateEvent(draft)).await?;
//! println!("confirmed in block {}", executed.receipt.block_number);
//! ```

/// Errors surfaced to callers of the executor
pub mod error;

/// Retrying transaction executor
pub mod executor;

/// Prometheus metrics for observability
pub mod metrics;

/// Retry logic with exponential backoff
pub mod retry;

pub use error::ExecutionError;
pub use executor::{Executed, TransactionExecutor};
pub use metrics::{ExecutorMetrics, MetricsRecorder};
pub use retry::{AttemptState, RetryPolicy};
