//! Prometheus metrics for ledger transaction execution.
//!
//! Covers every attempt the executor makes, the retries and session resets it decides
//! on, reconciliation reads, and final failures.
//!
//! # Example
//!
//! ```rust,no_run
//! use ticketchain_runtime::metrics::MetricsRecorder;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut recorder = MetricsRecorder::new();
//! recorder.install()?;
//!
//! // ... run operations ...
//!
//! if let Some(text) = recorder.render() {
//!     println!("{text}");
//! }
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;
use thiserror::Error;

// Re-export metrics macros for use in other modules
pub use metrics::{counter, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus recorder.
///
/// Installs a process-wide recorder and renders the text exposition format on demand.
#[derive(Default)]
pub struct MetricsRecorder {
    handle: Option<PrometheusHandle>,
}

impl MetricsRecorder {
    /// Create a recorder that has not been installed yet.
    #[must_use]
    pub const fn new() -> Self {
        Self { handle: None }
    }

    /// Describe all metrics and install the Prometheus recorder.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or installed.
    ///
    /// # Note
    ///
    /// If a metrics recorder is already installed (e.g., in tests), installation is
    /// skipped with a warning.
    pub fn install(&mut self) -> Result<(), MetricsError> {
        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[
                    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
                ],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                register_metrics();
                tracing::info!("Metrics recorder installed");
                Ok(())
            }
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            }
        }
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if the recorder hasn't been installed.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(
        "ticketchain_ledger_attempts_total",
        "Total number of physical ledger attempts"
    );
    describe_counter!(
        "ticketchain_ledger_retries_total",
        "Total number of retries scheduled after a transient failure"
    );
    describe_counter!(
        "ticketchain_ledger_session_resets_total",
        "Total number of session resets after nonce or fee contention"
    );
    describe_counter!(
        "ticketchain_ledger_reconciliations_total",
        "Total number of operation lookups after exhausted attempts"
    );
    describe_counter!(
        "ticketchain_ledger_failures_total",
        "Total number of operations that failed after all attempts"
    );
    describe_counter!(
        "ticketchain_ledger_rejections_total",
        "Total number of calls rejected by the settlement rules"
    );
    describe_histogram!(
        "ticketchain_ledger_operation_duration_seconds",
        "Time from first attempt to final outcome"
    );
}

/// Executor metrics recorder.
pub struct ExecutorMetrics;

impl ExecutorMetrics {
    /// Record one physical attempt.
    pub fn record_attempt(operation: &'static str) {
        counter!("ticketchain_ledger_attempts_total", "operation" => operation).increment(1);
    }

    /// Record a scheduled retry.
    pub fn record_retry(operation: &'static str, code: &'static str) {
        counter!("ticketchain_ledger_retries_total", "operation" => operation, "code" => code)
            .increment(1);
    }

    /// Record a session reset and whether it succeeded.
    pub fn record_session_reset(succeeded: bool) {
        let outcome = if succeeded { "ok" } else { "failed" };
        counter!("ticketchain_ledger_session_resets_total", "outcome" => outcome).increment(1);
    }

    /// Record a reconciliation read and what it found.
    pub fn record_reconciliation(outcome: &'static str) {
        counter!("ticketchain_ledger_reconciliations_total", "outcome" => outcome).increment(1);
    }

    /// Record a final infrastructure failure.
    pub fn record_failure(operation: &'static str, code: &'static str) {
        counter!("ticketchain_ledger_failures_total", "operation" => operation, "code" => code)
            .increment(1);
    }

    /// Record a rejection by the settlement rules.
    pub fn record_rejection(operation: &'static str, code: &'static str) {
        counter!("ticketchain_ledger_rejections_total", "operation" => operation, "code" => code)
            .increment(1);
    }

    /// Record how long an operation took end to end.
    pub fn record_duration(operation: &'static str, duration: Duration) {
        histogram!("ticketchain_ledger_operation_duration_seconds", "operation" => operation)
            .record(duration.as_secs_f64());
    }
}
