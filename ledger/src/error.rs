//! Ledger client errors and their retry classification.

use thiserror::Error;
use ticketchain_core::{MarketError, TxHash};

/// Errors returned by a [`LedgerClient`](crate::LedgerClient).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Connection failed or dropped
    #[error("Network error: {0}")]
    Network(String),

    /// Request or confirmation wait timed out
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Endpoint answered with a 5xx status
    #[error("Server error (status {status}): {message}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },

    /// Endpoint throttled the request
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Signer nonce was stale or already used
    #[error("Nonce conflict: {0}")]
    NonceConflict(String),

    /// Replacement transaction priced too low
    #[error("Replacement underpriced: {0}")]
    Underpriced(String),

    /// The settlement rules rejected the call
    #[error("Call reverted: {0}")]
    Reverted(MarketError),

    /// No signing credential is configured
    #[error("Ledger client is read-only: no signing credential configured")]
    ReadOnly,

    /// The ledger does not know the transaction
    #[error("Unknown transaction {0}")]
    UnknownTransaction(TxHash),

    /// Response could not be decoded
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Any other JSON-RPC error object
    #[error("RPC error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code
        code: i64,
        /// JSON-RPC error message
        message: String,
    },
}

impl LedgerError {
    /// Whether repeating the same request may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network(_)
                | Self::Timeout(_)
                | Self::Server { .. }
                | Self::RateLimited(_)
                | Self::NonceConflict(_)
                | Self::Underpriced(_)
        )
    }

    /// Whether the failure came from signer nonce or fee contention, which calls for a
    /// session reset before the next attempt.
    #[must_use]
    pub const fn is_price_contention(&self) -> bool {
        matches!(self, Self::NonceConflict(_) | Self::Underpriced(_))
    }

    /// Stable machine-readable code. Reverts report the rejection's own code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Network(_) => "NETWORK_ERROR",
            Self::Timeout(_) => "TIMEOUT",
            Self::Server { .. } => "SERVER_ERROR",
            Self::RateLimited(_) => "RATE_LIMITED",
            Self::NonceConflict(_) => "NONCE_CONFLICT",
            Self::Underpriced(_) => "REPLACEMENT_UNDERPRICED",
            Self::Reverted(error) => error.code(),
            Self::ReadOnly => "READ_ONLY",
            Self::UnknownTransaction(_) => "UNKNOWN_TRANSACTION",
            Self::InvalidResponse(_) => "INVALID_RESPONSE",
            Self::Rpc { .. } => "RPC_ERROR",
        }
    }

    /// Classify a JSON-RPC error object by its message.
    ///
    /// Nodes report nonce and fee contention, throttling and timeouts as free-form
    /// messages, so matching is by substring.
    #[must_use]
    pub fn classify_rpc(code: i64, message: &str) -> Self {
        let lower = message.to_ascii_lowercase();
        if lower.contains("nonce") {
            Self::NonceConflict(message.to_string())
        } else if lower.contains("underpriced") {
            Self::Underpriced(message.to_string())
        } else if lower.contains("rate limit") || lower.contains("too many requests") {
            Self::RateLimited(message.to_string())
        } else if lower.contains("timeout") || lower.contains("timed out") {
            Self::Timeout(message.to_string())
        } else {
            Self::Rpc {
                code,
                message: message.to_string(),
            }
        }
    }
}
