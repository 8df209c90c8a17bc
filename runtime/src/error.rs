//! Errors surfaced by the transaction executor.

use thiserror::Error;
use ticketchain_core::{ErrorKind, MarketError};
use ticketchain_ledger::LedgerError;

/// Final outcome of a logical ledger operation that did not succeed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    /// The settlement rules rejected the call. Never retried.
    #[error("Rejected: {0}")]
    Rejected(MarketError),

    /// Every attempt failed with a transient error and reconciliation found nothing.
    #[error("Ledger operation failed after {attempts} attempt(s): {source}")]
    Exhausted {
        /// Attempts made
        attempts: u32,
        /// Error of the final attempt
        source: LedgerError,
    },

    /// A non-retryable infrastructure error ended the operation.
    #[error("Ledger operation failed on attempt {attempts}: {source}")]
    Fatal {
        /// Attempts made
        attempts: u32,
        /// The error
        source: LedgerError,
    },
}

impl ExecutionError {
    /// Stable machine-readable code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Rejected(error) => error.code(),
            Self::Exhausted { source, .. } | Self::Fatal { source, .. } => source.code(),
        }
    }

    /// Taxonomy class.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Rejected(error) => error.kind(),
            Self::Exhausted { .. } | Self::Fatal { .. } => ErrorKind::Infrastructure,
        }
    }

    /// Attempts made, for infrastructure failures.
    #[must_use]
    pub const fn attempts(&self) -> Option<u32> {
        match self {
            Self::Rejected(_) => None,
            Self::Exhausted { attempts, .. } | Self::Fatal { attempts, .. } => Some(*attempts),
        }
    }

    /// Whether the client refused to sign, so nothing reached the ledger.
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        matches!(
            self,
            Self::Fatal {
                source: LedgerError::ReadOnly,
                ..
            }
        )
    }

    /// The rejection, if the rules refused the call.
    #[must_use]
    pub const fn rejection(&self) -> Option<&MarketError> {
        match self {
            Self::Rejected(error) => Some(error),
            Self::Exhausted { .. } | Self::Fatal { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infrastructure_errors_carry_attempts() {
        let error = ExecutionError::Exhausted {
            attempts: 3,
            source: LedgerError::Timeout("slow".into()),
        };
        assert_eq!(error.code(), "TIMEOUT");
        assert_eq!(error.kind(), ErrorKind::Infrastructure);
        assert_eq!(error.attempts(), Some(3));
        assert_eq!(
            error.to_string(),
            "Ledger operation failed after 3 attempt(s): Timeout: slow"
        );
    }

    #[test]
    fn test_rejection_keeps_its_code() {
        let error = ExecutionError::Rejected(MarketError::CannotBuyOwnListing);
        assert_eq!(error.code(), "CANNOT_BUY_OWN_LISTING");
        assert_eq!(error.kind(), ErrorKind::Validation);
        assert_eq!(error.attempts(), None);
    }

    #[test]
    fn test_only_fatal_read_only_counts_as_read_only() {
        let read_only = ExecutionError::Fatal {
            attempts: 1,
            source: LedgerError::ReadOnly,
        };
        let invalid = ExecutionError::Fatal {
            attempts: 1,
            source: LedgerError::InvalidResponse("truncated body".into()),
        };
        assert!(read_only.is_read_only());
        assert!(!invalid.is_read_only());
        assert!(!ExecutionError::Rejected(MarketError::NotOwner).is_read_only());
    }
}
