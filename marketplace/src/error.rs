//! Errors returned by [`Marketplace`](crate::Marketplace) operations.

use thiserror::Error;
use ticketchain_core::{ErrorKind, MarketError};
use ticketchain_runtime::ExecutionError;

/// Failure of a marketplace operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MarketplaceError {
    /// Refused locally before anything was submitted
    #[error("{0}")]
    Preflight(MarketError),

    /// The ledger rejected the call or could not be reached
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// The ledger answered with a shape that does not fit the operation
    #[error("Unexpected ledger response to {operation}: {detail}")]
    UnexpectedResponse {
        /// Operation name
        operation: &'static str,
        /// What came back
        detail: String,
    },
}

impl MarketplaceError {
    /// Stable machine-readable code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Preflight(error) => error.code(),
            Self::Execution(error) => error.code(),
            Self::UnexpectedResponse { .. } => "UNEXPECTED_RESPONSE",
        }
    }

    /// Taxonomy class.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Preflight(error) => error.kind(),
            Self::Execution(error) => error.kind(),
            Self::UnexpectedResponse { .. } => ErrorKind::Infrastructure,
        }
    }

    /// Attempts made, for infrastructure failures.
    #[must_use]
    pub const fn attempts(&self) -> Option<u32> {
        match self {
            Self::Execution(error) => error.attempts(),
            Self::Preflight(_) | Self::UnexpectedResponse { .. } => None,
        }
    }

    /// The settlement rule that refused the operation, locally or on the ledger.
    #[must_use]
    pub const fn rejection(&self) -> Option<&MarketError> {
        match self {
            Self::Preflight(error) => Some(error),
            Self::Execution(error) => error.rejection(),
            Self::UnexpectedResponse { .. } => None,
        }
    }

    pub(crate) fn unexpected(operation: &'static str, detail: impl std::fmt::Debug) -> Self {
        Self::UnexpectedResponse {
            operation,
            detail: format!("{detail:?}"),
        }
    }
}
