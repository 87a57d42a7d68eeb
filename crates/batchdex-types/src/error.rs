//! Error types for the batchdex ledger simulator.
//!
//! All errors use the `BDX_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Balance ledger errors
//! - 2xx: Token registry errors
//! - 3xx: Token transfer errors
//! - 6xx: Settlement errors
//! - 9xx: General / internal errors
//!
//! Every error is a precondition violation raised before any state is
//! mutated. Nothing here is retried internally.

use thiserror::Error;

use crate::{Amount, BatchId, TokenAddress, TokenId};

/// Coarse classification of a [`BatchdexError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Operation attempted without the required prior state.
    InvalidState,
    /// Withdrawal claimed before its request's batch elapsed.
    NotYetSettled,
    /// Lookup of an unregistered token id or address.
    NotFound,
    /// Token address registered twice.
    AlreadyRegistered,
    /// Registry is at its configured maximum.
    CapacityExceeded,
    /// The external token-transfer collaborator refused the transfer.
    Transfer,
    /// Configuration, serialization or internal failure.
    Internal,
}

/// Central error enum for all batchdex operations.
#[derive(Debug, Error)]
pub enum BatchdexError {
    // =================================================================
    // Balance Ledger Errors (1xx)
    // =================================================================
    /// Operation attempted without the required prior state (no pending
    /// withdraw request, zero settled balance at claim time, underflow).
    #[error("BDX_ERR_100: Invalid state: {reason}")]
    InvalidState { reason: String },

    /// A withdrawal was claimed in or before the batch it was requested in.
    #[error("BDX_ERR_101: Withdraw requested in {requested_in} not yet settled at {current}")]
    NotYetSettled {
        requested_in: BatchId,
        current: BatchId,
    },

    // =================================================================
    // Token Registry Errors (2xx)
    // =================================================================
    /// No token is registered under this address.
    #[error("BDX_ERR_200: Token not found: {0}")]
    TokenNotFound(TokenAddress),

    /// No token is registered under this id.
    #[error("BDX_ERR_201: Token id not found: {0}")]
    TokenIdNotFound(TokenId),

    /// The token address is already registered.
    #[error("BDX_ERR_202: Token already registered: {0}")]
    AlreadyRegistered(TokenAddress),

    /// The registry holds its maximum number of tokens.
    #[error("BDX_ERR_203: Token registry full (max {max})")]
    CapacityExceeded { max: usize },

    // =================================================================
    // Transfer Errors (3xx)
    // =================================================================
    /// The external wallet does not hold enough of the token.
    #[error("BDX_ERR_300: Insufficient wallet funds: need {needed}, have {available}")]
    InsufficientFunds { needed: Amount, available: Amount },

    // =================================================================
    // Settlement Errors (6xx)
    // =================================================================
    /// The deferred settlement task went away before resolving.
    #[error("BDX_ERR_600: Settlement dropped before completion")]
    SettlementDropped,

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("BDX_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("BDX_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid values, unparsable input).
    #[error("BDX_ERR_902: Configuration error: {0}")]
    Configuration(String),
}

impl BatchdexError {
    /// Shorthand for an [`BatchdexError::InvalidState`] with a reason.
    pub fn invalid_state(reason: impl Into<String>) -> Self {
        Self::InvalidState {
            reason: reason.into(),
        }
    }

    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidState { .. } => ErrorKind::InvalidState,
            Self::NotYetSettled { .. } => ErrorKind::NotYetSettled,
            Self::TokenNotFound(_) | Self::TokenIdNotFound(_) => ErrorKind::NotFound,
            Self::AlreadyRegistered(_) => ErrorKind::AlreadyRegistered,
            Self::CapacityExceeded { .. } => ErrorKind::CapacityExceeded,
            Self::InsufficientFunds { .. } => ErrorKind::Transfer,
            Self::SettlementDropped
            | Self::Internal(_)
            | Self::Serialization(_)
            | Self::Configuration(_) => ErrorKind::Internal,
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, BatchdexError>;

impl From<serde_json::Error> for BatchdexError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::Address;

    use super::*;

    #[test]
    fn not_yet_settled_display() {
        let err = BatchdexError::NotYetSettled {
            requested_in: BatchId(7),
            current: BatchId(7),
        };
        let msg = format!("{err}");
        assert!(msg.starts_with("BDX_ERR_101"), "Got: {msg}");
        assert!(msg.contains("batch:7"));
    }

    #[test]
    fn kinds_classify_lookup_failures() {
        let by_addr = BatchdexError::TokenNotFound(Address::ZERO);
        let by_id = BatchdexError::TokenIdNotFound(TokenId(3));
        assert_eq!(by_addr.kind(), ErrorKind::NotFound);
        assert_eq!(by_id.kind(), ErrorKind::NotFound);
        assert_eq!(
            BatchdexError::invalid_state("x").kind(),
            ErrorKind::InvalidState
        );
    }

    #[test]
    fn all_errors_have_bdx_err_prefix() {
        let errors: Vec<Box<dyn std::error::Error>> = vec![
            Box::new(BatchdexError::invalid_state("no pending withdraw")),
            Box::new(BatchdexError::AlreadyRegistered(Address::ZERO)),
            Box::new(BatchdexError::CapacityExceeded { max: 2 }),
            Box::new(BatchdexError::SettlementDropped),
            Box::new(BatchdexError::InsufficientFunds {
                needed: Amount::from(2u64),
                available: Amount::from(1u64),
            }),
        ];
        for err in errors {
            let msg = format!("{err}");
            assert!(
                msg.starts_with("BDX_ERR_"),
                "Error missing BDX_ERR_ prefix: {msg}"
            );
        }
    }
}
