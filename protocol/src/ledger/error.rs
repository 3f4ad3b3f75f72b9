//! Error taxonomy of the reserve ledger.
//!
//! Every rejected transition returns exactly one [`LedgerError`] and leaves
//! the store untouched. Only [`LedgerError::TransportFailure`] is worth
//! retrying; everything else would fail the same way again.

use thiserror::Error;

use crate::address::Address;
use crate::amount::AmountError;

/// Result alias used throughout the ledger.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Errors produced by ledger operations and audits.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The caller is not allowed to perform this operation.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The ledger is paused; mint and burn are rejected.
    #[error("ledger is paused")]
    LedgerPaused,

    /// The amount is not positive after truncation, or does not fit.
    #[error("invalid amount: {0}")]
    InvalidAmount(#[from] AmountError),

    /// A mint exceeds the per-transaction ceiling.
    #[error("amount too large: {amount} minor units exceeds the per-transaction limit of {limit}")]
    AmountTooLarge {
        /// Requested amount in minor units.
        amount: u64,
        /// Configured ceiling in minor units.
        limit: u64,
    },

    /// A deposit reference or payout descriptor is empty or too long.
    #[error("invalid settlement reference: {0}")]
    InvalidReference(String),

    /// The deposit reference was already consumed by an earlier mint.
    #[error("deposit reference already used: {0}")]
    DuplicateReference(String),

    /// The holder's balance does not cover the burn.
    #[error("insufficient balance: account has {balance}, tried to burn {amount}")]
    InsufficientBalance {
        /// Balance in minor units.
        balance: u64,
        /// Requested burn in minor units.
        amount: u64,
    },

    /// No token account exists at the holder's derived address.
    #[error("token account not found: {0}")]
    AccountNotFound(Address),

    /// `initialize` was called on a ledger that already has a reserve.
    #[error("reserve already initialized")]
    AlreadyInitialized,

    /// An operation ran before `initialize`.
    #[error("reserve not initialized")]
    NotInitialized,

    /// The request was conditioned on a reserve version that is no longer
    /// current. Re-read the reserve and resubmit.
    #[error("reserve changed: request expected sequence {expected}, current is {actual}")]
    Conflict {
        /// Sequence the request was prepared against.
        expected: u64,
        /// Sequence of the committed reserve.
        actual: u64,
    },

    /// Checked arithmetic on a counter failed.
    #[error("arithmetic overflow in {0}")]
    Overflow(&'static str),

    /// The backing store could not be reached or failed an I/O operation.
    #[error("transport failure: {0}")]
    TransportFailure(String),

    /// An integrity audit found the reserve in a state no valid sequence of
    /// transitions can produce.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// A persisted record could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl LedgerError {
    /// `true` only for failures a submitting layer may retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::TransportFailure(_))
    }

    /// Short machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::Unauthorized(_) => "unauthorized",
            LedgerError::LedgerPaused => "ledger_paused",
            LedgerError::InvalidAmount(_) => "invalid_amount",
            LedgerError::AmountTooLarge { .. } => "amount_too_large",
            LedgerError::InvalidReference(_) => "invalid_reference",
            LedgerError::DuplicateReference(_) => "duplicate_reference",
            LedgerError::InsufficientBalance { .. } => "insufficient_balance",
            LedgerError::AccountNotFound(_) => "account_not_found",
            LedgerError::AlreadyInitialized => "already_initialized",
            LedgerError::NotInitialized => "not_initialized",
            LedgerError::Conflict { .. } => "conflict",
            LedgerError::Overflow(_) => "overflow",
            LedgerError::TransportFailure(_) => "transport_failure",
            LedgerError::InvariantViolation(_) => "invariant_violation",
            LedgerError::Serialization(_) => "serialization",
        }
    }
}

impl From<sled::Error> for LedgerError {
    fn from(e: sled::Error) -> Self {
        LedgerError::TransportFailure(e.to_string())
    }
}

impl From<bincode::Error> for LedgerError {
    fn from(e: bincode::Error) -> Self {
        LedgerError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transport_failures_are_retryable() {
        assert!(LedgerError::TransportFailure("io".into()).is_retryable());
        assert!(!LedgerError::LedgerPaused.is_retryable());
        assert!(!LedgerError::Overflow("total_supply").is_retryable());
        assert!(!LedgerError::DuplicateReference("PIX1".into()).is_retryable());
    }

    #[test]
    fn messages_name_a_single_cause() {
        let e = LedgerError::InsufficientBalance {
            balance: 5050,
            amount: 10000,
        };
        assert_eq!(
            e.to_string(),
            "insufficient balance: account has 5050, tried to burn 10000"
        );
        assert_eq!(e.kind(), "insufficient_balance");
    }

    #[test]
    fn amount_errors_convert() {
        let e: LedgerError = AmountError::Malformed("x".into()).into();
        assert!(matches!(e, LedgerError::InvalidAmount(_)));
    }
}
