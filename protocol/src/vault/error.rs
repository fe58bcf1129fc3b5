//! Lockup program errors.

use thiserror::Error;

use crate::config::LOCKUP_ERROR_BASE;
use crate::crypto::keys::Pubkey;
use crate::crypto::pda::PdaError;
use crate::storage::DbError;
use crate::system::SystemError;
use crate::token::TokenError;

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

/// Everything that can go wrong in `initialize`, `deposit` or `withdraw`.
///
/// Codes are `LOCKUP_ERROR_BASE + offset` and never change once assigned.
/// Clients match on `0x193` ([`LockupError::StillLocked`]) in particular.
#[derive(Debug, Error)]
pub enum LockupError {
    /// A vault already lives at the authority's derived address.
    #[error("vault for {authority} is already initialized")]
    AlreadyInitialized { authority: Pubkey },

    /// The vault authority is not among the transaction's signers.
    #[error("{0} did not sign for this vault")]
    Unauthorized(Pubkey),

    /// The authority's token account cannot cover the deposit.
    #[error("insufficient token balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: u64, available: u64 },

    /// Withdraw attempted before `unlock_time`.
    #[error("funds are locked until {unlock_time} (now {now})")]
    StillLocked { now: u64, unlock_time: u64 },

    /// No vault, or no mint, at the expected address.
    #[error("no {what} found for {key}")]
    NotFound { what: &'static str, key: Pubkey },

    #[error("deposit amount must be greater than zero")]
    InvalidAmount,

    /// The lock has expired but holds nothing.
    #[error("vault for {authority} holds nothing to withdraw")]
    NothingLocked { authority: Pubkey },

    /// Custody was opened for a different mint.
    #[error("custody holds mint {expected}, vault asked for {found}")]
    MintMismatch { expected: Pubkey, found: Pubkey },

    #[error("unlock time overflows: start {start} + duration {duration}")]
    Overflow { start: u64, duration: u64 },

    #[error("vault address derivation failed: {0}")]
    DerivationFailure(#[from] PdaError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    System(#[from] SystemError),

    #[error(transparent)]
    Storage(#[from] DbError),
}

/// How a caller should react to a [`LockupError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Nothing is wrong with the request, it is just early. Resubmit later.
    Retryable,
    /// The request itself is wrong and will keep failing as-is.
    Caller,
    /// The ledger or derivation machinery failed.
    Internal,
}

impl LockupError {
    /// Stable numeric code. Wrapped token and system errors keep the code
    /// of the program that raised them.
    pub fn code(&self) -> u32 {
        let offset = match self {
            LockupError::AlreadyInitialized { .. } => 0,
            LockupError::Unauthorized(_) => 1,
            LockupError::InsufficientBalance { .. } => 2,
            LockupError::StillLocked { .. } => 3,
            LockupError::NotFound { .. } => 4,
            LockupError::InvalidAmount => 5,
            LockupError::NothingLocked { .. } => 6,
            LockupError::MintMismatch { .. } => 7,
            LockupError::Overflow { .. } => 8,
            LockupError::DerivationFailure(_) => 9,
            LockupError::Storage(_) => 0x0F,
            LockupError::Token(inner) => return inner.code(),
            LockupError::System(inner) => return inner.code(),
        };
        LOCKUP_ERROR_BASE + offset
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            LockupError::StillLocked { .. } => ErrorClass::Retryable,
            LockupError::DerivationFailure(_) | LockupError::Storage(_) => ErrorClass::Internal,
            LockupError::Token(TokenError::Storage(_) | TokenError::Derivation(_)) => {
                ErrorClass::Internal
            }
            LockupError::System(SystemError::Storage(_)) => ErrorClass::Internal,
            _ => ErrorClass::Caller,
        }
    }
}
