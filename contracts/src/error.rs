//! # Vault Errors
//!
//! Every failure the vault can report. All of them are terminal for the call
//! that produced them: the operation is abandoned with no ledger change, and
//! retrying (after fixing an allowance, waiting out a lock, ...) is up to the
//! caller.

use thiserror::Error;

use crate::address::Address;
use crate::token::TokenError;

/// Errors returned by vault operations.
#[derive(Debug, Error)]
pub enum VaultError {
    /// The token address is the null address.
    #[error("invalid token address")]
    InvalidToken,

    /// Locks must carry a non-zero amount.
    #[error("amount must be greater than zero")]
    InvalidAmount,

    /// The requested duration is not one of the whitelisted values.
    #[error("invalid lock duration: {0} seconds is not an allowed duration")]
    InvalidDuration(u64),

    /// A duration string that is neither a known label nor a number.
    #[error("unrecognized lock duration '{0}', expected 1m, 6m, 1y, 3y, 10y or seconds")]
    UnrecognizedDuration(String),

    /// New locks are blocked while the vault is paused. Also returned by a
    /// redundant `pause`.
    #[error("vault is paused")]
    Paused,

    /// `unpause` was called on a running vault.
    #[error("vault is not paused")]
    NotPaused,

    /// The lock index is out of range for the caller's own lock list.
    #[error("not lock owner: {account} has no lock at index {index}")]
    NotLockOwner {
        /// The calling account.
        account: Address,
        /// The index it tried to use.
        index: usize,
    },

    /// The unlock time has not been reached yet.
    #[error("still locked: unlocks at {unlock_time}, now {now}")]
    StillLocked {
        /// Timestamp at which the lock matures.
        unlock_time: u64,
        /// Timestamp at which the claim was attempted.
        now: u64,
    },

    /// The lock has already been withdrawn.
    #[error("already claimed")]
    AlreadyClaimed,

    /// An administrative operation was called by someone other than the owner.
    #[error("unauthorized: {0} is not the vault owner")]
    NotOwner(Address),

    /// Ownership cannot be handed to the null address.
    #[error("invalid owner: {0}")]
    InvalidOwner(Address),

    /// `lock_time + duration` does not fit in a u64 timestamp.
    #[error("timestamp overflow: {now} + {duration} seconds")]
    TimestampOverflow {
        /// Creation timestamp.
        now: u64,
        /// Requested duration.
        duration: u64,
    },

    /// The token refused or failed a transfer into or out of custody.
    #[error("token transfer failed for {token}: {source}")]
    TransferFailed {
        /// The token contract that was called.
        token: Address,
        /// What the token reported.
        #[source]
        source: TokenError,
    },
}
