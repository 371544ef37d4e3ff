//! # Hodl Vault Contracts
//!
//! A token time-lock vault. Depositors lock an amount of any fungible token
//! for one of five fixed durations and can withdraw it only once the unlock
//! time has passed. There is no early exit: not for the depositor, not for
//! the owner, not while paused.
//!
//! - **Ledger** ([`ledger`]): per-account lock lists, the global lock
//!   counter, the pause flag and the owner.
//! - **Vault** ([`vault`]): sequences ledger transitions with token
//!   transfers so that state changes always precede outbound calls.
//! - **Token boundary** ([`token`]): the two-operation capability the vault
//!   needs from any token it custodies.
//! - **Duration whitelist** ([`duration`]): the closed set of lock periods.
//!
//! ## Design Principles
//!
//! 1. Token amounts are raw `u128` units; sums and timestamps use checked
//!    arithmetic.
//! 2. A lock's terms are immutable. Only `claimed` changes, once.
//! 3. Every operation is all-or-nothing. A rejected call leaves the ledger
//!    and the event log untouched.
//! 4. Ledger state is serde-serializable for snapshots and transport.

pub mod address;
pub mod clock;
pub mod config;
pub mod duration;
pub mod error;
pub mod events;
pub mod ledger;
pub mod lock;
pub mod token;
pub mod vault;

pub use address::Address;
pub use clock::{Clock, ManualClock, SystemClock};
pub use duration::LockDuration;
pub use error::VaultError;
pub use events::VaultEvent;
pub use ledger::{LockTerms, VaultLedger};
pub use lock::{Countdown, Lock, LockId};
pub use token::{FungibleToken, StandardToken, TokenError, TokenRegistry, TokenState};
pub use vault::HodlVault;
