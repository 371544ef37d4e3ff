//! # Vault Events
//!
//! Notifications emitted by committed operations. A reverted operation emits
//! nothing. These are what an indexer or UI would subscribe to.

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::lock::LockId;

/// A committed state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VaultEvent {
    /// A deposit was taken into custody.
    LockCreated {
        id: LockId,
        account: Address,
        index: usize,
        token: Address,
        amount: u128,
        lock_time: u64,
        unlock_time: u64,
    },
    /// A matured deposit was returned to its owner.
    LockClaimed {
        id: LockId,
        account: Address,
        index: usize,
        token: Address,
        amount: u128,
    },
    /// New locks are blocked.
    Paused { account: Address },
    /// New locks are accepted again.
    Unpaused { account: Address },
    /// Administrative control changed hands.
    OwnershipTransferred {
        previous_owner: Address,
        new_owner: Address,
    },
}

impl VaultEvent {
    /// Short event name, for logs and CLI output.
    pub fn name(&self) -> &'static str {
        match self {
            VaultEvent::LockCreated { .. } => "LockCreated",
            VaultEvent::LockClaimed { .. } => "LockClaimed",
            VaultEvent::Paused { .. } => "Paused",
            VaultEvent::Unpaused { .. } => "Unpaused",
            VaultEvent::OwnershipTransferred { .. } => "OwnershipTransferred",
        }
    }
}
