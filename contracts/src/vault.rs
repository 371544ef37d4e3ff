//! # Hodl Vault
//!
//! The callable contract. [`HodlVault`] owns the [`VaultLedger`], knows its
//! own custody address, and reaches tokens through the [`TokenRegistry`].
//!
//! ## Call discipline
//!
//! Every public call runs under one operation guard, a
//! [`ReentrantMutex`] held from the first check to the last event. Calls
//! from other threads wait for it, so they only ever see committed state.
//! The thread that holds it can re-enter: token code running inside a
//! transfer may call back into the vault (a hostile token will try), and it
//! sees the ledger exactly as the in-flight operation left it:
//!
//! - during a claim's outbound transfer the lock is already `claimed`, so a
//!   nested claim fails with [`VaultError::AlreadyClaimed`];
//! - during a lock's inbound transfer nothing has been recorded yet, so a
//!   failed pull leaves no trace.
//!
//! The ledger itself sits in a [`RwLock`] that is only held for a single
//! state transition or query, never across a token call.
//!
//! A failed outbound transfer restores the flag, so the whole claim reverts.

use std::sync::Arc;

use parking_lot::{ReentrantMutex, ReentrantMutexGuard, RwLock};
use tracing::warn;

use crate::address::Address;
use crate::clock::Clock;
use crate::duration::LockDuration;
use crate::error::VaultError;
use crate::events::VaultEvent;
use crate::ledger::VaultLedger;
use crate::lock::{Lock, LockId};
use crate::token::TokenRegistry;

/// A deployed time-lock vault.
#[derive(Debug)]
pub struct HodlVault {
    /// Address the vault holds custody under.
    address: Address,
    /// Serializes whole operations across threads; re-entrant on one thread.
    op: ReentrantMutex<()>,
    ledger: RwLock<VaultLedger>,
    tokens: Arc<TokenRegistry>,
    clock: Arc<dyn Clock>,
}

impl HodlVault {
    /// Deploys an empty vault at `address` administered by `owner`.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::InvalidOwner`] if `owner` is the null address.
    pub fn new(
        address: Address,
        owner: Address,
        tokens: Arc<TokenRegistry>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, VaultError> {
        Ok(Self::from_ledger(
            address,
            VaultLedger::new(owner)?,
            tokens,
            clock,
        ))
    }

    /// Restores a vault from a ledger snapshot.
    pub fn from_ledger(
        address: Address,
        ledger: VaultLedger,
        tokens: Arc<TokenRegistry>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            address,
            op: ReentrantMutex::new(()),
            ledger: RwLock::new(ledger),
            tokens,
            clock,
        }
    }

    /// The vault's custody address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// The token registry this vault calls into.
    pub fn tokens(&self) -> &Arc<TokenRegistry> {
        &self.tokens
    }

    /// Current time according to the vault's clock.
    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    /// Copy of the full ledger, for persistence.
    pub fn snapshot(&self) -> VaultLedger {
        let _op = self.begin_op();
        self.ledger.read().clone()
    }

    fn begin_op(&self) -> ReentrantMutexGuard<'_, ()> {
        self.op.lock()
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Pulls `amount` of `token` from `caller` into custody and records a
    /// lock that matures `duration_secs` from now.
    ///
    /// `caller` must have approved the vault's address for at least `amount`
    /// beforehand.
    ///
    /// # Errors
    ///
    /// [`VaultError::Paused`], [`VaultError::InvalidToken`],
    /// [`VaultError::InvalidAmount`], [`VaultError::InvalidDuration`],
    /// [`VaultError::TimestampOverflow`], or [`VaultError::TransferFailed`]
    /// if the token refuses the pull. In every error case the ledger is
    /// unchanged.
    pub fn lock_tokens(
        &self,
        caller: &Address,
        token: &Address,
        amount: u128,
        duration_secs: u64,
    ) -> Result<Lock, VaultError> {
        let _op = self.begin_op();
        let now = self.clock.now();
        let terms = self
            .ledger
            .read()
            .validate_new_lock(token, amount, duration_secs, now)?;

        // Interaction: the ledger lock is free while token code runs.
        self.tokens
            .resolve(token)
            .and_then(|contract| contract.transfer_from(&self.address, caller, &self.address, amount))
            .map_err(|source| {
                warn!(account = %caller, token = %token, amount = %amount, error = %source, "lock deposit failed");
                VaultError::TransferFailed {
                    token: *token,
                    source,
                }
            })?;

        let lock = self.ledger.write().record_lock(caller, terms);
        Ok(lock)
    }

    /// Same as [`lock_tokens`](Self::lock_tokens) with a typed duration.
    pub fn lock_for(
        &self,
        caller: &Address,
        token: &Address,
        amount: u128,
        duration: LockDuration,
    ) -> Result<Lock, VaultError> {
        self.lock_tokens(caller, token, amount, duration.as_secs())
    }

    /// Returns the matured deposit at `index` in `caller`'s lock list.
    ///
    /// Works while the vault is paused.
    ///
    /// # Errors
    ///
    /// [`VaultError::NotLockOwner`], [`VaultError::AlreadyClaimed`],
    /// [`VaultError::StillLocked`], or [`VaultError::TransferFailed`] (in
    /// which case the lock stays unclaimed).
    pub fn claim_tokens(&self, caller: &Address, index: usize) -> Result<u128, VaultError> {
        let _op = self.begin_op();
        let now = self.clock.now();

        // Effects: the flag is set and the ledger lock dropped before the transfer.
        let lock = self.ledger.write().begin_claim(caller, index, now)?;

        let pushed = self
            .tokens
            .resolve(&lock.token)
            .and_then(|contract| contract.transfer(&self.address, caller, lock.amount));

        match pushed {
            Ok(()) => {
                self.ledger.write().finish_claim(&lock);
                Ok(lock.amount)
            }
            Err(source) => {
                warn!(
                    lock_id = lock.id.0,
                    account = %caller,
                    index,
                    error = %source,
                    "claim transfer failed, reverting"
                );
                self.ledger.write().revert_claim(caller, index);
                Err(VaultError::TransferFailed {
                    token: lock.token,
                    source,
                })
            }
        }
    }

    // -----------------------------------------------------------------------
    // Administration
    // -----------------------------------------------------------------------

    /// Blocks new locks. Owner only.
    pub fn pause(&self, caller: &Address) -> Result<(), VaultError> {
        let _op = self.begin_op();
        self.ledger.write().pause(caller)
    }

    /// Accepts new locks again. Owner only.
    pub fn unpause(&self, caller: &Address) -> Result<(), VaultError> {
        let _op = self.begin_op();
        self.ledger.write().unpause(caller)
    }

    /// Hands administrative control to `new_owner`. Owner only.
    pub fn transfer_ownership(
        &self,
        caller: &Address,
        new_owner: &Address,
    ) -> Result<(), VaultError> {
        let _op = self.begin_op();
        self.ledger.write().transfer_ownership(caller, new_owner)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn owner(&self) -> Address {
        let _op = self.begin_op();
        self.ledger.read().owner()
    }

    pub fn is_paused(&self) -> bool {
        let _op = self.begin_op();
        self.ledger.read().is_paused()
    }

    pub fn total_locks(&self) -> u64 {
        let _op = self.begin_op();
        self.ledger.read().total_locks()
    }

    /// The whitelist. Read-only by construction.
    pub fn allowed_durations(&self) -> &'static [LockDuration] {
        &LockDuration::ALL
    }

    pub fn locks_of(&self, account: &Address) -> Vec<Lock> {
        let _op = self.begin_op();
        self.ledger.read().locks_of(account).to_vec()
    }

    pub fn active_locks_of(&self, account: &Address) -> Vec<Lock> {
        let _op = self.begin_op();
        self.ledger
            .read()
            .active_locks_of(account)
            .into_iter()
            .cloned()
            .collect()
    }

    /// `account`'s locks that could be claimed right now.
    pub fn claimable_locks_of(&self, account: &Address) -> Vec<Lock> {
        let _op = self.begin_op();
        let now = self.clock.now();
        self.ledger
            .read()
            .claimable_locks_of(account, now)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn lock_at(&self, account: &Address, index: usize) -> Option<Lock> {
        let _op = self.begin_op();
        self.ledger.read().lock_at(account, index).cloned()
    }

    pub fn lock_by_id(&self, id: LockId) -> Option<Lock> {
        let _op = self.begin_op();
        self.ledger.read().lock_by_id(id).cloned()
    }

    /// `None` if `account` has no lock at `index`.
    pub fn is_claimable(&self, account: &Address, index: usize) -> Option<bool> {
        let _op = self.begin_op();
        let now = self.clock.now();
        self.ledger.read().is_claimable(account, index, now)
    }

    pub fn is_claimable_by_id(&self, id: LockId) -> Option<bool> {
        let _op = self.begin_op();
        let now = self.clock.now();
        self.ledger.read().is_claimable_by_id(id, now)
    }

    pub fn next_unlock_time(&self, account: &Address) -> Option<u64> {
        let _op = self.begin_op();
        self.ledger.read().next_unlock_time(account)
    }

    /// Sum of unclaimed deposits of `token`.
    pub fn locked_balance(&self, token: &Address) -> u128 {
        let _op = self.begin_op();
        self.ledger.read().locked_balance(token)
    }

    pub fn events(&self) -> Vec<VaultEvent> {
        let _op = self.begin_op();
        self.ledger.read().events().to_vec()
    }
}
