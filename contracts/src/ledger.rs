//! # Vault Ledger
//!
//! The complete persistent state of the vault: who locked what, for how long,
//! and whether it has been withdrawn, plus the owner and the pause flag.
//!
//! The ledger never talks to a token. It exposes each operation as the pure
//! state transition around the external call, and [`super::vault::HodlVault`]
//! sequences those transitions with the token transfers:
//!
//! ```text
//! lock:   validate_new_lock  ->  token.transfer_from  ->  record_lock
//! claim:  begin_claim        ->  token.transfer       ->  finish_claim
//!                                      | (failure)
//!                                      +-> revert_claim
//! ```
//!
//! `begin_claim` flips `claimed` before the outbound transfer runs, so any
//! code the token executes during the transfer already sees the lock as
//! withdrawn.
//!
//! ## Addressing
//!
//! Each lock has a global [`LockId`] (creation order across all accounts) and
//! an index into its owner's list. Claims use the index; the ID is kept for
//! events and lookups. The locator table maps one to the other without any
//! log replay.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::address::Address;
use crate::duration::LockDuration;
use crate::error::VaultError;
use crate::events::VaultEvent;
use crate::lock::{Lock, LockId};

/// Validated parameters of a lock that has not been funded yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockTerms {
    /// Token contract to pull from.
    pub token: Address,
    /// Units to pull.
    pub amount: u128,
    /// Whitelisted duration.
    pub duration: LockDuration,
    /// Creation timestamp.
    pub lock_time: u64,
    /// `lock_time + duration`.
    pub unlock_time: u64,
}

/// Where a global lock ID lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct LockLocator {
    owner: Address,
    index: usize,
}

/// Process-wide vault state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultLedger {
    /// Account allowed to pause, unpause and hand over ownership.
    owner: Address,
    /// When set, new locks are rejected. Claims are unaffected.
    paused: bool,
    /// Number of locks ever created; also the next global ID.
    lock_counter: u64,
    /// Per-account locks in creation order. Append-only.
    locks: BTreeMap<Address, Vec<Lock>>,
    /// `locators[id]` is the owner/index of lock `id`.
    locators: Vec<LockLocator>,
    /// Committed events, oldest first.
    events: Vec<VaultEvent>,
}

impl VaultLedger {
    /// Creates an empty, unpaused ledger administered by `owner`.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::InvalidOwner`] for the null address.
    pub fn new(owner: Address) -> Result<Self, VaultError> {
        if owner.is_zero() {
            return Err(VaultError::InvalidOwner(owner));
        }
        Ok(Self {
            owner,
            paused: false,
            lock_counter: 0,
            locks: BTreeMap::new(),
            locators: Vec::new(),
            events: Vec::new(),
        })
    }

    fn emit(&mut self, event: VaultEvent) {
        debug!(event = event.name(), seq = self.events.len(), "event emitted");
        self.events.push(event);
    }

    // -----------------------------------------------------------------------
    // Lock creation
    // -----------------------------------------------------------------------

    /// Checks a lock request against the current state without changing it.
    ///
    /// Checks run in this order: pause flag, null token, zero amount,
    /// whitelist, timestamp overflow.
    ///
    /// # Errors
    ///
    /// [`VaultError::Paused`], [`VaultError::InvalidToken`],
    /// [`VaultError::InvalidAmount`], [`VaultError::InvalidDuration`] or
    /// [`VaultError::TimestampOverflow`].
    pub fn validate_new_lock(
        &self,
        token: &Address,
        amount: u128,
        duration_secs: u64,
        now: u64,
    ) -> Result<LockTerms, VaultError> {
        if self.paused {
            return Err(VaultError::Paused);
        }
        if token.is_zero() {
            return Err(VaultError::InvalidToken);
        }
        if amount == 0 {
            return Err(VaultError::InvalidAmount);
        }
        let duration = LockDuration::try_from(duration_secs)?;
        let unlock_time = now
            .checked_add(duration.as_secs())
            .ok_or(VaultError::TimestampOverflow {
                now,
                duration: duration.as_secs(),
            })?;

        Ok(LockTerms {
            token: *token,
            amount,
            duration,
            lock_time: now,
            unlock_time,
        })
    }

    /// Appends a funded lock to `owner`'s list and assigns its global ID.
    ///
    /// Only call this after the deposit has arrived in custody.
    pub fn record_lock(&mut self, owner: &Address, terms: LockTerms) -> Lock {
        let id = LockId(self.lock_counter);
        let list = self.locks.entry(*owner).or_default();
        let index = list.len();

        let lock = Lock {
            id,
            owner: *owner,
            index,
            token: terms.token,
            amount: terms.amount,
            lock_time: terms.lock_time,
            unlock_time: terms.unlock_time,
            claimed: false,
        };
        list.push(lock.clone());
        self.locators.push(LockLocator {
            owner: *owner,
            index,
        });
        self.lock_counter += 1;

        info!(
            lock_id = id.0,
            account = %owner,
            index,
            token = %lock.token,
            amount = %lock.amount,
            unlock_time = lock.unlock_time,
            duration = %terms.duration,
            "lock created"
        );
        self.emit(VaultEvent::LockCreated {
            id,
            account: *owner,
            index,
            token: lock.token,
            amount: lock.amount,
            lock_time: lock.lock_time,
            unlock_time: lock.unlock_time,
        });

        lock
    }

    // -----------------------------------------------------------------------
    // Claiming
    // -----------------------------------------------------------------------

    /// Marks `caller`'s lock at `index` as claimed and returns a copy of it.
    ///
    /// The flag is set here, before the caller performs the outbound
    /// transfer. If that transfer fails, undo with [`revert_claim`](Self::revert_claim).
    ///
    /// # Errors
    ///
    /// [`VaultError::NotLockOwner`] if `caller` has no lock at `index`,
    /// [`VaultError::AlreadyClaimed`], or [`VaultError::StillLocked`].
    pub fn begin_claim(
        &mut self,
        caller: &Address,
        index: usize,
        now: u64,
    ) -> Result<Lock, VaultError> {
        let lock = self
            .locks
            .get_mut(caller)
            .and_then(|list| list.get_mut(index))
            .ok_or(VaultError::NotLockOwner {
                account: *caller,
                index,
            })?;

        if lock.claimed {
            debug!(account = %caller, index, "claim rejected: already claimed");
            return Err(VaultError::AlreadyClaimed);
        }
        if now < lock.unlock_time {
            debug!(
                account = %caller,
                index,
                remaining = lock.unlock_time - now,
                "claim rejected: still locked"
            );
            return Err(VaultError::StillLocked {
                unlock_time: lock.unlock_time,
                now,
            });
        }

        lock.claimed = true;
        Ok(lock.clone())
    }

    /// Restores `claimed = false` after a failed outbound transfer.
    pub fn revert_claim(&mut self, caller: &Address, index: usize) {
        if let Some(lock) = self
            .locks
            .get_mut(caller)
            .and_then(|list| list.get_mut(index))
        {
            lock.claimed = false;
        }
    }

    /// Records the claim event once the outbound transfer has succeeded.
    pub fn finish_claim(&mut self, lock: &Lock) {
        info!(
            lock_id = lock.id.0,
            account = %lock.owner,
            index = lock.index,
            token = %lock.token,
            amount = %lock.amount,
            "lock claimed"
        );
        self.emit(VaultEvent::LockClaimed {
            id: lock.id,
            account: lock.owner,
            index: lock.index,
            token: lock.token,
            amount: lock.amount,
        });
    }

    // -----------------------------------------------------------------------
    // Administration
    // -----------------------------------------------------------------------

    fn ensure_owner(&self, caller: &Address) -> Result<(), VaultError> {
        if *caller != self.owner {
            debug!(caller = %caller, "admin call rejected: not owner");
            return Err(VaultError::NotOwner(*caller));
        }
        Ok(())
    }

    /// Blocks new locks.
    ///
    /// # Errors
    ///
    /// [`VaultError::NotOwner`], or [`VaultError::Paused`] if already paused.
    pub fn pause(&mut self, caller: &Address) -> Result<(), VaultError> {
        self.ensure_owner(caller)?;
        if self.paused {
            return Err(VaultError::Paused);
        }
        self.paused = true;
        info!(account = %caller, "vault paused");
        self.emit(VaultEvent::Paused { account: *caller });
        Ok(())
    }

    /// Accepts new locks again.
    ///
    /// # Errors
    ///
    /// [`VaultError::NotOwner`], or [`VaultError::NotPaused`] if running.
    pub fn unpause(&mut self, caller: &Address) -> Result<(), VaultError> {
        self.ensure_owner(caller)?;
        if !self.paused {
            return Err(VaultError::NotPaused);
        }
        self.paused = false;
        info!(account = %caller, "vault unpaused");
        self.emit(VaultEvent::Unpaused { account: *caller });
        Ok(())
    }

    /// Hands administrative control to `new_owner`.
    ///
    /// # Errors
    ///
    /// [`VaultError::NotOwner`], or [`VaultError::InvalidOwner`] for the null
    /// address.
    pub fn transfer_ownership(
        &mut self,
        caller: &Address,
        new_owner: &Address,
    ) -> Result<(), VaultError> {
        self.ensure_owner(caller)?;
        if new_owner.is_zero() {
            return Err(VaultError::InvalidOwner(*new_owner));
        }
        let previous_owner = self.owner;
        self.owner = *new_owner;
        info!(previous = %previous_owner, new = %new_owner, "ownership transferred");
        self.emit(VaultEvent::OwnershipTransferred {
            previous_owner,
            new_owner: *new_owner,
        });
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Current administrator.
    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Whether new locks are blocked.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Number of locks ever created.
    pub fn total_locks(&self) -> u64 {
        self.lock_counter
    }

    /// All of `account`'s locks, claimed ones included, in creation order.
    pub fn locks_of(&self, account: &Address) -> &[Lock] {
        self.locks.get(account).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of locks `account` has ever created.
    pub fn lock_count_of(&self, account: &Address) -> usize {
        self.locks_of(account).len()
    }

    /// `account`'s unclaimed locks, in creation order.
    pub fn active_locks_of(&self, account: &Address) -> Vec<&Lock> {
        self.locks_of(account).iter().filter(|l| !l.claimed).collect()
    }

    /// `account`'s locks that could be claimed at `now`.
    pub fn claimable_locks_of(&self, account: &Address, now: u64) -> Vec<&Lock> {
        self.locks_of(account)
            .iter()
            .filter(|l| l.is_claimable(now))
            .collect()
    }

    /// The lock at position `index` in `account`'s list.
    pub fn lock_at(&self, account: &Address, index: usize) -> Option<&Lock> {
        self.locks_of(account).get(index)
    }

    /// The lock with global ID `id`.
    pub fn lock_by_id(&self, id: LockId) -> Option<&Lock> {
        let locator = self.locators.get(usize::try_from(id.0).ok()?)?;
        self.lock_at(&locator.owner, locator.index)
    }

    /// Claimability of `account`'s lock at `index`; `None` if out of range.
    pub fn is_claimable(&self, account: &Address, index: usize, now: u64) -> Option<bool> {
        self.lock_at(account, index).map(|l| l.is_claimable(now))
    }

    /// Claimability of lock `id`; `None` if no such lock.
    pub fn is_claimable_by_id(&self, id: LockId, now: u64) -> Option<bool> {
        self.lock_by_id(id).map(|l| l.is_claimable(now))
    }

    /// Earliest unlock time among `account`'s unclaimed locks.
    pub fn next_unlock_time(&self, account: &Address) -> Option<u64> {
        self.locks_of(account)
            .iter()
            .filter(|l| !l.claimed)
            .map(|l| l.unlock_time)
            .min()
    }

    /// Units of `token` the vault owes depositors (sum of unclaimed locks).
    pub fn locked_balance(&self, token: &Address) -> u128 {
        self.locks
            .values()
            .flatten()
            .filter(|l| !l.claimed && l.token == *token)
            .map(|l| l.amount)
            .sum()
    }

    /// Accounts that have created at least one lock.
    pub fn accounts(&self) -> impl Iterator<Item = &Address> {
        self.locks.keys()
    }

    /// Committed events, oldest first.
    pub fn events(&self) -> &[VaultEvent] {
        &self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ONE_MONTH_SECS;

    const T0: u64 = 1_700_000_000;

    fn owner() -> Address {
        Address::repeat_byte(0x0A)
    }

    fn user() -> Address {
        Address::repeat_byte(0x01)
    }

    fn token() -> Address {
        Address::repeat_byte(0x70)
    }

    fn ledger_with_lock(amount: u128) -> VaultLedger {
        let mut ledger = VaultLedger::new(owner()).unwrap();
        let terms = ledger
            .validate_new_lock(&token(), amount, ONE_MONTH_SECS, T0)
            .unwrap();
        ledger.record_lock(&user(), terms);
        ledger
    }

    #[test]
    fn new_ledger_is_empty_and_running() {
        let ledger = VaultLedger::new(owner()).unwrap();
        assert_eq!(ledger.owner(), owner());
        assert!(!ledger.is_paused());
        assert_eq!(ledger.total_locks(), 0);
        assert!(ledger.locks_of(&user()).is_empty());
        assert!(ledger.events().is_empty());
    }

    #[test]
    fn zero_owner_rejected() {
        assert!(matches!(
            VaultLedger::new(Address::ZERO),
            Err(VaultError::InvalidOwner(_))
        ));
    }

    #[test]
    fn validation_order() {
        let mut ledger = VaultLedger::new(owner()).unwrap();
        ledger.pause(&owner()).unwrap();
        // Paused wins over every other defect.
        assert!(matches!(
            ledger.validate_new_lock(&Address::ZERO, 0, 1, T0),
            Err(VaultError::Paused)
        ));
        ledger.unpause(&owner()).unwrap();

        assert!(matches!(
            ledger.validate_new_lock(&Address::ZERO, 0, 1, T0),
            Err(VaultError::InvalidToken)
        ));
        assert!(matches!(
            ledger.validate_new_lock(&token(), 0, 1, T0),
            Err(VaultError::InvalidAmount)
        ));
        assert!(matches!(
            ledger.validate_new_lock(&token(), 1, 1, T0),
            Err(VaultError::InvalidDuration(1))
        ));
    }

    #[test]
    fn unlock_time_overflow_rejected() {
        let ledger = VaultLedger::new(owner()).unwrap();
        assert!(matches!(
            ledger.validate_new_lock(&token(), 1, ONE_MONTH_SECS, u64::MAX - 10),
            Err(VaultError::TimestampOverflow { .. })
        ));
    }

    #[test]
    fn record_assigns_id_index_and_times() {
        let ledger = ledger_with_lock(100);
        let lock = ledger.lock_at(&user(), 0).unwrap();
        assert_eq!(lock.id, LockId(0));
        assert_eq!(lock.index, 0);
        assert_eq!(lock.lock_time, T0);
        assert_eq!(lock.unlock_time, T0 + ONE_MONTH_SECS);
        assert!(!lock.claimed);
        assert_eq!(ledger.total_locks(), 1);
        assert_eq!(ledger.lock_by_id(LockId(0)), Some(lock));
        assert!(matches!(
            ledger.events()[0],
            VaultEvent::LockCreated { amount: 100, .. }
        ));
    }

    #[test]
    fn ids_are_global_indices_are_per_account() {
        let mut ledger = ledger_with_lock(1);
        let other = Address::repeat_byte(0x02);
        let terms = ledger
            .validate_new_lock(&token(), 2, ONE_MONTH_SECS, T0)
            .unwrap();
        let lock = ledger.record_lock(&other, terms);
        assert_eq!(lock.id, LockId(1));
        assert_eq!(lock.index, 0);
        assert_eq!(ledger.lock_by_id(LockId(1)).unwrap().owner, other);
        assert!(ledger.lock_by_id(LockId(2)).is_none());
    }

    #[test]
    fn begin_claim_sets_flag_and_revert_clears_it() {
        let mut ledger = ledger_with_lock(100);
        let lock = ledger
            .begin_claim(&user(), 0, T0 + ONE_MONTH_SECS)
            .unwrap();
        assert!(lock.claimed);
        assert!(ledger.lock_at(&user(), 0).unwrap().claimed);

        ledger.revert_claim(&user(), 0);
        assert!(!ledger.lock_at(&user(), 0).unwrap().claimed);
        // Nothing was emitted for the aborted claim.
        assert_eq!(ledger.events().len(), 1);
    }

    #[test]
    fn begin_claim_rejections() {
        let mut ledger = ledger_with_lock(100);
        assert!(matches!(
            ledger.begin_claim(&user(), 0, T0 + ONE_MONTH_SECS - 1),
            Err(VaultError::StillLocked { .. })
        ));
        assert!(matches!(
            ledger.begin_claim(&user(), 1, T0 + ONE_MONTH_SECS),
            Err(VaultError::NotLockOwner { index: 1, .. })
        ));
        assert!(matches!(
            ledger.begin_claim(&owner(), 0, T0 + ONE_MONTH_SECS),
            Err(VaultError::NotLockOwner { .. })
        ));

        let lock = ledger.begin_claim(&user(), 0, T0 + ONE_MONTH_SECS).unwrap();
        ledger.finish_claim(&lock);
        assert!(matches!(
            ledger.begin_claim(&user(), 0, T0 + ONE_MONTH_SECS),
            Err(VaultError::AlreadyClaimed)
        ));
    }

    #[test]
    fn pause_unpause_are_owner_only_and_not_toggles() {
        let mut ledger = VaultLedger::new(owner()).unwrap();
        assert!(matches!(ledger.pause(&user()), Err(VaultError::NotOwner(_))));
        assert!(matches!(ledger.unpause(&owner()), Err(VaultError::NotPaused)));

        ledger.pause(&owner()).unwrap();
        assert!(ledger.is_paused());
        assert!(matches!(ledger.pause(&owner()), Err(VaultError::Paused)));
        assert!(matches!(ledger.unpause(&user()), Err(VaultError::NotOwner(_))));

        ledger.unpause(&owner()).unwrap();
        assert!(!ledger.is_paused());
        assert_eq!(ledger.events().len(), 2);
    }

    #[test]
    fn ownership_transfer() {
        let mut ledger = VaultLedger::new(owner()).unwrap();
        let next = Address::repeat_byte(0x0B);
        assert!(matches!(
            ledger.transfer_ownership(&owner(), &Address::ZERO),
            Err(VaultError::InvalidOwner(_))
        ));
        ledger.transfer_ownership(&owner(), &next).unwrap();
        assert_eq!(ledger.owner(), next);
        assert!(matches!(ledger.pause(&owner()), Err(VaultError::NotOwner(_))));
        ledger.pause(&next).unwrap();
    }

    #[test]
    fn active_claimable_and_next_unlock() {
        let mut ledger = VaultLedger::new(owner()).unwrap();
        for (amount, secs) in [(10u128, ONE_MONTH_SECS), (20, ONE_MONTH_SECS * 6)] {
            let terms = ledger.validate_new_lock(&token(), amount, secs, T0).unwrap();
            ledger.record_lock(&user(), terms);
        }
        let matured = T0 + ONE_MONTH_SECS;
        assert_eq!(ledger.claimable_locks_of(&user(), matured).len(), 1);
        assert_eq!(ledger.next_unlock_time(&user()), Some(matured));
        assert_eq!(ledger.locked_balance(&token()), 30);

        let lock = ledger.begin_claim(&user(), 0, matured).unwrap();
        ledger.finish_claim(&lock);

        let active = ledger.active_locks_of(&user());
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].index, 1);
        assert_eq!(ledger.locks_of(&user()).len(), 2);
        assert_eq!(ledger.next_unlock_time(&user()), Some(T0 + ONE_MONTH_SECS * 6));
        assert_eq!(ledger.locked_balance(&token()), 20);
        assert_eq!(ledger.is_claimable(&user(), 0, matured), Some(false));
        assert_eq!(ledger.is_claimable(&user(), 5, matured), None);
        assert_eq!(ledger.is_claimable_by_id(LockId(1), u64::MAX), Some(true));
    }

    #[test]
    fn per_account_counts_and_depositors() {
        let mut ledger = ledger_with_lock(5);
        let other = Address::repeat_byte(0x02);
        for account in [user(), other] {
            let terms = ledger
                .validate_new_lock(&token(), 7, ONE_MONTH_SECS, T0)
                .unwrap();
            ledger.record_lock(&account, terms);
        }
        assert_eq!(ledger.lock_count_of(&user()), 2);
        assert_eq!(ledger.lock_count_of(&other), 1);
        assert_eq!(ledger.lock_count_of(&owner()), 0);

        // BTreeMap order: 0x01.. before 0x02..
        let accounts: Vec<Address> = ledger.accounts().copied().collect();
        assert_eq!(accounts, vec![user(), other]);

        // A claim does not remove the lock from the count.
        let lock = ledger.begin_claim(&user(), 0, T0 + ONE_MONTH_SECS).unwrap();
        ledger.finish_claim(&lock);
        assert_eq!(ledger.lock_count_of(&user()), 2);

        let names: Vec<&str> = ledger.events().iter().map(VaultEvent::name).collect();
        assert_eq!(
            names,
            ["LockCreated", "LockCreated", "LockCreated", "LockClaimed"]
        );
    }
}
