//! # Fungible-Token Boundary
//!
//! The vault custodies tokens it knows nothing about. All it needs from a
//! token contract is a pull (`transfer_from`, spending an allowance the
//! depositor granted beforehand) and a push (`transfer`). Either may fail,
//! and either may run arbitrary code before returning; the vault treats the
//! call as untrusted in both directions.
//!
//! [`TokenRegistry`] plays the part of the execution environment: it maps a
//! token address to the code behind it. [`StandardToken`] is a plain
//! allowance-based ledger used by the devnet CLI and the tests.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::address::Address;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures reported by a token contract.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TokenError {
    /// The sender holds fewer units than requested.
    #[error("insufficient balance: {account} has {balance}, needs {amount}")]
    InsufficientBalance {
        /// Account being debited.
        account: Address,
        /// Its current balance.
        balance: u128,
        /// Requested amount.
        amount: u128,
    },

    /// The spender's allowance does not cover the requested amount.
    #[error("insufficient allowance: {spender} may spend {allowance} of {owner}'s tokens, needs {amount}")]
    InsufficientAllowance {
        /// Token holder.
        owner: Address,
        /// Account spending on the holder's behalf.
        spender: Address,
        /// Currently approved amount.
        allowance: u128,
        /// Requested amount.
        amount: u128,
    },

    /// A balance or supply would exceed `u128::MAX`.
    #[error("token arithmetic overflow")]
    Overflow,

    /// The token returned failure without a more specific reason.
    #[error("transfer rejected: {0}")]
    Rejected(String),

    /// No token contract is registered at this address.
    #[error("no token contract at {0}")]
    UnknownToken(Address),
}

// ---------------------------------------------------------------------------
// Capability
// ---------------------------------------------------------------------------

/// The two token operations the vault depends on.
///
/// Implementations must be all-or-nothing: an `Err` means no balance moved.
pub trait FungibleToken: Send + Sync {
    /// Moves `amount` from `from` to `to`, spending `spender`'s allowance
    /// over `from`'s balance.
    fn transfer_from(
        &self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<(), TokenError>;

    /// Moves `amount` from `from` (the caller) to `to`.
    fn transfer(&self, from: &Address, to: &Address, amount: u128) -> Result<(), TokenError>;
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Address → token contract lookup.
#[derive(Default)]
pub struct TokenRegistry {
    tokens: RwLock<HashMap<Address, Arc<dyn FungibleToken>>>,
}

impl TokenRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Deploys `token` at `address`, replacing whatever was there.
    pub fn register(&self, address: Address, token: Arc<dyn FungibleToken>) {
        self.tokens.write().insert(address, token);
    }

    /// Returns the contract at `address`.
    ///
    /// The returned handle is cloned out so no registry lock is held while
    /// the caller runs token code.
    pub fn resolve(&self, address: &Address) -> Result<Arc<dyn FungibleToken>, TokenError> {
        self.tokens
            .read()
            .get(address)
            .cloned()
            .ok_or(TokenError::UnknownToken(*address))
    }

    /// `true` if a contract is registered at `address`.
    pub fn contains(&self, address: &Address) -> bool {
        self.tokens.read().contains_key(address)
    }

    /// Number of registered contracts.
    pub fn len(&self) -> usize {
        self.tokens.read().len()
    }

    /// `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.tokens.read().is_empty()
    }
}

impl fmt::Debug for TokenRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut addresses: Vec<Address> = self.tokens.read().keys().copied().collect();
        addresses.sort();
        f.debug_struct("TokenRegistry")
            .field("tokens", &addresses)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// StandardToken
// ---------------------------------------------------------------------------

/// Serializable balances and allowances of a [`StandardToken`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenState {
    /// Circulating supply.
    pub total_supply: u128,
    /// Holder → balance. Zero balances are omitted.
    pub balances: BTreeMap<Address, u128>,
    /// Holder → (spender → remaining allowance).
    pub allowances: BTreeMap<Address, BTreeMap<Address, u128>>,
}

impl TokenState {
    fn balance_of(&self, account: &Address) -> u128 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> u128 {
        self.allowances
            .get(owner)
            .and_then(|m| m.get(spender))
            .copied()
            .unwrap_or(0)
    }

    /// Debits `from` and credits `to`, validating both sides before writing.
    fn move_balance(&mut self, from: &Address, to: &Address, amount: u128) -> Result<(), TokenError> {
        let from_balance = self.balance_of(from);
        if from_balance < amount {
            return Err(TokenError::InsufficientBalance {
                account: *from,
                balance: from_balance,
                amount,
            });
        }
        if from == to {
            return Ok(());
        }
        let to_balance = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;

        set_or_remove(&mut self.balances, *from, from_balance - amount);
        set_or_remove(&mut self.balances, *to, to_balance);
        Ok(())
    }
}

fn set_or_remove(map: &mut BTreeMap<Address, u128>, key: Address, value: u128) {
    if value == 0 {
        map.remove(&key);
    } else {
        map.insert(key, value);
    }
}

/// An in-memory allowance-based token.
#[derive(Debug, Default)]
pub struct StandardToken {
    state: Mutex<TokenState>,
}

impl StandardToken {
    /// A token with zero supply.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restores a token from saved state.
    pub fn from_state(state: TokenState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    /// Copy of the current state, for persistence.
    pub fn state(&self) -> TokenState {
        self.state.lock().clone()
    }

    /// Creates `amount` new units in `to`'s balance.
    pub fn mint(&self, to: &Address, amount: u128) -> Result<(), TokenError> {
        let mut state = self.state.lock();
        let supply = state
            .total_supply
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;
        let balance = state
            .balance_of(to)
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;
        state.total_supply = supply;
        set_or_remove(&mut state.balances, *to, balance);
        Ok(())
    }

    /// Sets `spender`'s allowance over `owner`'s balance to exactly `amount`.
    pub fn approve(&self, owner: &Address, spender: &Address, amount: u128) {
        let mut state = self.state.lock();
        let entry = state.allowances.entry(*owner).or_default();
        set_or_remove(entry, *spender, amount);
        if entry.is_empty() {
            state.allowances.remove(owner);
        }
    }

    /// Balance of `account`.
    pub fn balance_of(&self, account: &Address) -> u128 {
        self.state.lock().balance_of(account)
    }

    /// Remaining allowance of `spender` over `owner`.
    pub fn allowance(&self, owner: &Address, spender: &Address) -> u128 {
        self.state.lock().allowance(owner, spender)
    }

    /// Circulating supply.
    pub fn total_supply(&self) -> u128 {
        self.state.lock().total_supply
    }
}

impl FungibleToken for StandardToken {
    fn transfer_from(
        &self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<(), TokenError> {
        let mut state = self.state.lock();
        let allowance = state.allowance(from, spender);
        if allowance < amount {
            return Err(TokenError::InsufficientAllowance {
                owner: *from,
                spender: *spender,
                allowance,
                amount,
            });
        }
        state.move_balance(from, to, amount)?;

        let entry = state.allowances.entry(*from).or_default();
        set_or_remove(entry, *spender, allowance - amount);
        if entry.is_empty() {
            state.allowances.remove(from);
        }
        Ok(())
    }

    fn transfer(&self, from: &Address, to: &Address, amount: u128) -> Result<(), TokenError> {
        self.state.lock().move_balance(from, to, amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Address {
        Address::repeat_byte(0xA1)
    }

    fn bob() -> Address {
        Address::repeat_byte(0xB0)
    }

    fn vault() -> Address {
        Address::repeat_byte(0x77)
    }

    #[test]
    fn mint_increases_supply_and_balance() {
        let token = StandardToken::new();
        token.mint(&alice(), 1_000).unwrap();
        assert_eq!(token.total_supply(), 1_000);
        assert_eq!(token.balance_of(&alice()), 1_000);
        assert_eq!(token.balance_of(&bob()), 0);
    }

    #[test]
    fn mint_overflow_rejected() {
        let token = StandardToken::new();
        token.mint(&alice(), u128::MAX).unwrap();
        assert_eq!(token.mint(&bob(), 1), Err(TokenError::Overflow));
        assert_eq!(token.balance_of(&bob()), 0);
    }

    #[test]
    fn transfer_moves_balance() {
        let token = StandardToken::new();
        token.mint(&alice(), 100).unwrap();
        token.transfer(&alice(), &bob(), 40).unwrap();
        assert_eq!(token.balance_of(&alice()), 60);
        assert_eq!(token.balance_of(&bob()), 40);
        assert_eq!(token.total_supply(), 100);
    }

    #[test]
    fn transfer_more_than_balance_rejected() {
        let token = StandardToken::new();
        token.mint(&alice(), 10).unwrap();
        let err = token.transfer(&alice(), &bob(), 11).unwrap_err();
        assert!(matches!(err, TokenError::InsufficientBalance { balance: 10, .. }));
        assert_eq!(token.balance_of(&alice()), 10);
    }

    #[test]
    fn transfer_from_spends_allowance() {
        let token = StandardToken::new();
        token.mint(&alice(), 100).unwrap();
        token.approve(&alice(), &vault(), 70);
        token.transfer_from(&vault(), &alice(), &vault(), 50).unwrap();
        assert_eq!(token.balance_of(&vault()), 50);
        assert_eq!(token.allowance(&alice(), &vault()), 20);
    }

    #[test]
    fn transfer_from_without_allowance_rejected() {
        let token = StandardToken::new();
        token.mint(&alice(), 100).unwrap();
        let err = token
            .transfer_from(&vault(), &alice(), &vault(), 1)
            .unwrap_err();
        assert!(matches!(err, TokenError::InsufficientAllowance { allowance: 0, .. }));
        assert_eq!(token.balance_of(&alice()), 100);
    }

    #[test]
    fn failed_transfer_from_keeps_allowance() {
        let token = StandardToken::new();
        token.mint(&alice(), 5).unwrap();
        token.approve(&alice(), &vault(), 50);
        assert!(token.transfer_from(&vault(), &alice(), &vault(), 50).is_err());
        assert_eq!(token.allowance(&alice(), &vault()), 50);
    }

    #[test]
    fn registry_resolves_registered_tokens_only() {
        let registry = TokenRegistry::new();
        let addr = Address::repeat_byte(0x70);
        assert!(registry.is_empty());
        assert!(matches!(
            registry.resolve(&addr),
            Err(TokenError::UnknownToken(a)) if a == addr
        ));

        registry.register(addr, Arc::new(StandardToken::new()));
        assert!(registry.contains(&addr));
        assert_eq!(registry.len(), 1);
        assert!(registry.resolve(&addr).is_ok());
    }

    #[test]
    fn state_survives_json() {
        let token = StandardToken::new();
        token.mint(&alice(), 300).unwrap();
        token.approve(&alice(), &vault(), 120);

        let json = serde_json::to_string(&token.state()).unwrap();
        let restored = StandardToken::from_state(serde_json::from_str(&json).unwrap());
        assert_eq!(restored.state(), token.state());
        assert_eq!(restored.allowance(&alice(), &vault()), 120);
    }
}
