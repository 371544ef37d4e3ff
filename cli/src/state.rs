//! # Devnet State File
//!
//! The CLI is stateless between invocations; everything it knows lives in one
//! JSON document holding the vault ledger and the balances of every simulated
//! token. A run loads the file, rebuilds a live [`HodlVault`] from it, applies
//! one operation, and writes the snapshot back if the operation succeeded.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use hodl_contracts::{
    Address, Clock, HodlVault, StandardToken, TokenRegistry, TokenState, VaultLedger,
};

/// Everything persisted between CLI runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevnetState {
    /// Custody address of the vault.
    pub vault_address: Address,
    pub ledger: VaultLedger,
    /// Token address → balances and allowances.
    #[serde(default)]
    pub tokens: BTreeMap<Address, TokenState>,
}

impl DevnetState {
    /// A freshly deployed vault with no tokens.
    pub fn genesis(vault_address: Address, owner: Address) -> Result<Self> {
        let ledger = VaultLedger::new(owner).context("failed to deploy vault")?;
        Ok(Self {
            vault_address,
            ledger,
            tokens: BTreeMap::new(),
        })
    }

    /// Reads a state file written by [`save`](Self::save).
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            bail!(
                "state file {} not found, run `hodl-vault init` first",
                path.display()
            );
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read state file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse state file {}", path.display()))
    }

    /// Writes the state as pretty JSON, replacing the file atomically.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create directory {}", dir.display()))?;
        }
        let json = serde_json::to_string_pretty(self).context("failed to encode state")?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .with_context(|| format!("failed to replace state file {}", path.display()))?;
        tracing::debug!(path = %path.display(), "state saved");
        Ok(())
    }

    /// Deploys every saved token and the vault into a live environment.
    pub fn into_devnet(self, clock: Arc<dyn Clock>) -> Devnet {
        let registry = Arc::new(TokenRegistry::new());
        let mut tokens = BTreeMap::new();
        for (address, state) in self.tokens {
            let token = Arc::new(StandardToken::from_state(state));
            registry.register(address, token.clone());
            tokens.insert(address, token);
        }
        let vault = HodlVault::from_ledger(self.vault_address, self.ledger, registry, clock);
        Devnet { vault, tokens }
    }
}

/// A live vault plus handles to the concrete tokens behind its registry.
#[derive(Debug)]
pub struct Devnet {
    pub vault: HodlVault,
    tokens: BTreeMap<Address, Arc<StandardToken>>,
}

impl Devnet {
    /// The token at `address`, if one has been deployed.
    pub fn token(&self, address: &Address) -> Option<&Arc<StandardToken>> {
        self.tokens.get(address)
    }

    /// Addresses of every deployed token, in order.
    pub fn token_addresses(&self) -> impl Iterator<Item = &Address> {
        self.tokens.keys()
    }

    /// The token at `address`, deploying an empty one on first use.
    pub fn token_or_deploy(&mut self, address: &Address) -> Arc<StandardToken> {
        if let Some(token) = self.tokens.get(address) {
            return token.clone();
        }
        let token = Arc::new(StandardToken::new());
        self.vault.tokens().register(*address, token.clone());
        self.tokens.insert(*address, token.clone());
        tracing::info!(token = %address, "token deployed");
        token
    }

    /// Captures the current state for persistence.
    pub fn snapshot(&self) -> DevnetState {
        DevnetState {
            vault_address: self.vault.address(),
            ledger: self.vault.snapshot(),
            tokens: self
                .tokens
                .iter()
                .map(|(address, token)| (*address, token.state()))
                .collect(),
        }
    }
}
