// Copyright (c) 2026 Hodl Vault Contributors. MIT License.
// See LICENSE for details.

//! # Hodl Vault Devnet
//!
//! Entry point for the `hodl-vault` binary. Parses CLI arguments, initializes
//! logging, loads the devnet state file, applies one operation, and saves the
//! result.
//!
//! State is only written back when the operation succeeds, so a rejected
//! lock or claim leaves the file exactly as it was.

mod cli;
mod logging;
mod state;

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;

use hodl_contracts::config::BPS_DENOMINATOR;
use hodl_contracts::{Clock, Countdown, Lock, LockDuration, ManualClock, SystemClock};

use cli::{Commands, GlobalArgs, HodlCli};
use state::{Devnet, DevnetState};

/// Filter used when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "hodl_vault=info,hodl_contracts=info";

fn main() -> Result<()> {
    let cli = HodlCli::parse();
    logging::init_logging(DEFAULT_LOG_FILTER, cli.global.log_format);

    match cli.command {
        Commands::Init(args) => init_vault(&cli.global, args),
        Commands::Durations => {
            print_durations();
            Ok(())
        }
        command => run_on_state(&cli.global.state, make_clock(&cli.global), command),
    }
}

/// Loads the state file, runs `command`, and writes the file back only if the
/// command succeeded and changed something.
fn run_on_state(path: &Path, clock: Arc<dyn Clock>, command: Commands) -> Result<()> {
    let mut devnet = DevnetState::load(path)?.into_devnet(clock);
    let dirty = execute(&mut devnet, command)?;
    if dirty {
        devnet.snapshot().save(path)?;
    }
    Ok(())
}

/// System time unless `--now` pins it.
fn make_clock(global: &GlobalArgs) -> Arc<dyn Clock> {
    match global.now {
        Some(now) => {
            tracing::debug!(now, "using pinned clock");
            Arc::new(ManualClock::new(now))
        }
        None => Arc::new(SystemClock),
    }
}

/// Writes a fresh vault to the state file.
fn init_vault(global: &GlobalArgs, args: cli::InitArgs) -> Result<()> {
    let path = &global.state;
    if path.exists() && !args.force {
        bail!(
            "state file {} already exists, pass --force to overwrite",
            path.display()
        );
    }

    let state = DevnetState::genesis(args.vault, args.owner)?;
    state.save(path)?;

    tracing::info!(
        vault = %args.vault,
        owner = %args.owner,
        path = %path.display(),
        "vault deployed"
    );

    println!("Vault deployed.");
    println!("  State file : {}", path.display());
    println!("  Vault      : {}", args.vault);
    println!("  Owner      : {}", args.owner);
    Ok(())
}

/// Runs one state-file command. Returns `true` if the state changed.
fn execute(devnet: &mut Devnet, command: Commands) -> Result<bool> {
    let vault = &devnet.vault;
    match command {
        Commands::Mint(args) => {
            let token = devnet.token_or_deploy(&args.token);
            token
                .mint(&args.to, args.amount)
                .with_context(|| format!("mint of {} to {} failed", args.amount, args.to))?;
            println!(
                "Minted {} of {} to {} (balance {})",
                args.amount,
                args.token,
                args.to,
                token.balance_of(&args.to)
            );
            Ok(true)
        }

        Commands::Approve(args) => {
            let Some(token) = devnet.token(&args.token) else {
                bail!("no token deployed at {}, mint some first", args.token);
            };
            let spender = vault.address();
            token.approve(&args.holder, &spender, args.amount);
            println!(
                "{} approved the vault ({}) for {} of {}",
                args.holder, spender, args.amount, args.token
            );
            Ok(true)
        }

        Commands::Lock(args) => {
            let lock = vault
                .lock_for(&args.account, &args.token, args.amount, args.duration)
                .with_context(|| format!("lock by {} failed", args.account))?;
            println!("Locked {} for {}.", lock.amount, args.duration);
            print_lock(&lock, vault.now());
            Ok(true)
        }

        Commands::Claim(args) => {
            let amount = vault
                .claim_tokens(&args.account, args.index)
                .with_context(|| format!("claim of lock {} by {} failed", args.index, args.account))?;
            println!("Claimed {} from lock {} of {}", amount, args.index, args.account);
            Ok(true)
        }

        Commands::Pause(args) => {
            vault.pause(&args.caller).context("pause failed")?;
            println!("Vault paused. New locks are rejected; claims still work.");
            Ok(true)
        }

        Commands::Unpause(args) => {
            vault.unpause(&args.caller).context("unpause failed")?;
            println!("Vault unpaused.");
            Ok(true)
        }

        Commands::TransferOwnership(args) => {
            vault
                .transfer_ownership(&args.caller, &args.new_owner)
                .context("ownership transfer failed")?;
            println!("Ownership transferred to {}", args.new_owner);
            Ok(true)
        }

        Commands::Locks(args) => {
            let now = vault.now();
            let locks = if args.active {
                vault.active_locks_of(&args.account)
            } else {
                vault.locks_of(&args.account)
            };
            if locks.is_empty() {
                println!("No locks for {}", args.account);
            }
            for lock in &locks {
                print_lock(lock, now);
            }
            if let Some(next) = vault.next_unlock_time(&args.account) {
                let wait = Countdown::from_secs(next.saturating_sub(now));
                println!("Next unlock in {wait}");
            }
            Ok(false)
        }

        Commands::Balance(args) => {
            let balance = devnet
                .token(&args.token)
                .map(|t| t.balance_of(&args.account))
                .unwrap_or(0);
            println!("{balance}");
            Ok(false)
        }

        Commands::Status => {
            println!("Vault        : {}", vault.address());
            println!("Owner        : {}", vault.owner());
            println!("Paused       : {}", vault.is_paused());
            println!("Total locks  : {}", vault.total_locks());
            println!("Now          : {}", vault.now());
            for address in devnet.token_addresses() {
                let locked = vault.locked_balance(address);
                if locked > 0 {
                    println!("Locked       : {locked} of {address}");
                }
            }
            Ok(false)
        }

        Commands::Init(_) | Commands::Durations => {
            bail!("command does not operate on saved state")
        }
    }
}

fn print_lock(lock: &Lock, now: u64) {
    let status = if lock.claimed {
        "claimed".to_string()
    } else if lock.is_unlocked(now) {
        "claimable".to_string()
    } else {
        format!(
            "locked, {} left ({:.1}%)",
            Countdown::from_secs(lock.time_remaining(now)),
            lock.progress_bps(now) as f64 * 100.0 / BPS_DENOMINATOR as f64
        )
    };
    let unlock_date = lock
        .unlock_at()
        .map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| lock.unlock_time.to_string());

    println!(
        "  [{}] {} amount={} token={} unlocks={} ({})",
        lock.index, lock.id, lock.amount, lock.token, unlock_date, status
    );
}

fn print_durations() {
    for duration in LockDuration::ALL {
        println!(
            "{:>4}  {:<9} {:>5} days  {:>10} s",
            duration.short_label(),
            duration.to_string(),
            duration.days(),
            duration.as_secs()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cli::{AdminArgs, ApproveArgs, ClaimArgs, LockArgs, MintArgs};
    use hodl_contracts::config::ONE_MONTH_SECS;
    use hodl_contracts::{Address, VaultError};

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

    fn at(now: u64) -> Arc<dyn Clock> {
        Arc::new(ManualClock::new(now))
    }

    fn lock_cmd(amount: u128) -> Commands {
        Commands::Lock(LockArgs {
            account: user(),
            token: token(),
            amount,
            duration: LockDuration::OneMonth,
        })
    }

    fn claim_cmd() -> Commands {
        Commands::Claim(ClaimArgs {
            account: user(),
            index: 0,
        })
    }

    /// A state file with a funded, approved user.
    fn funded_state(dir: &tempfile::TempDir) -> std::path::PathBuf {
        let path = dir.path().join("devnet.json");
        DevnetState::genesis(Address::repeat_byte(0x77), owner())
            .unwrap()
            .save(&path)
            .unwrap();
        run_on_state(
            &path,
            at(T0),
            Commands::Mint(MintArgs {
                token: token(),
                to: user(),
                amount: 1_000,
            }),
        )
        .unwrap();
        run_on_state(
            &path,
            at(T0),
            Commands::Approve(ApproveArgs {
                token: token(),
                holder: user(),
                amount: 1_000,
            }),
        )
        .unwrap();
        path
    }

    fn vault_error(err: &anyhow::Error) -> Option<&VaultError> {
        err.downcast_ref::<VaultError>()
    }

    #[test]
    fn lock_then_claim_persists_between_runs() {
        let dir = tempfile::tempdir().unwrap();
        let path = funded_state(&dir);

        run_on_state(&path, at(T0), lock_cmd(300)).unwrap();
        let state = DevnetState::load(&path).unwrap();
        assert_eq!(state.ledger.total_locks(), 1);
        assert_eq!(state.tokens[&token()].balances[&user()], 700);

        run_on_state(&path, at(T0 + ONE_MONTH_SECS), claim_cmd()).unwrap();
        let state = DevnetState::load(&path).unwrap();
        assert!(state.ledger.lock_at(&user(), 0).unwrap().claimed);
        assert_eq!(state.tokens[&token()].balances[&user()], 1_000);
    }

    #[test]
    fn early_claim_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = funded_state(&dir);
        run_on_state(&path, at(T0), lock_cmd(300)).unwrap();
        let before = std::fs::read(&path).unwrap();

        let err = run_on_state(&path, at(T0 + ONE_MONTH_SECS - 1), claim_cmd()).unwrap_err();
        assert!(matches!(
            vault_error(&err),
            Some(VaultError::StillLocked { .. })
        ));
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[test]
    fn lock_while_paused_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = funded_state(&dir);
        run_on_state(&path, at(T0), Commands::Pause(AdminArgs { caller: owner() })).unwrap();
        let before = std::fs::read(&path).unwrap();

        let err = run_on_state(&path, at(T0), lock_cmd(300)).unwrap_err();
        assert!(matches!(vault_error(&err), Some(VaultError::Paused)));
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[test]
    fn queries_do_not_rewrite_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = funded_state(&dir);
        let before = std::fs::read(&path).unwrap();

        run_on_state(&path, at(T0), Commands::Status).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[test]
    fn approve_on_unknown_token_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = funded_state(&dir);
        let err = run_on_state(
            &path,
            at(T0),
            Commands::Approve(ApproveArgs {
                token: Address::repeat_byte(0x99),
                holder: user(),
                amount: 1,
            }),
        )
        .unwrap_err();
        assert!(err.to_string().contains("no token deployed"));
    }
}
